use clap::Parser;
use miette::Result;
use fieldbook::cli::{Cli, Commands, GlobalOpts};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Field(cmd) => fieldbook::cli::commands::field::run(cmd, &global),
        Commands::Crop(cmd) => fieldbook::cli::commands::crop::run(cmd, &global),
        Commands::Work(cmd) => fieldbook::cli::commands::work::run(cmd, &global),
        Commands::Cache(cmd) => fieldbook::cli::commands::cache::run(cmd, &global),
        Commands::Config(cmd) => fieldbook::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => fieldbook::cli::commands::completions::run(args),
    }
}

/// Warnings by default; `-v` for debug, `-q` for errors only. `RUST_LOG` wins.
fn init_logging(global: &GlobalOpts) {
    let level = if global.verbose {
        log::LevelFilter::Debug
    } else if global.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .init();
}
