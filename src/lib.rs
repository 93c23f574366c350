//! Fieldbook: farm records from the command line
//!
//! Keeps fields, the crops planted on them and the field work done for each
//! crop against a REST backend, with a local query cache, schema-checked
//! forms and cascading deletes.

pub mod cli;
pub mod core;
pub mod entities;
pub mod schema;
