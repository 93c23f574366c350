//! Core module - fundamental types and services

pub mod cache;
pub mod cascade;
pub mod config;
pub mod gateway;
pub mod identity;
pub mod record;
pub mod store;
pub mod transport;

pub use cache::{CacheError, CacheKey, CacheStats, QueryCache};
pub use cascade::{CascadeError, CascadeSummary, CropRef, DeletePlan, DeleteStep, WorkRef};
pub use config::Config;
pub use gateway::{Gateway, GatewayError};
pub use identity::{Identifier, KindParseError, RecordKind};
pub use record::{ReadOptions, Record};
pub use store::{RecordStore, StoreError};
pub use transport::{ApiRequest, HttpTransport, Method, Transport, TransportError};
