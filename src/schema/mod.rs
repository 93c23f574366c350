//! Schema system - form input and validation

pub mod form;
pub mod registry;
pub mod validator;

pub use form::FormInput;
pub use registry::{FormMode, SchemaRegistry};
pub use validator::{FieldViolation, FormValidator, ValidationError, EMPTY_EDIT_MESSAGE};
