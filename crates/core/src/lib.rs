pub mod config;
pub mod domain;
pub mod error;
pub mod postfields;
pub mod sanitize;
pub mod timeutil;

pub use config::{AggregatorConfig, Credentials, CredentialsError};
pub use domain::*;
pub use error::*;
pub use postfields::ensure_post_fields;
