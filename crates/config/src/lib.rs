pub mod error;
pub mod loader;
pub mod validation;

pub use error::ConfigError;
pub use loader::{deep_merge, load};
pub use validation::{validate_config, ValidationError, ValidationResult, ValidationWarning};
