pub mod errors;
pub mod types;

pub use errors::{AfterglowError, ConfigError};
pub use types::Color;

pub type Result<T> = std::result::Result<T, AfterglowError>;
