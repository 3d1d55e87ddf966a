pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, LlmProvider};
pub use error::PrecisError;
pub type Result<T> = std::result::Result<T, PrecisError>;
