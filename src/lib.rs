pub mod auth;
pub mod blog;
pub mod config;
pub mod donation;
pub mod error;
pub mod platform;
pub mod receipt;
pub mod score;
pub mod storage;
pub mod utils;

pub use error::{Result, EcoShareError};
pub use config::Config;
pub use platform::Platform;
