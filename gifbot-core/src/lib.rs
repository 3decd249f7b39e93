pub mod capabilities;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod types;

pub use capabilities::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use types::*;
