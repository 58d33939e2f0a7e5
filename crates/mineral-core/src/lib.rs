pub mod config_manager;
pub mod error;
pub mod term;

pub use config_manager::*;
pub use error::*;
pub use term::*;
