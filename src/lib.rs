pub mod compose;
pub mod config;
pub mod error;
pub mod normalize;
pub mod reader;
pub mod selector;
pub mod store;
pub mod table;

pub use error::{FeeScheduleError, Result};
