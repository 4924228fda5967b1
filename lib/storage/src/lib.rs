pub mod file;
pub mod store;

pub use file::{parse_log, FileLoader};
pub use store::LogStore;
