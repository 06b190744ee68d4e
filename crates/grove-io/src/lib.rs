//! Loading dataset tables for grove from CSV files.

mod error;
mod reader;

pub use error::IoError;
pub use reader::TableReader;
