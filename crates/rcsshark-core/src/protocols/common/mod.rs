pub mod reader;

pub use reader::{ByteCursor, OutOfBounds};
