pub mod be;
pub mod cursor;

pub use be::{push_tag, read_tag, BigEndianExt};
pub use cursor::Cursor;
