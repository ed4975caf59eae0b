mod size;
mod time;

pub use self::size::format_bytes;
pub use self::time::format_duration;
pub use self::time::parse_duration;
