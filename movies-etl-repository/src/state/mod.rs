//! Cursor state storage backends.

mod file;
mod memory;
mod redis;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;
pub use self::redis::RedisStorage;
