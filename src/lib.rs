//! Right analog stick to relative mouse emulation over uinput.

pub mod bridge;
pub mod config;
pub mod cursor;
pub mod device_db;
pub mod dump;
pub mod hook;
pub mod injector;
pub mod input;
