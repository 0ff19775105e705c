#[macro_use]
pub mod exception;
pub mod asset;
pub mod json;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod log;
pub mod schedule;
pub mod shutdown;
