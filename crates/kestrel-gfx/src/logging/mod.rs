//! Logger setup for binaries. The library itself only uses the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig};
