//! Server configuration
//!
//! Read once at startup from the command line and environment.

use std::env;
use std::path::PathBuf;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default directory for uploaded attachments
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Channel buffer size for server commands
pub const DEFAULT_COMMAND_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to listen on
    pub bind_addr: String,
    /// Where `FsStore` keeps attachments
    pub upload_dir: PathBuf,
    /// Depth of the ChatServer command channel
    pub command_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

impl Config {
    /// Build from process arguments and environment
    ///
    /// The first argument, then `CHAT_ADDR`, sets the bind address;
    /// `CHAT_UPLOAD_DIR` sets the upload directory.
    pub fn from_env() -> Self {
        Self::from_sources(env::args().nth(1), |key| env::var(key).ok())
    }

    fn from_sources(arg: Option<String>, var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: arg
                .or_else(|| var("CHAT_ADDR"))
                .unwrap_or(defaults.bind_addr),
            upload_dir: var("CHAT_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            command_buffer: defaults.command_buffer,
        }
    }
}
