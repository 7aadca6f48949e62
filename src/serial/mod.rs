pub mod interface;
pub mod protocol;

pub use interface::SerialInterface;
pub use protocol::{Speed, Xdm1041};

use serde::{Deserialize, Serialize};

/// Identity of a discovered USB serial device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialDeviceInfo {
    pub port_name: String,
    pub vid: u16,
    pub pid: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Port not open")]
    NotOpen,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Short write: {written} of {expected} bytes accepted")]
    ShortWrite { written: usize, expected: usize },

    #[error("Write confirmation timeout")]
    WriteTimeout,

    #[error("Read timeout")]
    ReadTimeout,

    #[error("Invalid reply: {0:?}")]
    InvalidReply(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;
