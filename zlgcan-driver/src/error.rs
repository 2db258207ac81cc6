use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why the device property store refused a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The SDK did not hand out a property interface for the device.
    #[error("property store unreachable")]
    Unreachable,
    /// The property interface rejected the write.
    #[error("property write rejected")]
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("bus name {0:?} is not a device index")]
    InvalidBusName(String),
    #[error("unrecognized baud rate {0:?}")]
    UnrecognizedBaudrate(String),
    #[error("device {index} is unavailable")]
    DeviceUnavailable { index: u32 },
    #[error("baud rate configuration rejected: {0}")]
    ConfigurationRejected(PropertyError),
    #[error("failed to initialize channel {index}")]
    ChannelInitFailed { index: u32 },
    #[error("failed to start channel {index}")]
    ChannelStartFailed { index: u32 },
    #[error("no open session behind this handle")]
    InvalidSession,
    #[error("message length {0} exceeds 8 bytes")]
    InvalidLength(u8),
    #[error("failed to transmit frame")]
    TransmitFailed,
    #[error("failed to fetch queued frame")]
    ReceiveFailed,
    #[error("device reported an error while closing")]
    CloseFailed,
    #[error("timed out waiting for a frame")]
    Timeout,
    #[error("receive cancelled")]
    Cancelled,
}

impl Error {
    /// Non-zero status code reported through the C driver interface.
    pub fn status(&self) -> u8 {
        match self {
            Error::InvalidSession => 1,
            Error::DeviceUnavailable { .. } => 2,
            Error::ConfigurationRejected(_) => 3,
            Error::ChannelInitFailed { .. } => 4,
            Error::ChannelStartFailed { .. } => 5,
            Error::TransmitFailed => 6,
            Error::ReceiveFailed => 7,
            Error::CloseFailed => 8,
            Error::InvalidBusName(_) => 9,
            Error::UnrecognizedBaudrate(_) => 10,
            Error::InvalidLength(_) => 11,
            Error::Timeout => 12,
            Error::Cancelled => 13,
        }
    }
}

impl embedded_can::Error for Error {
    fn kind(&self) -> embedded_can::ErrorKind {
        embedded_can::ErrorKind::Other
    }
}
