//! KaCanOpen driver for ZLG CAN interfaces.
//!
//! A [`Session`] owns an opened device with one started channel and
//! translates between [`Message`]s and the frames of the ZLG SDK. The SDK is
//! reached through the [`Transport`] trait; [`zlg::ZlgTransport`] (feature
//! `vendor`) calls into the real library and [`Loopback`] simulates it.

pub mod prelude {
    pub use embedded_can::{blocking::Can as _, nb::Can as _, Frame as _};
}

pub mod config;
pub mod error;
pub mod ffi;
pub mod frame;
pub mod handle;
pub mod loopback;
pub mod session;
pub mod transport;
#[cfg(feature = "vendor")]
pub mod zlg;

pub use config::{Baudrate, BusConfig, SessionOptions};
pub use error::{Error, PropertyError, Result};
pub use frame::{Message, RawFrame};
pub use handle::HandleTable;
pub use loopback::Loopback;
pub use session::{CancelToken, Session};
pub use transport::Transport;
