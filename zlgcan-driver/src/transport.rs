//! The subset of the ZLG SDK the driver relies on.

use std::num::NonZeroUsize;

use crate::{error::PropertyError, frame::RawFrame};

/// Opaque device handle handed out by the SDK. Never null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(NonZeroUsize);

/// Opaque channel handle handed out by the SDK. Never null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(NonZeroUsize);

macro_rules! raw_handle {
    ($handle:ident) => {
        impl $handle {
            /// Returns `None` for the SDK's invalid handle value 0.
            pub fn from_raw(raw: usize) -> Option<Self> {
                NonZeroUsize::new(raw).map(Self)
            }

            pub fn as_raw(self) -> usize {
                self.0.get()
            }
        }
    };
}

raw_handle!(DeviceHandle);
raw_handle!(ChannelHandle);

/// Controller type selected by `ZCAN_CHANNEL_INIT_CONFIG::can_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanType {
    Can = 0,
    CanFd = 1,
}

/// Channel initialization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub can_type: CanType,
    pub acc_code: u32,
    pub acc_mask: u32,
    pub filter: u8,
    pub mode: u8,
}

impl ChannelConfig {
    /// Classic CAN in normal mode, acceptance filter open for every frame.
    pub fn accept_all() -> Self {
        Self {
            can_type: CanType::Can,
            acc_code: 0,
            acc_mask: 0xFFFF_FFFF,
            filter: 0,
            mode: 0,
        }
    }
}

/// Vendor SDK calls, one method per SDK function.
///
/// Implementations report failures the way the SDK does (invalid handles,
/// status flags, frame counts); translating them into [`crate::Error`] is up
/// to the session.
pub trait Transport {
    fn open_device(&self, device_type: u32, index: u32) -> Option<DeviceHandle>;

    /// Returns `false` if the SDK reported an error.
    fn close_device(&self, device: DeviceHandle) -> bool;

    /// Writes `value` to `path` in the device property store.
    fn set_property(
        &self,
        device: DeviceHandle,
        path: &str,
        value: &str,
    ) -> Result<(), PropertyError>;

    fn init_channel(
        &self,
        device: DeviceHandle,
        index: u32,
        config: &ChannelConfig,
    ) -> Option<ChannelHandle>;

    fn start_channel(&self, channel: ChannelHandle) -> bool;

    /// Queues `frames` for transmission, returns the number accepted.
    fn transmit(&self, channel: ChannelHandle, frames: &[RawFrame]) -> u32;

    /// Number of classic CAN frames waiting in the receive buffer.
    fn receive_count(&self, channel: ChannelHandle) -> u32;

    /// Fetches up to `frames.len()` frames, waiting at most `wait_ms`
    /// milliseconds (-1 waits forever). Returns the number fetched.
    fn receive(&self, channel: ChannelHandle, frames: &mut [RawFrame], wait_ms: i32) -> u32;
}
