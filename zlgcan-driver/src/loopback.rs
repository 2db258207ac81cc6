//! In-process stand-in for the ZLG SDK.
//!
//! Every transmitted frame is echoed back into the receive queue, which makes
//! it usable as a bench harness for protocol stacks. Each SDK step can be made
//! to fail through [`Faults`].

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    error::PropertyError,
    frame::{Message, RawFrame},
    transport::{ChannelConfig, ChannelHandle, DeviceHandle, Transport},
};

/// SDK calls that should report failure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Faults {
    pub open_device: bool,
    pub property: Option<PropertyError>,
    pub init_channel: bool,
    pub start_channel: bool,
    pub transmit: bool,
    /// Frames are still counted as queued but cannot be fetched.
    pub receive: bool,
    pub close_device: bool,
}

#[derive(Debug, Default)]
struct State {
    faults: Faults,
    next_handle: usize,
    open_devices: BTreeSet<usize>,
    properties: BTreeMap<String, String>,
    channel_config: Option<ChannelConfig>,
    queue: VecDeque<RawFrame>,
    transmitted: Vec<RawFrame>,
    no_echo: bool,
}

impl State {
    fn next_handle(&mut self) -> usize {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Cloning yields another view of the same simulated device.
#[derive(Debug, Clone, Default)]
pub struct Loopback {
    state: Arc<Mutex<State>>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        let loopback = Self::new();
        loopback.set_faults(faults);
        loopback
    }

    pub fn set_faults(&self, faults: Faults) {
        self.state.lock().faults = faults;
    }

    /// Disables echoing of transmitted frames.
    pub fn set_echo(&self, echo: bool) {
        self.state.lock().no_echo = !echo;
    }

    /// Queues a frame as if it was received from the bus.
    pub fn inject_frame(&self, frame: RawFrame) {
        self.state.lock().queue.push_back(frame);
    }

    pub fn inject(&self, message: &Message) {
        self.inject_frame(RawFrame::encode(message));
    }

    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Frames handed to the transmit call, oldest first.
    pub fn transmitted(&self) -> Vec<RawFrame> {
        self.state.lock().transmitted.clone()
    }

    /// Devices opened and not closed yet.
    pub fn open_devices(&self) -> usize {
        self.state.lock().open_devices.len()
    }

    pub fn property(&self, path: &str) -> Option<String> {
        self.state.lock().properties.get(path).cloned()
    }

    /// Configuration of the last initialized channel.
    pub fn channel_config(&self) -> Option<ChannelConfig> {
        self.state.lock().channel_config
    }
}

impl Transport for Loopback {
    fn open_device(&self, _device_type: u32, _index: u32) -> Option<DeviceHandle> {
        let mut state = self.state.lock();
        if state.faults.open_device {
            return None;
        }

        let handle = state.next_handle();
        state.open_devices.insert(handle);
        DeviceHandle::from_raw(handle)
    }

    fn close_device(&self, device: DeviceHandle) -> bool {
        let mut state = self.state.lock();
        state.open_devices.remove(&device.as_raw());
        !state.faults.close_device
    }

    fn set_property(
        &self,
        _device: DeviceHandle,
        path: &str,
        value: &str,
    ) -> Result<(), PropertyError> {
        let mut state = self.state.lock();
        if let Some(error) = state.faults.property {
            return Err(error);
        }

        state.properties.insert(path.to_string(), value.to_string());
        Ok(())
    }

    fn init_channel(
        &self,
        _device: DeviceHandle,
        _index: u32,
        config: &ChannelConfig,
    ) -> Option<ChannelHandle> {
        let mut state = self.state.lock();
        if state.faults.init_channel {
            return None;
        }

        state.channel_config = Some(*config);
        let handle = state.next_handle();
        ChannelHandle::from_raw(handle)
    }

    fn start_channel(&self, _channel: ChannelHandle) -> bool {
        !self.state.lock().faults.start_channel
    }

    fn transmit(&self, _channel: ChannelHandle, frames: &[RawFrame]) -> u32 {
        let mut state = self.state.lock();
        if state.faults.transmit {
            return 0;
        }

        state.transmitted.extend_from_slice(frames);
        if !state.no_echo {
            state.queue.extend(frames.iter().copied());
        }
        frames.len() as u32
    }

    fn receive_count(&self, _channel: ChannelHandle) -> u32 {
        self.state.lock().queue.len() as u32
    }

    fn receive(&self, _channel: ChannelHandle, frames: &mut [RawFrame], _wait_ms: i32) -> u32 {
        let mut state = self.state.lock();
        if state.faults.receive {
            return 0;
        }

        let mut count = 0;
        for slot in frames.iter_mut() {
            match state.queue.pop_front() {
                Some(frame) => {
                    *slot = frame;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }
}
