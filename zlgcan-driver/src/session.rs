use std::{
    slice,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, error, warn};

use crate::{
    config::{BusConfig, SessionOptions},
    error::{Error, Result},
    frame::{Message, RawFrame},
    transport::{ChannelConfig, ChannelHandle, DeviceHandle, Transport},
};

/// Aborts a blocking receive from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Closes the device unless disarmed by [`DeviceGuard::into_inner`].
struct DeviceGuard<'a, T: Transport> {
    transport: &'a T,
    device: DeviceHandle,
    armed: bool,
}

impl<'a, T: Transport> DeviceGuard<'a, T> {
    fn new(transport: &'a T, device: DeviceHandle) -> Self {
        Self {
            transport,
            device,
            armed: true,
        }
    }

    fn into_inner(mut self) -> DeviceHandle {
        self.armed = false;
        self.device
    }
}

impl<T: Transport> Drop for DeviceGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            debug!("releasing device after failed open");
            if !self.transport.close_device(self.device) {
                warn!("device could not be released after failed open");
            }
        }
    }
}

/// An opened device with one started channel.
///
/// Dropping the session closes the device. SDK calls on the channel hold the
/// read side of `open`; closing takes the write side, so no call can overlap
/// or follow the release of the device.
pub struct Session<T: Transport> {
    transport: T,
    device: DeviceHandle,
    channel: ChannelHandle,
    index: u32,
    options: SessionOptions,
    open: RwLock<bool>,
}

impl<T: Transport> Session<T> {
    pub fn open(transport: T, config: &BusConfig) -> Result<Self> {
        Self::open_with(transport, config, SessionOptions::default())
    }

    pub fn open_with(transport: T, config: &BusConfig, options: SessionOptions) -> Result<Self> {
        let index = config.bus_index().map_err(|e| {
            error!("{}", e);
            e
        })?;

        debug!(index, device_type = options.device_type, "opening device");
        let device = transport
            .open_device(options.device_type, index)
            .ok_or_else(|| {
                error!(index, "failed to open device");
                Error::DeviceUnavailable { index }
            })?;
        let guard = DeviceGuard::new(&transport, device);

        let baudrate = config.baudrate();
        if !baudrate.is_recognized() {
            warn!(baudrate = %baudrate, "unrecognized baud rate, treating it as none");
        }

        let path = format!("{}/baud_rate", index);
        transport
            .set_property(device, &path, &baudrate.bits_per_second().to_string())
            .map_err(|e| {
                error!(%path, "failed to set baud rate: {}", e);
                Error::ConfigurationRejected(e)
            })?;

        let channel = transport
            .init_channel(device, index, &ChannelConfig::accept_all())
            .ok_or_else(|| {
                error!(index, "failed to initialize channel");
                Error::ChannelInitFailed { index }
            })?;

        if !transport.start_channel(channel) {
            error!(index, "failed to start channel");
            return Err(Error::ChannelStartFailed { index });
        }

        let device = guard.into_inner();
        debug!(index, baudrate = %baudrate, "channel started");

        Ok(Self {
            transport,
            device,
            channel,
            index,
            options,
            open: RwLock::new(true),
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Closes the device.
    ///
    /// The session is gone afterwards even if the SDK reports an error.
    pub fn close(self) -> Result<()> {
        self.shutdown()
    }

    /// Closes the device if it is still open. Waits for SDK calls of other
    /// threads to finish; their next poll returns [`Error::InvalidSession`].
    pub(crate) fn shutdown(&self) -> Result<()> {
        let mut open = self.open.write();
        if !*open {
            error!(index = self.index, "session already closed");
            return Err(Error::InvalidSession);
        }
        *open = false;

        debug!(index = self.index, "closing device");
        if self.transport.close_device(self.device) {
            Ok(())
        } else {
            error!(index = self.index, "failed to close device");
            Err(Error::CloseFailed)
        }
    }

    /// Keeps the device open for as long as the guard lives.
    fn ensure_open(&self) -> Result<RwLockReadGuard<'_, bool>> {
        let open = self.open.read();
        if *open {
            Ok(open)
        } else {
            error!(index = self.index, "session is closed");
            Err(Error::InvalidSession)
        }
    }

    pub fn send(&self, message: &Message) -> Result<()> {
        let _open = self.ensure_open()?;

        let frame = RawFrame::encode(message);
        let sent = self.transport.transmit(self.channel, slice::from_ref(&frame));
        if sent < 1 {
            error!(id = message.id(), "failed to transmit frame");
            return Err(Error::TransmitFailed);
        }
        Ok(())
    }

    /// Fetches one queued message or reports `WouldBlock` if none is queued.
    pub fn try_receive(&self) -> nb::Result<Message, Error> {
        let _open = self.ensure_open().map_err(nb::Error::Other)?;

        if self.transport.receive_count(self.channel) == 0 {
            return Err(nb::Error::WouldBlock);
        }

        let mut frame = [RawFrame::default()];
        let received =
            self.transport
                .receive(self.channel, &mut frame, self.options.fetch_wait_ms);
        if received < 1 {
            error!(index = self.index, "frame was queued but could not be fetched");
            return Err(nb::Error::Other(Error::ReceiveFailed));
        }
        Ok(frame[0].decode())
    }

    /// Blocks until a message arrives.
    pub fn receive(&self) -> Result<Message> {
        self.receive_until(None, None)
    }

    pub fn receive_timeout(&self, timeout: Duration) -> Result<Message> {
        self.receive_until(Some(timeout), None)
    }

    /// Blocks until a message arrives, `timeout` elapses or `cancel` fires.
    ///
    /// The queue is checked once per `SessionOptions::poll_interval`.
    pub fn receive_until(
        &self,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<Message> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            match self.try_receive() {
                Ok(message) => break Ok(message),
                Err(nb::Error::Other(e)) => break Err(e),
                Err(nb::Error::WouldBlock) => {}
            }

            if cancel.map_or(false, CancelToken::is_cancelled) {
                debug!(index = self.index, "receive cancelled");
                break Err(Error::Cancelled);
            }
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                break Err(Error::Timeout);
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    /// The channel keeps its baud rate; the call only logs that it was ignored.
    pub fn change_baud_rate(&self, baudrate: &str) {
        warn!(
            index = self.index,
            baudrate, "changing the baud rate of a running channel is not supported, ignoring"
        );
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.shutdown();
        }
    }
}

impl<T: Transport> embedded_can::nb::Can for Session<T> {
    type Frame = Message;
    type Error = Error;

    fn transmit(&mut self, frame: &Message) -> nb::Result<Option<Message>, Error> {
        self.send(frame).map_err(nb::Error::Other)?;
        Ok(None)
    }

    fn receive(&mut self) -> nb::Result<Message, Error> {
        self.try_receive()
    }
}

impl<T: Transport> embedded_can::blocking::Can for Session<T> {
    type Frame = Message;
    type Error = Error;

    fn transmit(&mut self, frame: &Message) -> Result<()> {
        self.send(frame)
    }

    fn receive(&mut self) -> Result<Message> {
        Session::receive(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::PropertyError,
        loopback::{Faults, Loopback},
    };
    use tracing_test::traced_test;

    fn open(loopback: &Loopback, busname: &str, baudrate: &str) -> Result<Session<Loopback>> {
        Session::open(loopback.clone(), &BusConfig::new(busname, baudrate))
    }

    #[test]
    fn open_writes_baud_rate_property() {
        let loopback = Loopback::new();
        let session = open(&loopback, "2", "250K").unwrap();
        assert_eq!(session.index(), 2);
        assert_eq!(loopback.property("2/baud_rate").as_deref(), Some("250000"));
        assert_eq!(loopback.channel_config(), Some(ChannelConfig::accept_all()));
        assert_eq!(loopback.open_devices(), 1);
    }

    #[test]
    fn device_open_failure_skips_channel_init() {
        let loopback = Loopback::with_faults(Faults {
            open_device: true,
            ..Faults::default()
        });
        assert_eq!(
            open(&loopback, "0", "1M").err(),
            Some(Error::DeviceUnavailable { index: 0 })
        );
        assert_eq!(loopback.channel_config(), None);
        assert_eq!(loopback.open_devices(), 0);
    }

    #[test]
    fn failed_open_releases_device() {
        let cases = [
            (
                Faults {
                    property: Some(PropertyError::Unreachable),
                    ..Faults::default()
                },
                Error::ConfigurationRejected(PropertyError::Unreachable),
            ),
            (
                Faults {
                    property: Some(PropertyError::Rejected),
                    ..Faults::default()
                },
                Error::ConfigurationRejected(PropertyError::Rejected),
            ),
            (
                Faults {
                    init_channel: true,
                    ..Faults::default()
                },
                Error::ChannelInitFailed { index: 1 },
            ),
            (
                Faults {
                    start_channel: true,
                    ..Faults::default()
                },
                Error::ChannelStartFailed { index: 1 },
            ),
        ];

        for (faults, expected) in cases.iter() {
            let loopback = Loopback::with_faults(faults.clone());
            assert_eq!(open(&loopback, "1", "500K").err().as_ref(), Some(expected));
            assert_eq!(loopback.open_devices(), 0, "{:?}", expected);
        }
    }

    #[test]
    fn invalid_bus_name_is_rejected_before_opening() {
        let loopback = Loopback::new();
        assert_eq!(
            open(&loopback, "can0", "500K").err(),
            Some(Error::InvalidBusName("can0".into()))
        );
        assert_eq!(loopback.open_devices(), 0);
    }

    #[traced_test]
    #[test]
    fn unrecognized_baud_rate_is_written_as_zero() {
        let loopback = Loopback::new();
        let _session = open(&loopback, "0", "fast").unwrap();
        assert_eq!(loopback.property("0/baud_rate").as_deref(), Some("0"));
        assert!(logs_contain("unrecognized baud rate"));
    }

    #[test]
    fn close_reports_transport_result() {
        let loopback = Loopback::new();
        let session = open(&loopback, "0", "500K").unwrap();
        assert_eq!(session.close(), Ok(()));
        assert_eq!(loopback.open_devices(), 0);

        let session = open(&loopback, "0", "500K").unwrap();
        loopback.set_faults(Faults {
            close_device: true,
            ..Faults::default()
        });
        assert_eq!(session.close(), Err(Error::CloseFailed));
    }

    #[test]
    fn drop_closes_device() {
        let loopback = Loopback::new();
        drop(open(&loopback, "0", "500K").unwrap());
        assert_eq!(loopback.open_devices(), 0);
    }

    #[test]
    fn operations_after_shutdown_are_rejected() {
        let loopback = Loopback::new();
        let session = open(&loopback, "0", "500K").unwrap();
        session.shutdown().unwrap();

        let message = Message::new(0x10, &[1]).unwrap();
        assert_eq!(session.send(&message), Err(Error::InvalidSession));
        assert_eq!(session.receive(), Err(Error::InvalidSession));
        assert_eq!(session.shutdown(), Err(Error::InvalidSession));
    }

    /// Loopback that counts SDK calls made on a channel whose device is closed.
    #[derive(Clone, Default)]
    struct SlowBus {
        inner: Loopback,
        closed: Arc<AtomicBool>,
        calls_after_close: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl SlowBus {
        fn check_open(&self) {
            if self.closed.load(Ordering::SeqCst) {
                self.calls_after_close.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl Transport for SlowBus {
        fn open_device(&self, device_type: u32, index: u32) -> Option<DeviceHandle> {
            self.inner.open_device(device_type, index)
        }

        fn close_device(&self, device: DeviceHandle) -> bool {
            self.closed.store(true, Ordering::SeqCst);
            self.inner.close_device(device)
        }

        fn set_property(
            &self,
            device: DeviceHandle,
            path: &str,
            value: &str,
        ) -> std::result::Result<(), PropertyError> {
            self.inner.set_property(device, path, value)
        }

        fn init_channel(
            &self,
            device: DeviceHandle,
            index: u32,
            config: &ChannelConfig,
        ) -> Option<ChannelHandle> {
            self.inner.init_channel(device, index, config)
        }

        fn start_channel(&self, channel: ChannelHandle) -> bool {
            self.inner.start_channel(channel)
        }

        fn transmit(&self, channel: ChannelHandle, frames: &[RawFrame]) -> u32 {
            self.check_open();
            self.inner.transmit(channel, frames)
        }

        fn receive_count(&self, channel: ChannelHandle) -> u32 {
            thread::sleep(Duration::from_millis(10));
            self.check_open();
            self.inner.receive_count(channel)
        }

        fn receive(&self, channel: ChannelHandle, frames: &mut [RawFrame], wait_ms: i32) -> u32 {
            self.check_open();
            self.inner.receive(channel, frames, wait_ms)
        }
    }

    #[test]
    fn shutdown_waits_for_sdk_calls_in_flight() {
        let bus = SlowBus::default();
        let session = Arc::new(Session::open(bus.clone(), &BusConfig::new("0", "500K")).unwrap());

        let receiver = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.receive())
        };

        thread::sleep(Duration::from_millis(25));
        assert_eq!(session.shutdown(), Ok(()));
        assert_eq!(receiver.join().unwrap(), Err(Error::InvalidSession));
        assert_eq!(bus.calls_after_close.load(Ordering::SeqCst), 0);
        assert_eq!(bus.inner.open_devices(), 0);
    }

    #[test]
    fn send_reports_transmit_failure() {
        let loopback = Loopback::new();
        let session = open(&loopback, "0", "500K").unwrap();
        loopback.set_faults(Faults {
            transmit: true,
            ..Faults::default()
        });
        let message = Message::new(0x10, &[1]).unwrap();
        assert_eq!(session.send(&message), Err(Error::TransmitFailed));
    }

    #[test]
    fn receive_reports_fetch_failure() {
        let loopback = Loopback::new();
        let session = open(&loopback, "0", "500K").unwrap();
        loopback.inject(&Message::new(0x10, &[1]).unwrap());
        loopback.set_faults(Faults {
            receive: true,
            ..Faults::default()
        });
        assert!(matches!(
            session.try_receive(),
            Err(nb::Error::Other(Error::ReceiveFailed))
        ));
    }

    #[test]
    fn try_receive_would_block_on_empty_queue() {
        let loopback = Loopback::new();
        let session = open(&loopback, "0", "500K").unwrap();
        assert!(matches!(session.try_receive(), Err(nb::Error::WouldBlock)));
    }

    #[test]
    fn receive_timeout_and_cancel() {
        let loopback = Loopback::new();
        let session = open(&loopback, "0", "500K").unwrap();
        assert_eq!(
            session.receive_timeout(Duration::from_millis(5)),
            Err(Error::Timeout)
        );

        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            session.receive_until(None, Some(&cancel)),
            Err(Error::Cancelled)
        );
    }

    #[traced_test]
    #[test]
    fn change_baud_rate_is_a_logged_noop() {
        let loopback = Loopback::new();
        let session = open(&loopback, "0", "500K").unwrap();
        session.change_baud_rate("1M");
        assert_eq!(loopback.property("0/baud_rate").as_deref(), Some("500000"));
        assert!(logs_contain("not supported"));
    }

    #[test]
    fn embedded_can_traits() {
        let loopback = Loopback::new();
        let mut session = open(&loopback, "0", "500K").unwrap();
        let message = Message::new(0x321, &[7, 7]).unwrap();

        embedded_can::nb::Can::transmit(&mut session, &message).unwrap();
        assert!(matches!(
            embedded_can::nb::Can::receive(&mut session),
            Ok(received) if received == message
        ));

        embedded_can::blocking::Can::transmit(&mut session, &message).unwrap();
        assert_eq!(embedded_can::blocking::Can::receive(&mut session), Ok(message));
    }
}
