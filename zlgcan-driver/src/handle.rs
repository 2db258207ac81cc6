//! Handle based driver interface.
//!
//! KaCanOpen identifies a driver instance through an opaque pointer sized
//! value. The table hands out non-zero integers, never reused, so a handle
//! that was closed is rejected instead of dereferenced.

use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::{const_mutex, Mutex};
use tracing::{debug, error};

use crate::{
    config::{BusConfig, SessionOptions},
    error::{Error, Result},
    frame::Message,
    session::Session,
    transport::Transport,
};

pub struct HandleTable<T: Transport> {
    sessions: Mutex<BTreeMap<usize, Arc<Session<T>>>>,
    next: AtomicUsize,
}

impl<T: Transport> HandleTable<T> {
    pub const fn new() -> Self {
        Self {
            sessions: const_mutex(BTreeMap::new()),
            next: AtomicUsize::new(1),
        }
    }

    pub fn open(&self, transport: T, config: &BusConfig) -> Result<NonZeroUsize> {
        self.open_with(transport, config, SessionOptions::default())
    }

    pub fn open_with(
        &self,
        transport: T,
        config: &BusConfig,
        options: SessionOptions,
    ) -> Result<NonZeroUsize> {
        let session = Session::open_with(transport, config, options)?;

        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        let handle = NonZeroUsize::new(raw).ok_or(Error::InvalidSession)?;
        self.sessions.lock().insert(raw, Arc::new(session));
        debug!(handle = raw, busname = %config.busname, "session opened");
        Ok(handle)
    }

    /// Looks up the session behind `handle`.
    pub fn get(&self, handle: usize) -> Result<Arc<Session<T>>> {
        self.sessions.lock().get(&handle).cloned().ok_or_else(|| {
            error!(handle, "unknown driver handle");
            Error::InvalidSession
        })
    }

    /// Removes the session and closes its device.
    ///
    /// The handle is invalid afterwards whatever the SDK reports.
    pub fn close(&self, handle: usize) -> Result<()> {
        let session = self.sessions.lock().remove(&handle).ok_or_else(|| {
            error!(handle, "close on unknown driver handle");
            Error::InvalidSession
        })?;
        session.shutdown()
    }

    pub fn send(&self, handle: usize, message: &Message) -> Result<()> {
        self.get(handle)?.send(message)
    }

    /// Blocks until a message arrives on the session behind `handle`.
    ///
    /// The table lock is not held while waiting, so the handle may be used
    /// for sending or closed from another thread meanwhile.
    pub fn receive(&self, handle: usize) -> Result<Message> {
        self.get(handle)?.receive()
    }

    pub fn change_baud_rate(&self, handle: usize, baudrate: &str) {
        match self.get(handle) {
            Ok(session) => session.change_baud_rate(baudrate),
            Err(_) => debug!(handle, baudrate, "baud rate change ignored"),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl<T: Transport> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{Faults, Loopback};

    #[test]
    fn handles_are_distinct_and_not_reused() {
        let table = HandleTable::new();
        let loopback = Loopback::new();
        let config = BusConfig::new("0", "500K");

        let first = table.open(loopback.clone(), &config).unwrap();
        let second = table.open(loopback.clone(), &config).unwrap();
        assert_ne!(first, second);
        assert_eq!(table.len(), 2);

        table.close(first.get()).unwrap();
        let third = table.open(loopback.clone(), &config).unwrap();
        assert_ne!(third, first);
        assert_eq!(loopback.open_devices(), 2);
    }

    #[test]
    fn stale_and_null_handles_are_rejected() {
        let table = HandleTable::new();
        let loopback = Loopback::new();
        let handle = table
            .open(loopback.clone(), &BusConfig::new("0", "1M"))
            .unwrap()
            .get();
        table.close(handle).unwrap();

        let message = Message::new(1, &[]).unwrap();
        assert_eq!(table.close(0), Err(Error::InvalidSession));
        assert_eq!(table.close(handle), Err(Error::InvalidSession));
        assert_eq!(table.send(handle, &message), Err(Error::InvalidSession));
        assert_eq!(table.receive(handle), Err(Error::InvalidSession));
        assert!(table.is_empty());
    }

    #[test]
    fn close_drops_entry_even_if_device_close_fails() {
        let table = HandleTable::new();
        let loopback = Loopback::new();
        let handle = table
            .open(loopback.clone(), &BusConfig::new("0", "1M"))
            .unwrap()
            .get();

        loopback.set_faults(Faults {
            close_device: true,
            ..Faults::default()
        });
        assert_eq!(table.close(handle), Err(Error::CloseFailed));
        assert!(table.is_empty());
        assert_eq!(loopback.open_devices(), 0);
    }

    #[test]
    fn failed_open_leaves_no_entry() {
        let table = HandleTable::new();
        let loopback = Loopback::with_faults(Faults {
            start_channel: true,
            ..Faults::default()
        });
        assert_eq!(
            table.open(loopback.clone(), &BusConfig::new("4", "125K")),
            Err(Error::ChannelStartFailed { index: 4 })
        );
        assert!(table.is_empty());
        assert_eq!(loopback.open_devices(), 0);
    }

    #[test]
    fn change_baud_rate_never_fails() {
        let table: HandleTable<Loopback> = HandleTable::new();
        table.change_baud_rate(0, "1M");
        table.change_baud_rate(17, "bogus");
    }
}
