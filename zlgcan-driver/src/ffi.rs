//! KaCanOpen driver interface.
//!
//! With the `vendor` feature the crate exports `canOpen_driver`,
//! `canClose_driver`, `canReceive_driver`, `canSend_driver` and
//! `canChangeBaudRate_driver` backed by [`ZlgTransport`](crate::zlg::ZlgTransport).
//! The helpers in this module implement those exports for any transport.

use std::{
    borrow::Cow,
    ffi::{c_void, CStr},
    os::raw::c_char,
    ptr,
};

use tracing::error;

use crate::{
    config::BusConfig,
    error::{Error, Result},
    frame::{Message, MAX_DLEN},
    handle::HandleTable,
    transport::Transport,
};

/// Bus name and baud rate as C strings.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CANBoard {
    pub busname: *const c_char,
    pub baudrate: *const c_char,
}

/// Driver instance. Null signals a failed initialization.
pub type CANHandle = *mut c_void;

/// Message layout shared with the protocol stack.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CanMessage {
    pub cob_id: u32,
    pub rtr: u8,
    pub len: u8,
    pub data: [u8; MAX_DLEN],
}

impl From<Message> for CanMessage {
    fn from(message: Message) -> Self {
        CanMessage {
            cob_id: message.id(),
            rtr: message.is_remote() as u8,
            len: message.len(),
            data: *message.raw_data(),
        }
    }
}

impl TryFrom<CanMessage> for Message {
    type Error = Error;

    fn try_from(message: CanMessage) -> Result<Self> {
        Message::from_parts(message.cob_id, message.len, message.rtr != 0, message.data)
    }
}

fn status<T>(result: Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.status(),
    }
}

/// # Safety
///
/// `busname` must be null or point to a NUL terminated string.
unsafe fn busname<'a>(busname: *const c_char) -> Result<&'a str> {
    if busname.is_null() {
        error!("bus name is null");
        return Err(Error::InvalidBusName(String::new()));
    }
    CStr::from_ptr(busname).to_str().map_err(|_| {
        let lossy = CStr::from_ptr(busname).to_string_lossy().into_owned();
        error!(busname = %lossy, "bus name is not valid UTF-8");
        Error::InvalidBusName(lossy)
    })
}

/// Baud rate text, lossily decoded. Null reads as empty text, which like any
/// other unknown token resolves to no baud rate.
///
/// # Safety
///
/// `baudrate` must be null or point to a NUL terminated string.
unsafe fn baudrate<'a>(baudrate: *const c_char) -> Cow<'a, str> {
    if baudrate.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(baudrate).to_string_lossy()
    }
}

/// # Safety
///
/// `board` must be null or point to a valid [`CANBoard`].
pub unsafe fn open<T: Transport>(
    table: &HandleTable<T>,
    transport: T,
    board: *const CANBoard,
) -> CANHandle {
    let board = match board.as_ref() {
        Some(board) => board,
        None => {
            error!("board is null");
            return ptr::null_mut();
        }
    };

    let config = match busname(board.busname) {
        Ok(busname) => BusConfig::new(busname, baudrate(board.baudrate)),
        Err(_) => return ptr::null_mut(),
    };

    match table.open(transport, &config) {
        Ok(handle) => handle.get() as CANHandle,
        Err(_) => ptr::null_mut(),
    }
}

pub fn close<T: Transport>(table: &HandleTable<T>, handle: CANHandle) -> i32 {
    status(table.close(handle as usize)) as i32
}

/// Blocks until a message arrives. `message` is only written on success.
///
/// # Safety
///
/// `message` must be null or valid for writes.
pub unsafe fn receive<T: Transport>(
    table: &HandleTable<T>,
    handle: CANHandle,
    message: *mut CanMessage,
) -> u8 {
    if message.is_null() {
        error!("receive buffer is null");
        return Error::ReceiveFailed.status();
    }

    status(
        table
            .receive(handle as usize)
            .map(|received| message.write(received.into())),
    )
}

/// # Safety
///
/// `message` must be null or point to a valid [`CanMessage`].
pub unsafe fn send<T: Transport>(
    table: &HandleTable<T>,
    handle: CANHandle,
    message: *const CanMessage,
) -> u8 {
    let message = match message.as_ref() {
        Some(message) => *message,
        None => {
            error!("message is null");
            return Error::TransmitFailed.status();
        }
    };

    status(
        Message::try_from(message)
            .map_err(|e| {
                error!("{}", e);
                e
            })
            .and_then(|message| table.send(handle as usize, &message)),
    )
}

/// Always succeeds, the baud rate of an open channel is left untouched.
///
/// # Safety
///
/// `baudrate` must be null or point to a NUL terminated string.
pub unsafe fn change_baud_rate<T: Transport>(
    table: &HandleTable<T>,
    handle: CANHandle,
    baudrate: *const c_char,
) -> u8 {
    table.change_baud_rate(handle as usize, &self::baudrate(baudrate));
    0
}

#[cfg(feature = "vendor")]
#[allow(non_snake_case)]
mod exports {
    use std::{os::raw::c_char, sync::Once};

    use super::{CANBoard, CANHandle, CanMessage};
    use crate::{handle::HandleTable, zlg::ZlgTransport};

    static DRIVERS: HandleTable<ZlgTransport> = HandleTable::new();
    static LOGGING: Once = Once::new();

    fn init_logging() {
        LOGGING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init();
        });
    }

    #[no_mangle]
    pub unsafe extern "C" fn canOpen_driver(board: *mut CANBoard) -> CANHandle {
        init_logging();
        super::open(&DRIVERS, ZlgTransport, board)
    }

    #[no_mangle]
    pub extern "C" fn canClose_driver(handle: CANHandle) -> i32 {
        super::close(&DRIVERS, handle)
    }

    #[no_mangle]
    pub unsafe extern "C" fn canReceive_driver(handle: CANHandle, message: *mut CanMessage) -> u8 {
        super::receive(&DRIVERS, handle, message)
    }

    #[no_mangle]
    pub unsafe extern "C" fn canSend_driver(handle: CANHandle, message: *const CanMessage) -> u8 {
        super::send(&DRIVERS, handle, message)
    }

    #[no_mangle]
    pub unsafe extern "C" fn canChangeBaudRate_driver(
        handle: CANHandle,
        baudrate: *mut c_char,
    ) -> u8 {
        super::change_baud_rate(&DRIVERS, handle, baudrate)
    }
}
