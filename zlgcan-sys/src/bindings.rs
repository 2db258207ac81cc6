//! Declarations from `zlgcan.h` (classic CAN subset).

use std::os::raw::{c_char, c_int, c_void};

pub type BYTE = u8;
pub type USHORT = u16;
pub type UINT = u32;
pub type UINT64 = u64;

pub type DEVICE_HANDLE = *mut c_void;
pub type CHANNEL_HANDLE = *mut c_void;
pub type canid_t = UINT;

pub const ZCAN_PCI9810: UINT = 2;
pub const ZCAN_USBCAN1: UINT = 3;
pub const ZCAN_USBCAN2: UINT = 4;
pub const ZCAN_PCI9820: UINT = 5;
pub const ZCAN_CANETUDP: UINT = 12;
pub const ZCAN_USBCAN_E_U: UINT = 20;
pub const ZCAN_USBCAN_2E_U: UINT = 21;
pub const ZCAN_USBCAN_4E_U: UINT = 31;
pub const ZCAN_USBCANFD_200U: UINT = 41;
pub const ZCAN_USBCANFD_100U: UINT = 42;
pub const ZCAN_USBCANFD_MINI: UINT = 43;
pub const ZCAN_VIRTUAL_DEVICE: UINT = 99;

pub const INVALID_DEVICE_HANDLE: usize = 0;
pub const INVALID_CHANNEL_HANDLE: usize = 0;

pub const STATUS_ERR: UINT = 0;
pub const STATUS_OK: UINT = 1;
pub const STATUS_ONLINE: UINT = 2;
pub const STATUS_OFFLINE: UINT = 3;
pub const STATUS_UNSUPPORTED: UINT = 4;

pub const TYPE_CAN: UINT = 0;
pub const TYPE_CANFD: UINT = 1;

pub const CAN_EFF_FLAG: canid_t = 0x8000_0000;
pub const CAN_RTR_FLAG: canid_t = 0x4000_0000;
pub const CAN_ERR_FLAG: canid_t = 0x2000_0000;
pub const CAN_SFF_MASK: canid_t = 0x0000_07FF;
pub const CAN_EFF_MASK: canid_t = 0x1FFF_FFFF;
pub const CAN_MAX_DLEN: usize = 8;

#[repr(C, align(8))]
#[derive(Debug, Default, Copy, Clone)]
pub struct can_frame {
    pub can_id: canid_t,
    pub can_dlc: BYTE,
    pub __pad: BYTE,
    pub __res0: BYTE,
    pub __res1: BYTE,
    pub data: [BYTE; CAN_MAX_DLEN],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct ZCAN_CAN_INIT_CONFIG {
    pub acc_code: UINT,
    pub acc_mask: UINT,
    pub reserved: UINT,
    pub filter: BYTE,
    pub timing0: BYTE,
    pub timing1: BYTE,
    pub mode: BYTE,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct ZCAN_CANFD_INIT_CONFIG {
    pub acc_code: UINT,
    pub acc_mask: UINT,
    pub abit_timing: UINT,
    pub dbit_timing: UINT,
    pub brp: UINT,
    pub filter: BYTE,
    pub mode: BYTE,
    pub pad: USHORT,
    pub reserved: UINT,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union ZCAN_INIT_CONFIG_u {
    pub can: ZCAN_CAN_INIT_CONFIG,
    pub canfd: ZCAN_CANFD_INIT_CONFIG,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ZCAN_CHANNEL_INIT_CONFIG {
    pub can_type: UINT,
    pub config: ZCAN_INIT_CONFIG_u,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct ZCAN_Transmit_Data {
    pub frame: can_frame,
    pub transmit_type: UINT,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct ZCAN_Receive_Data {
    pub frame: can_frame,
    pub timestamp: UINT64,
}

pub type SetValueFunc =
    Option<unsafe extern "C" fn(path: *const c_char, value: *const c_char) -> c_int>;
pub type GetValueFunc = Option<unsafe extern "C" fn(path: *const c_char) -> *const c_char>;
pub type GetPropertysFunc =
    Option<unsafe extern "C" fn(path: *const c_char, value: *const c_char) -> *const c_char>;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct IProperty {
    pub SetValue: SetValueFunc,
    pub GetValue: GetValueFunc,
    pub GetPropertys: GetPropertysFunc,
}

extern "system" {
    pub fn ZCAN_OpenDevice(device_type: UINT, device_index: UINT, reserved: UINT)
        -> DEVICE_HANDLE;
    pub fn ZCAN_CloseDevice(device_handle: DEVICE_HANDLE) -> UINT;
    pub fn ZCAN_InitCAN(
        device_handle: DEVICE_HANDLE,
        can_index: UINT,
        pInitConfig: *mut ZCAN_CHANNEL_INIT_CONFIG,
    ) -> CHANNEL_HANDLE;
    pub fn ZCAN_StartCAN(channel_handle: CHANNEL_HANDLE) -> UINT;
    pub fn ZCAN_GetReceiveNum(channel_handle: CHANNEL_HANDLE, type_: BYTE) -> UINT;
    pub fn ZCAN_Transmit(
        channel_handle: CHANNEL_HANDLE,
        pTransmit: *mut ZCAN_Transmit_Data,
        len: UINT,
    ) -> UINT;
    pub fn ZCAN_Receive(
        channel_handle: CHANNEL_HANDLE,
        pReceive: *mut ZCAN_Receive_Data,
        len: UINT,
        wait_time: c_int,
    ) -> UINT;
    pub fn GetIProperty(device_handle: DEVICE_HANDLE) -> *mut IProperty;
    pub fn ReleaseIProperty(pIProperty: *mut IProperty) -> UINT;
}
