//! [`Transport`] backed by the ZLG SDK.

use std::{
    ffi::{c_void, CString},
    os::raw::c_int,
};

use zlgcan_sys::*;

use crate::{
    error::PropertyError,
    frame::RawFrame,
    transport::{CanType, ChannelConfig, ChannelHandle, DeviceHandle, Transport},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct ZlgTransport;

fn device_ptr(device: DeviceHandle) -> DEVICE_HANDLE {
    device.as_raw() as *mut c_void
}

fn channel_ptr(channel: ChannelHandle) -> CHANNEL_HANDLE {
    channel.as_raw() as *mut c_void
}

impl From<&RawFrame> for can_frame {
    fn from(frame: &RawFrame) -> Self {
        can_frame {
            can_id: frame.can_id,
            can_dlc: frame.can_dlc,
            data: frame.data,
            ..can_frame::default()
        }
    }
}

impl From<&can_frame> for RawFrame {
    fn from(frame: &can_frame) -> Self {
        RawFrame {
            can_id: frame.can_id,
            can_dlc: frame.can_dlc,
            data: frame.data,
        }
    }
}

impl Transport for ZlgTransport {
    fn open_device(&self, device_type: u32, index: u32) -> Option<DeviceHandle> {
        let handle = unsafe { ZCAN_OpenDevice(device_type, index, 0) };
        DeviceHandle::from_raw(handle as usize)
    }

    fn close_device(&self, device: DeviceHandle) -> bool {
        unsafe { ZCAN_CloseDevice(device_ptr(device)) == STATUS_OK }
    }

    fn set_property(
        &self,
        device: DeviceHandle,
        path: &str,
        value: &str,
    ) -> Result<(), PropertyError> {
        let path = CString::new(path).map_err(|_| PropertyError::Rejected)?;
        let value = CString::new(value).map_err(|_| PropertyError::Rejected)?;

        let property = unsafe { GetIProperty(device_ptr(device)) };
        if property.is_null() {
            return Err(PropertyError::Unreachable);
        }

        let result = match unsafe { (*property).SetValue } {
            Some(set_value) => {
                if unsafe { set_value(path.as_ptr(), value.as_ptr()) } == STATUS_OK as c_int {
                    Ok(())
                } else {
                    Err(PropertyError::Rejected)
                }
            }
            None => Err(PropertyError::Unreachable),
        };

        unsafe { ReleaseIProperty(property) };
        result
    }

    fn init_channel(
        &self,
        device: DeviceHandle,
        index: u32,
        config: &ChannelConfig,
    ) -> Option<ChannelHandle> {
        let mut init = ZCAN_CHANNEL_INIT_CONFIG {
            can_type: match config.can_type {
                CanType::Can => TYPE_CAN,
                CanType::CanFd => TYPE_CANFD,
            },
            config: ZCAN_INIT_CONFIG_u {
                can: ZCAN_CAN_INIT_CONFIG {
                    acc_code: config.acc_code,
                    acc_mask: config.acc_mask,
                    reserved: 0,
                    filter: config.filter,
                    timing0: 0,
                    timing1: 0,
                    mode: config.mode,
                },
            },
        };

        let handle = unsafe { ZCAN_InitCAN(device_ptr(device), index, &mut init) };
        ChannelHandle::from_raw(handle as usize)
    }

    fn start_channel(&self, channel: ChannelHandle) -> bool {
        unsafe { ZCAN_StartCAN(channel_ptr(channel)) == STATUS_OK }
    }

    fn transmit(&self, channel: ChannelHandle, frames: &[RawFrame]) -> u32 {
        let mut data: Vec<ZCAN_Transmit_Data> = frames
            .iter()
            .map(|frame| ZCAN_Transmit_Data {
                frame: frame.into(),
                transmit_type: 0,
            })
            .collect();

        unsafe { ZCAN_Transmit(channel_ptr(channel), data.as_mut_ptr(), data.len() as u32) }
    }

    fn receive_count(&self, channel: ChannelHandle) -> u32 {
        unsafe { ZCAN_GetReceiveNum(channel_ptr(channel), TYPE_CAN as u8) }
    }

    fn receive(&self, channel: ChannelHandle, frames: &mut [RawFrame], wait_ms: i32) -> u32 {
        let mut data = vec![ZCAN_Receive_Data::default(); frames.len()];
        let received = unsafe {
            ZCAN_Receive(
                channel_ptr(channel),
                data.as_mut_ptr(),
                data.len() as u32,
                wait_ms,
            )
        };

        let received = received.min(frames.len() as u32);
        for (slot, data) in frames.iter_mut().zip(&data[..received as usize]) {
            *slot = RawFrame::from(&data.frame);
        }
        received
    }
}
