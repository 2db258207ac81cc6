#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

mod bindings;

pub use bindings::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn frame_layout() {
        assert_eq!(mem::size_of::<can_frame>(), 16);
        assert_eq!(mem::align_of::<can_frame>(), 8);
        assert_eq!(mem::size_of::<ZCAN_Transmit_Data>(), 24);
        assert_eq!(mem::size_of::<ZCAN_Receive_Data>(), 24);
    }

    #[test]
    fn init_config_layout() {
        assert_eq!(mem::size_of::<ZCAN_CHANNEL_INIT_CONFIG>(), 32);
    }

    #[test]
    fn identifier_flags_do_not_overlap_mask() {
        assert_eq!(CAN_EFF_MASK & (CAN_EFF_FLAG | CAN_RTR_FLAG | CAN_ERR_FLAG), 0);
        assert_eq!(CAN_SFF_MASK & CAN_EFF_MASK, CAN_SFF_MASK);
    }
}
