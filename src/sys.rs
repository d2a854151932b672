//! Kernel ABI of `/dev/cecX`. See `linux/cec.h`.

use crate::{
    message::{Message, CEC_MAX_MSG_SIZE},
    types::{CecLogAddrMask, CecLogAddrType, CecPrimDevType, Version},
};
use bitflags::bitflags;
use nix::{ioctl_read, ioctl_readwrite, ioctl_write_ptr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

//#define CEC_ADAP_G_CAPS         _IOWR('a',  0, struct cec_caps)
ioctl_readwrite! {
    /// Query device capabilities
    capabilities, b'a',  0, CecCaps
}
//#define CEC_ADAP_G_PHYS_ADDR    _IOR('a',  1, __u16)
ioctl_read! {
    get_phys, b'a',  1, u16
}
//#define CEC_ADAP_S_PHYS_ADDR    _IOW('a',  2, __u16)
ioctl_write_ptr! {
    /// Needs initiator mode. Blocks until the logical addresses are claimed.
    set_phys, b'a',  2, u16
}
//#define CEC_ADAP_G_LOG_ADDRS    _IOR('a',  3, struct cec_log_addrs)
ioctl_read! {
    get_log, b'a',  3, CecLogAddrs
}
//#define CEC_ADAP_S_LOG_ADDRS    _IOWR('a',  4, struct cec_log_addrs)
ioctl_readwrite! {
    /// Needs initiator mode. EBUSY if logical address types are already defined.
    set_log, b'a',  4, CecLogAddrs
}
//#define CEC_TRANSMIT            _IOWR('a',  5, struct cec_msg)
ioctl_readwrite! {
    /// In blocking mode this returns after the transmit finished.
    transmit, b'a',  5, CecMsg
}
//#define CEC_RECEIVE             _IOWR('a',  6, struct cec_msg)
ioctl_readwrite! {
    /// ETIMEDOUT if nothing arrived within `timeout` ms.
    receive, b'a',  6, CecMsg
}
//#define CEC_DQEVENT             _IOWR('a',  7, struct cec_event)
ioctl_readwrite! {
    get_event, b'a',  7, CecEvent
}
//#define CEC_G_MODE              _IOR('a',  8, __u32)
ioctl_read! {
    get_mode, b'a',  8, u32
}
//#define CEC_S_MODE              _IOW('a',  9, __u32)
ioctl_write_ptr! {
    set_mode, b'a',  9, u32
}

/// information about the CEC adapter
#[derive(Debug)]
#[repr(C)]
pub struct CecCaps {
    driver: OSDStr<32>,
    name: OSDStr<32>,
    available_log_addrs: u32,
    capabilities: Capabilities,
    version: u32,
}
impl CecCaps {
    #[inline]
    pub fn available_log_addrs(&self) -> u32 {
        self.available_log_addrs
    }
    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
    /// name of the driver
    pub fn driver(&self) -> &str {
        self.driver.as_ref()
    }
}

bitflags! {
    /// capabilities of the CEC adapter
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// userspace has to configure the physical address
        const PHYS_ADDR = 0b00000001;
        /// userspace has to configure the logical addresses
        const LOG_ADDRS = 0b00000010;
        const TRANSMIT = 0b00000100;
        const PASSTHROUGH = 0b00001000;
        const RC = 0b00010000;
        const MONITOR_ALL = 0b00100000;
    }
}

/// The most logical addresses one adapter can claim
pub const CEC_MAX_LOG_ADDRS: usize = 4;

/// CEC logical addresses structure
#[derive(Debug)]
#[repr(C)]
pub struct CecLogAddrs {
    /// claimed addresses. Set by the driver.
    pub log_addr: [u8; CEC_MAX_LOG_ADDRS],
    /// Set by the driver.
    pub log_addr_mask: CecLogAddrMask,
    pub cec_version: Version,
    /// how many addresses to claim. 0 clears all.
    pub num_log_addrs: u8,
    pub vendor_id: u32,
    pub flags: CecLogAddrFlags,
    pub osd_name: OSDStr<15>,
    pub primary_device_type: [CecPrimDevType; CEC_MAX_LOG_ADDRS],
    pub log_addr_type: [CecLogAddrType; CEC_MAX_LOG_ADDRS],
    /// CEC 2.0, used in Report Features
    pub all_device_types: [u8; CEC_MAX_LOG_ADDRS],
    /// CEC 2.0, used in Report Features
    pub features: [[u8; 12]; CEC_MAX_LOG_ADDRS],
}
impl Default for CecLogAddrs {
    fn default() -> Self {
        Self {
            log_addr: Default::default(),
            log_addr_mask: Default::default(),
            cec_version: Version::V2_0,
            num_log_addrs: 0,
            vendor_id: Default::default(),
            flags: CecLogAddrFlags::empty(),
            osd_name: Default::default(),
            primary_device_type: [CecPrimDevType::PLAYBACK; CEC_MAX_LOG_ADDRS],
            log_addr_type: [CecLogAddrType::PLAYBACK; CEC_MAX_LOG_ADDRS],
            all_device_types: Default::default(),
            features: Default::default(),
        }
    }
}
impl CecLogAddrs {
    /// Request one more address of type `kind`. Ignored when full.
    pub fn push(&mut self, kind: CecLogAddrType) {
        let i = self.num_log_addrs as usize;
        if i >= CEC_MAX_LOG_ADDRS {
            return;
        }
        let prim = kind.primary_device_type();
        self.log_addr_type[i] = kind;
        self.primary_device_type[i] = prim;
        self.all_device_types[i] = prim.all_device_type();
        self.num_log_addrs += 1;
    }
}

bitflags! {
    /// Flags for [CecLogAddrs]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CecLogAddrFlags : u32 {
        /// fall back to Unregistered if no address of the requested type is free
        const ALLOW_UNREG_FALLBACK = (1 << 0);
        /// pass Remote Control messages to the follower even in passthrough
        const ALLOW_RC_PASSTHRU = (1 << 1);
        /// CEC 2.0: let the follower answer Give Device Power Status itself
        const CDC_ONLY = (1 << 2);
    }
}

// ---  The message handling modes  ---
/// Modes for initiator
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u32)]
pub enum CecModeInitiator {
    None = 0,
    /// **Default** Shared access
    Send = 1,
    Exclusive = 2,
}
pub const CEC_MODE_INITIATOR_MSK: u32 = 0x0f;
/// Modes for follower
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u32)]
pub enum CecModeFollower {
    /// **Default**: only replies to own messages
    RepliesOnly = 0x0 << 4,
    All = 0x1 << 4,
    Exclusive = 0x2 << 4,
    /// The kernel passes most core messages on without answering them.
    ExclusivePassthru = 0x3 << 4,
    Monitor = 0xe << 4,
    MonitorAll = 0xf << 4,
}
pub const CEC_MODE_FOLLOWER_MSK: u32 = 0xf0;

/// `struct cec_msg`
#[derive(Debug)]
#[repr(C)]
pub struct CecMsg {
    tx_ts: u64,
    rx_ts: u64,
    pub len: u32,
    /// ms to wait in CEC_RECEIVE, 0 for ever
    pub timeout: u32,
    /// non zero for results of earlier transmits
    pub sequence: u32,
    flags: u32,
    pub msg: [u8; CEC_MAX_MSG_SIZE],
    /// opcode of a reply to wait for
    reply: u8,
    rx_status: RxStatus,
    tx_status: TxStatus,
    tx_arb_lost_cnt: u8,
    tx_nack_cnt: u8,
    tx_low_drive_cnt: u8,
    tx_error_cnt: u8,
}
impl CecMsg {
    fn empty() -> Self {
        Self {
            tx_ts: 0,
            rx_ts: 0,
            len: 0,
            timeout: 0,
            sequence: 0,
            flags: 0,
            msg: [0; CEC_MAX_MSG_SIZE],
            reply: 0,
            rx_status: RxStatus::empty(),
            tx_status: TxStatus::empty(),
            tx_arb_lost_cnt: 0,
            tx_nack_cnt: 0,
            tx_low_drive_cnt: 0,
            tx_error_cnt: 0,
        }
    }
    /// an empty buffer for CEC_RECEIVE
    pub fn for_receive(timeout_ms: u32) -> Self {
        let mut m = Self::empty();
        m.timeout = timeout_ms;
        m
    }
    #[inline]
    pub fn tx_status(&self) -> TxStatus {
        self.tx_status
    }
    /// error counters of the last transmit
    pub fn tx_counters(&self) -> [u8; 4] {
        [
            self.tx_arb_lost_cnt,
            self.tx_nack_cnt,
            self.tx_low_drive_cnt,
            self.tx_error_cnt,
        ]
    }
}
impl From<&Message> for CecMsg {
    fn from(value: &Message) -> Self {
        let mut m = Self::empty();
        let bytes = value.as_bytes();
        m.msg[..bytes.len()].copy_from_slice(bytes);
        m.len = bytes.len() as u32;
        m
    }
}
impl TryFrom<&CecMsg> for Message {
    type Error = crate::Error;
    fn try_from(value: &CecMsg) -> Result<Self, Self::Error> {
        let len = (value.len as usize).min(CEC_MAX_MSG_SIZE);
        Message::try_from(&value.msg[..len])
    }
}

// ---  cec status field  ---
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TxStatus: u8 {
        const OK          = (1 << 0);
        const ARB_LOST    = (1 << 1);
        const NACK        = (1 << 2);
        const LOW_DRIVE   = (1 << 3);
        const ERROR       = (1 << 4);
        const MAX_RETRIES = (1 << 5);
    }
}
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RxStatus: u8 {
        const OK            = (1 << 0);
        const TIMEOUT       = (1 << 1);
        const FEATURE_ABORT = (1 << 2);
    }
}

// ---  Events  ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CecEventType {
    /// adapter state changed
    StateChange = 1,
    /// the receive queue overflowed
    LostMsgs = 2,
}
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CecEventFlags : u32 {
        const INITIAL_STATE = (1 << 0);
    }
}

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct CecEventStateChange {
    pub phys_addr: u16,
    /// 0 if nothing is claimed
    pub log_addr_mask: CecLogAddrMask,
}

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct CecEventLostMsgs {
    pub lost_msgs: u32,
}
#[repr(C)]
pub union CecEventPayload {
    pub state_change: CecEventStateChange,
    pub lost_msgs: CecEventLostMsgs,
    raw: [u32; 16],
}
#[repr(C)]
pub struct CecEvent {
    pub ts: u64,
    pub typ: CecEventType,
    pub flags: CecEventFlags,
    pub payload: CecEventPayload,
}
impl Default for CecEvent {
    fn default() -> Self {
        Self {
            ts: Default::default(),
            typ: CecEventType::LostMsgs,
            flags: CecEventFlags::empty(),
            payload: CecEventPayload { raw: [0; 16] },
        }
    }
}

#[allow(non_camel_case_types)]
type c_char = u8;

/// A NUL padded ASCII string of a kernel struct
#[repr(transparent)]
#[derive(Clone)]
pub struct OSDStr<const MAX: usize>([c_char; MAX]);

impl<const MAX: usize> From<&[u8]> for OSDStr<MAX> {
    fn from(value: &[u8]) -> Self {
        let mut osd = OSDStr::default();
        let len = MAX.min(value.len());
        osd.0[..len].copy_from_slice(&value[..len]);
        osd
    }
}
impl<const MAX: usize> AsRef<str> for OSDStr<MAX> {
    fn as_ref(&self) -> &str {
        match std::ffi::CStr::from_bytes_until_nul(&self.0) {
            Ok(s) => s.to_str().unwrap_or_default(),
            Err(_) => std::str::from_utf8(&self.0).unwrap_or_default(),
        }
    }
}
impl<const MAX: usize> std::fmt::Debug for OSDStr<MAX> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}
impl<const MAX: usize> Default for OSDStr<MAX> {
    fn default() -> Self {
        Self([0; MAX])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CecLogicalAddress, CecOpcode};

    #[test]
    fn abi_sizes() {
        assert_eq!(std::mem::size_of::<CecMsg>(), 56);
        assert_eq!(std::mem::size_of::<CecLogAddrs>(), 92);
        assert_eq!(std::mem::size_of::<CecCaps>(), 76);
    }

    #[test]
    fn message_conversion() {
        let m = Message::with_operands(
            CecLogicalAddress::Playback1,
            CecLogicalAddress::Tv,
            CecOpcode::ReportPowerStatus,
            &[0x01],
        );
        let raw = CecMsg::from(&m);
        assert_eq!(raw.len, 3);
        assert_eq!(Message::try_from(&raw).unwrap(), m);
    }

    #[test]
    fn log_addrs_push() {
        let mut log = CecLogAddrs::default();
        log.push(CecLogAddrType::TV);
        log.push(CecLogAddrType::RECORD);
        assert_eq!(log.num_log_addrs, 2);
        assert_eq!(log.primary_device_type[1], CecPrimDevType::RECORD);
        assert_eq!(log.all_device_types, [0x80, 0x40, 0, 0]);
        for _ in 0..4 {
            log.push(CecLogAddrType::PLAYBACK);
        }
        assert_eq!(log.num_log_addrs as usize, CEC_MAX_LOG_ADDRS);
    }

    #[test]
    fn osd_str() {
        let s = OSDStr::<15>::from(&b"Follower"[..]);
        assert_eq!(s.as_ref(), "Follower");
        let s = OSDStr::<4>::from(&b"toolong"[..]);
        assert_eq!(s.as_ref(), "tool");
    }
}
