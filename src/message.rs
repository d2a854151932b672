use crate::{
    error::Error,
    types::{CecAbortReason, CecLogicalAddress, CecOpcode},
};
use num_enum::TryFromPrimitiveError;

/// largest CEC frame: header, opcode and 14 operands
pub const CEC_MAX_MSG_SIZE: usize = 16;

/**
 * A single CEC frame, independent of the adapter it came from.
 *
 * Byte 0 holds initiator and destination, byte 1 the opcode and the rest the operands.
 * ```
 * # use cec_follower::{Message, CecLogicalAddress, CecOpcode};
 * let msg = Message::new(CecLogicalAddress::Tv, CecLogicalAddress::Playback1, CecOpcode::GiveDevicePowerStatus);
 * assert_eq!(msg.as_bytes(), &[0x04, 0x8f]);
 * ```
 */
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    bytes: [u8; CEC_MAX_MSG_SIZE],
    len: usize,
}

impl Message {
    /// a poll message (header only)
    pub fn poll(from: CecLogicalAddress, to: CecLogicalAddress) -> Self {
        let f: u8 = from.into();
        let t: u8 = to.into();
        let mut bytes = [0; CEC_MAX_MSG_SIZE];
        bytes[0] = f << 4 | t;
        Self { bytes, len: 1 }
    }
    pub fn new(from: CecLogicalAddress, to: CecLogicalAddress, opcode: CecOpcode) -> Self {
        let mut m = Self::poll(from, to);
        m.bytes[1] = opcode.into();
        m.len = 2;
        m
    }
    /// Build a message with operands. Operands beyond the frame size are cut off.
    pub fn with_operands(
        from: CecLogicalAddress,
        to: CecLogicalAddress,
        opcode: CecOpcode,
        data: &[u8],
    ) -> Self {
        let mut m = Self::new(from, to, opcode);
        m.extend(data);
        m
    }
    /// Start a reply to `orig`: initiator and destination swapped.
    pub fn reply_to(orig: &Message, opcode: CecOpcode) -> Self {
        Self::new(orig.destination(), orig.initiator(), opcode)
    }
    /// The Feature Abort answer to `orig`
    pub fn feature_abort(orig: &Message, reason: CecAbortReason) -> Self {
        let mut m = Self::reply_to(orig, CecOpcode::FeatureAbort);
        m.push(orig.raw_opcode().unwrap_or_default());
        m.push(reason.into());
        m
    }
    pub fn push(&mut self, b: u8) {
        if self.len < CEC_MAX_MSG_SIZE {
            self.bytes[self.len] = b;
            self.len += 1;
        }
    }
    pub fn extend(&mut self, data: &[u8]) {
        for b in data {
            self.push(*b);
        }
    }
    pub fn push_u16(&mut self, v: u16) {
        self.extend(&v.to_be_bytes());
    }
    /// return the initiator's logical address
    #[inline]
    pub fn initiator(&self) -> CecLogicalAddress {
        CecLogicalAddress::from_nibble(self.bytes[0] >> 4)
    }
    /// return the destination's logical address
    #[inline]
    pub fn destination(&self) -> CecLogicalAddress {
        CecLogicalAddress::from_nibble(self.bytes[0])
    }
    /// return true if this is a broadcast message
    #[inline]
    pub fn is_broadcast(&self) -> bool {
        self.destination().is_broadcast()
    }
    /// the opcode byte, None for poll
    #[inline]
    pub fn raw_opcode(&self) -> Option<u8> {
        if self.len > 1 {
            Some(self.bytes[1])
        } else {
            None
        }
    }
    /// return the opcode of the message, None for poll
    pub fn opcode(&self) -> Option<Result<CecOpcode, TryFromPrimitiveError<CecOpcode>>> {
        self.raw_opcode().map(CecOpcode::try_from)
    }
    pub fn parameters(&self) -> &[u8] {
        if self.len > 2 {
            &self.bytes[2..self.len]
        } else {
            &[]
        }
    }
    /// cursor over the operands
    #[inline]
    pub fn operands(&self) -> Operands<'_> {
        Operands(self.parameters())
    }
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl TryFrom<&[u8]> for Message {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::EmptyMessage);
        }
        if value.len() > CEC_MAX_MSG_SIZE {
            return Err(Error::MessageTooLong(value.len()));
        }
        let mut bytes = [0; CEC_MAX_MSG_SIZE];
        bytes[..value.len()].copy_from_slice(value);
        Ok(Self {
            bytes,
            len: value.len(),
        })
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Some(Ok(op)) => write!(
                f,
                "{:?}->{:?} {:?} {:x?}",
                self.initiator(),
                self.destination(),
                op,
                self.parameters()
            ),
            _ => write!(f, "{:x?}", self.as_bytes()),
        }
    }
}

/// Reads operands front to back.
///
/// Running out of bytes is an [CecAbortReason::InvalidOp].
#[derive(Debug, Clone, Copy)]
pub struct Operands<'a>(&'a [u8]);

impl<'a> Operands<'a> {
    pub fn u8(&mut self) -> Result<u8, CecAbortReason> {
        match self.0.split_first() {
            Some((b, rest)) => {
                self.0 = rest;
                Ok(*b)
            }
            None => Err(CecAbortReason::InvalidOp),
        }
    }
    pub fn u16(&mut self) -> Result<u16, CecAbortReason> {
        let hi = self.u8()?;
        let lo = self.u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }
    /// next byte as a closed enum
    pub fn parse<T: TryFrom<u8>>(&mut self) -> Result<T, CecAbortReason> {
        T::try_from(self.u8()?).map_err(|_| CecAbortReason::InvalidOp)
    }
    /// all bytes not consumed yet
    pub fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.0)
    }
    #[inline]
    pub fn remaining(&self) -> usize {
        self.0.len()
    }
}
