//! Typed operands of the tuner, record and timer features.

use crate::{message::Operands, types::CecAbortReason};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// decode a BCD byte, `max` inclusive
pub fn from_bcd(b: u8, max: u8) -> Result<u8, CecAbortReason> {
    let (hi, lo) = (b >> 4, b & 0xf);
    if hi > 9 || lo > 9 || hi * 10 + lo > max {
        return Err(CecAbortReason::InvalidOp);
    }
    Ok(hi * 10 + lo)
}
/// encode 0..=99 as BCD
#[inline]
pub fn to_bcd(v: u8) -> u8 {
    ((v / 10) % 10) << 4 | v % 10
}

// ---  Record Source Type Operand (rec_src_type)  ---
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum RecordSourceType {
    Own = 1,
    Digital = 2,
    Analogue = 3,
    ExtPlug = 4,
    ExtPhysAddr = 5,
}

// ---  Digital Service Broadcast System Operand (dig_bcast_system)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum DigitalBroadcastSystem {
    AribGen = 0x00,
    AtscGen = 0x01,
    DvbGen = 0x02,
    AribBs = 0x08,
    AribCs = 0x09,
    AribT = 0x0a,
    AtscCable = 0x10,
    AtscSat = 0x11,
    AtscT = 0x12,
    DvbC = 0x18,
    DvbS = 0x19,
    DvbS2 = 0x1a,
    DvbT = 0x1b,
}
impl DigitalBroadcastSystem {
    #[inline]
    fn is_arib(self) -> bool {
        matches!(
            self,
            Self::AribGen | Self::AribBs | Self::AribCs | Self::AribT
        )
    }
    #[inline]
    fn is_atsc(self) -> bool {
        matches!(
            self,
            Self::AtscGen | Self::AtscCable | Self::AtscSat | Self::AtscT
        )
    }
}

// ---  Channel Number Format Operand (channel_number_fmt)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum ChannelNumberFormat {
    OnePart = 0x01,
    TwoPart = 0x02,
}

/// How a digital service is identified
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum DigitalService {
    Arib {
        transport_id: u16,
        service_id: u16,
        orig_network_id: u16,
    },
    Atsc {
        transport_id: u16,
        program_number: u16,
    },
    Dvb {
        transport_id: u16,
        service_id: u16,
        orig_network_id: u16,
    },
    /// by logical channel number
    Channel {
        format: ChannelNumberFormat,
        major: u16,
        minor: u16,
    },
}

/// Digital Service Identification, 7 bytes on the wire
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct DigitalServiceId {
    pub system: DigitalBroadcastSystem,
    pub service: DigitalService,
}
impl DigitalServiceId {
    pub const LEN: usize = 7;

    pub fn parse(ops: &mut Operands) -> Result<Self, CecAbortReason> {
        let b = ops.u8()?;
        let by_channel = b & 0x80 != 0;
        let system = DigitalBroadcastSystem::try_from(b & 0x7f)
            .map_err(|_| CecAbortReason::InvalidOp)?;
        let (w1, w2, w3) = (ops.u16()?, ops.u16()?, ops.u16()?);
        let service = if by_channel {
            DigitalService::Channel {
                format: ChannelNumberFormat::try_from((w1 >> 10) as u8)
                    .map_err(|_| CecAbortReason::InvalidOp)?,
                major: w1 & 0x3ff,
                minor: w2,
            }
        } else if system.is_arib() {
            DigitalService::Arib {
                transport_id: w1,
                service_id: w2,
                orig_network_id: w3,
            }
        } else if system.is_atsc() {
            DigitalService::Atsc {
                transport_id: w1,
                program_number: w2,
            }
        } else {
            DigitalService::Dvb {
                transport_id: w1,
                service_id: w2,
                orig_network_id: w3,
            }
        };
        Ok(Self { system, service })
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        let sys: u8 = self.system.into();
        let (method, w1, w2, w3) = match self.service {
            DigitalService::Arib {
                transport_id,
                service_id,
                orig_network_id,
            }
            | DigitalService::Dvb {
                transport_id,
                service_id,
                orig_network_id,
            } => (0, transport_id, service_id, orig_network_id),
            DigitalService::Atsc {
                transport_id,
                program_number,
            } => (0, transport_id, program_number, 0),
            DigitalService::Channel {
                format,
                major,
                minor,
            } => (0x80, (u8::from(format) as u16) << 10 | (major & 0x3ff), minor, 0),
        };
        let [a, b] = w1.to_be_bytes();
        let [c, d] = w2.to_be_bytes();
        let [e, f] = w3.to_be_bytes();
        [method | sys, a, b, c, d, e, f]
    }
}

// ---  Analogue Broadcast Type Operand (ana_bcast_type)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum AnalogueBroadcastType {
    Cable = 0,
    Satellite = 1,
    Terrestrial = 2,
}

// ---  Broadcast System Operand (bcast_system)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum BroadcastSystem {
    PalBg = 0x00,
    /// SECAM L'
    SecamLq = 0x01,
    PalM = 0x02,
    NtscM = 0x03,
    PalI = 0x04,
    SecamDk = 0x05,
    SecamBg = 0x06,
    SecamL = 0x07,
    PalDk = 0x08,
    Other = 0x1f,
}

/// An analogue service: broadcast type, frequency and system
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct AnalogueService {
    pub bcast_type: AnalogueBroadcastType,
    /// in units of 62.5 kHz
    pub freq: u16,
    pub system: BroadcastSystem,
}
impl AnalogueService {
    pub const LEN: usize = 4;

    pub fn parse(ops: &mut Operands) -> Result<Self, CecAbortReason> {
        let bcast_type = ops.parse::<AnalogueBroadcastType>()?;
        let freq = ops.u16()?;
        let system = ops.parse::<BroadcastSystem>()?;
        // 0x0000 and 0xffff are reserved
        if freq == 0 || freq == 0xffff {
            return Err(CecAbortReason::InvalidOp);
        }
        Ok(Self {
            bcast_type,
            freq,
            system,
        })
    }
    pub fn encode(&self) -> [u8; Self::LEN] {
        let [hi, lo] = self.freq.to_be_bytes();
        [self.bcast_type.into(), hi, lo, self.system.into()]
    }
    /// frequency in kHz
    pub fn freq_khz(&self) -> u32 {
        self.freq as u32 * 625 / 10
    }
    pub fn freq_from_khz(khz: u32) -> u16 {
        (khz * 10 / 625) as u16
    }
}

/// Record Source operand of [CecOpcode::RecordOn](crate::CecOpcode::RecordOn) and the timer messages
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum RecordSource {
    /// whatever the recorder is tuned to
    Own,
    Digital(DigitalServiceId),
    Analogue(AnalogueService),
    ExtPlug(u8),
    ExtPhysAddr(u16),
}
impl RecordSource {
    pub fn source_type(&self) -> RecordSourceType {
        match self {
            RecordSource::Own => RecordSourceType::Own,
            RecordSource::Digital(_) => RecordSourceType::Digital,
            RecordSource::Analogue(_) => RecordSourceType::Analogue,
            RecordSource::ExtPlug(_) => RecordSourceType::ExtPlug,
            RecordSource::ExtPhysAddr(_) => RecordSourceType::ExtPhysAddr,
        }
    }
    /// parse a Record Source as sent with Record On
    pub fn parse(ops: &mut Operands) -> Result<Self, CecAbortReason> {
        Ok(match ops.parse::<RecordSourceType>()? {
            RecordSourceType::Own => RecordSource::Own,
            RecordSourceType::Digital => RecordSource::Digital(DigitalServiceId::parse(ops)?),
            RecordSourceType::Analogue => RecordSource::Analogue(AnalogueService::parse(ops)?),
            RecordSourceType::ExtPlug => RecordSource::ExtPlug(ops.u8()?),
            RecordSourceType::ExtPhysAddr => RecordSource::ExtPhysAddr(ops.u16()?),
        })
    }
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.source_type().into());
        match self {
            RecordSource::Own => {}
            RecordSource::Digital(id) => out.extend_from_slice(&id.encode()),
            RecordSource::Analogue(svc) => out.extend_from_slice(&svc.encode()),
            RecordSource::ExtPlug(plug) => out.push(*plug),
            RecordSource::ExtPhysAddr(pa) => out.extend_from_slice(&pa.to_be_bytes()),
        }
    }
}

// ---  Tuner Display Info Operand (tuner_display_info)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum TunerDisplayInfo {
    Digital = 0,
    None = 1,
    Analogue = 2,
}

/// What the tuner is currently showing
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum TunedService {
    Analogue(AnalogueService),
    Digital(DigitalServiceId),
}

/// Operand of [CecOpcode::TunerDeviceStatus](crate::CecOpcode::TunerDeviceStatus)
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct TunerDeviceInfo {
    /// the tuner is used for a recording
    pub rec_flag: bool,
    pub display: TunerDisplayInfo,
    pub service: TunedService,
}
impl TunerDeviceInfo {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + DigitalServiceId::LEN);
        out.push((self.rec_flag as u8) << 7 | u8::from(self.display));
        match &self.service {
            TunedService::Analogue(svc) => out.extend_from_slice(&svc.encode()),
            TunedService::Digital(id) => out.extend_from_slice(&id.encode()),
        }
        out
    }
}

// ---  Record Status Operand (rec_status)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum RecordStatus {
    CurSrc = 0x01,
    DigService = 0x02,
    AnaService = 0x03,
    ExtInput = 0x04,
    NoDigService = 0x05,
    NoAnaService = 0x06,
    NoService = 0x07,
    InvalidExtPlug = 0x09,
    InvalidExtPhysAddr = 0x0a,
    UnsupCa = 0x0b,
    NoCaEntitlements = 0x0c,
    CantCopySrc = 0x0d,
    NoMoreCopies = 0x0e,
    NoMedia = 0x10,
    Playing = 0x11,
    AlreadyRecording = 0x12,
    MediaProt = 0x13,
    NoSignal = 0x14,
    MediaProblem = 0x15,
    NoSpace = 0x16,
    ParentalLock = 0x17,
    TerminatedOk = 0x1a,
    AlreadyTerm = 0x1b,
    Other = 0x1f,
}

// ---  Timer Cleared Status Data Operand (timer_cleared_status)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum TimerClearedStatus {
    /// not cleared, the timer is recording
    Recording = 0x00,
    NoMatching = 0x01,
    NoInfo = 0x02,
    Cleared = 0x80,
}

// ---  Media Info Operand (media_info)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum MediaInfo {
    UnprotMedia = 0,
    ProtMedia = 1,
    NoMedia = 2,
}

// ---  Programmed Info Operand (prog_info)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum ProgrammedInfo {
    EnoughSpace = 0x08,
    NotEnoughSpace = 0x09,
    NoneAvailable = 0x0a,
    MightNotBeEnoughSpace = 0x0b,
}

// ---  Not Programmed Error Info Operand (prog_error)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum ProgrammedError {
    NoFreeTimer = 0x01,
    DateOutOfRange = 0x02,
    RecSeqError = 0x03,
    InvExtPlug = 0x04,
    InvExtPhysAddr = 0x05,
    CaUnsupp = 0x06,
    InsufCaEntitlements = 0x07,
    ResolutionUnsupp = 0x08,
    ParentalLock = 0x09,
    ClockFailure = 0x0a,
    Duplicate = 0x0e,
}

/// Timer Status Data of [CecOpcode::TimerStatus](crate::CecOpcode::TimerStatus)
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct TimerStatusData {
    pub overlap_warning: bool,
    pub media_info: MediaInfo,
    pub programmed: Result<ProgrammedInfo, ProgrammedError>,
    /// available recording time, sent with space warnings and duplicates
    pub duration_available: Option<(u8, u8)>,
}
impl TimerStatusData {
    pub fn encode(&self) -> Vec<u8> {
        let (prog, bits) = match self.programmed {
            Ok(info) => (0x10, u8::from(info)),
            Err(err) => (0, u8::from(err)),
        };
        let mut out = vec![
            (self.overlap_warning as u8) << 7 | u8::from(self.media_info) << 5 | prog | bits,
        ];
        let with_duration = matches!(
            self.programmed,
            Ok(ProgrammedInfo::NotEnoughSpace)
                | Ok(ProgrammedInfo::MightNotBeEnoughSpace)
                | Err(ProgrammedError::Duplicate)
        );
        if with_duration {
            let (h, m) = self.duration_available.unwrap_or_default();
            out.push(to_bcd(h));
            out.push(to_bcd(m));
        }
        out
    }
}

// ---  Audio Rate Operand (audio_rate)  ---
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum AudioRate {
    Off = 0,
    WideStd = 1,
    WideFast = 2,
    WideSlow = 3,
    NarrowStd = 4,
    NarrowFast = 5,
    NarrowSlow = 6,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn ops(bytes: &[u8]) -> Message {
        let mut raw = vec![0x40, 0x09];
        raw.extend_from_slice(bytes);
        Message::try_from(&raw[..]).unwrap()
    }

    #[test]
    fn bcd() {
        assert_eq!(from_bcd(0x59, 59), Ok(59));
        assert_eq!(from_bcd(0x60, 59), Err(CecAbortReason::InvalidOp));
        assert_eq!(from_bcd(0x1a, 99), Err(CecAbortReason::InvalidOp));
        assert_eq!(to_bcd(23), 0x23);
    }

    #[test]
    fn digital_service_by_channel() {
        let id = DigitalServiceId {
            system: DigitalBroadcastSystem::AtscT,
            service: DigitalService::Channel {
                format: ChannelNumberFormat::TwoPart,
                major: 7,
                minor: 2,
            },
        };
        let bytes = id.encode();
        assert_eq!(bytes, [0x92, 0x08, 0x07, 0x00, 0x02, 0x00, 0x00]);
        let m = ops(&bytes);
        assert_eq!(DigitalServiceId::parse(&mut m.operands()), Ok(id));
    }

    #[test]
    fn record_source_analogue() {
        let m = ops(&[0x03, 0x02, 0x1b, 0x20, 0x04]);
        let src = RecordSource::parse(&mut m.operands()).unwrap();
        assert_eq!(src.source_type(), RecordSourceType::Analogue);
        let mut out = Vec::new();
        src.encode(&mut out);
        assert_eq!(out, vec![0x03, 0x02, 0x1b, 0x20, 0x04]);
    }

    #[test]
    fn record_source_reserved_frequency() {
        let m = ops(&[0x03, 0x00, 0xff, 0xff, 0x00]);
        assert_eq!(
            RecordSource::parse(&mut m.operands()),
            Err(CecAbortReason::InvalidOp)
        );
    }

    #[test]
    fn timer_status_layout() {
        let ok = TimerStatusData {
            overlap_warning: false,
            media_info: MediaInfo::UnprotMedia,
            programmed: Ok(ProgrammedInfo::EnoughSpace),
            duration_available: None,
        };
        assert_eq!(ok.encode(), vec![0x18]);
        let dup = TimerStatusData {
            overlap_warning: true,
            media_info: MediaInfo::NoMedia,
            programmed: Err(ProgrammedError::Duplicate),
            duration_available: Some((12, 30)),
        };
        assert_eq!(dup.encode(), vec![0x80 | 0x40 | 0x0e, 0x12, 0x30]);
    }
}
