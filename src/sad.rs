/*!
 * Short Audio Descriptors (CTA-861), as carried by
 * [CecOpcode::ReportShortAudioDescriptor](crate::CecOpcode::ReportShortAudioDescriptor).
 *
 * A descriptor is three bytes:
 * - byte 1: `channels - 1` in bits 0-2, format code in bits 3-6, bit 7 reserved
 * - byte 2: sample rate mask
 * - byte 3: depends on the format code
 *
 * ```
 * # use cec_follower::sad::{AudioFormat, BitDepths, SampleRates, ShortAudioDescriptor};
 * let lpcm = ShortAudioDescriptor {
 *     channels: 2,
 *     reserved: false,
 *     sample_rates: SampleRates::HZ_32 | SampleRates::HZ_44_1 | SampleRates::HZ_48,
 *     format: AudioFormat::Lpcm { bit_depths: BitDepths::all() },
 * };
 * assert_eq!(lpcm.encode(), [0x09, 0x07, 0x07]);
 * assert_eq!(ShortAudioDescriptor::decode([0x09, 0x07, 0x07]), lpcm);
 * ```
 */
use crate::types::CecAbortReason;
use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

bitflags! {
    /// Byte 2 of every descriptor. Bit 7 is reserved and kept as is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SampleRates: u8 {
        const HZ_32 = 1;
        const HZ_44_1 = 1 << 1;
        const HZ_48 = 1 << 2;
        const HZ_88_2 = 1 << 3;
        const HZ_96 = 1 << 4;
        const HZ_176_4 = 1 << 5;
        const HZ_192 = 1 << 6;
    }
}
bitflags! {
    /// LPCM sample sizes. Reserved bits are kept as is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BitDepths: u8 {
        const BITS_16 = 1;
        const BITS_20 = 1 << 1;
        const BITS_24 = 1 << 2;
    }
}
bitflags! {
    /// AAC frame lengths, at their position in byte 3.
    /// Without an MPS bit, bit 0 is reserved and kept as is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameLengths: u8 {
        const SAMPLES_960 = 1 << 1;
        const SAMPLES_1024 = 1 << 2;
    }
}

/// Audio Format Code, bits 3-6 of byte 1
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum AudioFormatCode {
    Lpcm = 1,
    Ac3 = 2,
    Mpeg1 = 3,
    Mp3 = 4,
    Mpeg2 = 5,
    AacLc = 6,
    Dts = 7,
    Atrac = 8,
    OneBitAudio = 9,
    EnhancedAc3 = 10,
    DtsHd = 11,
    Mat = 12,
    Dst = 13,
    WmaPro = 14,
    /// byte 3 carries an [ExtensionTypeCode]
    Extended = 15,
}

/// Audio Format Extension Type Code, bits 3-7 of byte 3 when the format is [AudioFormatCode::Extended]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum ExtensionTypeCode {
    MpegHeAac = 4,
    MpegHeAacV2 = 5,
    Mpeg4AacLc = 6,
    Dra = 7,
    MpegHeAacSurround = 8,
    Mpeg4AacLcSurround = 10,
    MpegH3dAudio = 11,
    Ac4 = 12,
    Lpcm3dAudio = 13,
}

/// Format code plus the meaning of byte 3 that goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// format code 0 is reserved, byte 3 is passed through
    Reserved { byte3: u8 },
    Lpcm { bit_depths: BitDepths },
    /// `max_bitrate` is in units of 8 kbit/s
    Ac3 { max_bitrate: u8 },
    Mpeg1 { max_bitrate: u8 },
    Mp3 { max_bitrate: u8 },
    Mpeg2 { max_bitrate: u8 },
    AacLc { max_bitrate: u8 },
    Dts { max_bitrate: u8 },
    Atrac { max_bitrate: u8 },
    OneBitAudio { format_dependent: u8 },
    EnhancedAc3 { format_dependent: u8 },
    DtsHd { format_dependent: u8 },
    Mat { format_dependent: u8 },
    Dst { format_dependent: u8 },
    /// profile in bits 0-1, the reserved bits above it are kept
    WmaPro { profile: u8 },
    Extended(ExtendedAudio),
}

/// Byte 3 of an extended descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedAudio {
    MpegHeAac { frame_lengths: FrameLengths },
    MpegHeAacV2 { frame_lengths: FrameLengths },
    Mpeg4AacLc { frame_lengths: FrameLengths },
    /// bits 0-2 are reserved
    Dra { low_bits: u8 },
    MpegHeAacSurround { frame_lengths: FrameLengths, mps: bool },
    Mpeg4AacLcSurround { frame_lengths: FrameLengths, mps: bool },
    /// format dependent value in bits 0-2
    MpegH3dAudio { format_dependent: u8 },
    Ac4 { format_dependent: u8 },
    Lpcm3dAudio { bit_depths: BitDepths },
    /// extension type codes without a defined layout
    Other { code: u8, low_bits: u8 },
}

impl ExtendedAudio {
    pub fn type_code(&self) -> u8 {
        let code = match self {
            ExtendedAudio::MpegHeAac { .. } => ExtensionTypeCode::MpegHeAac,
            ExtendedAudio::MpegHeAacV2 { .. } => ExtensionTypeCode::MpegHeAacV2,
            ExtendedAudio::Mpeg4AacLc { .. } => ExtensionTypeCode::Mpeg4AacLc,
            ExtendedAudio::Dra { .. } => ExtensionTypeCode::Dra,
            ExtendedAudio::MpegHeAacSurround { .. } => ExtensionTypeCode::MpegHeAacSurround,
            ExtendedAudio::Mpeg4AacLcSurround { .. } => ExtensionTypeCode::Mpeg4AacLcSurround,
            ExtendedAudio::MpegH3dAudio { .. } => ExtensionTypeCode::MpegH3dAudio,
            ExtendedAudio::Ac4 { .. } => ExtensionTypeCode::Ac4,
            ExtendedAudio::Lpcm3dAudio { .. } => ExtensionTypeCode::Lpcm3dAudio,
            ExtendedAudio::Other { code, .. } => return *code & 0x1f,
        };
        code.into()
    }

    fn encode(&self) -> u8 {
        let low = match *self {
            ExtendedAudio::MpegHeAac { frame_lengths }
            | ExtendedAudio::MpegHeAacV2 { frame_lengths }
            | ExtendedAudio::Mpeg4AacLc { frame_lengths } => frame_lengths.bits() & 0x07,
            ExtendedAudio::MpegHeAacSurround { frame_lengths, mps }
            | ExtendedAudio::Mpeg4AacLcSurround { frame_lengths, mps } => {
                frame_lengths.bits() & 0x06 | mps as u8
            }
            ExtendedAudio::MpegH3dAudio { format_dependent }
            | ExtendedAudio::Ac4 { format_dependent } => format_dependent & 0x07,
            ExtendedAudio::Lpcm3dAudio { bit_depths } => bit_depths.bits() & 0x07,
            ExtendedAudio::Dra { low_bits } | ExtendedAudio::Other { low_bits, .. } => {
                low_bits & 0x07
            }
        };
        self.type_code() << 3 | low
    }

    fn decode(b3: u8) -> Self {
        let code = b3 >> 3;
        let frame_lengths = FrameLengths::from_bits_retain(b3 & 0x07);
        let surround = FrameLengths::from_bits_retain(b3 & 0x06);
        let mps = b3 & 1 == 1;
        match ExtensionTypeCode::try_from(code) {
            Ok(ExtensionTypeCode::MpegHeAac) => ExtendedAudio::MpegHeAac { frame_lengths },
            Ok(ExtensionTypeCode::MpegHeAacV2) => ExtendedAudio::MpegHeAacV2 { frame_lengths },
            Ok(ExtensionTypeCode::Mpeg4AacLc) => ExtendedAudio::Mpeg4AacLc { frame_lengths },
            Ok(ExtensionTypeCode::Dra) => ExtendedAudio::Dra {
                low_bits: b3 & 0x07,
            },
            Ok(ExtensionTypeCode::MpegHeAacSurround) => {
                ExtendedAudio::MpegHeAacSurround {
                    frame_lengths: surround,
                    mps,
                }
            }
            Ok(ExtensionTypeCode::Mpeg4AacLcSurround) => {
                ExtendedAudio::Mpeg4AacLcSurround {
                    frame_lengths: surround,
                    mps,
                }
            }
            Ok(ExtensionTypeCode::MpegH3dAudio) => ExtendedAudio::MpegH3dAudio {
                format_dependent: b3 & 0x07,
            },
            Ok(ExtensionTypeCode::Ac4) => ExtendedAudio::Ac4 {
                format_dependent: b3 & 0x07,
            },
            Ok(ExtensionTypeCode::Lpcm3dAudio) => ExtendedAudio::Lpcm3dAudio {
                bit_depths: BitDepths::from_bits_truncate(b3),
            },
            Err(_) => ExtendedAudio::Other {
                code,
                low_bits: b3 & 0x07,
            },
        }
    }
}

impl AudioFormat {
    /// the 4 bit format code of byte 1
    pub fn code(&self) -> u8 {
        let code = match self {
            AudioFormat::Reserved { .. } => return 0,
            AudioFormat::Lpcm { .. } => AudioFormatCode::Lpcm,
            AudioFormat::Ac3 { .. } => AudioFormatCode::Ac3,
            AudioFormat::Mpeg1 { .. } => AudioFormatCode::Mpeg1,
            AudioFormat::Mp3 { .. } => AudioFormatCode::Mp3,
            AudioFormat::Mpeg2 { .. } => AudioFormatCode::Mpeg2,
            AudioFormat::AacLc { .. } => AudioFormatCode::AacLc,
            AudioFormat::Dts { .. } => AudioFormatCode::Dts,
            AudioFormat::Atrac { .. } => AudioFormatCode::Atrac,
            AudioFormat::OneBitAudio { .. } => AudioFormatCode::OneBitAudio,
            AudioFormat::EnhancedAc3 { .. } => AudioFormatCode::EnhancedAc3,
            AudioFormat::DtsHd { .. } => AudioFormatCode::DtsHd,
            AudioFormat::Mat { .. } => AudioFormatCode::Mat,
            AudioFormat::Dst { .. } => AudioFormatCode::Dst,
            AudioFormat::WmaPro { .. } => AudioFormatCode::WmaPro,
            AudioFormat::Extended(_) => AudioFormatCode::Extended,
        };
        code.into()
    }

    fn byte3(&self) -> u8 {
        match *self {
            AudioFormat::Reserved { byte3 } => byte3,
            AudioFormat::Lpcm { bit_depths } => bit_depths.bits(),
            AudioFormat::Ac3 { max_bitrate }
            | AudioFormat::Mpeg1 { max_bitrate }
            | AudioFormat::Mp3 { max_bitrate }
            | AudioFormat::Mpeg2 { max_bitrate }
            | AudioFormat::AacLc { max_bitrate }
            | AudioFormat::Dts { max_bitrate }
            | AudioFormat::Atrac { max_bitrate } => max_bitrate,
            AudioFormat::OneBitAudio { format_dependent }
            | AudioFormat::EnhancedAc3 { format_dependent }
            | AudioFormat::DtsHd { format_dependent }
            | AudioFormat::Mat { format_dependent }
            | AudioFormat::Dst { format_dependent } => format_dependent,
            AudioFormat::WmaPro { profile } => profile,
            AudioFormat::Extended(ext) => ext.encode(),
        }
    }

    fn from_bytes(code: u8, b3: u8) -> Self {
        let code = match AudioFormatCode::try_from(code) {
            Ok(code) => code,
            Err(_) => return AudioFormat::Reserved { byte3: b3 },
        };
        match code {
            AudioFormatCode::Lpcm => AudioFormat::Lpcm {
                bit_depths: BitDepths::from_bits_retain(b3),
            },
            AudioFormatCode::Ac3 => AudioFormat::Ac3 { max_bitrate: b3 },
            AudioFormatCode::Mpeg1 => AudioFormat::Mpeg1 { max_bitrate: b3 },
            AudioFormatCode::Mp3 => AudioFormat::Mp3 { max_bitrate: b3 },
            AudioFormatCode::Mpeg2 => AudioFormat::Mpeg2 { max_bitrate: b3 },
            AudioFormatCode::AacLc => AudioFormat::AacLc { max_bitrate: b3 },
            AudioFormatCode::Dts => AudioFormat::Dts { max_bitrate: b3 },
            AudioFormatCode::Atrac => AudioFormat::Atrac { max_bitrate: b3 },
            AudioFormatCode::OneBitAudio => AudioFormat::OneBitAudio { format_dependent: b3 },
            AudioFormatCode::EnhancedAc3 => AudioFormat::EnhancedAc3 { format_dependent: b3 },
            AudioFormatCode::DtsHd => AudioFormat::DtsHd { format_dependent: b3 },
            AudioFormatCode::Mat => AudioFormat::Mat { format_dependent: b3 },
            AudioFormatCode::Dst => AudioFormat::Dst { format_dependent: b3 },
            AudioFormatCode::WmaPro => AudioFormat::WmaPro { profile: b3 },
            AudioFormatCode::Extended => AudioFormat::Extended(ExtendedAudio::decode(b3)),
        }
    }
}

/// One supported audio format of a sink or an audio system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortAudioDescriptor {
    /// 1..=8
    pub channels: u8,
    /// bit 7 of byte 1
    pub reserved: bool,
    pub sample_rates: SampleRates,
    pub format: AudioFormat,
}

impl ShortAudioDescriptor {
    pub fn encode(&self) -> [u8; 3] {
        let b1 = (self.channels.wrapping_sub(1) & 0x07)
            | (self.format.code() & 0x0f) << 3
            | (self.reserved as u8) << 7;
        [b1, self.sample_rates.bits(), self.format.byte3()]
    }
    pub fn decode(bytes: [u8; 3]) -> Self {
        let [b1, b2, b3] = bytes;
        Self {
            channels: (b1 & 0x07) + 1,
            reserved: b1 & 0x80 != 0,
            sample_rates: SampleRates::from_bits_retain(b2),
            format: AudioFormat::from_bytes((b1 >> 3) & 0x0f, b3),
        }
    }
}

/// Audio Format ID and Code operand of
/// [CecOpcode::RequestShortAudioDescriptor](crate::CecOpcode::RequestShortAudioDescriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormatId {
    /// ID 0: an [AudioFormatCode]
    Code(u8),
    /// ID 1: an [ExtensionTypeCode]
    Extension(u8),
}

impl AudioFormatId {
    pub fn from_operand(b: u8) -> Result<Self, CecAbortReason> {
        let code = b & 0x3f;
        match b >> 6 {
            0 => Ok(AudioFormatId::Code(code)),
            1 => Ok(AudioFormatId::Extension(code)),
            _ => Err(CecAbortReason::InvalidOp),
        }
    }
    pub fn to_operand(self) -> u8 {
        match self {
            AudioFormatId::Code(c) => c & 0x3f,
            AudioFormatId::Extension(c) => 1 << 6 | (c & 0x3f),
        }
    }
    /// does `sad` describe this format
    pub fn matches(self, sad: &ShortAudioDescriptor) -> bool {
        match (self, &sad.format) {
            (AudioFormatId::Extension(c), AudioFormat::Extended(ext)) => ext.type_code() == c,
            (AudioFormatId::Extension(_), _) => false,
            (AudioFormatId::Code(c), fmt) => {
                fmt.code() == c && fmt.code() != u8::from(AudioFormatCode::Extended)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sad(channels: u8, rates: u8, format: AudioFormat) -> ShortAudioDescriptor {
        ShortAudioDescriptor {
            channels,
            reserved: false,
            sample_rates: SampleRates::from_bits_retain(rates),
            format,
        }
    }

    #[test]
    fn known_encodings() {
        let ac3 = sad(6, 0x04, AudioFormat::Ac3 { max_bitrate: 80 });
        assert_eq!(ac3.encode(), [0x15, 0x04, 0x50]);

        let he_aac = sad(
            2,
            0x07,
            AudioFormat::Extended(ExtendedAudio::MpegHeAac {
                frame_lengths: FrameLengths::SAMPLES_1024,
            }),
        );
        assert_eq!(he_aac.encode(), [0x79, 0x07, 0x24]);

        let wma = sad(2, 0x06, AudioFormat::WmaPro { profile: 0x02 });
        assert_eq!(wma.encode(), [0x71, 0x06, 0x02]);
    }

    #[test]
    fn every_format_round_trips() {
        let formats = [
            AudioFormat::Lpcm {
                bit_depths: BitDepths::BITS_16 | BitDepths::BITS_24,
            },
            AudioFormat::Ac3 { max_bitrate: 0xff },
            AudioFormat::Mpeg1 { max_bitrate: 1 },
            AudioFormat::Mp3 { max_bitrate: 40 },
            AudioFormat::Mpeg2 { max_bitrate: 0 },
            AudioFormat::AacLc { max_bitrate: 128 },
            AudioFormat::Dts { max_bitrate: 191 },
            AudioFormat::Atrac { max_bitrate: 2 },
            AudioFormat::OneBitAudio { format_dependent: 0x5a },
            AudioFormat::EnhancedAc3 { format_dependent: 1 },
            AudioFormat::DtsHd { format_dependent: 0 },
            AudioFormat::Mat { format_dependent: 0x80 },
            AudioFormat::Dst { format_dependent: 0xff },
            AudioFormat::WmaPro { profile: 2 },
            AudioFormat::Extended(ExtendedAudio::MpegHeAac {
                frame_lengths: FrameLengths::all(),
            }),
            AudioFormat::Extended(ExtendedAudio::MpegHeAacV2 {
                frame_lengths: FrameLengths::SAMPLES_960,
            }),
            AudioFormat::Extended(ExtendedAudio::Mpeg4AacLc {
                frame_lengths: FrameLengths::empty(),
            }),
            AudioFormat::Extended(ExtendedAudio::Dra { low_bits: 0 }),
            AudioFormat::Extended(ExtendedAudio::MpegHeAacSurround {
                frame_lengths: FrameLengths::SAMPLES_1024,
                mps: true,
            }),
            AudioFormat::Extended(ExtendedAudio::Mpeg4AacLcSurround {
                frame_lengths: FrameLengths::all(),
                mps: false,
            }),
            AudioFormat::Extended(ExtendedAudio::MpegH3dAudio { format_dependent: 5 }),
            AudioFormat::Extended(ExtendedAudio::Ac4 { format_dependent: 7 }),
            AudioFormat::Extended(ExtendedAudio::Lpcm3dAudio {
                bit_depths: BitDepths::all(),
            }),
            AudioFormat::Extended(ExtendedAudio::Other { code: 9, low_bits: 3 }),
        ];
        for (i, format) in formats.into_iter().enumerate() {
            let d = sad((i % 8) as u8 + 1, 0x7f >> (i % 7), format);
            assert_eq!(ShortAudioDescriptor::decode(d.encode()), d, "{:?}", d);
        }
    }

    #[test]
    fn channels_and_rates_round_trip() {
        for channels in 1..=8 {
            for rates in 0..0x80 {
                let d = sad(channels, rates, AudioFormat::Dts { max_bitrate: 0x40 });
                assert_eq!(ShortAudioDescriptor::decode(d.encode()), d);
            }
        }
    }

    #[test]
    fn unknown_codes_pass_through() {
        let raw = [0x01, 0x85, 0xaa];
        let d = ShortAudioDescriptor::decode(raw);
        assert_eq!(d.format, AudioFormat::Reserved { byte3: 0xaa });
        assert_eq!(d.encode(), raw);

        // extension type 31 is not assigned
        let raw = [0x7a, 0x01, 0xfd];
        let d = ShortAudioDescriptor::decode(raw);
        assert_eq!(
            d.format,
            AudioFormat::Extended(ExtendedAudio::Other { code: 31, low_bits: 5 })
        );
        assert_eq!(d.encode(), raw);
    }

    #[test]
    fn reserved_bits_are_kept() {
        for raw in [
            [0x09, 0x07, 0xff],
            [0x89, 0x07, 0x07],
            [0x79, 0x07, 0x25],
            [0x79, 0x07, 0x3f],
            [0x79, 0x07, 0x41],
            [0x79, 0x87, 0x47],
            [0x71, 0x06, 0xfe],
        ] {
            assert_eq!(ShortAudioDescriptor::decode(raw).encode(), raw, "{:02x?}", raw);
        }
        let d = ShortAudioDescriptor::decode([0x79, 0x07, 0x25]);
        assert_eq!(
            d.format,
            AudioFormat::Extended(ExtendedAudio::MpegHeAac {
                frame_lengths: FrameLengths::SAMPLES_1024 | FrameLengths::from_bits_retain(1),
            })
        );
        assert!(ShortAudioDescriptor::decode([0x89, 0x07, 0x07]).reserved);
    }

    #[test]
    fn format_id_matching() {
        let lpcm = sad(2, 7, AudioFormat::Lpcm { bit_depths: BitDepths::all() });
        let ext = sad(
            2,
            7,
            AudioFormat::Extended(ExtendedAudio::Ac4 { format_dependent: 0 }),
        );
        assert!(AudioFormatId::from_operand(0x01).unwrap().matches(&lpcm));
        assert!(!AudioFormatId::from_operand(0x41).unwrap().matches(&lpcm));
        assert!(AudioFormatId::from_operand(0x4c).unwrap().matches(&ext));
        assert!(!AudioFormatId::from_operand(0x0f).unwrap().matches(&ext));
        assert_eq!(AudioFormatId::from_operand(0x81), Err(CecAbortReason::InvalidOp));
        assert_eq!(AudioFormatId::Extension(12).to_operand(), 0x4c);
    }
}
