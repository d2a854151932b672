//! Static description of the emulated device.

use crate::{
    error::{Error, Result},
    operand::{
        AnalogueBroadcastType, AnalogueService, BroadcastSystem, DigitalBroadcastSystem,
        DigitalService, DigitalServiceId, TunedService,
    },
    sad::{AudioFormat, BitDepths, ShortAudioDescriptor, SampleRates},
    state::FloodReset,
    types::{CecLogAddrMask, CecLogAddrType, CecLogicalAddress, Version},
};
use bitflags::bitflags;
use std::time::Duration;

bitflags! {
    /// Optional features of the emulated device
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u8 {
        /// audio system that can receive ARC from the TV
        const ARC_RX = (1 << 0);
        /// TV that can send ARC to an audio system
        const ARC_TX = (1 << 1);
        /// Audio Rate Control
        const AUDIO_RATE = (1 << 2);
        /// Deck Control for playback and record devices
        const DECK_CONTROL = (1 << 3);
        /// TV that accepts Record TV Screen
        const RECORD_TV_SCREEN = (1 << 4);
        /// TV that shows Set OSD String
        const OSD_STRING = (1 << 5);
    }
}

/// 471.25 MHz cable, PAL B/G
pub const DEFAULT_ANALOGUE: AnalogueService = AnalogueService {
    bcast_type: AnalogueBroadcastType::Cable,
    freq: 7540,
    system: BroadcastSystem::PalBg,
};

/// Built in channel list of a tuner
pub fn default_services() -> Vec<TunedService> {
    vec![
        TunedService::Analogue(DEFAULT_ANALOGUE),
        TunedService::Analogue(AnalogueService {
            bcast_type: AnalogueBroadcastType::Terrestrial,
            freq: 2804,
            system: BroadcastSystem::PalBg,
        }),
        TunedService::Analogue(AnalogueService {
            bcast_type: AnalogueBroadcastType::Terrestrial,
            freq: 8308,
            system: BroadcastSystem::PalBg,
        }),
        TunedService::Digital(DigitalServiceId {
            system: DigitalBroadcastSystem::DvbT,
            service: DigitalService::Dvb {
                transport_id: 0x1001,
                service_id: 0x0101,
                orig_network_id: 0x2174,
            },
        }),
        TunedService::Digital(DigitalServiceId {
            system: DigitalBroadcastSystem::DvbT,
            service: DigitalService::Dvb {
                transport_id: 0x1001,
                service_id: 0x0102,
                orig_network_id: 0x2174,
            },
        }),
        TunedService::Digital(DigitalServiceId {
            system: DigitalBroadcastSystem::AtscT,
            service: DigitalService::Atsc {
                transport_id: 0x0641,
                program_number: 3,
            },
        }),
        TunedService::Digital(DigitalServiceId {
            system: DigitalBroadcastSystem::AribT,
            service: DigitalService::Arib {
                transport_id: 0x7fe1,
                service_id: 0x0400,
                orig_network_id: 0x7fe1,
            },
        }),
    ]
}

/// LPCM stereo, AC-3 5.1 and E-AC-3 7.1
pub fn default_sads() -> Vec<ShortAudioDescriptor> {
    vec![
        ShortAudioDescriptor {
            channels: 2,
            reserved: false,
            sample_rates: SampleRates::HZ_32 | SampleRates::HZ_44_1 | SampleRates::HZ_48,
            format: AudioFormat::Lpcm {
                bit_depths: BitDepths::BITS_16 | BitDepths::BITS_20 | BitDepths::BITS_24,
            },
        },
        ShortAudioDescriptor {
            channels: 6,
            reserved: false,
            sample_rates: SampleRates::HZ_32 | SampleRates::HZ_44_1 | SampleRates::HZ_48,
            format: AudioFormat::Ac3 { max_bitrate: 80 },
        },
        ShortAudioDescriptor {
            channels: 8,
            reserved: false,
            sample_rates: SampleRates::HZ_44_1 | SampleRates::HZ_48,
            format: AudioFormat::EnhancedAc3 {
                format_dependent: 1,
            },
        },
    ]
}

/**
 * Everything that does not change while the follower runs.
 *
 * Build one with [FollowerConfig::new] and adjust the public fields.
 * ```
 * # use cec_follower::{FollowerConfig, CecLogicalAddress, CecLogAddrType};
 * let mut cfg = FollowerConfig::new(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK, 0x1000);
 * cfg.osd_name = "player".to_string();
 * assert!(cfg.validate().is_ok());
 * ```
 */
#[derive(Debug, Clone)]
pub struct FollowerConfig {
    /// claimed addresses. The first one answers broadcasts.
    pub logical_addresses: Vec<(CecLogicalAddress, CecLogAddrType)>,
    pub phys_addr: u16,
    pub version: Version,
    /// 24 bit IEEE OUI
    pub vendor_id: u32,
    pub osd_name: String,
    pub menu_language: [u8; 3],
    pub features: Features,
    pub standby_at_start: bool,

    /// identical Standby messages accepted in a row, 0 to accept all
    pub standby_flood: u32,
    /// identical Image/Text View On messages accepted in a row, 0 to accept all
    pub view_on_flood: u32,
    pub flood_window: Duration,
    pub flood_reset: FloodReset,

    /// at most `abort_max` Feature Aborts per peer and opcode within `abort_window`
    pub abort_window: Duration,
    pub abort_max: u32,

    /// messages from these are dropped
    pub ignore_la: CecLogAddrMask,
    /// per opcode, the initiators whose messages are dropped
    pub ignore_opcode: Box<[CecLogAddrMask; 256]>,

    /// how long Give Device Power Status reports a transition
    pub power_transition: Duration,
    /// flip between on and standby at this interval
    pub toggle_power: Option<Duration>,
    /// minutes of recording space
    pub media_space: u32,
    pub services: Vec<TunedService>,
    pub sads: Vec<ShortAudioDescriptor>,
    /// receive timeout of [Follower::run](crate::Follower::run)
    pub poll_interval: Duration,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        FollowerConfig::new(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK, 0x1000)
    }
}

impl FollowerConfig {
    /// A single address device with defaults for everything else
    pub fn new(la: CecLogicalAddress, kind: CecLogAddrType, phys_addr: u16) -> Self {
        Self {
            logical_addresses: vec![(la, kind)],
            phys_addr,
            version: Version::V2_0,
            vendor_id: 0x000c03,
            osd_name: "Follower".to_string(),
            menu_language: *b"eng",
            features: Features::empty(),
            standby_at_start: false,
            standby_flood: 0,
            view_on_flood: 0,
            flood_window: Duration::from_secs(1),
            flood_reset: FloodReset::default(),
            abort_window: Duration::from_secs(1),
            abort_max: 3,
            ignore_la: CecLogAddrMask::empty(),
            ignore_opcode: Box::new([CecLogAddrMask::empty(); 256]),
            power_transition: Duration::from_secs(1),
            toggle_power: None,
            media_space: 600,
            services: default_services(),
            sads: default_sads(),
            poll_interval: Duration::from_millis(50),
        }
    }
    /// Drop `opcode` when sent by any address in `from`.
    pub fn ignore_opcode_from(&mut self, opcode: u8, from: CecLogAddrMask) {
        self.ignore_opcode[opcode as usize] |= from;
    }
    /// is `opcode` from `la` dropped
    #[inline]
    pub fn ignores(&self, opcode: u8, la: CecLogicalAddress) -> bool {
        self.ignore_opcode[opcode as usize].has(la)
    }
    /// type of one of our addresses
    pub fn kind_of(&self, la: CecLogicalAddress) -> Option<CecLogAddrType> {
        self.logical_addresses
            .iter()
            .find(|(a, _)| *a == la)
            .map(|(_, t)| *t)
    }
    /// all claimed addresses
    pub fn la_mask(&self) -> CecLogAddrMask {
        self.logical_addresses
            .iter()
            .fold(CecLogAddrMask::empty(), |m, (la, _)| m | CecLogAddrMask::from(*la))
    }
    /// All Device Types operand: every type we claimed an address for
    pub fn all_device_types(&self) -> u8 {
        self.logical_addresses
            .iter()
            .fold(0, |m, (_, kind)| m | kind.primary_device_type().all_device_type())
    }
    /// RC Profile and Device Features operands of Report Features for `kind`
    pub fn report_features(&self, kind: CecLogAddrType) -> [u8; 2] {
        let tv = kind == CecLogAddrType::TV;
        // TV: profile none. Sources: bit 6 marks a source profile
        let rc_profile = if tv { 0x00 } else { 0x40 };
        let f = self.features;
        let mut dev = 0;
        if tv && f.contains(Features::RECORD_TV_SCREEN) {
            dev |= 0x40;
        }
        if tv && f.contains(Features::OSD_STRING) {
            dev |= 0x20;
        }
        if f.contains(Features::DECK_CONTROL)
            && matches!(kind, CecLogAddrType::PLAYBACK | CecLogAddrType::RECORD)
        {
            dev |= 0x10;
        }
        if f.contains(Features::AUDIO_RATE) {
            dev |= 0x08;
        }
        if tv && f.contains(Features::ARC_TX) {
            dev |= 0x04;
        }
        if kind == CecLogAddrType::AUDIOSYSTEM && f.contains(Features::ARC_RX) {
            dev |= 0x02;
        }
        [rc_profile, dev]
    }
    pub fn validate(&self) -> Result<()> {
        if self.logical_addresses.is_empty() {
            return Err(Error::Config("no logical address"));
        }
        if self.logical_addresses.len() > 4 {
            return Err(Error::Config("at most 4 logical addresses"));
        }
        for (i, (la, _)) in self.logical_addresses.iter().enumerate() {
            if la.is_broadcast() {
                return Err(Error::Config("the broadcast address can not be claimed"));
            }
            if self.logical_addresses[..i].iter().any(|(o, _)| o == la) {
                return Err(Error::Config("logical address listed twice"));
            }
        }
        if self.phys_addr == 0xffff {
            return Err(Error::Config("invalid physical address"));
        }
        if self.vendor_id > 0xff_ffff {
            return Err(Error::Config("vendor id has more than 24 bits"));
        }
        if self.osd_name.len() > 14 || !self.osd_name.is_ascii() {
            return Err(Error::Config("OSD name must be up to 14 ASCII characters"));
        }
        if !self.menu_language.iter().all(u8::is_ascii_lowercase) {
            return Err(Error::Config("menu language must be ISO 639-2"));
        }
        if self.abort_max == 0 {
            return Err(Error::Config("abort_max must be at least 1"));
        }
        if self.services.is_empty() {
            return Err(Error::Config("service table is empty"));
        }
        if self.sads.len() > 4 * 4 {
            return Err(Error::Config("too many short audio descriptors"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must not be zero"));
        }
        Ok(())
    }
}
