//! Closed protocol enumerations shared by the follower and the kernel transport.
//https://www.avsforum.com/attachments/hdmi-cec-v1-3a-specifications-pdf.2579760/

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// CEC Version Operand for [CecOpcode::CecVersion]
#[repr(u8)]
#[non_exhaustive]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone)]
pub enum Version {
    V1_3A = 4,
    V1_4 = 5,
    V2_0 = 6,
}

/// Primary Device Type Operand, sent with [CecOpcode::ReportPhysicalAddr]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum CecPrimDevType {
    TV = 0,
    RECORD = 1,
    TUNER = 3,
    PLAYBACK = 4,
    AUDIOSYSTEM = 5,
    SWITCH = 6,
    PROCESSOR = 7,
}

impl CecPrimDevType {
    /// bit of the All Device Types operand of Report Features
    pub fn all_device_type(self) -> u8 {
        match self {
            CecPrimDevType::TV => 0x80,
            CecPrimDevType::RECORD => 0x40,
            CecPrimDevType::TUNER => 0x20,
            CecPrimDevType::PLAYBACK => 0x10,
            CecPrimDevType::AUDIOSYSTEM => 0x08,
            CecPrimDevType::SWITCH | CecPrimDevType::PROCESSOR => 0x04,
        }
    }
}

/// The kind of device a claimed logical address stands for.
///
/// The follower picks its behaviour per destination address from this type.
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum CecLogAddrType {
    TV = 0,
    RECORD = 1,
    TUNER = 2,
    PLAYBACK = 3,
    AUDIOSYSTEM = 4,
    SPECIFIC = 5,
    UNREGISTERED = 6,
}
impl CecLogAddrType {
    /// primary device type reported for this address type
    pub fn primary_device_type(self) -> CecPrimDevType {
        match self {
            CecLogAddrType::TV => CecPrimDevType::TV,
            CecLogAddrType::RECORD => CecPrimDevType::RECORD,
            CecLogAddrType::TUNER => CecPrimDevType::TUNER,
            CecLogAddrType::PLAYBACK => CecPrimDevType::PLAYBACK,
            CecLogAddrType::AUDIOSYSTEM => CecPrimDevType::AUDIOSYSTEM,
            CecLogAddrType::SPECIFIC => CecPrimDevType::PROCESSOR,
            CecLogAddrType::UNREGISTERED => CecPrimDevType::SWITCH,
        }
    }
    /// devices of this type carry a tuner
    #[inline]
    pub fn has_tuner(self) -> bool {
        matches!(
            self,
            CecLogAddrType::TV | CecLogAddrType::TUNER | CecLogAddrType::RECORD
        )
    }
}

/**
 * The logical addresses defined by CEC 2.0
 *
 * Switches should use UNREGISTERED.
 * Processors should use SPECIFIC.
 */
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum CecLogicalAddress {
    Tv = 0,
    Record1 = 1,
    Record2 = 2,
    Tuner1 = 3,
    Playback1 = 4,
    Audiosystem = 5,
    Tuner2 = 6,
    Tuner3 = 7,
    Playback2 = 8,
    Record3 = 9,
    Tuner4 = 10,
    Playback3 = 11,
    Backup1 = 12,
    Backup2 = 13,
    Specific = 14,
    ///as initiator address
    UnregisteredBroadcast = 15,
}
impl CecLogicalAddress {
    /// Take the low nibble of `v`. Every nibble names an address.
    pub fn from_nibble(v: u8) -> Self {
        match Self::try_from(v & 0xf) {
            Ok(la) => la,
            Err(_) => CecLogicalAddress::UnregisteredBroadcast,
        }
    }
    #[inline]
    pub fn is_broadcast(self) -> bool {
        self == CecLogicalAddress::UnregisteredBroadcast
    }
    /// index into per address tables (0..=15)
    #[inline]
    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}

bitflags! {
    /// A set of logical addresses.
    ///
    /// Used for the addresses this adapter has claimed and for ignore lists.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CecLogAddrMask: u16 {
        const Tv            = (1 << 0);
        const Record1       = (1 << 1);
        const Record2       = (1 << 2);
        const Record3       = (1 << 9);
        const Tuner1        = (1 << 3);
        const Tuner2        = (1 << 6);
        const Tuner3        = (1 << 7);
        const Tuner4        = (1 << 10);
        const Playback1     = (1 << 4);
        const Playback2     = (1 << 8);
        const Playback3     = (1 << 11);
        const Audiosystem   = (1 << 5);
        const Backup1       = (1 << 12);
        const Backup2       = (1 << 13);
        const Specific      = (1 << 14);
        /// adapter is Unregistered
        const Unregistered  = (1 << 15);
    }
}
impl CecLogAddrMask {
    #[inline]
    pub fn is_playback(&self) -> bool {
        self.intersects(Self::Playback1 | Self::Playback2 | Self::Playback3)
    }
    #[inline]
    pub fn is_record(&self) -> bool {
        self.intersects(Self::Record1 | Self::Record2 | Self::Record3)
    }
    #[inline]
    pub fn is_tuner(&self) -> bool {
        self.intersects(Self::Tuner1 | Self::Tuner2 | Self::Tuner3 | Self::Tuner4)
    }
    #[inline]
    pub fn is_backup(&self) -> bool {
        self.intersects(Self::Backup1 | Self::Backup2)
    }
    #[inline]
    pub fn has(&self, la: CecLogicalAddress) -> bool {
        self.contains(Self::from(la))
    }
}
impl From<CecLogicalAddress> for CecLogAddrMask {
    fn from(la: CecLogicalAddress) -> Self {
        Self::from_bits_retain(1 << la.index())
    }
}

/// How an opcode may be addressed on the bus.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum Addressing {
    Directed,
    Broadcast,
    Both,
}

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum CecOpcode {
    /* One Touch Play Feature */
    /// A new source started streaming, or answer to [CecOpcode::RequestActiveSource].
    /// __Parameters:__ 2byte - physical address of active source
    ActiveSource = 0x82,
    /// A source asks the TV to leave standby and show its picture.
    ImageViewOn = 0x04,
    /// As [CecOpcode::ImageViewOn], but also clears menus from the screen.
    TextViewOn = 0x0d,

    /* Routing Control Feature */
    /// The active source tells the TV it stops providing video.
    /// __Parameters:__ 2byte - physical address of active source
    InactiveSource = 0x9d,
    /// Asks the active source to announce itself.
    RequestActiveSource = 0x85,
    /// A switch changed its active route.
    /// __Parameters:__ 2byte old, 2byte new physical address
    RoutingChange = 0x80,
    /// __Parameters:__ 2byte - physical address
    RoutingInformation = 0x81,
    /// The TV requests the stream of the given physical address.
    /// __Parameters:__ 2byte - physical address
    SetStreamPath = 0x86,

    /* Standby Feature */
    /// Turn off remote device. Can be used as a broadcast. No Payload
    Standby = 0x36,

    /* System Information Feature */
    /// __Parameters:__ [Version]
    CecVersion = 0x9e,
    GetCecVersion = 0x9f,
    GivePhysicalAddr = 0x83,
    GetMenuLanguage = 0x91,
    /// __Parameters:__ 2b physical address, 1b [CecPrimDevType]
    ReportPhysicalAddr = 0x84,
    /// __Parameters:__ 3 byte ISO 639-2 language
    SetMenuLanguage = 0x32,
    /// HDMI 2.0
    ReportFeatures = 0xa6,
    /// HDMI 2.0
    GiveFeatures = 0xa5,

    /* Deck Control Feature */
    /// __Parameters:__ [DeckControlMode]
    DeckControl = 0x42,
    /// __Parameters:__ [DeckInfo]
    DeckStatus = 0x1b,
    /// __Parameters:__ [StatusRequest]
    GiveDeckStatus = 0x1a,
    /// __Parameters:__ [PlayMode]
    Play = 0x41,

    /* Vendor Specific Commands Feature */
    /// __Parameters:__ 3 byte vendor id
    DeviceVendorId = 0x87,
    GiveDeviceVendorId = 0x8c,
    VendorCommand = 0x89,
    VendorCommandWithId = 0xa0,
    VendorRemoteButtonDown = 0x8a,
    VendorRemoteButtonUp = 0x8b,

    /* OSD Display Feature */
    /// __Parameters:__ [DisplayControl], up to 13 ASCII bytes
    SetOsdString = 0x64,
    /* Device OSD Transfer Feature */
    GiveOsdName = 0x46,
    /// __Parameters:__ up to 14 ASCII bytes
    SetOsdName = 0x47,

    /* Device Menu Control Feature */
    /// __Parameters:__ [MenuRequestType]
    MenuRequest = 0x8d,
    /// __Parameters:__ 1 byte Activated(0)/Deactivated(1)
    MenuStatus = 0x8e,
    /// __Parameters:__ 1 byte [CecUserControlCode] plus optional operands
    UserControlPressed = 0x44,
    UserControlReleased = 0x45,

    /* Power Status Feature */
    GiveDevicePowerStatus = 0x8f,
    /// __Parameters:__ 1 byte [CecPowerStatus]
    ReportPowerStatus = 0x90,

    /* General Protocol Messages */
    /// Negative acknowledgement.
    ///
    /// __Parameters:__
    /// - [CecOpcode]
    /// - [CecAbortReason]
    FeatureAbort = 0x00,
    /// Test message. A follower must answer it with [CecAbortReason::Refused].
    Abort = 0xff,

    /* System Audio Control Feature */
    GiveAudioStatus = 0x71,
    GiveSystemAudioModeStatus = 0x7d,
    /// __Parameters:__ 1 byte, bit 7 mute, bits 0-6 volume in percent
    ReportAudioStatus = 0x7a,
    /// __Parameters:__ up to 4 Short Audio Descriptors (3 bytes each)
    ReportShortAudioDescriptor = 0xa3,
    /// __Parameters:__ up to 4 Audio Format ID and Code bytes
    RequestShortAudioDescriptor = 0xa4,
    /// __Parameters:__ 1 byte On(1)/Off(0)
    SetSystemAudioMode = 0x72,
    /// __Parameters:__ HDMI 2.0: 1 byte volume
    SetAudioVolumeLevel = 0x73,
    /// __Parameters:__ optional 2b physical address of the audio source.
    /// Without operand the request terminates System Audio Mode.
    SystemAudioModeRequest = 0x70,
    /// __Parameters:__ 1 byte On(1)/Off(0)
    SystemAudioModeStatus = 0x7e,

    /* Audio Rate Control Feature */
    /// __Parameters:__ [AudioRate](crate::operand::AudioRate)
    SetAudioRate = 0x9a,

    /* One Touch Record Feature */
    RecordOff = 0x0b,
    /// __Parameters:__ [RecordSource](crate::operand::RecordSource)
    RecordOn = 0x09,
    /// __Parameters:__ [RecordStatus](crate::operand::RecordStatus)
    RecordStatus = 0x0a,
    RecordTvScreen = 0x0f,

    /* Timer Programming Feature */
    ClearAnalogueTimer = 0x33,
    ClearDigitalTimer = 0x99,
    ClearExtTimer = 0xa1,
    SetAnalogueTimer = 0x34,
    SetDigitalTimer = 0x97,
    SetExtTimer = 0xa2,
    SetTimerProgramTitle = 0x67,
    TimerClearedStatus = 0x43,
    TimerStatus = 0x35,

    /* Tuner Control Feature */
    /// __Parameters:__ [StatusRequest]
    GiveTunerDeviceStatus = 0x08,
    SelectAnalogueService = 0x92,
    SelectDigitalService = 0x93,
    TunerDeviceStatus = 0x07,
    TunerStepDecrement = 0x06,
    TunerStepIncrement = 0x05,

    /* Audio Return Channel Control Feature */
    InitiateArc = 0xc0,
    ReportArcInitiated = 0xc1,
    ReportArcTerminated = 0xc2,
    RequestArcInitiation = 0xc3,
    RequestArcTermination = 0xc4,
    TerminateArc = 0xc5,

    /* Dynamic Audio Lipsync Feature */
    /* Only for CEC 2.0 and up */
    RequestCurrentLatency = 0xa7,
    ReportCurrentLatency = 0xa8,
    /* Capability Discovery and Control Feature */
    CdcMessage = 0xf8,
}
impl CecOpcode {
    /// How this opcode has to be addressed.
    pub fn addressing(self) -> Addressing {
        use CecOpcode::*;
        match self {
            ActiveSource | RequestActiveSource | RoutingChange
            | RoutingInformation | SetStreamPath | ReportPhysicalAddr | SetMenuLanguage
            | ReportFeatures | DeviceVendorId | ReportCurrentLatency | RequestCurrentLatency
            | CdcMessage => Addressing::Broadcast,
            Standby | SetSystemAudioMode | VendorCommandWithId | VendorRemoteButtonDown
            | VendorRemoteButtonUp => Addressing::Both,
            _ => Addressing::Directed,
        }
    }
}

/// parameter for [CecOpcode::UserControlPressed]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum CecUserControlCode {
    Select = 0x00,
    Up = 0x01,
    Down = 0x02,
    Left = 0x03,
    Right = 0x04,
    RightUp = 0x05,
    RightDown = 0x06,
    LeftUp = 0x07,
    LeftDown = 0x08,
    RootMenu = 0x09,
    SetupMenu = 0x0a,
    ContentsMenu = 0x0b,
    FavoriteMenu = 0x0c,
    Exit = 0x0d,
    // reserved: 0x0E, 0x0F
    TopMenu = 0x10,
    DvdMenu = 0x11, // reserved: 0x12 ... 0x1C
    NumberEntryMode = 0x1d,
    Number11 = 0x1e,
    Number12 = 0x1f,
    Number0 = 0x20,
    Number1 = 0x21,
    Number2 = 0x22,
    Number3 = 0x23,
    Number4 = 0x24,
    Number5 = 0x25,
    Number6 = 0x26,
    Number7 = 0x27,
    Number8 = 0x28,
    Number9 = 0x29,
    Dot = 0x2a,
    Enter = 0x2b,
    Clear = 0x2c,
    NextFavorite = 0x2f,
    ChannelUp = 0x30,
    ChannelDown = 0x31,
    PreviousChannel = 0x32,
    SoundSelect = 0x33,
    InputSelect = 0x34,
    DisplayInformation = 0x35,
    Help = 0x36,
    PageUp = 0x37,
    PageDown = 0x38,
    // reserved: 0x39 ... 0x3F
    Power = 0x40,
    VolumeUp = 0x41,
    VolumeDown = 0x42,
    Mute = 0x43,
    Play = 0x44,
    Stop = 0x45,
    Pause = 0x46,
    Record = 0x47,
    Rewind = 0x48,
    FastForward = 0x49,
    Eject = 0x4a,
    Forward = 0x4b,
    Backward = 0x4c,
    StopRecord = 0x4d,
    PauseRecord = 0x4e,
    // reserved: 0x4F
    Angle = 0x50,
    SubPicture = 0x51,
    VideoOnDemand = 0x52,
    ElectronicProgramGuide = 0x53,
    TimerProgramming = 0x54,
    InitialConfiguration = 0x55,
    SelectBroadcastType = 0x56,
    SelectSoundPresentation = 0x57,
    // reserved: 0x58 ... 0x5F
    /// Additional Operands: [PlayMode]
    PlayFunction = 0x60,
    PausePlayFunction = 0x61,
    RecordFunction = 0x62,
    PauseRecordFunction = 0x63,
    StopFunction = 0x64,
    MuteFunction = 0x65,
    RestoreVolumeFunction = 0x66,
    TuneFunction = 0x67,
    SelectMediaFunction = 0x68,
    SelectAvInputFunction = 0x69,
    SelectAudioInputFunction = 0x6a,
    PowerToggleFunction = 0x6b,
    PowerOffFunction = 0x6c,
    PowerOnFunction = 0x6d,
    // reserved: 0x6E ... 0x70
    F1Blue = 0x71,
    F2Red = 0x72,
    F3Green = 0x73,
    F4Yellow = 0x74,
    F5 = 0x75,
    Data = 0x76,
    // reserved: 0x77 ... 0xFF
}

/// used by [CecOpcode::FeatureAbort]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum CecAbortReason {
    /// Unrecognized opcode
    Unrecognized = 0,
    /// Not in correct mode to respond
    WrongMode = 1,
    /// Cannot provide source
    NoSource = 2,
    /// Invalid operand
    InvalidOp = 3,
    Refused = 4,
    /// Unable to determine
    Other = 5,
}

/// used by [CecOpcode::DeckControl]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum DeckControlMode {
    SkipFwd = 1,
    SkipRev = 2,
    Stop = 3,
    Eject = 4,
}
/// used by [CecOpcode::DeckStatus]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum DeckInfo {
    Play = 0x11,
    Record = 0x12,
    PlayRev = 0x13,
    Still = 0x14,
    Slow = 0x15,
    SlowRev = 0x16,
    FastFwd = 0x17,
    FastRev = 0x18,
    NoMedia = 0x19,
    Stop = 0x1a,
    SkipFwd = 0x1b,
    SkipRev = 0x1c,
    IndexSearchFwd = 0x1d,
    IndexSearchRev = 0x1e,
    Other = 0x1f,
}
/// used by [CecOpcode::SetOsdString]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum DisplayControl {
    Default = 0x00,
    UntilCleared = 0x40,
    Clear = 0x80,
}
/// used by [CecOpcode::MenuRequest]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum MenuRequestType {
    Activate = 0x00,
    Deactivate = 0x01,
    Query = 0x02,
}
/// used by [CecOpcode::Play]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum PlayMode {
    Fwd = 0x24,
    Rev = 0x20,
    Still = 0x25,
    FastFwdMin = 0x05,
    FastFwdMed = 0x06,
    FastFwdMax = 0x07,
    FastRevMin = 0x09,
    FastRevMed = 0x0a,
    FastRevMax = 0x0b,
    SlowFwdMin = 0x15,
    SlowFwdMed = 0x16,
    SlowFwdMax = 0x17,
    SlowRevMin = 0x19,
    SlowRevMed = 0x1a,
    SlowRevMax = 0x1b,
}
impl PlayMode {
    /// deck state a player ends up in
    pub fn deck_info(self) -> DeckInfo {
        use PlayMode::*;
        match self {
            Fwd => DeckInfo::Play,
            Rev => DeckInfo::PlayRev,
            Still => DeckInfo::Still,
            FastFwdMin | FastFwdMed | FastFwdMax => DeckInfo::FastFwd,
            FastRevMin | FastRevMed | FastRevMax => DeckInfo::FastRev,
            SlowFwdMin | SlowFwdMed | SlowFwdMax => DeckInfo::Slow,
            SlowRevMin | SlowRevMed | SlowRevMax => DeckInfo::SlowRev,
        }
    }
}
/// used by [CecOpcode::GiveDeckStatus] and [CecOpcode::GiveTunerDeviceStatus]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum StatusRequest {
    On = 1,
    Off = 2,
    Once = 3,
}

bitflags! {
    /// Repeat recording or don't (if zero)
    ///
    /// Payload of [CecOpcode::SetAnalogueTimer], [CecOpcode::SetDigitalTimer] or [CecOpcode::SetExtTimer]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RecordingSequence : u8 {
        const SUNDAY = 0x01;
        const MONDAY = 0x02;
        const TUESDAY = 0x04;
        const WEDNESDAY = 0x08;
        const THURSDAY = 0x10;
        const FRIDAY = 0x20;
        const SATURDAY = 0x40;
    }
}
impl RecordingSequence {
    /// bit for a weekday counted from sunday (0..7)
    #[inline]
    pub fn day(days_from_sunday: u8) -> Self {
        Self::from_bits_truncate(1 << (days_from_sunday % 7))
    }
}

// ---  Power Status Operand (pwr_state)  ---
/// Payload of [CecOpcode::ReportPowerStatus]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum CecPowerStatus {
    On = 0,
    Standby = 1,
    InTransitionStandbyToOn = 2,
    InTransitionOnToStandby = 3,
}
