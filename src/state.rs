//! Mutable state of the emulated device.

use crate::{
    config::FollowerConfig,
    operand::{TunedService, TunerDeviceInfo, TunerDisplayInfo},
    types::{CecLogicalAddress, CecPowerStatus, DeckInfo},
};
use log::info;
use std::time::{Duration, SystemTime};

/// Power status with the transition it came from.
///
/// Only On and Standby are stored. The transient values are derived
/// from the time of the last change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerState {
    status: CecPowerStatus,
    previous: CecPowerStatus,
    changed_at: Option<SystemTime>,
}

impl PowerState {
    pub fn new(on: bool) -> Self {
        let status = if on {
            CecPowerStatus::On
        } else {
            CecPowerStatus::Standby
        };
        Self {
            status,
            previous: status,
            changed_at: None,
        }
    }
    /// the status the device is in or moving to
    #[inline]
    pub fn current(&self) -> CecPowerStatus {
        self.status
    }
    #[inline]
    pub fn previous(&self) -> CecPowerStatus {
        self.previous
    }
    #[inline]
    pub fn changed_at(&self) -> Option<SystemTime> {
        self.changed_at
    }
    #[inline]
    pub fn is_on(&self) -> bool {
        self.status == CecPowerStatus::On
    }
    /// What to answer Give Device Power Status with at `now`.
    pub fn reported(&self, now: SystemTime, transition: Duration) -> CecPowerStatus {
        let in_transition = match self.changed_at {
            Some(at) => {
                self.previous != self.status
                    && now.duration_since(at).unwrap_or_default() < transition
            }
            None => false,
        };
        match (in_transition, self.status) {
            (true, CecPowerStatus::On) => CecPowerStatus::InTransitionStandbyToOn,
            (true, CecPowerStatus::Standby) => CecPowerStatus::InTransitionOnToStandby,
            (_, status) => status,
        }
    }
    /// Returns false if already in `status`.
    pub fn set(&mut self, status: CecPowerStatus, now: SystemTime) -> bool {
        if status == self.status {
            return false;
        }
        self.previous = self.status;
        self.status = status;
        self.changed_at = Some(now);
        true
    }
}

/// When a flood counter starts over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloodReset {
    /// any other message was received
    DifferentMessage,
    /// the flood window passed since the last identical message
    WindowElapsed,
    /// whatever happens first
    #[default]
    Either,
}
impl FloodReset {
    fn on_different(self) -> bool {
        matches!(self, FloodReset::DifferentMessage | FloodReset::Either)
    }
    fn on_window(self) -> bool {
        matches!(self, FloodReset::WindowElapsed | FloodReset::Either)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloodState {
    #[default]
    Quiet,
    /// this many identical messages were accepted
    Counting(u32),
    /// threshold exceeded, identical messages are dropped
    Suppressing,
}

/// Drops repeats of one kind of message once they exceed a threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodGuard {
    state: FloodState,
    last: Option<SystemTime>,
}

impl FloodGuard {
    #[inline]
    pub fn state(&self) -> FloodState {
        self.state
    }
    /**
     * Feed one received message to the guard.
     *
     * `guarded` tells if the message is of the kind this guard counts.
     * Returns true if the message has to be dropped.
     * A `threshold` of 0 disables the guard.
     */
    pub fn check(
        &mut self,
        guarded: bool,
        now: SystemTime,
        threshold: u32,
        window: Duration,
        reset: FloodReset,
    ) -> bool {
        if threshold == 0 {
            return false;
        }
        if !guarded {
            if reset.on_different() {
                *self = Self::default();
            }
            return false;
        }
        if let Some(last) = self.last {
            if reset.on_window() && now.duration_since(last).unwrap_or_default() >= window {
                self.state = FloodState::Quiet;
            }
        }
        self.last = Some(now);
        self.state = match self.state {
            FloodState::Quiet => FloodState::Counting(1),
            FloodState::Counting(n) if n >= threshold => FloodState::Suppressing,
            FloodState::Counting(n) => FloodState::Counting(n + 1),
            FloodState::Suppressing => FloodState::Suppressing,
        };
        self.state == FloodState::Suppressing
    }
}

/// A remote control key that is held down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcPress {
    pub ui_cmd: u8,
    /// last press or repeat
    pub pressed_at: SystemTime,
    pub hold_count: u32,
    /// time between all repeats
    pub duration_sum: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    /// (ms / 2) + 1
    pub video_latency: u8,
    pub low_latency_mode: bool,
    pub audio_out_compensated: u8,
    /// (ms / 2) + 1, valid with `audio_out_compensated` 3
    pub audio_out_delay: u8,
}
impl Default for Latency {
    fn default() -> Self {
        Self {
            video_latency: 10,
            low_latency_mode: true,
            audio_out_compensated: 3,
            audio_out_delay: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunerState {
    pub info: TunerDeviceInfo,
    /// position of the tuned service in the service table
    pub service_idx: usize,
    pub report_changes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckState {
    pub info: DeckInfo,
    /// where to send Deck Status on every change
    pub report_to: Option<CecLogicalAddress>,
    /// a skip is in progress
    pub skip_start: Option<SystemTime>,
}
impl Default for DeckState {
    fn default() -> Self {
        Self {
            info: DeckInfo::Stop,
            report_to: None,
            skip_start: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordState {
    /// one touch record or a timer is recording
    pub recording: bool,
    /// Standby arrived while recording. Applied once the recording ends.
    pub received_standby: bool,
    pub controlled_by_timer: bool,
    /// minutes of recording left on the medium
    pub media_space: u32,
}

/// Everything handlers may change
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub power: PowerState,
    pub active_source: Option<u16>,
    /// our menu is shown on the TV
    pub menu_active: bool,
    /// ISO 639-2
    pub menu_language: [u8; 3],
    pub latency: Latency,
    pub arc_active: bool,
    pub sac_active: bool,
    /// percent
    pub volume: u8,
    pub mute: bool,
    pub rc: Option<RcPress>,
    pub tuner: TunerState,
    pub deck: DeckState,
    pub record: RecordState,
    pub standby_guard: FloodGuard,
    pub view_on_guard: FloodGuard,
    pub last_aud_rate: Option<SystemTime>,
    pub last_power_toggle: Option<SystemTime>,
}

impl DeviceState {
    pub fn new(config: &FollowerConfig) -> Self {
        let service = config
            .services
            .first()
            .copied()
            .unwrap_or(TunedService::Analogue(crate::config::DEFAULT_ANALOGUE));
        let display = match service {
            TunedService::Analogue(_) => TunerDisplayInfo::Analogue,
            TunedService::Digital(_) => TunerDisplayInfo::Digital,
        };
        Self {
            power: PowerState::new(!config.standby_at_start),
            active_source: None,
            menu_active: false,
            menu_language: config.menu_language,
            latency: Latency::default(),
            arc_active: false,
            sac_active: false,
            volume: 50,
            mute: false,
            rc: None,
            tuner: TunerState {
                info: TunerDeviceInfo {
                    rec_flag: false,
                    display,
                    service,
                },
                service_idx: 0,
                report_changes: false,
            },
            deck: DeckState::default(),
            record: RecordState {
                media_space: config.media_space,
                ..Default::default()
            },
            standby_guard: FloodGuard::default(),
            view_on_guard: FloodGuard::default(),
            last_aud_rate: None,
            last_power_toggle: None,
        }
    }

    /// Go to standby if on. Returns true if the status changed.
    pub fn enter_standby(&mut self, now: SystemTime) -> bool {
        if !self.power.set(CecPowerStatus::Standby, now) {
            return false;
        }
        self.rc = None;
        self.deck.skip_start = None;
        self.record.received_standby = false;
        info!("changing state to standby");
        true
    }
    /// Standby as asked for by a peer. Waits for a running recording to end.
    pub fn request_standby(&mut self, now: SystemTime) {
        if self.record.recording {
            info!("standby deferred until the recording ends");
            self.record.received_standby = true;
        } else {
            self.enter_standby(now);
        }
    }
    /// Wake up if in standby. Returns true if the status changed.
    pub fn exit_standby(&mut self, now: SystemTime) -> bool {
        if !self.power.set(CecPowerStatus::On, now) {
            return false;
        }
        info!("changing state to on");
        true
    }
    /// volume byte of Report Audio Status
    pub fn audio_status(&self) -> u8 {
        (self.mute as u8) << 7 | self.volume.min(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ms: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
    }

    #[test]
    fn transition_is_reported_for_a_while() {
        let mut p = PowerState::new(false);
        let tr = Duration::from_secs(1);
        assert_eq!(p.reported(t(0), tr), CecPowerStatus::Standby);
        assert!(p.set(CecPowerStatus::On, t(100)));
        assert!(!p.set(CecPowerStatus::On, t(150)));
        assert_eq!(p.reported(t(500), tr), CecPowerStatus::InTransitionStandbyToOn);
        assert_eq!(p.reported(t(1100), tr), CecPowerStatus::On);
        assert!(p.set(CecPowerStatus::Standby, t(2000)));
        assert_eq!(p.previous(), CecPowerStatus::On);
        assert_eq!(p.reported(t(2001), tr), CecPowerStatus::InTransitionOnToStandby);
        assert_eq!(p.reported(t(2001), Duration::ZERO), CecPowerStatus::Standby);
    }

    #[test]
    fn flood_threshold_three() {
        let mut g = FloodGuard::default();
        let w = Duration::from_secs(1);
        let drops: Vec<bool> = (0..5)
            .map(|i| g.check(true, t(i * 100), 3, w, FloodReset::Either))
            .collect();
        assert_eq!(drops, vec![false, false, false, true, true]);
        assert_eq!(g.state(), FloodState::Suppressing);
    }

    #[test]
    fn flood_resets_on_other_message() {
        let mut g = FloodGuard::default();
        let w = Duration::from_secs(10);
        for i in 0..3 {
            assert!(!g.check(true, t(i), 3, w, FloodReset::DifferentMessage));
        }
        assert!(!g.check(false, t(5), 3, w, FloodReset::DifferentMessage));
        assert_eq!(g.state(), FloodState::Quiet);
        assert!(!g.check(true, t(6), 3, w, FloodReset::DifferentMessage));
        assert_eq!(g.state(), FloodState::Counting(1));

        // a window only policy ignores other messages
        let mut g = FloodGuard::default();
        for i in 0..3 {
            g.check(true, t(i), 3, w, FloodReset::WindowElapsed);
        }
        g.check(false, t(5), 3, w, FloodReset::WindowElapsed);
        assert!(g.check(true, t(6), 3, w, FloodReset::WindowElapsed));
    }

    #[test]
    fn flood_resets_after_window() {
        let mut g = FloodGuard::default();
        let w = Duration::from_secs(1);
        for i in 0..4 {
            g.check(true, t(i * 10), 3, w, FloodReset::WindowElapsed);
        }
        assert_eq!(g.state(), FloodState::Suppressing);
        // the window counts from the last identical message
        assert!(g.check(true, t(900), 3, w, FloodReset::WindowElapsed));
        assert!(!g.check(true, t(1900), 3, w, FloodReset::WindowElapsed));
        assert_eq!(g.state(), FloodState::Counting(1));
    }

    #[test]
    fn disabled_guard_never_drops() {
        let mut g = FloodGuard::default();
        for i in 0..10 {
            assert!(!g.check(true, t(i), 0, Duration::from_secs(1), FloodReset::Either));
        }
    }

    #[test]
    fn standby_clears_transient_state() {
        let mut s = DeviceState::new(&FollowerConfig::default());
        s.deck.skip_start = Some(t(0));
        s.rc = Some(RcPress {
            ui_cmd: 0x41,
            pressed_at: t(0),
            hold_count: 0,
            duration_sum: Duration::ZERO,
        });
        s.record.received_standby = true;
        assert!(s.enter_standby(t(10)));
        assert_eq!(s.deck.skip_start, None);
        assert_eq!(s.rc, None);
        assert!(!s.record.received_standby);
        assert!(!s.enter_standby(t(20)));
        assert!(s.exit_standby(t(30)));
    }
}
