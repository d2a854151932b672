/*!
 * The protocol state machine.
 *
 * A [Follower] owns the device state, the programmed timers and what it learned
 * about its peers. Feed it received messages with [Follower::process] and call
 * [Follower::poll] regularly. Both return the messages to transmit.
 */
mod audio;
mod deck;
mod power;
mod programming;
mod record;
mod remote;
mod system;
mod tuner;

use crate::{
    config::FollowerConfig,
    error::Result,
    message::Message,
    peer::PeerTable,
    state::DeviceState,
    timer::{Insert, TimerSet},
    transport::{Clock, Transport},
    types::{Addressing, CecAbortReason, CecLogAddrType, CecLogicalAddress, CecOpcode},
};
use log::{debug, info, warn};
use std::{
    fmt,
    time::{Duration, SystemTime},
};

/// a held key is released if not repeated within this time
const RC_RELEASE_TIMEOUT: Duration = Duration::from_millis(550);
/// a skip returns to play after this time
const DECK_SKIP_TIMEOUT: Duration = Duration::from_secs(2);
/// Set Audio Rate has to be repeated within this time
const AUDIO_RATE_TIMEOUT: Duration = Duration::from_secs(2);

#[inline]
pub(crate) fn elapsed(now: SystemTime, since: SystemTime) -> Duration {
    now.duration_since(since).unwrap_or_default()
}

/// What a handler may look at and change while processing one message.
pub(crate) struct Ctx<'a> {
    pub cfg: &'a FollowerConfig,
    pub state: &'a mut DeviceState,
    pub timers: &'a mut TimerSet,
    warnings: &'a mut u32,
    out: &'a mut Vec<Message>,
    /// the address that was addressed, or the primary one for broadcasts
    pub me: CecLogicalAddress,
    pub kind: CecLogAddrType,
    pub now: SystemTime,
}

impl Ctx<'_> {
    pub fn send(&mut self, to: CecLogicalAddress, opcode: CecOpcode, data: &[u8]) {
        self.out
            .push(Message::with_operands(self.me, to, opcode, data));
    }
    pub fn reply(&mut self, msg: &Message, opcode: CecOpcode, data: &[u8]) {
        self.send(msg.initiator(), opcode, data);
    }
    pub fn broadcast(&mut self, opcode: CecOpcode, data: &[u8]) {
        self.send(CecLogicalAddress::UnregisteredBroadcast, opcode, data);
    }
    /// a peer did something it should not have
    pub fn warn(&mut self, args: fmt::Arguments) {
        *self.warnings += 1;
        warn!("{}", args);
    }
    #[inline]
    pub fn is(&self, kind: CecLogAddrType) -> bool {
        self.kind == kind
    }
}

/// An emulated CEC device
#[derive(Debug)]
pub struct Follower {
    config: FollowerConfig,
    state: DeviceState,
    timers: TimerSet,
    peers: PeerTable,
    warnings: u32,
}

impl Follower {
    pub fn new(config: FollowerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: DeviceState::new(&config),
            config,
            timers: TimerSet::new(),
            peers: PeerTable::new(),
            warnings: 0,
        })
    }
    #[inline]
    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }
    #[inline]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }
    #[inline]
    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }
    #[inline]
    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }
    /// number of protocol violations seen so far
    #[inline]
    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    fn warn(&mut self, args: fmt::Arguments) {
        self.warnings += 1;
        warn!("{}", args);
    }

    fn ctx<'a>(
        &'a mut self,
        me: CecLogicalAddress,
        kind: CecLogAddrType,
        now: SystemTime,
        out: &'a mut Vec<Message>,
    ) -> Ctx<'a> {
        Ctx {
            cfg: &self.config,
            state: &mut self.state,
            timers: &mut self.timers,
            warnings: &mut self.warnings,
            out,
            me,
            kind,
            now,
        }
    }

    /// first of our addresses whose type passes `f`
    fn la_with(
        &self,
        f: impl Fn(CecLogAddrType) -> bool,
    ) -> Option<(CecLogicalAddress, CecLogAddrType)> {
        self.config
            .logical_addresses
            .iter()
            .copied()
            .find(|(_, kind)| f(*kind))
    }

    /**
     * Handle one received message and return the replies.
     *
     * Polls, our own messages and messages for other devices are ignored.
     * Broadcasts are handled once, by the first configured address.
     */
    pub fn process(&mut self, msg: &Message, now: SystemTime) -> Vec<Message> {
        let mut out = Vec::new();
        let Some(raw_op) = msg.raw_opcode() else {
            return out;
        };
        let from = msg.initiator();
        if self.config.la_mask().has(from) {
            return out;
        }
        let addressed = if msg.is_broadcast() {
            self.config.logical_addresses.first().copied()
        } else {
            self.config
                .kind_of(msg.destination())
                .map(|kind| (msg.destination(), kind))
        };
        let Some((me, kind)) = addressed else {
            return out;
        };
        debug!("rx {:?}", msg);

        let phys = if raw_op == u8::from(CecOpcode::ReportPhysicalAddr) {
            msg.operands().u16().ok()
        } else {
            None
        };
        self.peers.touch(from, now, phys);

        if self.config.ignore_la.has(from) || self.config.ignores(raw_op, from) {
            debug!("ignoring {:?}", msg);
            return out;
        }

        // only broadcast Standby is flood guarded
        let standby = raw_op == u8::from(CecOpcode::Standby) && msg.is_broadcast();
        let view_on = raw_op == u8::from(CecOpcode::ImageViewOn)
            || raw_op == u8::from(CecOpcode::TextViewOn);
        let cfg = &self.config;
        let flood_standby = self.state.standby_guard.check(
            standby,
            now,
            cfg.standby_flood,
            cfg.flood_window,
            cfg.flood_reset,
        );
        let flood_view_on = self.state.view_on_guard.check(
            view_on,
            now,
            cfg.view_on_flood,
            cfg.flood_window,
            cfg.flood_reset,
        );
        if flood_standby || flood_view_on {
            info!("dropping repeated {:?}", msg);
            return out;
        }

        let op = match CecOpcode::try_from(raw_op) {
            Ok(op) => op,
            Err(_) => {
                if !msg.is_broadcast() {
                    self.feature_abort(msg, CecAbortReason::Unrecognized, now, &mut out);
                }
                return out;
            }
        };
        match (op.addressing(), msg.is_broadcast()) {
            (Addressing::Directed, true) => {
                self.warn(format_args!("{:?} from {:?} must not be broadcast", op, from));
                return out;
            }
            (Addressing::Broadcast, false) => {
                self.warn(format_args!("{:?} from {:?} must be broadcast", op, from));
                return out;
            }
            _ => {}
        }

        let res = dispatch(&mut self.ctx(me, kind, now, &mut out), msg, op);
        if let Err(reason) = res {
            if reason == CecAbortReason::InvalidOp {
                self.warn(format_args!("invalid operand in {:?}", msg));
            }
            if !msg.is_broadcast() {
                self.feature_abort(msg, reason, now, &mut out);
            }
        }
        out
    }

    fn feature_abort(
        &mut self,
        msg: &Message,
        reason: CecAbortReason,
        now: SystemTime,
        out: &mut Vec<Message>,
    ) {
        let from = msg.initiator();
        if from.is_broadcast() {
            // Unregistered can not be answered without broadcasting
            debug!("not aborting {:?}: {:?}", msg, reason);
            return;
        }
        let opcode = msg.raw_opcode().unwrap_or_default();
        if self.peers.should_suppress_abort(
                from,
                opcode,
                now,
                self.config.abort_window,
                self.config.abort_max,
            )
        {
            self.warn(format_args!(
                "{:?} repeats opcode {:#04x} after Feature Abort",
                from, opcode
            ));
            return;
        }
        debug!("feature abort {:?}: {:?}", msg, reason);
        out.push(Message::feature_abort(msg, reason));
    }

    /**
     * Work that depends on time only.
     *
     * Starts and ends timer recordings, toggles the power status if configured,
     * releases held keys, ends deck skips and checks the audio rate keep alive.
     */
    pub fn poll(&mut self, now: SystemTime) -> Vec<Message> {
        let mut out = Vec::new();
        self.poll_timers(now);

        if let Some(interval) = self.config.toggle_power {
            let last = *self.state.last_power_toggle.get_or_insert(now);
            if elapsed(now, last) >= interval {
                if !self.state.enter_standby(now) {
                    self.state.exit_standby(now);
                }
                self.state.last_power_toggle = Some(now);
            }
        }

        if let Some(press) = self.state.rc {
            if elapsed(now, press.pressed_at) >= RC_RELEASE_TIMEOUT {
                info!("key {:#04x} released by timeout", press.ui_cmd);
                self.state.rc = None;
            }
        }

        if let Some(start) = self.state.deck.skip_start {
            if elapsed(now, start) >= DECK_SKIP_TIMEOUT {
                self.state.deck.skip_start = None;
                let deck = self.la_with(|k| {
                    matches!(k, CecLogAddrType::PLAYBACK | CecLogAddrType::RECORD)
                });
                if let Some((me, kind)) = deck {
                    deck::update(
                        &mut self.ctx(me, kind, now, &mut out),
                        crate::types::DeckInfo::Play,
                    );
                }
            }
        }

        if let Some(last) = self.state.last_aud_rate {
            if elapsed(now, last) > AUDIO_RATE_TIMEOUT {
                self.state.last_aud_rate = None;
                self.warn(format_args!(
                    "Set Audio Rate was not repeated within {:?}",
                    AUDIO_RATE_TIMEOUT
                ));
            }
        }
        out
    }

    fn poll_timers(&mut self, now: SystemTime) {
        for timer in self.timers.expired(now) {
            if self.state.record.controlled_by_timer {
                let rec = &mut self.state.record;
                rec.recording = false;
                rec.controlled_by_timer = false;
                rec.media_space = rec
                    .media_space
                    .saturating_sub((timer.duration.as_secs() / 60) as u32);
                self.state.tuner.info.rec_flag = false;
                info!("timer recording finished, {} min left", rec.media_space);
                if self.state.record.received_standby {
                    self.state.enter_standby(now);
                }
            }
            if let Some(next) = timer.next_occurrence() {
                match self.timers.insert(next) {
                    Insert::Accepted => info!("repeating timer armed for {:?}", next.start),
                    Insert::Conflict(other) => {
                        info!("repeating timer dropped, overlaps {:?}", other.start)
                    }
                }
            }
        }
        if self.state.record.recording {
            return;
        }
        if let Some(timer) = self.timers.active(now).copied() {
            self.state.exit_standby(now);
            let rec = &mut self.state.record;
            rec.recording = true;
            rec.controlled_by_timer = true;
            self.state.tuner.info.rec_flag = true;
            info!("timer recording of {:?} started", timer.source);
        }
    }

    /// Wait up to the poll interval for one message, handle it and poll.
    pub fn step<T: Transport + ?Sized, C: Clock + ?Sized>(
        &mut self,
        transport: &mut T,
        clock: &C,
    ) -> Result<()> {
        if let Some(msg) = transport.receive(self.config.poll_interval)? {
            let replies = self.process(&msg, clock.now());
            send_all(transport, &replies)?;
        }
        let msgs = self.poll(clock.now());
        send_all(transport, &msgs)
    }

    /// [Follower::step] until the transport fails
    pub fn run<T: Transport + ?Sized, C: Clock + ?Sized>(
        &mut self,
        transport: &mut T,
        clock: &C,
    ) -> Result<()> {
        info!(
            "following as {:?} at {:#06x}",
            self.config.logical_addresses, self.config.phys_addr
        );
        loop {
            self.step(transport, clock)?;
        }
    }
}

fn send_all<T: Transport + ?Sized>(transport: &mut T, msgs: &[Message]) -> Result<()> {
    for msg in msgs {
        debug!("tx {:?}", msg);
        transport.send(msg)?;
    }
    Ok(())
}

fn dispatch(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> std::result::Result<(), CecAbortReason> {
    use CecOpcode::*;
    match op {
        GiveDevicePowerStatus | ReportPowerStatus | Standby | ImageViewOn | TextViewOn => {
            power::process(ctx, msg, op)
        }
        InitiateArc | TerminateArc | RequestArcInitiation | RequestArcTermination
        | ReportArcInitiated | ReportArcTerminated | GiveAudioStatus | ReportAudioStatus
        | GiveSystemAudioModeStatus | SystemAudioModeStatus | SystemAudioModeRequest
        | SetSystemAudioMode | RequestShortAudioDescriptor | ReportShortAudioDescriptor
        | SetAudioRate | SetAudioVolumeLevel | RequestCurrentLatency | ReportCurrentLatency => {
            audio::process(ctx, msg, op)
        }
        GiveTunerDeviceStatus | TunerDeviceStatus | SelectAnalogueService
        | SelectDigitalService | TunerStepIncrement | TunerStepDecrement => {
            tuner::process(ctx, msg, op)
        }
        RecordOn | RecordOff | RecordStatus | RecordTvScreen => record::process(ctx, msg, op),
        SetAnalogueTimer | SetDigitalTimer | SetExtTimer | ClearAnalogueTimer
        | ClearDigitalTimer | ClearExtTimer | SetTimerProgramTitle | TimerStatus
        | TimerClearedStatus => programming::process(ctx, msg, op),
        GiveDeckStatus | DeckStatus | DeckControl | Play => deck::process(ctx, msg, op),
        UserControlPressed | UserControlReleased => remote::process(ctx, msg, op),
        _ => system::process(ctx, msg, op),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{state::FloodState, types::CecPowerStatus};

    pub fn t(ms: u64) -> SystemTime {
        // 2024-01-01 00:00 UTC
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200) + Duration::from_millis(ms)
    }
    pub fn msg(bytes: &[u8]) -> Message {
        Message::try_from(bytes).unwrap()
    }
    pub fn bytes(out: &[Message]) -> Vec<Vec<u8>> {
        out.iter().map(|m| m.as_bytes().to_vec()).collect()
    }
    pub fn follower(la: CecLogicalAddress, kind: CecLogAddrType) -> Follower {
        Follower::new(FollowerConfig::new(la, kind, 0x1000)).unwrap()
    }

    #[test]
    fn ignores_polls_echoes_and_other_addresses() {
        let mut f = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        assert!(f.process(&msg(&[0x04]), t(0)).is_empty());
        assert!(f.process(&msg(&[0x40, 0x8f]), t(0)).is_empty());
        assert!(f.process(&msg(&[0x08, 0x8f]), t(0)).is_empty());
        assert!(f.peers().get(CecLogicalAddress::Tv).is_none());
    }

    #[test]
    fn unknown_opcode() {
        let mut f = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        let out = f.process(&msg(&[0x04, 0xee]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x40, 0x00, 0xee, 0x00]]);
        assert!(f.process(&msg(&[0x0f, 0xee]), t(0)).is_empty());
    }

    #[test]
    fn unregistered_is_never_aborted() {
        let mut f = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        assert!(f.process(&msg(&[0xf4, 0xee]), t(0)).is_empty());
        // Give Audio Status is refused by a player
        assert!(f.process(&msg(&[0xf4, 0x71]), t(10)).is_empty());
        assert_eq!(f.process(&msg(&[0x04, 0x71]), t(20)).len(), 1);
        assert_eq!(f.warnings(), 0);
    }

    #[test]
    fn directed_standby_is_not_flood_guarded() {
        let mut cfg = FollowerConfig::default();
        cfg.standby_flood = 3;
        let mut f = Follower::new(cfg).unwrap();
        for i in 0..5 {
            f.process(&msg(&[0x04, 0x36]), t(i * 100));
            assert!(!f.state().power.is_on());
            assert_eq!(f.state().standby_guard.state(), FloodState::Quiet);
            // Power On Function key
            f.process(&msg(&[0x04, 0x44, 0x6d]), t(i * 100 + 10));
            f.process(&msg(&[0x04, 0x45]), t(i * 100 + 20));
            assert!(f.state().power.is_on());
        }
    }

    #[test]
    fn abort_rate_limit() {
        let mut f = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        let m = msg(&[0x04, 0xee]);
        for i in 0..3 {
            assert_eq!(f.process(&m, t(i * 10)).len(), 1);
        }
        assert!(f.process(&m, t(40)).is_empty());
        assert_eq!(f.warnings(), 1);
        assert_eq!(f.process(&m, t(2000)).len(), 1);
    }

    #[test]
    fn wrong_addressing_is_dropped() {
        let mut f = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        assert!(f.process(&msg(&[0x0f, 0x8f]), t(0)).is_empty());
        assert!(f.process(&msg(&[0x04, 0x82, 0x10, 0x00]), t(0)).is_empty());
        assert_eq!(f.warnings(), 2);
    }

    #[test]
    fn ignore_lists() {
        let mut cfg = FollowerConfig::default();
        cfg.ignore_la = crate::CecLogAddrMask::Tuner1;
        cfg.ignore_opcode_from(0x8f, crate::CecLogAddrMask::Tv);
        let mut f = Follower::new(cfg).unwrap();
        assert!(f.process(&msg(&[0x34, 0x8f]), t(0)).is_empty());
        assert!(f.process(&msg(&[0x04, 0x8f]), t(0)).is_empty());
        assert_eq!(f.process(&msg(&[0x54, 0x8f]), t(0)).len(), 1);
        // still seen
        assert!(f.peers().get(CecLogicalAddress::Tuner1).is_some());
    }

    #[test]
    fn report_physical_address_is_remembered() {
        let mut f = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        f.process(&msg(&[0x5f, 0x84, 0x20, 0x00, 0x05]), t(0));
        assert_eq!(f.peers().phys_addr(CecLogicalAddress::Audiosystem), Some(0x2000));
    }

    #[test]
    fn power_toggle() {
        let mut cfg = FollowerConfig::default();
        cfg.toggle_power = Some(Duration::from_secs(10));
        let mut f = Follower::new(cfg).unwrap();
        f.poll(t(0));
        assert!(f.state().power.is_on());
        f.poll(t(10_000));
        assert_eq!(f.state().power.current(), CecPowerStatus::Standby);
        f.poll(t(15_000));
        assert_eq!(f.state().power.current(), CecPowerStatus::Standby);
        f.poll(t(20_000));
        assert!(f.state().power.is_on());
    }
}
