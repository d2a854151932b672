use cec_follower::{
    state::{FloodReset, FloodState},
    CecAbortReason, CecLogAddrType, CecLogicalAddress, CecOpcode, CecPowerStatus, Clock, Error,
    Follower, FollowerConfig, Message, Transport,
};
use std::{
    cell::Cell,
    collections::VecDeque,
    io,
    time::{Duration, SystemTime},
};

/// Hands out queued frames, fails once they are used up.
#[derive(Default)]
struct Bus {
    rx: VecDeque<Message>,
    tx: Vec<Message>,
    broken_tx: bool,
}

impl Bus {
    fn with(frames: &[&[u8]]) -> Self {
        Self {
            rx: frames.iter().map(|f| Message::try_from(*f).unwrap()).collect(),
            ..Default::default()
        }
    }
    fn sent(&self) -> Vec<Vec<u8>> {
        self.tx.iter().map(|m| m.as_bytes().to_vec()).collect()
    }
}

impl Transport for Bus {
    fn receive(&mut self, _timeout: Duration) -> io::Result<Option<Message>> {
        match self.rx.pop_front() {
            Some(msg) => Ok(Some(msg)),
            None => Err(io::ErrorKind::UnexpectedEof.into()),
        }
    }
    fn send(&mut self, msg: &Message) -> io::Result<()> {
        if self.broken_tx {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.tx.push(msg.clone());
        Ok(())
    }
}

/// Moves forward by a fixed step every time it is read.
struct FakeClock {
    now: Cell<SystemTime>,
    tick: Duration,
}

impl FakeClock {
    fn new(tick: Duration) -> Self {
        // 2024-01-01 00:00 UTC
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);
        Self {
            now: Cell::new(start),
            tick,
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        let now = self.now.get();
        self.now.set(now + self.tick);
        now
    }
}

fn msg(bytes: &[u8]) -> Message {
    Message::try_from(bytes).unwrap()
}

#[test]
fn standby_reports_power_status() {
    let mut cfg = FollowerConfig::default();
    cfg.standby_at_start = true;
    let mut follower = Follower::new(cfg).unwrap();
    let mut bus = Bus::with(&[&[0x04, 0x8f]]);
    let clock = FakeClock::new(Duration::from_millis(10));

    follower.step(&mut bus, &clock).unwrap();
    assert_eq!(bus.sent(), vec![vec![0x40, 0x90, 0x01]]);
    assert_eq!(follower.state().power.current(), CecPowerStatus::Standby);
    assert_eq!(follower.state().power.changed_at(), None);
}

#[test]
fn audio_status_without_system_audio() {
    let mut follower = Follower::new(FollowerConfig::default()).unwrap();
    let out = follower.process(&msg(&[0x04, 0x71]), SystemTime::now());
    assert_eq!(out.len(), 1);
    assert!(matches!(out[0].opcode(), Some(Ok(CecOpcode::FeatureAbort))));
    assert_eq!(
        out[0].parameters(),
        &[u8::from(CecOpcode::GiveAudioStatus), u8::from(CecAbortReason::WrongMode)]
    );
}

#[test]
fn standby_flood_is_dropped() {
    let mut cfg = FollowerConfig::default();
    cfg.standby_flood = 3;
    let mut follower = Follower::new(cfg).unwrap();
    let standby: &[u8] = &[0x0f, 0x36];
    let mut bus = Bus::with(&[standby; 5]);
    let clock = FakeClock::new(Duration::from_millis(10));

    for _ in 0..3 {
        follower.step(&mut bus, &clock).unwrap();
    }
    assert_eq!(follower.state().standby_guard.state(), FloodState::Counting(3));
    let changed = follower.state().power.changed_at();
    assert!(changed.is_some());

    for _ in 0..2 {
        follower.step(&mut bus, &clock).unwrap();
    }
    assert_eq!(follower.state().standby_guard.state(), FloodState::Suppressing);
    assert_eq!(follower.state().power.current(), CecPowerStatus::Standby);
    assert_eq!(follower.state().power.changed_at(), changed);
    assert!(bus.tx.is_empty());
}

#[test]
fn dropped_standby_changes_nothing() {
    let mut cfg = FollowerConfig::default();
    cfg.standby_flood = 3;
    cfg.flood_reset = FloodReset::WindowElapsed;
    let mut follower = Follower::new(cfg).unwrap();
    let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);
    let at = |ms| start + Duration::from_millis(ms);

    for i in 0..3 {
        follower.process(&msg(&[0x0f, 0x36]), at(i * 100));
        assert!(!follower.state().power.is_on());
        // Power On Function key
        follower.process(&msg(&[0x04, 0x44, 0x6d]), at(i * 100 + 10));
        follower.process(&msg(&[0x04, 0x45]), at(i * 100 + 20));
        assert!(follower.state().power.is_on());
    }
    follower.process(&msg(&[0x0f, 0x36]), at(300));
    assert!(follower.state().power.is_on());

    // quiet long enough
    follower.process(&msg(&[0x0f, 0x36]), at(2000));
    assert!(!follower.state().power.is_on());
}

#[test]
fn conflicting_timer_keeps_the_first() {
    let mut follower = Follower::new(FollowerConfig::new(
        CecLogicalAddress::Record1,
        CecLogAddrType::RECORD,
        0x2000,
    ))
    .unwrap();
    let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);

    // Set Analogue Timer 1st of January 10:00 for 0:30 on 471.25 MHz
    let first = [0x01, 0x34, 1, 1, 0x10, 0x00, 0x00, 0x30, 0x00, 0x00, 0x1d, 0x74, 0x00];
    let out = follower.process(&msg(&first), now);
    assert_eq!(out.len(), 1);
    assert!(matches!(out[0].opcode(), Some(Ok(CecOpcode::TimerStatus))));
    assert_eq!(follower.timers().len(), 1);
    let before: Vec<_> = follower.timers().iter().map(|t| (t.start, t.duration)).collect();

    // 10:15 for 0:30 on another channel
    let second = [0x01, 0x34, 1, 1, 0x10, 0x15, 0x00, 0x30, 0x00, 0x00, 0x0a, 0xf4, 0x00];
    let out = follower.process(&msg(&second), now);
    assert_eq!(out.len(), 1);
    // overlap warning
    assert_eq!(out[0].parameters()[0] & 0x80, 0x80);

    let after: Vec<_> = follower.timers().iter().map(|t| (t.start, t.duration)).collect();
    assert_eq!(before, after);
    assert_eq!(after[0].1, Duration::from_secs(30 * 60));
}

#[test]
fn transport_errors_reach_the_caller() {
    let mut follower = Follower::new(FollowerConfig::default()).unwrap();
    let clock = FakeClock::new(Duration::from_millis(10));

    let mut bus = Bus::with(&[&[0x04, 0x9f]]);
    bus.broken_tx = true;
    let err = follower.step(&mut bus, &clock).unwrap_err();
    assert!(matches!(err, Error::Transport(e) if e.kind() == io::ErrorKind::BrokenPipe));

    let mut bus = Bus::with(&[&[0x04, 0x9f], &[0x04, 0x46]]);
    let err = follower.run(&mut bus, &clock).unwrap_err();
    assert!(matches!(err, Error::Transport(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    assert_eq!(bus.tx.len(), 2);
}

#[test]
fn two_devices_one_process() {
    let mut tv = Follower::new(FollowerConfig::new(
        CecLogicalAddress::Tv,
        CecLogAddrType::TV,
        0,
    ))
    .unwrap();
    let mut player = Follower::new(FollowerConfig::default()).unwrap();
    let now = SystemTime::now();

    // the TV asks, the player answers, the TV learns the address
    let out = player.process(&msg(&[0x04, 0x83]), now);
    assert_eq!(out.len(), 1);
    assert!(tv.process(&out[0], now).is_empty());
    let peer = tv.peers().get(CecLogicalAddress::Playback1).unwrap();
    assert_eq!(peer.phys_addr, Some(0x1000));
    assert!(player.peers().get(CecLogicalAddress::Tv).is_some());
}
