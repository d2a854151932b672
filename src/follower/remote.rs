//! Remote Control Pass Through.

use super::{elapsed, Ctx};
use crate::{
    message::Message,
    state::RcPress,
    types::{CecAbortReason, CecLogAddrType, CecOpcode, CecUserControlCode},
};
use log::{debug, info};
use std::time::Duration;

fn power_key(ctx: &mut Ctx, code: CecUserControlCode) {
    let now = ctx.now;
    let s = &mut *ctx.state;
    match code {
        CecUserControlCode::Power | CecUserControlCode::PowerToggleFunction => {
            if s.record.received_standby {
                info!("deferred standby cancelled");
                s.record.received_standby = false;
            } else if s.power.is_on() {
                s.request_standby(now);
            } else {
                s.exit_standby(now);
            }
        }
        CecUserControlCode::PowerOffFunction => s.request_standby(now),
        CecUserControlCode::PowerOnFunction => {
            s.record.received_standby = false;
            s.exit_standby(now);
        }
        _ => {}
    }
}

/// Returns true if the key changed volume or mute.
fn volume_key(ctx: &mut Ctx, code: CecUserControlCode) -> bool {
    let s = &mut *ctx.state;
    match code {
        CecUserControlCode::VolumeUp => {
            s.volume = (s.volume + 1).min(100);
            s.mute = false;
        }
        CecUserControlCode::VolumeDown => {
            s.volume = s.volume.saturating_sub(1);
            s.mute = false;
        }
        CecUserControlCode::Mute => s.mute = !s.mute,
        CecUserControlCode::MuteFunction => s.mute = true,
        CecUserControlCode::RestoreVolumeFunction => s.mute = false,
        _ => return false,
    }
    true
}

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    match op {
        CecOpcode::UserControlPressed => {
            let cmd = msg.operands().u8()?;
            let now = ctx.now;
            let repeat = matches!(ctx.state.rc, Some(press) if press.ui_cmd == cmd);
            let code = CecUserControlCode::try_from(cmd).ok();
            // standby clears the held key, act before storing it
            if let (Some(code), false) = (code, repeat) {
                power_key(ctx, code);
            }
            match &mut ctx.state.rc {
                Some(press) if repeat => {
                    press.hold_count += 1;
                    press.duration_sum += elapsed(now, press.pressed_at);
                    press.pressed_at = now;
                }
                rc => {
                    *rc = Some(RcPress {
                        ui_cmd: cmd,
                        pressed_at: now,
                        hold_count: 0,
                        duration_sum: Duration::ZERO,
                    })
                }
            }
            let Some(code) = code else {
                debug!("unknown key {:#04x}", cmd);
                return Ok(());
            };
            debug!("key {:?}{}", code, if repeat { " repeat" } else { "" });
            if ctx.is(CecLogAddrType::AUDIOSYSTEM) && volume_key(ctx, code) && ctx.state.sac_active
            {
                let status = ctx.state.audio_status();
                ctx.reply(msg, CecOpcode::ReportAudioStatus, &[status]);
            }
        }
        CecOpcode::UserControlReleased => match ctx.state.rc.take() {
            Some(press) if press.hold_count > 0 => info!(
                "key {:#04x} held for {} repeats, every {:?}",
                press.ui_cmd,
                press.hold_count,
                press.duration_sum / press.hold_count
            ),
            Some(press) => debug!("key {:#04x} released", press.ui_cmd),
            None => debug!("release without press"),
        },
        _ => return Err(CecAbortReason::Unrecognized),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use crate::{
        config::FollowerConfig,
        follower::Follower,
        types::{CecLogAddrType, CecLogicalAddress},
    };
    use std::time::Duration;

    #[test]
    fn power_toggles_once_per_press() {
        let mut p = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        p.process(&msg(&[0x04, 0x44, 0x40]), t(0));
        assert!(!p.state().power.is_on());
        p.process(&msg(&[0x04, 0x44, 0x40]), t(400));
        p.process(&msg(&[0x04, 0x44, 0x40]), t(800));
        assert!(!p.state().power.is_on());
        let press = p.state().rc.unwrap();
        assert_eq!(press.hold_count, 2);
        assert_eq!(press.duration_sum, Duration::from_millis(800));
        p.process(&msg(&[0x04, 0x45]), t(900));
        assert_eq!(p.state().rc, None);
        p.process(&msg(&[0x04, 0x44, 0x40]), t(1000));
        assert!(p.state().power.is_on());
    }

    #[test]
    fn held_key_is_released_by_timeout() {
        let mut p = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        p.process(&msg(&[0x04, 0x44, 0x6c]), t(0));
        assert!(p.state().rc.is_some());
        p.poll(t(500));
        assert!(p.state().rc.is_some());
        p.poll(t(550));
        assert_eq!(p.state().rc, None);
        p.process(&msg(&[0x04, 0x44, 0x6d]), t(600));
        assert!(p.state().power.is_on());
    }

    #[test]
    fn volume_keys_report_with_system_audio() {
        let cfg = FollowerConfig::new(
            CecLogicalAddress::Audiosystem,
            CecLogAddrType::AUDIOSYSTEM,
            0x1000,
        );
        let mut a = Follower::new(cfg).unwrap();
        assert!(a.process(&msg(&[0x05, 0x44, 0x41]), t(0)).is_empty());
        assert_eq!(a.state().volume, 51);
        a.process(&msg(&[0x05, 0x70, 0x00, 0x00]), t(10));
        let out = a.process(&msg(&[0x05, 0x44, 0x43]), t(20));
        assert_eq!(bytes(&out), vec![vec![0x50, 0x7a, 0x80 | 51]]);
    }

    #[test]
    fn power_keys_wait_for_the_recording() {
        let mut r = follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD);
        r.process(&msg(&[0x01, 0x09, 0x01]), t(0));
        assert!(r.state().record.recording);
        // Power Off Function
        r.process(&msg(&[0x01, 0x44, 0x6c]), t(10));
        r.process(&msg(&[0x01, 0x45]), t(20));
        assert!(r.state().power.is_on());
        assert!(r.state().record.received_standby);
        // Power toggles the deferred standby off again
        r.process(&msg(&[0x01, 0x44, 0x40]), t(30));
        r.process(&msg(&[0x01, 0x45]), t(40));
        assert!(!r.state().record.received_standby);
        r.process(&msg(&[0x01, 0x44, 0x40]), t(50));
        r.process(&msg(&[0x01, 0x45]), t(60));
        assert!(r.state().record.received_standby);
        // Record Off
        r.process(&msg(&[0x01, 0x0b]), t(70));
        assert!(!r.state().power.is_on());
    }

    #[test]
    fn missing_key_is_invalid() {
        let mut p = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        let out = p.process(&msg(&[0x04, 0x44]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x40, 0x00, 0x44, 0x03]]);
    }
}
