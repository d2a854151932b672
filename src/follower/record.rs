//! One Touch Record.

use super::Ctx;
use crate::{
    config::Features,
    message::Message,
    operand::{RecordSource, RecordStatus, TunedService},
    types::{CecAbortReason, CecLogAddrType, CecOpcode, DeckInfo},
};
use log::{debug, info};

fn status(ctx: &mut Ctx, msg: &Message, status: RecordStatus) {
    ctx.reply(msg, CecOpcode::RecordStatus, &[status.into()]);
}

/// What a recorder answers to Record On from `source`.
/// `Err` for sources it does not know.
fn check_source(ctx: &Ctx, source: &RecordSource) -> Result<RecordStatus, CecAbortReason> {
    let known = |svc: TunedService| ctx.cfg.services.contains(&svc);
    Ok(match *source {
        RecordSource::Own => RecordStatus::CurSrc,
        RecordSource::Digital(id) if known(TunedService::Digital(id)) => RecordStatus::DigService,
        RecordSource::Analogue(svc) if known(TunedService::Analogue(svc)) => {
            RecordStatus::AnaService
        }
        RecordSource::Digital(_) | RecordSource::Analogue(_) => {
            return Err(CecAbortReason::InvalidOp)
        }
        RecordSource::ExtPlug(0) => RecordStatus::InvalidExtPlug,
        RecordSource::ExtPhysAddr(0xffff) => RecordStatus::InvalidExtPhysAddr,
        RecordSource::ExtPlug(_) | RecordSource::ExtPhysAddr(_) => RecordStatus::ExtInput,
    })
}

fn record_on(ctx: &mut Ctx, msg: &Message) -> Result<(), CecAbortReason> {
    let source = RecordSource::parse(&mut msg.operands())?;
    if ctx.state.record.recording {
        status(ctx, msg, RecordStatus::AlreadyRecording);
        return Ok(());
    }
    let result = check_source(ctx, &source)?;
    let result = if ctx.state.deck.info == DeckInfo::NoMedia {
        RecordStatus::NoMedia
    } else if ctx.state.record.media_space == 0 {
        RecordStatus::NoSpace
    } else {
        result
    };
    let started = matches!(
        result,
        RecordStatus::CurSrc
            | RecordStatus::DigService
            | RecordStatus::AnaService
            | RecordStatus::ExtInput
    );
    if started {
        ctx.state.exit_standby(ctx.now);
        let tuned = match source {
            RecordSource::Digital(id) => Some(TunedService::Digital(id)),
            RecordSource::Analogue(svc) => Some(TunedService::Analogue(svc)),
            _ => None,
        };
        let tuner = &mut ctx.state.tuner;
        if let Some(svc) = tuned {
            if let Some(idx) = ctx.cfg.services.iter().position(|s| *s == svc) {
                tuner.service_idx = idx;
                tuner.info.service = svc;
            }
        }
        tuner.info.rec_flag = true;
        ctx.state.record.recording = true;
        ctx.state.record.controlled_by_timer = false;
        info!("recording {:?}", source);
    }
    status(ctx, msg, result);
    Ok(())
}

fn record_off(ctx: &mut Ctx, msg: &Message) -> Result<(), CecAbortReason> {
    let rec = ctx.state.record;
    if !rec.recording {
        status(ctx, msg, RecordStatus::AlreadyTerm);
        return Ok(());
    }
    if rec.controlled_by_timer {
        return Err(CecAbortReason::Refused);
    }
    ctx.state.record.recording = false;
    ctx.state.tuner.info.rec_flag = false;
    info!("recording stopped");
    status(ctx, msg, RecordStatus::TerminatedOk);
    if rec.received_standby {
        ctx.state.enter_standby(ctx.now);
    }
    Ok(())
}

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    match op {
        CecOpcode::RecordOn if ctx.is(CecLogAddrType::RECORD) => record_on(ctx, msg),
        CecOpcode::RecordOff if ctx.is(CecLogAddrType::RECORD) => record_off(ctx, msg),
        CecOpcode::RecordStatus => {
            let st = msg.operands().u8()?;
            debug!("{:?} record status {:#04x}", msg.initiator(), st);
            Ok(())
        }
        CecOpcode::RecordTvScreen
            if ctx.is(CecLogAddrType::TV)
                && ctx.cfg.features.contains(Features::RECORD_TV_SCREEN) =>
        {
            let source = match ctx.state.tuner.info.service {
                TunedService::Analogue(svc) => RecordSource::Analogue(svc),
                TunedService::Digital(id) => RecordSource::Digital(id),
            };
            let mut data = Vec::new();
            source.encode(&mut data);
            ctx.reply(msg, CecOpcode::RecordOn, &data);
            Ok(())
        }
        _ => Err(CecAbortReason::Unrecognized),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use crate::{
        config::{Features, FollowerConfig},
        follower::Follower,
        types::{CecLogAddrType, CecLogicalAddress, CecPowerStatus},
    };

    fn recorder() -> Follower {
        follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD)
    }

    #[test]
    fn one_touch_record() {
        let mut r = recorder();
        let out = r.process(&msg(&[0x01, 0x09, 0x01]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x01]]);
        assert!(r.state().record.recording);
        assert!(r.state().tuner.info.rec_flag);

        let out = r.process(&msg(&[0x01, 0x09, 0x01]), t(10));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x12]]);

        let out = r.process(&msg(&[0x01, 0x0b]), t(20));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x1a]]);
        assert!(!r.state().record.recording);
        let out = r.process(&msg(&[0x01, 0x0b]), t(30));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x1b]]);
    }

    #[test]
    fn external_sources() {
        let mut r = recorder();
        let out = r.process(&msg(&[0x01, 0x09, 0x04, 0x00]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x09]]);
        let out = r.process(&msg(&[0x01, 0x09, 0x05, 0xff, 0xff]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x0a]]);
        assert!(!r.state().record.recording);
        let out = r.process(&msg(&[0x01, 0x09, 0x04, 0x02]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x04]]);
    }

    #[test]
    fn no_space_left() {
        let mut cfg = FollowerConfig::new(CecLogicalAddress::Record1, CecLogAddrType::RECORD, 0x1000);
        cfg.media_space = 0;
        let mut r = Follower::new(cfg).unwrap();
        let out = r.process(&msg(&[0x01, 0x09, 0x01]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x0a, 0x16]]);
    }

    #[test]
    fn standby_waits_for_the_recording() {
        let mut r = recorder();
        r.process(&msg(&[0x01, 0x09, 0x01]), t(0));
        r.process(&msg(&[0x0f, 0x36]), t(10));
        assert_eq!(r.state().power.current(), CecPowerStatus::On);
        assert!(r.state().record.received_standby);
        r.process(&msg(&[0x01, 0x0b]), t(20));
        assert_eq!(r.state().power.current(), CecPowerStatus::Standby);
    }

    #[test]
    fn record_tv_screen() {
        let mut cfg = FollowerConfig::new(CecLogicalAddress::Tv, CecLogAddrType::TV, 0);
        cfg.features = Features::RECORD_TV_SCREEN;
        let mut tv = Follower::new(cfg).unwrap();
        let out = tv.process(&msg(&[0x10, 0x0f]), t(0));
        assert_eq!(
            bytes(&out),
            vec![vec![0x01, 0x09, 0x03, 0x00, 0x1d, 0x74, 0x00]]
        );
        let mut p = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        let out = p.process(&msg(&[0x14, 0x0f]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x41, 0x00, 0x0f, 0x00]]);
    }
}
