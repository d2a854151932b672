//! Audio Return Channel, System Audio Control, audio rate and latency.

use super::Ctx;
use crate::{
    config::Features,
    message::Message,
    operand::AudioRate,
    sad::AudioFormatId,
    types::{CecAbortReason, CecLogAddrType, CecLogicalAddress, CecOpcode},
};
use log::{debug, info};

/// Set Audio Volume Level: leave the volume as it is
const VOLUME_UNKNOWN: u8 = 0x7f;

fn require(ctx: &Ctx, kind: CecLogAddrType, feature: Features) -> Result<(), CecAbortReason> {
    if ctx.is(kind) && ctx.cfg.features.contains(feature) {
        Ok(())
    } else {
        Err(CecAbortReason::Unrecognized)
    }
}

fn on_off(msg: &Message) -> Result<bool, CecAbortReason> {
    match msg.operands().u8()? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(CecAbortReason::InvalidOp),
    }
}

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    use CecOpcode::*;
    match op {
        /* Audio Return Channel */
        InitiateArc | TerminateArc => {
            require(ctx, CecLogAddrType::AUDIOSYSTEM, Features::ARC_RX)?;
            let start = op == InitiateArc;
            ctx.state.arc_active = start;
            info!("ARC {}", if start { "started" } else { "stopped" });
            let report = if start {
                ReportArcInitiated
            } else {
                ReportArcTerminated
            };
            ctx.reply(msg, report, &[]);
        }
        RequestArcInitiation => {
            require(ctx, CecLogAddrType::TV, Features::ARC_TX)?;
            ctx.reply(msg, InitiateArc, &[]);
        }
        RequestArcTermination => {
            require(ctx, CecLogAddrType::TV, Features::ARC_TX)?;
            ctx.reply(msg, TerminateArc, &[]);
        }
        ReportArcInitiated | ReportArcTerminated => {
            require(ctx, CecLogAddrType::TV, Features::ARC_TX)?;
            ctx.state.arc_active = op == ReportArcInitiated;
        }

        /* System Audio Control */
        GiveAudioStatus => {
            if !ctx.is(CecLogAddrType::AUDIOSYSTEM) || !ctx.state.sac_active {
                return Err(CecAbortReason::WrongMode);
            }
            let status = ctx.state.audio_status();
            ctx.reply(msg, ReportAudioStatus, &[status]);
        }
        GiveSystemAudioModeStatus => {
            if !ctx.is(CecLogAddrType::AUDIOSYSTEM) {
                return Err(CecAbortReason::Unrecognized);
            }
            let on = ctx.state.sac_active as u8;
            ctx.reply(msg, SystemAudioModeStatus, &[on]);
        }
        SystemAudioModeRequest => {
            if !ctx.is(CecLogAddrType::AUDIOSYSTEM) {
                return Err(CecAbortReason::Unrecognized);
            }
            let mut ops = msg.operands();
            let on = match ops.remaining() {
                0 => false,
                _ => {
                    let pa = ops.u16()?;
                    debug!("system audio for {:#06x}", pa);
                    true
                }
            };
            if on {
                ctx.state.exit_standby(ctx.now);
            }
            ctx.state.sac_active = on;
            ctx.broadcast(SetSystemAudioMode, &[on as u8]);
        }
        SetSystemAudioMode | SystemAudioModeStatus => {
            let on = on_off(msg)?;
            if msg.initiator() != CecLogicalAddress::Audiosystem {
                ctx.warn(format_args!(
                    "{:?} from {:?}, which is no audio system",
                    op,
                    msg.initiator()
                ));
                return Ok(());
            }
            if ctx.is(CecLogAddrType::TV) {
                ctx.state.sac_active = on;
            } else if !msg.is_broadcast() && op == SetSystemAudioMode {
                return Err(CecAbortReason::Unrecognized);
            }
        }
        ReportAudioStatus => {
            let status = msg.operands().u8()?;
            debug!(
                "{:?} volume {}{}",
                msg.initiator(),
                status & 0x7f,
                if status & 0x80 != 0 { " muted" } else { "" }
            );
        }
        RequestShortAudioDescriptor => {
            if !ctx.is(CecLogAddrType::AUDIOSYSTEM) {
                return Err(CecAbortReason::Unrecognized);
            }
            let mut ops = msg.operands();
            let ids = ops.rest();
            if ids.is_empty() || ids.len() > 4 {
                return Err(CecAbortReason::InvalidOp);
            }
            let mut data = Vec::with_capacity(ids.len() * 3);
            for b in ids {
                let id = AudioFormatId::from_operand(*b)?;
                if let Some(sad) = ctx.cfg.sads.iter().find(|sad| id.matches(sad)) {
                    data.extend_from_slice(&sad.encode());
                }
            }
            if data.is_empty() {
                return Err(CecAbortReason::InvalidOp);
            }
            ctx.reply(msg, ReportShortAudioDescriptor, &data);
        }
        ReportShortAudioDescriptor => {}

        SetAudioRate => {
            if !ctx.cfg.features.contains(Features::AUDIO_RATE) {
                return Err(CecAbortReason::Unrecognized);
            }
            let rate = msg.operands().parse::<AudioRate>()?;
            ctx.state.last_aud_rate = match rate {
                AudioRate::Off => None,
                _ => Some(ctx.now),
            };
        }
        SetAudioVolumeLevel => {
            if !ctx.is(CecLogAddrType::AUDIOSYSTEM) {
                return Err(CecAbortReason::Unrecognized);
            }
            match msg.operands().u8()? {
                v @ 0..=100 => ctx.state.volume = v,
                VOLUME_UNKNOWN => {}
                _ => return Err(CecAbortReason::InvalidOp),
            }
            let status = ctx.state.audio_status();
            ctx.reply(msg, ReportAudioStatus, &[status]);
        }

        /* Dynamic Audio Lipsync */
        RequestCurrentLatency => {
            let pa = msg.operands().u16()?;
            if pa != ctx.cfg.phys_addr {
                return Ok(());
            }
            let lat = ctx.state.latency;
            let [hi, lo] = pa.to_be_bytes();
            let mut data = vec![
                hi,
                lo,
                lat.video_latency,
                (lat.low_latency_mode as u8) << 2 | lat.audio_out_compensated,
            ];
            if lat.audio_out_compensated == 3 {
                data.push(lat.audio_out_delay);
            }
            ctx.broadcast(ReportCurrentLatency, &data);
        }
        ReportCurrentLatency => {}
        _ => return Err(CecAbortReason::Unrecognized),
    }
    Ok(())
}
