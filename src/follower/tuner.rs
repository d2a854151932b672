//! Tuner Control: select and step through the built in service table.

use super::Ctx;
use crate::{
    message::Message,
    operand::{AnalogueService, DigitalServiceId, TunedService, TunerDisplayInfo},
    types::{CecAbortReason, CecOpcode, StatusRequest},
};
use log::info;

fn report(ctx: &mut Ctx, msg: &Message) {
    let info = ctx.state.tuner.info.encode();
    ctx.reply(msg, CecOpcode::TunerDeviceStatus, &info);
}

fn same_kind(a: &TunedService, b: &TunedService) -> bool {
    matches!(
        (a, b),
        (TunedService::Analogue(_), TunedService::Analogue(_))
            | (TunedService::Digital(_), TunedService::Digital(_))
    )
}

/// Tune to entry `idx` of the service table.
fn tune(ctx: &mut Ctx, msg: &Message, idx: usize) -> Result<(), CecAbortReason> {
    let service = *ctx.cfg.services.get(idx).ok_or(CecAbortReason::InvalidOp)?;
    let tuner = &mut ctx.state.tuner;
    tuner.service_idx = idx;
    tuner.info.service = service;
    tuner.info.display = match service {
        TunedService::Analogue(_) => TunerDisplayInfo::Analogue,
        TunedService::Digital(_) => TunerDisplayInfo::Digital,
    };
    info!("tuned to {:?}", service);
    if tuner.report_changes {
        report(ctx, msg);
    }
    Ok(())
}

/// Next or previous service of the kind currently tuned, wrapping around.
fn step(ctx: &Ctx, up: bool) -> Option<usize> {
    let current = ctx.state.tuner.info.service;
    let candidates: Vec<usize> = ctx
        .cfg
        .services
        .iter()
        .enumerate()
        .filter(|(_, s)| same_kind(s, &current))
        .map(|(i, _)| i)
        .collect();
    let pos = candidates
        .iter()
        .position(|i| *i == ctx.state.tuner.service_idx)
        .unwrap_or(0);
    let len = candidates.len();
    if len == 0 {
        return None;
    }
    let next = if up { (pos + 1) % len } else { (pos + len - 1) % len };
    candidates.get(next).copied()
}

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    if op == CecOpcode::TunerDeviceStatus {
        return Ok(());
    }
    if !ctx.kind.has_tuner() {
        return Err(CecAbortReason::Unrecognized);
    }
    match op {
        CecOpcode::GiveTunerDeviceStatus => {
            match msg.operands().parse::<StatusRequest>()? {
                StatusRequest::On => {
                    ctx.state.tuner.report_changes = true;
                    report(ctx, msg);
                }
                StatusRequest::Off => ctx.state.tuner.report_changes = false,
                StatusRequest::Once => report(ctx, msg),
            }
            Ok(())
        }
        CecOpcode::SelectAnalogueService | CecOpcode::SelectDigitalService => {
            let mut ops = msg.operands();
            let wanted = if op == CecOpcode::SelectAnalogueService {
                TunedService::Analogue(AnalogueService::parse(&mut ops)?)
            } else {
                TunedService::Digital(DigitalServiceId::parse(&mut ops)?)
            };
            if ctx.state.tuner.info.rec_flag {
                return Err(CecAbortReason::Refused);
            }
            let idx = ctx
                .cfg
                .services
                .iter()
                .position(|s| *s == wanted)
                .ok_or(CecAbortReason::InvalidOp)?;
            tune(ctx, msg, idx)
        }
        CecOpcode::TunerStepIncrement | CecOpcode::TunerStepDecrement => {
            if ctx.state.tuner.info.rec_flag {
                return Err(CecAbortReason::Refused);
            }
            let idx = step(ctx, op == CecOpcode::TunerStepIncrement)
                .ok_or(CecAbortReason::WrongMode)?;
            tune(ctx, msg, idx)
        }
        _ => Err(CecAbortReason::Unrecognized),
    }
}
