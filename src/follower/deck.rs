//! Deck Control for playback and record devices.

use super::Ctx;
use crate::{
    config::Features,
    message::Message,
    types::{
        CecAbortReason, CecLogAddrType, CecOpcode, DeckControlMode, DeckInfo, PlayMode,
        StatusRequest,
    },
};
use log::{debug, info};

/// Change the deck state and tell whoever asked for updates.
pub(super) fn update(ctx: &mut Ctx, info: DeckInfo) {
    if ctx.state.deck.info == info {
        return;
    }
    info!("deck {:?} -> {:?}", ctx.state.deck.info, info);
    ctx.state.deck.info = info;
    if let Some(to) = ctx.state.deck.report_to {
        ctx.send(to, CecOpcode::DeckStatus, &[info.into()]);
    }
}

fn report(ctx: &mut Ctx, msg: &Message) {
    let info = ctx.state.deck.info;
    ctx.reply(msg, CecOpcode::DeckStatus, &[info.into()]);
}

fn has_media(ctx: &Ctx) -> Result<(), CecAbortReason> {
    if ctx.state.deck.info == DeckInfo::NoMedia {
        Err(CecAbortReason::WrongMode)
    } else {
        Ok(())
    }
}

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    if op == CecOpcode::DeckStatus {
        let info = msg.operands().parse::<DeckInfo>()?;
        debug!("{:?} deck is {:?}", msg.initiator(), info);
        return Ok(());
    }
    let is_deck = ctx.is(CecLogAddrType::PLAYBACK) || ctx.is(CecLogAddrType::RECORD);
    if !is_deck || !ctx.cfg.features.contains(Features::DECK_CONTROL) {
        return Err(CecAbortReason::Unrecognized);
    }
    match op {
        CecOpcode::GiveDeckStatus => {
            match msg.operands().parse::<StatusRequest>()? {
                StatusRequest::On => {
                    ctx.state.deck.report_to = Some(msg.initiator());
                    report(ctx, msg);
                }
                StatusRequest::Off => ctx.state.deck.report_to = None,
                StatusRequest::Once => report(ctx, msg),
            }
        }
        CecOpcode::Play => {
            let mode = msg.operands().parse::<PlayMode>()?;
            // Play Forward loads a medium, anything else needs one
            if mode != PlayMode::Fwd {
                has_media(ctx)?;
            }
            ctx.state.deck.skip_start = None;
            ctx.state.exit_standby(ctx.now);
            update(ctx, mode.deck_info());
        }
        CecOpcode::DeckControl => match msg.operands().parse::<DeckControlMode>()? {
            mode @ (DeckControlMode::SkipFwd | DeckControlMode::SkipRev) => {
                has_media(ctx)?;
                let info = if mode == DeckControlMode::SkipFwd {
                    DeckInfo::SkipFwd
                } else {
                    DeckInfo::SkipRev
                };
                ctx.state.deck.skip_start = Some(ctx.now);
                update(ctx, info);
            }
            DeckControlMode::Stop => {
                has_media(ctx)?;
                ctx.state.deck.skip_start = None;
                update(ctx, DeckInfo::Stop);
            }
            DeckControlMode::Eject => {
                ctx.state.deck.skip_start = None;
                update(ctx, DeckInfo::NoMedia);
            }
        },
        _ => return Err(CecAbortReason::Unrecognized),
    }
    Ok(())
}
