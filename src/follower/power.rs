//! Power status, Standby and One Touch Play wake up.

use super::Ctx;
use crate::{
    message::Message,
    types::{CecAbortReason, CecLogAddrType, CecOpcode, CecPowerStatus},
};
use log::debug;

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    match op {
        CecOpcode::GiveDevicePowerStatus => {
            let status = ctx.state.power.reported(ctx.now, ctx.cfg.power_transition);
            ctx.reply(msg, CecOpcode::ReportPowerStatus, &[status.into()]);
        }
        CecOpcode::ReportPowerStatus => {
            let status = msg.operands().parse::<CecPowerStatus>()?;
            debug!("{:?} is {:?}", msg.initiator(), status);
        }
        CecOpcode::Standby => ctx.state.request_standby(ctx.now),
        CecOpcode::ImageViewOn | CecOpcode::TextViewOn => {
            if !ctx.is(CecLogAddrType::TV) {
                return Err(CecAbortReason::Unrecognized);
            }
            ctx.state.exit_standby(ctx.now);
        }
        _ => return Err(CecAbortReason::Unrecognized),
    }
    Ok(())
}
