//! System information, routing, menus and everything that has no feature of its own.

use super::Ctx;
use crate::{
    config::Features,
    message::Message,
    types::{
        CecAbortReason, CecLogAddrType, CecOpcode, DisplayControl, MenuRequestType, Version,
    },
};
use log::{debug, info};

fn announce_active(ctx: &mut Ctx) {
    let pa = ctx.cfg.phys_addr;
    ctx.state.active_source = Some(pa);
    ctx.broadcast(CecOpcode::ActiveSource, &pa.to_be_bytes());
}

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    use CecOpcode::*;
    let mut ops = msg.operands();
    let tv = ctx.is(CecLogAddrType::TV);
    match op {
        /* System Information */
        GetCecVersion => {
            let version = ctx.cfg.version;
            ctx.reply(msg, CecVersion, &[version.into()]);
        }
        GivePhysicalAddr => {
            let [hi, lo] = ctx.cfg.phys_addr.to_be_bytes();
            let prim = ctx.kind.primary_device_type();
            ctx.broadcast(ReportPhysicalAddr, &[hi, lo, prim.into()]);
        }
        GiveOsdName => {
            let name = ctx.cfg.osd_name.as_bytes();
            ctx.reply(msg, SetOsdName, name);
        }
        GiveDeviceVendorId => {
            let [_, a, b, c] = ctx.cfg.vendor_id.to_be_bytes();
            ctx.broadcast(DeviceVendorId, &[a, b, c]);
        }
        GetMenuLanguage => {
            if !tv {
                return Err(CecAbortReason::Unrecognized);
            }
            let lang = ctx.state.menu_language;
            ctx.broadcast(SetMenuLanguage, &lang);
        }
        SetMenuLanguage => {
            let lang: [u8; 3] = ops.rest().try_into().map_err(|_| CecAbortReason::InvalidOp)?;
            if !lang.iter().all(u8::is_ascii_lowercase) {
                return Err(CecAbortReason::InvalidOp);
            }
            if !tv {
                info!("menu language {}", String::from_utf8_lossy(&lang));
                ctx.state.menu_language = lang;
            }
        }
        GiveFeatures => {
            if ctx.cfg.version != Version::V2_0 {
                return Err(CecAbortReason::Unrecognized);
            }
            let [rc_profile, dev_features] = ctx.cfg.report_features(ctx.kind);
            let data = [
                ctx.cfg.version.into(),
                ctx.cfg.all_device_types(),
                rc_profile,
                dev_features,
            ];
            ctx.broadcast(ReportFeatures, &data);
        }
        Abort => return Err(CecAbortReason::Refused),
        // never answered, even when malformed
        FeatureAbort => match msg.parameters() {
            [opcode, reason] => debug!(
                "{:?} aborted {:#04x}: {:?}",
                msg.initiator(),
                opcode,
                CecAbortReason::try_from(*reason)
            ),
            other => ctx.warn(format_args!(
                "malformed Feature Abort {:x?} from {:?}",
                other,
                msg.initiator()
            )),
        },
        CecVersion | SetOsdName | ReportPhysicalAddr | DeviceVendorId | ReportFeatures
        | CdcMessage | MenuStatus => {}

        /* One Touch Play and Routing Control */
        ActiveSource => {
            let pa = ops.u16()?;
            debug!("active source {:#06x}", pa);
            ctx.state.active_source = Some(pa);
        }
        RequestActiveSource => {
            if !tv && ctx.state.active_source == Some(ctx.cfg.phys_addr) {
                announce_active(ctx);
            }
        }
        SetStreamPath => {
            let pa = ops.u16()?;
            if pa == ctx.cfg.phys_addr && !tv {
                info!("we are the active source");
                ctx.state.exit_standby(ctx.now);
                announce_active(ctx);
            } else {
                ctx.state.active_source = Some(pa);
            }
        }
        RoutingChange => {
            let from = ops.u16()?;
            let to = ops.u16()?;
            debug!("routing {:#06x} -> {:#06x}", from, to);
            ctx.state.active_source = Some(to);
        }
        RoutingInformation => {
            let pa = ops.u16()?;
            ctx.state.active_source = Some(pa);
        }
        InactiveSource => {
            if !tv {
                return Err(CecAbortReason::Unrecognized);
            }
            let pa = ops.u16()?;
            if ctx.state.active_source == Some(pa) {
                info!("{:#06x} is no longer active", pa);
                ctx.state.active_source = None;
            }
        }

        /* Menus and OSD */
        MenuRequest => {
            if tv {
                return Err(CecAbortReason::Unrecognized);
            }
            match ops.parse::<MenuRequestType>()? {
                MenuRequestType::Activate => ctx.state.menu_active = true,
                MenuRequestType::Deactivate => ctx.state.menu_active = false,
                MenuRequestType::Query => {}
            }
            let state = if ctx.state.menu_active { 0 } else { 1 };
            ctx.reply(msg, MenuStatus, &[state]);
        }
        SetOsdString => {
            if !tv || !ctx.cfg.features.contains(Features::OSD_STRING) {
                return Err(CecAbortReason::Unrecognized);
            }
            let ctl = ops.parse::<DisplayControl>()?;
            let text = ops.rest();
            info!("OSD {:?}: {}", ctl, String::from_utf8_lossy(text));
        }

        VendorCommand | VendorCommandWithId | VendorRemoteButtonDown | VendorRemoteButtonUp => {
            return Err(CecAbortReason::Unrecognized)
        }
        _ => return Err(CecAbortReason::Unrecognized),
    }
    Ok(())
}
