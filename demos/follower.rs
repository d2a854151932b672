use cec_follower::*;
use log::info;

/// usage: follower [/dev/cecX] [tv|record|tuner|playback|audio]
fn main() -> Result<()> {
    pretty_env_logger::init();
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/dev/cec0".to_string());
    let (la, kind) = match args.next().as_deref() {
        Some("tv") => (CecLogicalAddress::Tv, CecLogAddrType::TV),
        Some("record") => (CecLogicalAddress::Record1, CecLogAddrType::RECORD),
        Some("tuner") => (CecLogicalAddress::Tuner1, CecLogAddrType::TUNER),
        Some("audio") => (CecLogicalAddress::Audiosystem, CecLogAddrType::AUDIOSYSTEM),
        _ => (CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK),
    };

    let mut cec = CecDevice::open(&path)?;
    let capas = cec.get_capas()?;
    info!("{} with {} logical addresses", capas.driver(), capas.available_log_addrs());

    let mut config = FollowerConfig::new(la, kind, cec.get_phys()?);
    config.features = match kind {
        CecLogAddrType::TV => Features::OSD_STRING | Features::RECORD_TV_SCREEN | Features::ARC_TX,
        CecLogAddrType::AUDIOSYSTEM => Features::ARC_RX | Features::AUDIO_RATE,
        _ => Features::DECK_CONTROL,
    };
    config.standby_flood = 3;
    config.view_on_flood = 3;
    cec.configure(&config)?;

    let mut follower = Follower::new(config)?;
    follower.run(&mut cec, &SystemClock)
}
