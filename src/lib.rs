#![cfg_attr(docsrs, feature(doc_cfg))]
/*!
 * Emulate an HDMI-CEC follower on top of the [CEC linux API](https://www.kernel.org/doc/html/v4.9/media/uapi/cec/cec-api.html).
 *
 * A [Follower] takes every received [Message] and returns the messages it answers with.
 * It keeps the [state](state::DeviceState) of the device it pretends to be:
 * power, tuner, deck, recording, timers, audio and routing.
 * Time based duties (timers, key release, power toggling) happen in [Follower::poll].
 *
 * Hook it up to a kernel adapter with [CecDevice] or to anything else implementing [Transport].
 *
 * ```no_run
 * # use cec_follower::{CecDevice, Follower, FollowerConfig, CecLogicalAddress, CecLogAddrType, SystemClock};
 * # fn main() -> cec_follower::Result<()> {
 * let mut cec = CecDevice::open("/dev/cec0")?;
 * let phys = cec.get_phys()?;
 * let config = FollowerConfig::new(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK, phys);
 * cec.configure(&config)?;
 * let mut follower = Follower::new(config)?;
 * follower.run(&mut cec, &SystemClock)
 * # }
 * ```
 */
mod config;
mod device;
mod error;
mod follower;
mod message;
pub mod operand;
pub mod peer;
pub mod sad;
pub mod state;
mod sys;
pub mod timer;
mod transport;
mod types;

pub use config::{default_sads, default_services, Features, FollowerConfig, DEFAULT_ANALOGUE};
pub use device::{CecDevice, CecEvent};
pub use error::{Error, Result};
pub use follower::Follower;
pub use message::{Message, Operands, CEC_MAX_MSG_SIZE};
pub use sys::{
    Capabilities, CecCaps, CecEventLostMsgs, CecEventStateChange, CecLogAddrFlags, CecLogAddrs,
    CecModeFollower, CecModeInitiator, CecMsg, OSDStr, TxStatus, CEC_MAX_LOG_ADDRS,
};
pub use transport::{Clock, SystemClock, Transport};
pub use types::*;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod tokio;
