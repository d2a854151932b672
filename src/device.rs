//! [Transport] on top of a kernel CEC adapter.

use crate::{
    config::FollowerConfig,
    message::Message,
    sys::{
        self, capabilities, get_event, get_log, get_mode, get_phys, receive, set_log, set_mode,
        set_phys, transmit, CecCaps, CecEventLostMsgs, CecEventStateChange, CecEventType,
        CecLogAddrFlags, CecLogAddrs, CecModeFollower, CecModeInitiator, CecMsg,
        CEC_MODE_FOLLOWER_MSK, CEC_MODE_INITIATOR_MSK,
    },
    transport::Transport,
};
use log::{debug, warn};
use nix::errno::Errno;
use std::{
    io::{self, Result},
    mem::MaybeUninit,
    os::fd::AsRawFd,
    time::Duration,
};

/// A handle on a CEC device.
pub struct CecDevice(pub(crate) std::fs::File);

impl CecDevice {
    /**
     * Open a CEC device. Typically `/dev/cecX`
     * ```no_run
     * # use cec_follower::CecDevice;
     * # fn main() -> std::io::Result<()> {
     * let cec = CecDevice::open("/dev/cec0")?;
     * # Ok(())
     * # }
     * ```
     */
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(Self)
    }
    /// query information on the devices capabilities. See [CecCaps]
    pub fn get_capas(&self) -> Result<CecCaps> {
        let mut capas = MaybeUninit::uninit();
        unsafe { capabilities(self.0.as_raw_fd(), capas.as_mut_ptr()) }?;
        Ok(unsafe { capas.assume_init() })
    }
    /// Change this handles mode.
    ///
    /// A follower wants [CecModeFollower::ExclusivePassthru] so that the kernel leaves
    /// the core messages to it.
    pub fn set_mode(&self, initiator: CecModeInitiator, follower: CecModeFollower) -> Result<()> {
        let mode = u32::from(initiator) | u32::from(follower);
        unsafe { set_mode(self.0.as_raw_fd(), &mode) }?;
        Ok(())
    }
    pub fn get_mode(&self) -> Result<(CecModeInitiator, CecModeFollower)> {
        let mut mode = 0;
        unsafe { get_mode(self.0.as_raw_fd(), &mut mode) }?;
        let i = CecModeInitiator::try_from(mode & CEC_MODE_INITIATOR_MSK);
        let e = CecModeFollower::try_from(mode & CEC_MODE_FOLLOWER_MSK);
        match (i, e) {
            (Ok(i), Ok(e)) => Ok((i, e)),
            _ => Err(io::ErrorKind::Other.into()),
        }
    }
    /// Set the physical address of the adapter. `0xffff` unconfigures it.
    pub fn set_phys(&self, addr: u16) -> Result<()> {
        unsafe { set_phys(self.0.as_raw_fd(), &addr) }?;
        Ok(())
    }
    /// e.g. 0x3300 -> 3.3.0.0
    pub fn get_phys(&self) -> Result<u16> {
        let mut addr = 0;
        unsafe { get_phys(self.0.as_raw_fd(), &mut addr) }?;
        Ok(addr)
    }
    pub fn set_log(&self, mut log: CecLogAddrs) -> Result<()> {
        unsafe { set_log(self.0.as_raw_fd(), &mut log) }?;
        Ok(())
    }
    pub fn get_log(&self) -> Result<CecLogAddrs> {
        let mut log = MaybeUninit::uninit();
        unsafe { get_log(self.0.as_raw_fd(), log.as_mut_ptr()) }?;
        Ok(unsafe { log.assume_init() })
    }
    pub fn get_event(&self) -> Result<CecEvent> {
        let mut evt = sys::CecEvent::default();
        unsafe { get_event(self.0.as_raw_fd(), &mut evt) }?;
        Ok(match evt.typ {
            CecEventType::LostMsgs => CecEvent::LostMsgs(unsafe { evt.payload.lost_msgs }),
            CecEventType::StateChange => {
                CecEvent::StateChange(unsafe { evt.payload.state_change })
            }
        })
    }
    /**
     * Configure the adapter as the device described by `config`.
     *
     * Takes exclusive passthrough follower mode, sets the physical address
     * and claims one logical address per configured type.
     */
    pub fn configure(&self, config: &FollowerConfig) -> Result<()> {
        self.set_mode(CecModeInitiator::Send, CecModeFollower::ExclusivePassthru)?;
        if self.get_capas()?.capabilities().contains(sys::Capabilities::PHYS_ADDR) {
            self.set_phys(config.phys_addr)?;
        }
        let mut log = CecLogAddrs {
            cec_version: config.version,
            vendor_id: config.vendor_id,
            flags: CecLogAddrFlags::ALLOW_UNREG_FALLBACK,
            osd_name: config.osd_name.as_bytes().into(),
            ..Default::default()
        };
        for (i, (_, kind)) in config.logical_addresses.iter().enumerate() {
            log.push(*kind);
            if let Some(features) = log.features.get_mut(i) {
                features[..2].copy_from_slice(&config.report_features(*kind));
            }
        }
        // an empty request clears what was claimed before
        self.set_log(CecLogAddrs::default())?;
        self.set_log(log)?;
        let claimed = self.get_log()?;
        debug!("claimed {:?}", claimed.log_addr_mask);
        if claimed.log_addr_mask != config.la_mask() {
            warn!(
                "adapter claimed {:?}, configured {:?}",
                claimed.log_addr_mask,
                config.la_mask()
            );
        }
        Ok(())
    }
    /// Send a message and wait for it to be acknowledged.
    pub fn transmit(&self, msg: &Message) -> Result<()> {
        let mut raw = CecMsg::from(msg);
        unsafe { transmit(self.0.as_raw_fd(), &mut raw) }?;
        msg_to_io_result(&raw)
    }
    /// receive a single message.
    /// block for at most `timeout` ms, 0 blocks for ever.
    pub fn rec_for(&self, timeout: u32) -> Result<Option<Message>> {
        loop {
            let mut raw = CecMsg::for_receive(timeout);
            match unsafe { receive(self.0.as_raw_fd(), &mut raw) } {
                Ok(_) => {}
                Err(Errno::ETIMEDOUT) | Err(Errno::EAGAIN) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
            if raw.sequence != 0 {
                // result of a non blocking transmit
                if let Err(e) = msg_to_io_result(&raw) {
                    warn!("{}", e);
                }
                continue;
            }
            return Message::try_from(&raw)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
        }
    }
    /// Queue a message on a non blocking handle. The result arrives with [CecDevice::rec_for].
    #[cfg(feature = "tokio")]
    pub(crate) fn transmit_nonblocking(&self, msg: &Message) -> Result<()> {
        let mut raw = CecMsg::from(msg);
        unsafe { transmit(self.0.as_raw_fd(), &mut raw) }?;
        Ok(())
    }
}

impl Transport for CecDevice {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Message>> {
        // 0 would block for ever
        let ms = timeout.as_millis().clamp(1, u32::MAX as u128) as u32;
        self.rec_for(ms)
    }
    fn send(&mut self, msg: &Message) -> Result<()> {
        self.transmit(msg)
    }
}

impl AsRawFd for CecDevice {
    fn as_raw_fd(&self) -> std::os::unix::prelude::RawFd {
        self.0.as_raw_fd()
    }
}

#[derive(Debug)]
pub enum CecEvent {
    /// Event that occurs when the adapter state changes
    StateChange(CecEventStateChange),
    /// This event is sent when messages are lost because the application
    /// didn't empty the message queue in time
    LostMsgs(CecEventLostMsgs),
}

/// Turn a transmit result into io::Result
pub(crate) fn msg_to_io_result(msg: &CecMsg) -> Result<()> {
    if msg.tx_status().contains(sys::TxStatus::OK) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "transmit failed: {:?} (arb lost, nack, low drive, error: {:?})",
                msg.tx_status(),
                msg.tx_counters()
            ),
        ))
    }
}
