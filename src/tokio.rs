use crate::{
    device::{CecDevice, CecEvent},
    follower::Follower,
    message::Message,
    sys::{CecCaps, CecLogAddrs, CecModeFollower, CecModeInitiator},
    transport::Clock,
    FollowerConfig,
};
use log::debug;
use nix::libc::O_NONBLOCK;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Result};
use std::os::unix::fs::OpenOptionsExt;
use tokio::io::{unix::AsyncFd, Interest};

/// A [CecDevice] driven by the tokio reactor
pub struct AsyncCec(AsyncFd<CecDevice>);

impl AsyncCec {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        /* With O_NONBLOCK CEC_RECEIVE and CEC_DQEVENT return EAGAIN when nothing is available,
         * and CEC_TRANSMIT, CEC_ADAP_S_PHYS_ADDR and CEC_ADAP_S_LOG_ADDRS return 0 at once.
         */
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_NONBLOCK)
            .open(path)?;
        let a = AsyncFd::with_interest(
            CecDevice(f),
            Interest::READABLE | Interest::WRITABLE | Interest::PRIORITY,
        )?;
        Ok(Self(a))
    }
    /// wait for the next received message
    pub async fn rec(&self) -> Result<Message> {
        self.0
            .async_io(Interest::READABLE, |inner| {
                inner.rec_for(0)?.ok_or_else(|| ErrorKind::WouldBlock.into())
            })
            .await
    }
    pub async fn get_event(&self) -> Result<CecEvent> {
        self.0
            .async_io(Interest::PRIORITY, |inner| inner.get_event())
            .await
    }
    /// Queue `msg`. A failed transmit is logged when its result comes back.
    pub async fn transmit(&self, msg: &Message) -> Result<()> {
        self.0
            .async_io(Interest::WRITABLE, |inner| inner.transmit_nonblocking(msg))
            .await
    }
    pub fn get_capas(&self) -> Result<CecCaps> {
        self.0.get_ref().get_capas()
    }
    pub fn get_mode(&self) -> Result<(CecModeInitiator, CecModeFollower)> {
        self.0.get_ref().get_mode()
    }
    pub fn get_log(&self) -> Result<CecLogAddrs> {
        self.0.get_ref().get_log()
    }
    pub fn get_phys(&self) -> Result<u16> {
        self.0.get_ref().get_phys()
    }
    /// See [CecDevice::configure]. Does not wait for the addresses to be claimed.
    pub fn configure(&self, config: &FollowerConfig) -> Result<()> {
        self.0.get_ref().configure(config)
    }
}

/**
 * Serve `follower` on `cec` until a transport error occurs.
 *
 * Same loop as [Follower::run], the receive timeout being the configured poll interval.
 */
pub async fn run<C: Clock>(
    cec: &AsyncCec,
    follower: &mut Follower,
    clock: &C,
) -> crate::Result<()> {
    let interval = follower.config().poll_interval;
    loop {
        for msg in follower.poll(clock.now()) {
            debug!("tx {:?}", msg);
            cec.transmit(&msg).await?;
        }
        let msg = match tokio::time::timeout(interval, cec.rec()).await {
            Ok(msg) => msg?,
            Err(_) => continue,
        };
        for reply in follower.process(&msg, clock.now()) {
            debug!("tx {:?}", reply);
            cec.transmit(&reply).await?;
        }
    }
}
