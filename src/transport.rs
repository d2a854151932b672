//! The seams between the follower and the outside world.

use crate::message::Message;
use std::{
    io,
    time::{Duration, SystemTime},
};

/// Something that moves CEC frames.
///
/// [CecDevice](crate::CecDevice) talks to the kernel. Tests use an in memory queue.
pub trait Transport {
    /// Wait up to `timeout` for a message. `Ok(None)` if nothing arrived.
    fn receive(&mut self, timeout: Duration) -> io::Result<Option<Message>>;
    fn send(&mut self, msg: &Message) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn receive(&mut self, timeout: Duration) -> io::Result<Option<Message>> {
        (**self).receive(timeout)
    }
    fn send(&mut self, msg: &Message) -> io::Result<()> {
        (**self).send(msg)
    }
}

/// Source of the current time
pub trait Clock {
    fn now(&self) -> SystemTime;
}

/// the wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
