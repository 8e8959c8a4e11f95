//! Keep-alive scheduling.
//!
//! The deadline is armed lazily on the first poll after it was cleared and
//! cleared again by any transmission, so a PINGREQ only goes out after a full
//! interval with nothing sent.

use super::client::Client;
use super::event::Handler;
use super::packet::PINGREQ;
use super::platform::Platform;
use super::session::{State, Status};
use crate::network::error::Error;
use crate::network::{Connect, Resolve};

/// The keep-alive deadline, in platform ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeepAlive {
    interval: u64,
    deadline: Option<u64>,
}

impl KeepAlive {
    /// A scheduler with no interval and no deadline.
    pub const fn new() -> Self {
        Self {
            interval: 0,
            deadline: None,
        }
    }

    /// Set the interval and drop any pending deadline.
    pub fn arm(&mut self, seconds: u16, ticks_per_second: u32) {
        self.interval = u64::from(seconds) * u64::from(ticks_per_second);
        self.deadline = None;
    }

    /// The interval in ticks.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// The tick at which the next PINGREQ is due, if armed.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Record a transmission.
    pub fn touch(&mut self) {
        self.deadline = None;
    }

    /// Advance the scheduler to `now`.
    ///
    /// Returns `true` when the deadline has been reached and a PINGREQ is
    /// due. The deadline is cleared in that case and re-armed on the next
    /// call.
    pub fn poll(&mut self, now: u64) -> bool {
        match self.deadline {
            None => {
                self.deadline = Some(now.saturating_add(self.interval));
                false
            }
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            Some(_) => false,
        }
    }
}

impl<N, P, H, const TX: usize, const RX: usize> Client<N, P, H, TX, RX>
where
    N: Connect + Resolve,
    P: Platform,
    H: Handler,
{
    /// The keep-alive interval in seconds; 0 means disabled.
    pub fn keep_alive(&self) -> u16 {
        self.session.keep_alive_seconds
    }

    /// Change the keep-alive interval.
    ///
    /// The new value is sent to the broker in the next CONNECT. While online
    /// the local scheduler switches immediately; 0 stops PINGREQs.
    pub fn set_keep_alive(&mut self, seconds: u16) {
        self.session.keep_alive_seconds = seconds;
        if self.session.status.contains(Status::ONLINE) {
            self.session
                .keep_alive
                .arm(seconds, self.platform.ticks_per_second());
            if seconds == 0 {
                self.session.status.remove(Status::KEEP_ALIVE);
            } else {
                self.session.status.insert(Status::KEEP_ALIVE);
            }
        }
    }

    /// Send a PINGREQ if the keep-alive deadline has passed.
    pub(crate) fn service_keep_alive(&mut self) -> Result<(), Error> {
        let status = self.session.status;
        if self.session.state != State::Online
            || !status.contains(Status::ONLINE)
            || !status.contains(Status::KEEP_ALIVE)
        {
            return Ok(());
        }
        if self.session.keep_alive.poll(self.platform.now()) {
            debug!(
                "no traffic for {} s, sending PINGREQ",
                self.session.keep_alive_seconds
            );
            self.send_control(PINGREQ)?;
        }
        Ok(())
    }
}
