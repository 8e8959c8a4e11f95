//! Host services the client needs besides the network.

use crate::network::error::Error;

/// A trait for platform-specific client functionality.
///
/// This trait must be implemented by the target platform to give the client
/// a clock, a way to wait, and a hook into the host's periodic scheduler.
pub trait Platform {
    /// Current time in scheduler ticks. Must not go backwards.
    fn now(&self) -> u64;

    /// How many ticks make one second.
    fn ticks_per_second(&self) -> u32;

    /// Block the calling context for `ms` milliseconds.
    ///
    /// Used for the link-settle delay before CONNECT and between polls of a
    /// synchronous connect.
    fn delay_ms(&mut self, ms: u32);

    /// Register the client's poll function with the host scheduler.
    ///
    /// Called once by [`Client::initialize`](super::Client::initialize).
    fn register(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Remove the client from the host scheduler.
    ///
    /// Called once by [`Client::deinitialize`](super::Client::deinitialize).
    fn deregister(&mut self) {}
}
