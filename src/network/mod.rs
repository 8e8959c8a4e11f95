//! A network abstraction layer for embedded systems
//!
//! This module provides the traits the MQTT client uses to reach a broker:
//! a byte stream ([`Connection`]), a way to open one ([`Connect`]) and a
//! non-blocking hostname lookup ([`Resolve`]). Implement them once for the
//! target's TCP/IP stack and the client runs on top of it.
//!
//! All calls are expected to be non-blocking or bounded. The client is
//! driven from a cooperative poll loop, so a read that finds nothing must
//! return `Ok(0)` immediately instead of waiting for data.

#![allow(missing_docs)]
#![deny(unsafe_code)]

use core::net::{IpAddr, SocketAddr};

/// Common error types for network operations
pub mod error;

/// Protocol implementations built on the network traits
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Resolve, Resolution, Write};
}

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection.
    ///
    /// Returns `Ok(0)` when no data is available right now. An `Err` means
    /// the link is gone.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Shut down both directions of the connection before closing it
    fn shutdown(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

impl<T: Read + Write + Close> Connection for T {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Create a socket and connect it to `remote`
    fn connect(&mut self, remote: SocketAddr) -> Result<Self::Connection, Self::Error>;
}

/// Progress of a hostname lookup.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Resolution {
    /// The lookup was started or is still in flight; ask again later.
    Pending,
    /// The hostname resolved to this address.
    Resolved(IpAddr),
}

/// An asynchronous name resolver.
///
/// The first call for a hostname starts the lookup; later calls report its
/// progress. The caller owns the result, so there is no callback racing with
/// the code that reads the address.
pub trait Resolve {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Start or continue resolving `hostname`
    fn resolve(&mut self, hostname: &str) -> Result<Resolution, Self::Error>;
}
