//! Common error types for network operations

use core::fmt;

/// A common error type for network and session operations.
///
/// This enum defines the errors that can occur when working with the
/// transport binding and the MQTT session on top of it. It is designed to be
/// simple, `Copy` and portable for `no_std` environments.
///
/// The last three variants are the status codes of the client's control
/// surface: they are returned before any I/O is attempted and never fire a
/// session callback.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted on a connection that is not open.
    NotOpen,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// A connection attempt was refused, by the network or by the broker.
    ConnectionRefused,
    /// A timeout occurred.
    Timeout,
    /// The connection was closed.
    ConnectionClosed,
    /// An invalid address was provided, or a hostname could not be resolved.
    InvalidAddress,
    /// A protocol-specific error occurred (malformed or unexpected packet).
    ProtocolError,
    /// The operation needs an active session but the client is offline.
    Offline,
    /// A parameter was rejected: empty, too long, or larger than the
    /// session's fixed buffers.
    InvalidParameter,
    /// The operation is not allowed in the session's current state.
    InvalidState,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotOpen => write!(f, "connection not open"),
            Error::WriteError => write!(f, "write failed"),
            Error::ReadError => write!(f, "read failed"),
            Error::ConnectionRefused => write!(f, "connection refused"),
            Error::Timeout => write!(f, "timed out"),
            Error::ConnectionClosed => write!(f, "connection closed"),
            Error::InvalidAddress => write!(f, "invalid address"),
            Error::ProtocolError => write!(f, "protocol error"),
            Error::Offline => write!(f, "session offline"),
            Error::InvalidParameter => write!(f, "invalid parameter"),
            Error::InvalidState => write!(f, "invalid state"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::Offline => defmt::write!(f, "Offline"),
            Error::InvalidParameter => defmt::write!(f, "InvalidParameter"),
            Error::InvalidState => defmt::write!(f, "InvalidState"),
        }
    }
}
