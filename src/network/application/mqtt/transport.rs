//! Transport binding between the session and the network stack.
//!
//! The binding owns the network stack and, while the session is online, the
//! open connection. The state machine never touches sockets directly; it
//! opens, sends, receives and closes through here, and every stack-specific
//! error is mapped to [`Error`] at this boundary.

use crate::network::error::Error;
use crate::network::{Close, Connect, Read, Resolution, Resolve, Write};
use core::net::{IpAddr, SocketAddr};

/// The session's handle on a network stack.
pub struct Binding<N: Connect + Resolve> {
    stack: N,
    connection: Option<N::Connection>,
}

impl<N: Connect + Resolve> core::fmt::Debug for Binding<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Binding")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl<N: Connect + Resolve> Binding<N> {
    /// Wrap a network stack. No connection is open yet.
    pub fn new(stack: N) -> Self {
        Self {
            stack,
            connection: None,
        }
    }

    /// Whether a connection is open.
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// The wrapped network stack.
    pub fn stack(&self) -> &N {
        &self.stack
    }

    /// The wrapped network stack, mutably.
    pub fn stack_mut(&mut self) -> &mut N {
        &mut self.stack
    }

    /// Close any open connection and give the stack back.
    pub fn into_stack(mut self) -> N {
        self.close();
        self.stack
    }

    /// Start or continue resolving `hostname`.
    ///
    /// Returns `Ok(None)` while the lookup is in flight.
    pub fn resolve(&mut self, hostname: &str) -> Result<Option<IpAddr>, Error> {
        match self.stack.resolve(hostname) {
            Ok(Resolution::Pending) => Ok(None),
            Ok(Resolution::Resolved(address)) => Ok(Some(address)),
            Err(_) => {
                warn!("resolving {} failed", hostname);
                Err(Error::InvalidAddress)
            }
        }
    }

    /// Create a socket and connect it to `remote`, replacing any open
    /// connection.
    pub fn open(&mut self, remote: SocketAddr) -> Result<(), Error> {
        self.close();
        match self.stack.connect(remote) {
            Ok(connection) => {
                self.connection = Some(connection);
                Ok(())
            }
            Err(_) => {
                warn!("connect to port {} failed", remote.port());
                Err(Error::ConnectionRefused)
            }
        }
    }

    /// Send all of `bytes` and flush.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let connection = self.connection.as_mut().ok_or(Error::NotOpen)?;
        let mut sent = 0;
        while sent < bytes.len() {
            match connection.write(&bytes[sent..]) {
                Ok(n) if n == 0 || n > bytes.len() - sent => return Err(Error::WriteError),
                Ok(n) => sent += n,
                Err(_) => {
                    debug!("write failed after {} of {} bytes", sent, bytes.len());
                    return Err(Error::WriteError);
                }
            }
        }
        connection.flush().map_err(|_| Error::WriteError)
    }

    /// Shut down and close the open connection, if any.
    ///
    /// Failures are logged and otherwise ignored: the handle is gone either
    /// way.
    pub fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if connection.shutdown().is_err() {
                debug!("shutdown failed");
            }
            if connection.close().is_err() {
                debug!("close failed");
            }
        }
    }
}

impl<N: Connect + Resolve> Read for Binding<N> {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let connection = self.connection.as_mut().ok_or(Error::NotOpen)?;
        connection.read(buf).map_err(|_| {
            debug!("read failed");
            Error::ReadError
        })
    }
}
