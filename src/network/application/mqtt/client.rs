//! The client control surface.
//!
//! A [`Client`] owns one session, the network stack it talks through, the
//! host platform and the application's callbacks. Configuration and
//! connect/disconnect requests go through here; the actual work happens in
//! [`Client::poll`], which the host calls periodically.
//!
//! # Examples
//!
//! ```rust,no_run
//! use libiot_mqtt::network::application::mqtt::{AddressKind, Client, Options, Platform};
//! use libiot_mqtt::network::{Close, Connect, Read, Resolution, Resolve, Write};
//! # use core::net::SocketAddr;
//! # struct Socket;
//! # impl Read for Socket {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Socket {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Close for Socket {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Stack;
//! # impl Connect for Stack {
//! #     type Connection = Socket;
//! #     type Error = ();
//! #     fn connect(&mut self, _remote: SocketAddr) -> Result<Socket, ()> { Ok(Socket) }
//! # }
//! # impl Resolve for Stack {
//! #     type Error = ();
//! #     fn resolve(&mut self, _hostname: &str) -> Result<Resolution, ()> { Err(()) }
//! # }
//! # struct Board;
//! # impl Platform for Board {
//! #     fn now(&self) -> u64 { 0 }
//! #     fn ticks_per_second(&self) -> u32 { 1000 }
//! #     fn delay_ms(&mut self, _ms: u32) {}
//! # }
//!
//! let options = Options {
//!     client_id: "sensor_device_01",
//!     max_topic_len: 64,
//! };
//! let mut client: Client<_, _> = Client::initialize(Stack, Board, (), options)?;
//! client.set_connection("192.168.1.10", 1883, AddressKind::Ip, 60, true)?;
//! client.connect()?;
//! client.publish("sensors/temperature", b"23.5", false)?;
//! client.disconnect()?;
//! # Ok::<(), libiot_mqtt::network::error::Error>(())
//! ```

use super::config::Config;
use super::event::Handler;
use super::packet::QoS;
use super::platform::Platform;
use super::session::{AddressKind, Options, Session, State, Status};
use super::transport::Binding;
use crate::network::error::Error;
use crate::network::{Connect, Resolve};

/// How long [`Client::connect`] waits for the broker's CONNACK.
pub const CONNECT_TIMEOUT_SECONDS: u32 = 10;

/// Pause between polls while [`Client::connect`] waits.
pub const CONNECT_POLL_INTERVAL_MS: u32 = 10;

/// Pause between opening the transport and sending CONNECT.
pub const LINK_SETTLE_DELAY_MS: u32 = 100;

/// An MQTT 3.1.1 client.
///
/// `TX` and `RX` size the send and receive buffers. Every packet this
/// client sends must fit in `TX`; every packet it accepts must fit in `RX`.
/// Larger inbound packets are a protocol error and drop the session.
pub struct Client<
    N: Connect + Resolve,
    P: Platform,
    H: Handler = (),
    const TX: usize = 1024,
    const RX: usize = 1024,
> {
    pub(crate) session: Session<TX, RX>,
    pub(crate) binding: Binding<N>,
    pub(crate) platform: P,
    pub(crate) handler: H,
}

impl<N, P, H, const TX: usize, const RX: usize> core::fmt::Debug for Client<N, P, H, TX, RX>
where
    N: Connect + Resolve,
    P: Platform,
    H: Handler,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.session.client_id())
            .field("state", &self.session.state())
            .field("status", &self.session.status())
            .field("packet_id", &self.session.packet_id())
            .finish_non_exhaustive()
    }
}

impl<N, P, H, const TX: usize, const RX: usize> Client<N, P, H, TX, RX>
where
    N: Connect + Resolve,
    P: Platform,
    H: Handler,
{
    /// Create a client in the idle state and register it with the host
    /// scheduler.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidParameter`] - The client id is too long, or the
    ///   topic limit does not fit the send buffer
    /// * Whatever [`Platform::register`] returns
    pub fn initialize(
        stack: N,
        mut platform: P,
        handler: H,
        options: Options<'_>,
    ) -> Result<Self, Error> {
        let session = Session::new(&options)?;
        platform.register()?;
        info!("client {} initialized", options.client_id);
        Ok(Self {
            session,
            binding: Binding::new(stack),
            platform,
            handler,
        })
    }

    /// Tear the client down and hand back its parts.
    ///
    /// An online session is disconnected first, a pending connect is
    /// abandoned.
    pub fn deinitialize(mut self) -> (N, P, H) {
        match self.session.state {
            State::Online | State::Disconnecting => {
                self.session.transition(State::Disconnecting);
                self.step_disconnecting();
            }
            State::Connecting => self.session.transition(State::Idle),
            State::Idle => {}
        }
        self.platform.deregister();
        info!("client {} deinitialized", self.session.client_id());
        (self.binding.into_stack(), self.platform, self.handler)
    }

    /// Set the credentials sent in the next CONNECT.
    ///
    /// `None` clears a field. MQTT 3.1.1 does not allow a password without
    /// a username.
    pub fn set_auth(
        &mut self,
        username: Option<&str>,
        password: Option<&[u8]>,
    ) -> Result<(), Error> {
        self.ensure_idle()?;
        self.session.set_auth(username, password)
    }

    /// Set the broker and the connection options.
    ///
    /// With [`AddressKind::Ip`] the server must be a literal address;
    /// otherwise it is resolved through the network stack on connect.
    pub fn set_connection(
        &mut self,
        server: &str,
        port: u16,
        kind: AddressKind,
        keep_alive_seconds: u16,
        clean_session: bool,
    ) -> Result<(), Error> {
        self.ensure_idle()?;
        self.session
            .set_connection(server, port, kind, keep_alive_seconds, clean_session)
    }

    /// Register a last-will message with the next CONNECT.
    pub fn set_will(
        &mut self,
        topic: &str,
        message: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        self.ensure_idle()?;
        self.session.set_will(topic, message, qos, retain)
    }

    /// Stop sending a last-will message.
    pub fn clear_will(&mut self) -> Result<(), Error> {
        self.ensure_idle()?;
        self.session.clear_will();
        Ok(())
    }

    /// Apply a parsed [`Config`]: broker, options and credentials.
    ///
    /// The client id is fixed at initialization and is not changed.
    pub fn configure(&mut self, config: &Config<'_>) -> Result<(), Error> {
        self.set_connection(
            config.server,
            config.port,
            config.address_kind(),
            config.keep_alive_seconds,
            config.clean_session,
        )?;
        self.set_auth(config.username, config.password.map(str::as_bytes))
    }

    /// Replace the callbacks, returning the old ones.
    pub fn set_handler(&mut self, handler: H) -> H {
        core::mem::replace(&mut self.handler, handler)
    }

    /// Connect and wait for the broker to accept the session.
    ///
    /// Polls the state machine, sleeping [`CONNECT_POLL_INTERVAL_MS`]
    /// between polls, for at most [`CONNECT_TIMEOUT_SECONDS`].
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] - The client is not idle
    /// * [`Error::InvalidParameter`] - No broker configured
    /// * [`Error::ConnectionRefused`] - The transport or the broker refused
    /// * [`Error::Timeout`] - No CONNACK in time; the session is dropped
    pub fn connect(&mut self) -> Result<(), Error> {
        self.connect_async()?;
        let timeout =
            u64::from(CONNECT_TIMEOUT_SECONDS) * u64::from(self.platform.ticks_per_second());
        let deadline = self.platform.now().saturating_add(timeout);
        loop {
            match self.poll() {
                State::Online if self.session.status.contains(Status::ACTIVE) => return Ok(()),
                State::Idle => {
                    return Err(self.session.last_error.unwrap_or(Error::ConnectionRefused));
                }
                _ => {}
            }
            if self.platform.now() >= deadline {
                warn!("no CONNACK within {} s", CONNECT_TIMEOUT_SECONDS);
                self.abandon(Error::Timeout);
                return Err(Error::Timeout);
            }
            self.platform.delay_ms(CONNECT_POLL_INTERVAL_MS);
        }
    }

    /// Request a connection; [`Client::poll`] does the rest.
    pub fn connect_async(&mut self) -> Result<(), Error> {
        self.ensure_idle()?;
        if self.session.server.is_none() {
            return Err(Error::InvalidParameter);
        }
        self.session.last_error = None;
        self.session.transition(State::Connecting);
        Ok(())
    }

    /// Disconnect now.
    ///
    /// An online session sends DISCONNECT, closes the transport and fires
    /// the disconnect callback before this returns.
    ///
    /// # Errors
    ///
    /// * [`Error::Offline`] - The client is already idle
    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.disconnect_async()?;
        if self.session.state == State::Disconnecting {
            self.step_disconnecting();
        }
        Ok(())
    }

    /// Request a disconnect; the next [`Client::poll`] carries it out.
    ///
    /// A connect still in progress is abandoned on the spot, without a
    /// disconnect callback.
    pub fn disconnect_async(&mut self) -> Result<(), Error> {
        match self.session.state {
            State::Idle => Err(Error::Offline),
            State::Connecting => {
                debug!("connect abandoned");
                self.session.transition(State::Idle);
                Ok(())
            }
            State::Online => {
                self.session.transition(State::Disconnecting);
                Ok(())
            }
            State::Disconnecting => Ok(()),
        }
    }

    /// Give up on a connect attempt that took too long.
    fn abandon(&mut self, e: Error) {
        self.session.last_error = Some(e);
        match self.session.state {
            State::Connecting => self.session.transition(State::Idle),
            State::Online | State::Disconnecting => {
                self.session.transition(State::Disconnecting);
                self.step_disconnecting();
            }
            State::Idle => {}
        }
    }

    pub(crate) fn ensure_idle(&self) -> Result<(), Error> {
        if self.session.state == State::Idle {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    pub(crate) fn ensure_active(&self) -> Result<(), Error> {
        if self.session.state == State::Online && self.session.status.contains(Status::ACTIVE) {
            Ok(())
        } else {
            Err(Error::Offline)
        }
    }

    /// The state machine's current state.
    pub fn state(&self) -> State {
        self.session.state
    }

    /// Whether a transport connection is open.
    pub fn is_online(&self) -> bool {
        self.session.status.contains(Status::ONLINE)
    }

    /// Whether the broker has accepted the session.
    pub fn is_session_active(&self) -> bool {
        self.session.status.contains(Status::ACTIVE)
    }

    /// The packet identifier the next QoS > 0 request will carry.
    pub fn packet_id(&self) -> u16 {
        self.session.packet_id()
    }

    /// The session context.
    pub fn session(&self) -> &Session<TX, RX> {
        &self.session
    }

    /// The application callbacks.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The application callbacks, mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// The host platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The host platform, mutably.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// The network stack.
    pub fn stack(&self) -> &N {
        self.binding.stack()
    }

    /// The network stack, mutably.
    pub fn stack_mut(&mut self) -> &mut N {
        self.binding.stack_mut()
    }
}
