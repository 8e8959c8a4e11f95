//! Per-connection session context.
//!
//! Identity, credentials, connection target, the three fixed buffers, the
//! packet identifier counter, status flags and the state tag. A [`Session`]
//! is owned by its [`Client`](super::Client) for the client's whole life;
//! the buffers are sized at the type level and never grow.

use super::codec::{self, ConnectFields, LastWill, MAX_FIXED_HEADER_LEN, PacketReader};
use super::keepalive::KeepAlive;
use super::packet::QoS;
use crate::network::error::Error;
use core::net::{IpAddr, SocketAddr};
use heapless::{String, Vec};
use serde::Deserialize;

/// Longest accepted client identifier.
pub const MAX_CLIENT_ID_LEN: usize = 64;
/// Longest accepted broker hostname.
pub const MAX_HOSTNAME_LEN: usize = 128;
/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 64;
/// Longest accepted password.
pub const MAX_PASSWORD_LEN: usize = 64;
/// Longest accepted last-will topic.
pub const MAX_WILL_TOPIC_LEN: usize = 128;
/// Longest accepted last-will message.
pub const MAX_WILL_MESSAGE_LEN: usize = 128;
/// Standard unencrypted MQTT port.
pub const DEFAULT_PORT: u16 = 1883;
/// Variable header bytes around a topic: the length prefix and a packet id.
pub const TOPIC_OVERHEAD: usize = 4;

/// Connection state machine states.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No transport, no timers.
    Idle,
    /// Resolving the broker and sending CONNECT.
    Connecting,
    /// Connected; packets are exchanged on every poll.
    Online,
    /// Tearing the connection down; runs once, then back to idle.
    Disconnecting,
}

/// How the server address given to
/// [`Client::set_connection`](super::Client::set_connection) is interpreted.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    /// A literal IPv4 or IPv6 address.
    Ip,
    /// A hostname resolved through the network stack.
    Hostname,
}

impl AddressKind {
    /// Guess the kind of `server`: literal addresses parse, hostnames do not.
    pub fn detect(server: &str) -> Self {
        if server.parse::<IpAddr>().is_ok() {
            Self::Ip
        } else {
            Self::Hostname
        }
    }
}

/// The broker the session connects to.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ServerAddress {
    /// A literal address.
    Ip(IpAddr),
    /// A hostname still to be resolved.
    Hostname(String<MAX_HOSTNAME_LEN>),
}

/// Session status bit flags.
///
/// Mutated only by the connection state machine and the keep-alive
/// scheduler.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Status(u8);

impl Status {
    /// The broker address is known.
    pub const RESOLVED: Self = Self(0x01);
    /// A transport connection is open.
    pub const ONLINE: Self = Self(0x02);
    /// The broker accepted CONNECT.
    pub const ACTIVE: Self = Self(0x04);
    /// PINGREQ is sent when the keep-alive interval elapses.
    pub const KEEP_ALIVE: Self = Self(0x08);

    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether every flag in `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub(crate) fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// The 16-bit packet identifier counter.
///
/// Starts at 1 and wraps from 65535 back to 1, so 0 is never used. The
/// counter moves only when the broker acknowledges a request, which means
/// two QoS > 0 requests sent back to back carry the same identifier.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PacketId(u16);

impl Default for PacketId {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketId {
    /// A counter at its initial value, 1.
    pub const fn new() -> Self {
        Self(1)
    }

    /// The identifier the next request will carry.
    pub fn current(self) -> u16 {
        self.0
    }

    /// Move to the next identifier, skipping 0.
    pub fn advance(&mut self) {
        self.0 = if self.0 == u16::MAX { 1 } else { self.0 + 1 };
    }
}

/// Options fixed for the lifetime of a client.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::Options;
///
/// let options = Options {
///     client_id: "sensor_node_1",
///     max_topic_len: 64,
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Options<'a> {
    /// The client identifier, must be unique within the broker.
    ///
    /// An empty identifier asks the broker to assign one, which MQTT 3.1.1
    /// only allows together with a clean session.
    pub client_id: &'a str,

    /// The longest topic the application will publish or subscribe to.
    ///
    /// Sizes the variable-header scratch buffer; it plus the fixed overhead
    /// must fit in the send buffer.
    pub max_topic_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Will {
    topic: String<MAX_WILL_TOPIC_LEN>,
    message: Vec<u8, MAX_WILL_MESSAGE_LEN>,
    qos: QoS,
    retain: bool,
}

/// The per-connection data record.
#[derive(Debug)]
pub struct Session<const TX: usize, const RX: usize> {
    pub(crate) client_id: String<MAX_CLIENT_ID_LEN>,
    pub(crate) username: Option<String<MAX_USERNAME_LEN>>,
    pub(crate) password: Option<Vec<u8, MAX_PASSWORD_LEN>>,
    pub(crate) will: Option<Will>,
    pub(crate) server: Option<ServerAddress>,
    pub(crate) port: u16,
    pub(crate) address: Option<SocketAddr>,
    pub(crate) keep_alive_seconds: u16,
    pub(crate) clean_session: bool,
    pub(crate) tx: [u8; TX],
    pub(crate) rx: [u8; RX],
    pub(crate) scratch: Vec<u8, TX>,
    pub(crate) max_topic_len: usize,
    pub(crate) sequence: PacketId,
    pub(crate) status: Status,
    pub(crate) state: State,
    pub(crate) reader: PacketReader,
    pub(crate) keep_alive: KeepAlive,
    pub(crate) last_error: Option<Error>,
}

impl<const TX: usize, const RX: usize> Session<TX, RX> {
    pub(crate) fn new(options: &Options<'_>) -> Result<Self, Error> {
        let client_id = String::try_from(options.client_id).map_err(|_| Error::InvalidParameter)?;
        let largest_header = options
            .max_topic_len
            .checked_add(TOPIC_OVERHEAD + MAX_FIXED_HEADER_LEN);
        if options.max_topic_len == 0 || largest_header.is_none_or(|len| len > TX) {
            return Err(Error::InvalidParameter);
        }
        // The smallest inbound packets (CONNACK, acknowledgments) are 4 bytes.
        if RX < 4 {
            return Err(Error::InvalidParameter);
        }
        Ok(Self {
            client_id,
            username: None,
            password: None,
            will: None,
            server: None,
            port: DEFAULT_PORT,
            address: None,
            keep_alive_seconds: 0,
            clean_session: true,
            tx: [0; TX],
            rx: [0; RX],
            scratch: Vec::new(),
            max_topic_len: options.max_topic_len,
            sequence: PacketId::new(),
            status: Status::empty(),
            state: State::Idle,
            reader: PacketReader::new(),
            keep_alive: KeepAlive::new(),
            last_error: None,
        })
    }

    /// The state machine's current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The status flags.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The client identifier sent in CONNECT.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The configured broker, if any.
    pub fn server(&self) -> Option<&ServerAddress> {
        self.server.as_ref()
    }

    /// The broker port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The broker's socket address once it is known.
    pub fn resolved_address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Whether CONNECT asks for a clean session.
    pub fn clean_session(&self) -> bool {
        self.clean_session
    }

    /// The packet identifier the next QoS > 0 request will carry.
    pub fn packet_id(&self) -> u16 {
        self.sequence.current()
    }

    /// The longest topic accepted by publish and subscribe.
    pub fn max_topic_len(&self) -> usize {
        self.max_topic_len
    }

    /// Why the session last failed, if it did.
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    pub(crate) fn transition(&mut self, next: State) {
        if self.state != next {
            info!("state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    pub(crate) fn set_connection(
        &mut self,
        server: &str,
        port: u16,
        kind: AddressKind,
        keep_alive_seconds: u16,
        clean_session: bool,
    ) -> Result<(), Error> {
        let server = match kind {
            AddressKind::Ip => {
                ServerAddress::Ip(server.parse().map_err(|_| Error::InvalidParameter)?)
            }
            AddressKind::Hostname => {
                if server.is_empty() {
                    return Err(Error::InvalidParameter);
                }
                ServerAddress::Hostname(
                    String::try_from(server).map_err(|_| Error::InvalidParameter)?,
                )
            }
        };
        self.server = Some(server);
        self.port = port;
        self.address = None;
        self.status.remove(Status::RESOLVED);
        self.keep_alive_seconds = keep_alive_seconds;
        self.clean_session = clean_session;
        Ok(())
    }

    pub(crate) fn set_auth(
        &mut self,
        username: Option<&str>,
        password: Option<&[u8]>,
    ) -> Result<(), Error> {
        if username.is_none() && password.is_some() {
            return Err(Error::InvalidParameter);
        }
        let username = username
            .map(String::try_from)
            .transpose()
            .map_err(|_| Error::InvalidParameter)?;
        let password = password
            .map(Vec::from_slice)
            .transpose()
            .map_err(|_| Error::InvalidParameter)?;
        self.username = username;
        self.password = password;
        Ok(())
    }

    pub(crate) fn set_will(
        &mut self,
        topic: &str,
        message: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        if topic.is_empty() {
            return Err(Error::InvalidParameter);
        }
        self.will = Some(Will {
            topic: String::try_from(topic).map_err(|_| Error::InvalidParameter)?,
            message: Vec::from_slice(message).map_err(|_| Error::InvalidParameter)?,
            qos,
            retain,
        });
        Ok(())
    }

    pub(crate) fn clear_will(&mut self) {
        self.will = None;
    }

    /// Reject empty topics and topics the scratch buffer was not sized for.
    pub(crate) fn check_topic(&self, topic: &str) -> Result<(), Error> {
        if topic.is_empty() || topic.len() > self.max_topic_len {
            return Err(Error::InvalidParameter);
        }
        Ok(())
    }

    /// Encode CONNECT into the send buffer.
    pub(crate) fn encode_connect(&mut self) -> Result<usize, Error> {
        let fields = ConnectFields {
            client_id: &self.client_id,
            username: self.username.as_deref(),
            password: self.password.as_deref(),
            will: self.will.as_ref().map(|will| LastWill {
                topic: &will.topic,
                message: &will.message,
                qos: will.qos,
                retain: will.retain,
            }),
            keep_alive_seconds: self.keep_alive_seconds,
            clean_session: self.clean_session,
        };
        codec::encode_connect(&mut self.tx, &mut self.scratch, &fields)
    }
}
