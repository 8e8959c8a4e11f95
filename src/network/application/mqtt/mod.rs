//! MQTT 3.1.1 client for embedded systems.
//!
//! The client is built from a handful of layers:
//!
//! - [`codec`]: pure encode/decode of the wire format
//! - [`transport`]: the binding to the network stack
//! - [`session`]: identity, buffers, packet ids and status flags
//! - the connection state machine, driven by [`Client::poll`]
//! - the QoS engine: publish, subscribe and the acknowledgments
//! - [`keepalive`]: PINGREQ scheduling
//! - [`client`]: the control surface
//!
//! Everything runs on fixed-size buffers chosen at compile time, and nothing
//! blocks apart from the short pause before CONNECT. Inbound messages and
//! acknowledgments are delivered to a [`Handler`] from inside
//! [`Client::poll`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use libiot_mqtt::network::application::mqtt::{Client, Config, Event, Handler, Publish, QoS};
//! # use libiot_mqtt::network::application::mqtt::Platform;
//! # use libiot_mqtt::network::{Close, Connect, Read, Resolution, Resolve, Write};
//! # use core::net::{IpAddr, Ipv4Addr, SocketAddr};
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
//! #     fn resolve(&mut self, _hostname: &str) -> Result<Resolution, ()> {
//! #         Ok(Resolution::Resolved(IpAddr::V4(Ipv4Addr::LOCALHOST)))
//! #     }
//! # }
//! # struct Board;
//! # impl Platform for Board {
//! #     fn now(&self) -> u64 { 0 }
//! #     fn ticks_per_second(&self) -> u32 { 1000 }
//! #     fn delay_ms(&mut self, _ms: u32) {}
//! # }
//!
//! struct Commands;
//!
//! impl Handler for Commands {
//!     fn on_publish(&mut self, publish: &Publish<'_>) {
//!         let _ = (publish.topic, publish.payload);
//!     }
//!
//!     fn on_event(&mut self, event: Event<'_>) {
//!         if let Event::Error(_) = event {
//!             // schedule a reconnect
//!         }
//!     }
//! }
//!
//! let config = Config::from_json(r#"{"client_id":"node-7","server":"broker.local"}"#)?;
//! let mut client: Client<_, _, _> = Client::initialize(Stack, Board, Commands, config.options())?;
//! client.configure(&config)?;
//! client.connect()?;
//! client.subscribe("commands/#", QoS::AtLeastOnce)?;
//!
//! loop {
//!     client.poll();
//! }
//! # Ok::<(), libiot_mqtt::network::error::Error>(())
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod event;
pub mod keepalive;
pub mod packet;
pub mod platform;
pub mod session;
pub mod transport;

mod qos;
mod state;

pub use client::{
    CONNECT_POLL_INTERVAL_MS, CONNECT_TIMEOUT_SECONDS, Client, LINK_SETTLE_DELAY_MS,
};
pub use codec::{LastWill, PacketReader};
pub use config::Config;
pub use event::{Event, Handler};
pub use keepalive::KeepAlive;
pub use packet::{ConnectReturnCode, PacketType, Publish, PublishPacket, QoS};
pub use platform::Platform;
pub use session::{AddressKind, Options, PacketId, ServerAddress, Session, State, Status};
pub use transport::Binding;
