//! The connection state machine.
//!
//! [`Client::poll`] runs one step of the current state. The control surface
//! only starts and stops the machine; every transition in between happens
//! here.

use super::client::{Client, LINK_SETTLE_DELAY_MS};
use super::codec;
use super::event::{Event, Handler};
use super::packet::{ConnectReturnCode, DISCONNECT, PacketType, Publish};
use super::platform::Platform;
use super::session::{ServerAddress, Session, State, Status};
use crate::network::error::Error;
use crate::network::{Connect, Resolve};
use core::net::SocketAddr;

/// What the dispatcher wants the state machine to do after a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Stay,
    Disconnect,
}

impl<N, P, H, const TX: usize, const RX: usize> Client<N, P, H, TX, RX>
where
    N: Connect + Resolve,
    P: Platform,
    H: Handler,
{
    /// Run one step of the state machine and return the resulting state.
    ///
    /// Call this periodically from the host scheduler. Nothing blocks except
    /// the short link-settle delay right before CONNECT is sent.
    ///
    /// * Idle: nothing happens.
    /// * Connecting: resolve the broker if needed, open the transport and
    ///   send CONNECT. A pending lookup leaves the state unchanged; any
    ///   failure fires an error event and returns to idle.
    /// * Online: service the keep-alive, then read and dispatch at most one
    ///   inbound packet.
    /// * Disconnecting: send DISCONNECT if the broker session is active,
    ///   close the transport, fire the disconnect callback and return to
    ///   idle.
    pub fn poll(&mut self) -> State {
        match self.session.state {
            State::Idle => {}
            State::Connecting => self.step_connecting(),
            State::Online => self.step_online(),
            State::Disconnecting => self.step_disconnecting(),
        }
        self.session.state
    }

    fn step_connecting(&mut self) {
        let remote = match self.resolve_target() {
            Ok(Some(remote)) => remote,
            Ok(None) => return,
            Err(e) => return self.fail_connect(e),
        };

        if let Err(e) = self.binding.open(remote) {
            return self.fail_connect(e);
        }
        self.platform.delay_ms(LINK_SETTLE_DELAY_MS);

        let sent = match self.session.encode_connect() {
            Ok(len) => self.binding.send(&self.session.tx[..len]),
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            self.binding.close();
            return self.fail_connect(e);
        }
        trace!("sent CONNECT to port {}", remote.port());

        let session = &mut self.session;
        session.status.insert(Status::ONLINE);
        if session.keep_alive_seconds > 0 {
            session.status.insert(Status::KEEP_ALIVE);
        }
        session
            .keep_alive
            .arm(session.keep_alive_seconds, self.platform.ticks_per_second());
        session.reader.reset();
        session.transition(State::Online);
    }

    /// The broker's socket address, resolving it first when needed.
    ///
    /// `Ok(None)` means a lookup is still in flight.
    fn resolve_target(&mut self) -> Result<Option<SocketAddr>, Error> {
        if self.session.status.contains(Status::RESOLVED) {
            if let Some(address) = self.session.address {
                return Ok(Some(address));
            }
        }
        let ip = match &self.session.server {
            None => return Err(Error::InvalidAddress),
            Some(ServerAddress::Ip(ip)) => *ip,
            Some(ServerAddress::Hostname(host)) => match self.binding.resolve(host)? {
                Some(ip) => ip,
                None => {
                    debug!("waiting on lookup of {}", host.as_str());
                    return Ok(None);
                }
            },
        };
        if let Some(ServerAddress::Hostname(host)) = &self.session.server {
            debug!("resolved {}", host.as_str());
        }
        let remote = SocketAddr::new(ip, self.session.port);
        self.session.address = Some(remote);
        self.session.status.insert(Status::RESOLVED);
        Ok(Some(remote))
    }

    fn fail_connect(&mut self, e: Error) {
        warn!("connect failed: {:?}", e);
        self.session.last_error = Some(e);
        self.handler.on_event(Event::Error(e));
        self.session.transition(State::Idle);
    }

    fn step_online(&mut self) {
        if let Err(e) = self.service_keep_alive() {
            return self.link_lost(e);
        }
        let received = self
            .session
            .reader
            .poll(&mut self.binding, &mut self.session.rx);
        match received {
            Ok(None) => {}
            Ok(Some(len)) => match dispatch(&mut self.session, &mut self.handler, len) {
                Ok(Flow::Stay) => {}
                Ok(Flow::Disconnect) => self.session.transition(State::Disconnecting),
                Err(e) => self.protocol_failure(e),
            },
            Err(Error::ProtocolError) => self.protocol_failure(Error::ProtocolError),
            Err(e) => self.link_lost(e),
        }
    }

    /// The transport failed under an open session.
    fn link_lost(&mut self, e: Error) {
        warn!("link lost: {:?}", e);
        self.session.status.remove(Status::ACTIVE);
        self.session.last_error = Some(e);
        self.handler.on_event(Event::Error(e));
        self.session.transition(State::Disconnecting);
    }

    /// The broker sent something this client cannot make sense of.
    fn protocol_failure(&mut self, e: Error) {
        error!("protocol violation, dropping session");
        self.session.last_error = Some(e);
        self.handler.on_event(Event::Error(e));
        self.session.transition(State::Disconnecting);
    }

    pub(crate) fn step_disconnecting(&mut self) {
        if self.session.status.contains(Status::ACTIVE) {
            if self.send_control(DISCONNECT).is_err() {
                debug!("DISCONNECT not delivered");
            }
            self.session.status.remove(Status::ACTIVE);
        }
        self.binding.close();
        self.session.status.remove(Status::ONLINE);
        self.session.status.remove(Status::KEEP_ALIVE);
        self.session.reader.reset();
        self.session.keep_alive.touch();
        self.handler.on_disconnect();
        self.session.transition(State::Idle);
    }
}

/// Handle one complete inbound packet sitting in the receive buffer.
fn dispatch<H: Handler, const TX: usize, const RX: usize>(
    session: &mut Session<TX, RX>,
    handler: &mut H,
    len: usize,
) -> Result<Flow, Error> {
    let packet = &session.rx[..len];
    let kind = codec::parse_message_type(packet)?;
    trace!("received {:?} ({} bytes)", kind, len);

    match kind {
        PacketType::ConnAck => {
            let (flags, return_code) = match codec::body(packet)? {
                &[flags, code] => (flags, code),
                _ => return Err(Error::ProtocolError),
            };
            let event = Event::ConnAck {
                session_present: flags & 0x01 != 0,
                return_code,
            };
            if return_code == 0 {
                info!("broker accepted session");
                session.status.insert(Status::ACTIVE);
                handler.on_event(event);
                Ok(Flow::Stay)
            } else {
                match ConnectReturnCode::from_byte(return_code) {
                    Some(code) => warn!("broker refused session: {:?}", code),
                    None => warn!("broker refused session, return code {}", return_code),
                }
                session.last_error = Some(Error::ConnectionRefused);
                handler.on_event(event);
                Ok(Flow::Disconnect)
            }
        }
        PacketType::Publish => {
            let publish = Publish::parse(packet)?;
            handler.on_publish(&publish);
            Ok(Flow::Stay)
        }
        PacketType::SubAck => {
            let body = codec::body(packet)?;
            if body.len() < 3 {
                return Err(Error::ProtocolError);
            }
            let packet_id = u16::from_be_bytes([body[0], body[1]]);
            session.sequence.advance();
            handler.on_event(Event::SubAck {
                packet_id,
                return_codes: &body[2..],
            });
            Ok(Flow::Stay)
        }
        PacketType::PubAck | PacketType::PubRec | PacketType::PubRel | PacketType::PubComp
        | PacketType::UnsubAck => {
            let packet_id = codec::parse_packet_id(packet)?.ok_or(Error::ProtocolError)?;
            let event = match kind {
                PacketType::PubAck => Event::PubAck(packet_id),
                PacketType::PubRec => Event::PubRec(packet_id),
                PacketType::PubRel => Event::PubRel(packet_id),
                PacketType::PubComp => Event::PubComp(packet_id),
                _ => Event::UnsubAck(packet_id),
            };
            // PUBREC and PUBREL are mid-flow; the exchange is not finished yet.
            if !matches!(kind, PacketType::PubRec | PacketType::PubRel) {
                session.sequence.advance();
            }
            handler.on_event(event);
            Ok(Flow::Stay)
        }
        PacketType::PingResp => Ok(Flow::Stay),
        _ => {
            warn!("unexpected {:?} from broker", kind);
            Err(Error::ProtocolError)
        }
    }
}
