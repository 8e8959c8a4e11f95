#![allow(dead_code)]

use libiot_mqtt::network::application::mqtt::{
    AddressKind, Client, Event, Handler, Options, Platform, Publish, PublishPacket, State,
};
use libiot_mqtt::network::error::Error;
use libiot_mqtt::network::{Close, Connect, Read, Resolution, Resolve, Write};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::rc::Rc;

pub const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

/// CONNECT for client "dev1", clean session, keep-alive 0.
pub const CONNECT_DEV1: [u8; 18] = [
    0x10, 0x10, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x00, 0x00, 0x04, b'd',
    b'e', b'v', b'1',
];

/// Both ends of the fake network, shared between the test and the stack.
#[derive(Debug, Default)]
pub struct Wire {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub chunk: Option<usize>,
    pub fail_read: bool,
    pub fail_write: bool,
    pub refuse_connect: bool,
    pub lookups: VecDeque<Result<Resolution, Error>>,
    pub resolve_calls: usize,
    pub connects: Vec<SocketAddr>,
    pub closes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockStack {
    pub wire: Rc<RefCell<Wire>>,
}

impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.wire.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    pub fn take_outbound(&self) -> Vec<u8> {
        std::mem::take(&mut self.wire.borrow_mut().outbound)
    }
}

#[derive(Debug)]
pub struct MockSocket {
    wire: Rc<RefCell<Wire>>,
}

impl Read for MockSocket {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.fail_read {
            return Err(Error::ReadError);
        }
        let limit = wire.chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(limit).min(wire.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = wire.inbound.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for MockSocket {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.fail_write {
            return Err(Error::WriteError);
        }
        wire.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockSocket {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closes += 1;
        Ok(())
    }
}

impl Connect for MockStack {
    type Connection = MockSocket;
    type Error = Error;

    fn connect(&mut self, remote: SocketAddr) -> Result<Self::Connection, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.refuse_connect {
            return Err(Error::ConnectionRefused);
        }
        wire.connects.push(remote);
        Ok(MockSocket {
            wire: Rc::clone(&self.wire),
        })
    }
}

impl Resolve for MockStack {
    type Error = Error;

    fn resolve(&mut self, _hostname: &str) -> Result<Resolution, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        wire.resolve_calls += 1;
        wire.lookups.pop_front().unwrap_or(Ok(Resolution::Pending))
    }
}

/// A clock that only moves when the client sleeps, at 1000 ticks per second.
#[derive(Debug, Default)]
pub struct MockPlatform {
    pub now: u64,
    pub delays: Vec<u32>,
    pub registered: bool,
    pub deregistered: bool,
}

impl Platform for MockPlatform {
    fn now(&self) -> u64 {
        self.now
    }

    fn ticks_per_second(&self) -> u32 {
        1000
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.now += u64::from(ms);
    }

    fn register(&mut self) -> Result<(), Error> {
        self.registered = true;
        Ok(())
    }

    fn deregister(&mut self) {
        self.deregistered = true;
    }
}

/// An owned copy of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    ConnAck { session_present: bool, return_code: u8 },
    PubAck(u16),
    PubRec(u16),
    PubRel(u16),
    PubComp(u16),
    SubAck(u16, Vec<u8>),
    UnsubAck(u16),
    Error(Error),
}

impl From<Event<'_>> for Seen {
    fn from(event: Event<'_>) -> Self {
        match event {
            Event::ConnAck {
                session_present,
                return_code,
            } => Seen::ConnAck {
                session_present,
                return_code,
            },
            Event::PubAck(id) => Seen::PubAck(id),
            Event::PubRec(id) => Seen::PubRec(id),
            Event::PubRel(id) => Seen::PubRel(id),
            Event::PubComp(id) => Seen::PubComp(id),
            Event::SubAck {
                packet_id,
                return_codes,
            } => Seen::SubAck(packet_id, return_codes.to_vec()),
            Event::UnsubAck(id) => Seen::UnsubAck(id),
            Event::Error(e) => Seen::Error(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Seen>,
    pub publishes: Vec<PublishPacket>,
    pub disconnects: usize,
}

impl Handler for Recorder {
    fn on_event(&mut self, event: Event<'_>) {
        self.events.push(event.into());
    }

    fn on_publish(&mut self, publish: &Publish<'_>) {
        self.publishes.push(PublishPacket::try_from(publish).unwrap());
    }

    fn on_disconnect(&mut self) {
        self.disconnects += 1;
    }
}

pub type TestClient = Client<MockStack, MockPlatform, Recorder, 256, 256>;

/// An idle client for "dev1" and a handle on its network.
pub fn client(max_topic_len: usize) -> (TestClient, MockStack) {
    let stack = MockStack::new();
    let options = Options {
        client_id: "dev1",
        max_topic_len,
    };
    let client = TestClient::initialize(
        stack.clone(),
        MockPlatform::default(),
        Recorder::default(),
        options,
    )
    .unwrap();
    (client, stack)
}

/// Bring `client` online against 10.0.0.1 with keep-alive disabled, then
/// clear everything recorded so far.
pub fn go_online(client: &mut TestClient, stack: &MockStack) {
    client
        .set_connection("10.0.0.1", 1883, AddressKind::Ip, 0, true)
        .unwrap();
    client.connect_async().unwrap();
    assert_eq!(client.poll(), State::Online);
    stack.feed(&CONNACK_ACCEPTED);
    assert_eq!(client.poll(), State::Online);
    assert!(client.is_session_active());
    stack.take_outbound();
    client.handler_mut().events.clear();
}
