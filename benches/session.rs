use criterion::{Criterion, Throughput};
use libiot_mqtt::network::application::mqtt::{AddressKind, Client, Options, Platform, State};
use libiot_mqtt::network::{Close, Connect, Read, Resolution, Resolve, Write};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::hint::black_box;
use std::net::SocketAddr;
use std::rc::Rc;

/// An in-memory link: writes are dropped, reads drain a queue.
#[derive(Clone, Default)]
struct Loopback {
    inbound: Rc<RefCell<VecDeque<u8>>>,
}

impl Read for Loopback {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut inbound = self.inbound.borrow_mut();
        let n = buf.len().min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for Loopback {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(black_box(buf).len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for Loopback {
    type Error = ();

    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connect for Loopback {
    type Connection = Loopback;
    type Error = ();

    fn connect(&mut self, _remote: SocketAddr) -> Result<Self::Connection, Self::Error> {
        Ok(self.clone())
    }
}

impl Resolve for Loopback {
    type Error = ();

    fn resolve(&mut self, _hostname: &str) -> Result<Resolution, Self::Error> {
        Ok(Resolution::Pending)
    }
}

struct Clock;

impl Platform for Clock {
    fn now(&self) -> u64 {
        0
    }

    fn ticks_per_second(&self) -> u32 {
        1000
    }

    fn delay_ms(&mut self, _ms: u32) {}
}

fn online_client() -> (Client<Loopback, Clock>, Loopback) {
    let link = Loopback::default();
    let options = Options {
        client_id: "bench",
        max_topic_len: 64,
    };
    let mut client: Client<Loopback, Clock> =
        Client::initialize(link.clone(), Clock, (), options).unwrap();
    client
        .set_connection("127.0.0.1", 1883, AddressKind::Ip, 0, true)
        .unwrap();
    link.inbound
        .borrow_mut()
        .extend([0x20, 0x02, 0x00, 0x00]);
    client.connect().unwrap();
    (client, link)
}

pub fn bench_publish_qos0(c: &mut Criterion) {
    let (mut client, _link) = online_client();
    let payload = [0x42u8; 256];

    let mut group = c.benchmark_group("session");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("publish_qos0", |b| {
        b.iter(|| client.publish("sensors/temperature", black_box(&payload), false))
    });
    group.finish();
}

pub fn bench_poll_inbound(c: &mut Criterion) {
    let (mut client, link) = online_client();
    let packet = [
        0x30, 0x0E, 0x00, 0x07, b's', b'e', b'n', b's', b'o', b'r', b's', b'2', b'3', b'.', b'5',
        b'!',
    ];

    let mut group = c.benchmark_group("session");
    group.throughput(Throughput::Bytes(packet.len() as u64));
    group.bench_function("poll_publish", |b| {
        b.iter(|| {
            link.inbound.borrow_mut().extend(packet);
            assert_eq!(client.poll(), State::Online);
        })
    });
    group.finish();
}
