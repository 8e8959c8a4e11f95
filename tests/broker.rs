//! Runs against a real broker. Set `TEST_MQTT_ADDRESS` (host:port) in the
//! environment or a `.env` file, then `cargo test -- --ignored`.

use dotenvy::dotenv;
use libiot_mqtt::network::application::mqtt::{
    AddressKind, Client, Event, Handler, Options, Platform, Publish, QoS, State,
};
use libiot_mqtt::network::error::Error;
use libiot_mqtt::network::{Close, Connect, Read, Resolution, Resolve, Write};
use std::env;
use std::io::{ErrorKind, Read as StdRead, Write as StdWrite};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

struct NetConnection {
    stream: TcpStream,
}

impl Read for NetConnection {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.stream.read(buf) {
            Ok(0) => Err(Error::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(Error::ReadError),
        }
    }
}

impl Write for NetConnection {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream.write(buf).map_err(|_| Error::WriteError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for NetConnection {
    type Error = Error;
    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.stream
            .shutdown(Shutdown::Both)
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct StdStack;

impl Connect for StdStack {
    type Connection = NetConnection;
    type Error = Error;

    fn connect(&mut self, remote: SocketAddr) -> Result<Self::Connection, Self::Error> {
        let stream = TcpStream::connect_timeout(&remote, Duration::from_secs(5))
            .map_err(|_| Error::ConnectionRefused)?;
        stream
            .set_nonblocking(true)
            .map_err(|_| Error::ConnectionRefused)?;
        Ok(NetConnection { stream })
    }
}

impl Resolve for StdStack {
    type Error = Error;

    fn resolve(&mut self, hostname: &str) -> Result<Resolution, Self::Error> {
        (hostname, 0)
            .to_socket_addrs()
            .map_err(|_| Error::InvalidAddress)?
            .next()
            .map(|address| Resolution::Resolved(address.ip()))
            .ok_or(Error::InvalidAddress)
    }
}

struct StdPlatform {
    start: Instant,
}

impl Platform for StdPlatform {
    fn now(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn ticks_per_second(&self) -> u32 {
        1000
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[derive(Default)]
struct Inbox {
    messages: Vec<(String, Vec<u8>)>,
    suback: bool,
}

impl Handler for Inbox {
    fn on_event(&mut self, event: Event<'_>) {
        if let Event::SubAck { .. } = event {
            self.suback = true;
        }
    }

    fn on_publish(&mut self, publish: &Publish<'_>) {
        self.messages
            .push((publish.topic.to_string(), publish.payload.to_vec()));
    }
}

fn broker() -> (String, u16) {
    dotenv().ok();
    let address = env::var("TEST_MQTT_ADDRESS").unwrap_or("test.mosquitto.org:1883".to_string());
    let (host, port) = address.rsplit_once(':').expect("address must be host:port");
    (host.to_string(), port.parse().expect("invalid port"))
}

fn poll_until(client: &mut Client<StdStack, StdPlatform, Inbox>, done: impl Fn(&Inbox) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(client.handler()) {
        assert!(Instant::now() < deadline, "broker did not answer in time");
        assert_eq!(client.poll(), State::Online);
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
#[ignore = "needs a reachable MQTT broker"]
fn test_publish_and_subscribe_roundtrip() {
    let (host, port) = broker();
    let options = Options {
        client_id: "libiot-mqtt-test-67890",
        max_topic_len: 64,
    };
    let platform = StdPlatform {
        start: Instant::now(),
    };
    let mut client: Client<StdStack, StdPlatform, Inbox> =
        Client::initialize(StdStack, platform, Inbox::default(), options).unwrap();
    client
        .set_connection(&host, port, AddressKind::detect(&host), 30, true)
        .unwrap();
    client.connect().unwrap();

    let topic = "libiot-mqtt/test/roundtrip";
    client.subscribe(topic, QoS::AtMostOnce).unwrap();
    poll_until(&mut client, |inbox| inbox.suback);

    client.publish(topic, b"hello", false).unwrap();
    poll_until(&mut client, |inbox| !inbox.messages.is_empty());
    assert_eq!(client.handler().messages[0].1, b"hello");

    client.disconnect().unwrap();
    assert_eq!(client.state(), State::Idle);
}
