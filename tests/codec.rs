use libiot_mqtt::network::Read;
use libiot_mqtt::network::application::mqtt::codec::{
    self, MAX_REMAINING_LENGTH, PacketReader, RemainingLength,
};
use libiot_mqtt::network::application::mqtt::{PacketType, Publish, QoS};
use libiot_mqtt::network::error::Error;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hands out a fixed byte string a few bytes at a time.
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.step).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

/// Claims one byte more than it was handed.
struct Overcount;

impl Read for Overcount {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        buf.fill(0x30);
        Ok(buf.len() + 1)
    }
}

struct Broken;

impl Read for Broken {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> {
        Err(())
    }
}

#[test]
fn test_remaining_length_boundaries() {
    let cases: [(usize, &[u8]); 6] = [
        (0, &[0x00]),
        (1, &[0x01]),
        (127, &[0x7F]),
        (128, &[0x80, 0x01]),
        (321, &[0xC1, 0x02]),
        (16_383, &[0xFF, 0x7F]),
    ];
    for (value, expected) in cases {
        let mut out = [0u8; 4];
        let written = codec::encode_remaining_length(value, &mut out).unwrap();
        assert_eq!(&out[..written], expected, "encoding {value}");
        assert_eq!(
            codec::decode_remaining_length(expected),
            Ok((value, expected.len()))
        );
    }
}

#[test]
fn test_remaining_length_every_value() {
    let mut out = [0u8; 4];
    for value in 0..=MAX_REMAINING_LENGTH {
        let written = codec::encode_remaining_length(value, &mut out).unwrap();
        assert_eq!(written, if value < 128 { 1 } else { 2 });
        assert_eq!(
            codec::decode_remaining_length(&out[..written]),
            Ok((value, written)),
            "value {value}"
        );
    }
}

#[test]
fn test_remaining_length_limits() {
    let mut out = [0u8; 4];
    assert_eq!(
        codec::encode_remaining_length(MAX_REMAINING_LENGTH + 1, &mut out),
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        codec::encode_remaining_length(200, &mut out[..1]),
        Err(Error::InvalidParameter)
    );

    // Four bytes is the protocol maximum and decodes fine.
    assert_eq!(
        codec::decode_remaining_length(&[0xFF, 0xFF, 0xFF, 0x7F]),
        Ok((268_435_455, 4))
    );
    assert_eq!(
        codec::decode_remaining_length(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
        Err(Error::ProtocolError)
    );
    assert_eq!(
        codec::decode_remaining_length(&[0x80]),
        Err(Error::ProtocolError)
    );
}

#[test]
fn test_remaining_length_incremental() {
    let mut decoder = RemainingLength::new();
    assert_eq!(decoder.push(0xC1), Ok(None));
    assert_eq!(decoder.push(0x02), Ok(Some(321)));
}

#[test]
fn test_parse_qos1_publish() {
    let packet = [
        0x3A, 0x0C, 0x00, 0x03, b'a', b'/', b'b', 0x00, 0x01, b'h', b'e', b'l', b'l', b'o',
    ];

    assert_eq!(codec::parse_message_type(&packet), Ok(PacketType::Publish));
    assert_eq!(codec::parse_qos(&packet), Ok(QoS::AtLeastOnce));
    assert!(codec::parse_duplicate(&packet));
    assert!(!codec::parse_retain(&packet));
    assert_eq!(codec::parse_publish_topic(&packet), Ok("a/b"));
    assert_eq!(codec::parse_packet_id(&packet), Ok(Some(1)));
    assert_eq!(codec::parse_publish_payload(&packet), Ok(&b"hello"[..]));

    let publish = Publish::parse(&packet).unwrap();
    assert_eq!(publish.topic, "a/b");
    assert_eq!(publish.payload, b"hello");
    assert!(publish.dup);
}

#[test]
fn test_parse_qos0_publish_has_no_packet_id() {
    let packet = [0x31, 0x04, 0x00, 0x01, b't', b'v'];

    assert_eq!(codec::parse_packet_id(&packet), Ok(None));
    assert!(codec::parse_retain(&packet));
    assert_eq!(codec::parse_publish_payload(&packet), Ok(&b"v"[..]));
}

#[test]
fn test_parse_with_two_byte_length() {
    let payload = [0x5Au8; 200];
    let mut vh = heapless::Vec::<u8, 16>::new();
    codec::encode_publish_header(&mut vh, "big", None).unwrap();
    let mut packet = [0u8; 256];
    let len = codec::encode_packet(&mut packet, 0x30, &[vh.as_slice(), &payload]).unwrap();

    assert_eq!(len, 3 + 5 + 200);
    assert_eq!(&packet[1..3], &[0xCD, 0x01]);
    assert_eq!(codec::parse_publish_topic(&packet[..len]), Ok("big"));
    assert_eq!(codec::parse_publish_payload(&packet[..len]), Ok(&payload[..]));
}

#[test]
fn test_parse_rejects_truncated_packets() {
    // Remaining length says 12, only 4 bytes follow.
    let packet = [0x32, 0x0C, 0x00, 0x03, b'a', b'/'];
    assert_eq!(codec::parse_publish_topic(&packet), Err(Error::ProtocolError));
    // Topic length runs past the body.
    let packet = [0x30, 0x03, 0x00, 0x09, b'a'];
    assert_eq!(codec::parse_publish_topic(&packet), Err(Error::ProtocolError));
    assert_eq!(codec::parse_message_type(&[0x00]), Err(Error::ProtocolError));
    assert_eq!(codec::parse_message_type(&[]), Err(Error::ProtocolError));
    // QoS 3 is reserved.
    assert_eq!(codec::parse_qos(&[0x36]), Err(Error::ProtocolError));
}

#[test]
fn test_ack_and_empty_packets() {
    let mut out = [0u8; 4];
    assert_eq!(codec::encode_ack(&mut out, 0x40, 0x1234), Ok(4));
    assert_eq!(out, [0x40, 0x02, 0x12, 0x34]);
    assert_eq!(codec::parse_packet_id(&out), Ok(Some(0x1234)));

    assert_eq!(codec::encode_empty(&mut out, 0xC0), Ok(2));
    assert_eq!(&out[..2], &[0xC0, 0x00]);
    assert_eq!(codec::encode_empty(&mut [], 0xC0), Err(Error::InvalidParameter));
}

#[test]
fn test_random_payloads_survive_encoding() {
    let mut rng = StdRng::seed_from_u64(0x4D51_5454);
    let mut vh = heapless::Vec::<u8, 64>::new();
    let mut packet = [0u8; 1100];

    for _ in 0..64 {
        let mut payload = vec![0u8; rng.gen_range(0..1024)];
        rng.fill(&mut payload[..]);
        let packet_id: u16 = rng.gen_range(1..=u16::MAX);

        codec::encode_publish_header(&mut vh, "sensors/raw", Some(packet_id)).unwrap();
        let len = codec::encode_packet(&mut packet, 0x34, &[vh.as_slice(), &payload]).unwrap();

        let publish = Publish::parse(&packet[..len]).unwrap();
        assert_eq!(publish.topic, "sensors/raw");
        assert_eq!(publish.packet_id, Some(packet_id));
        assert_eq!(publish.qos, QoS::ExactlyOnce);
        assert_eq!(publish.payload, &payload[..]);
    }
}

#[test]
fn test_reader_reassembles_trickled_packets() {
    let stream = [
        0x20, 0x02, 0x00, 0x00, // CONNACK
        0x30, 0x04, 0x00, 0x01, b't', b'v', // PUBLISH
        0xD0, 0x00, // PINGRESP
    ];
    let mut src = Trickle {
        data: &stream,
        step: 1,
    };
    let mut reader = PacketReader::new();
    let mut buf = [0u8; 32];

    assert_eq!(reader.poll(&mut src, &mut buf), Ok(Some(4)));
    assert_eq!(&buf[..4], &stream[..4]);
    assert_eq!(reader.poll(&mut src, &mut buf), Ok(Some(6)));
    assert_eq!(&buf[..6], &stream[4..10]);
    assert_eq!(reader.poll(&mut src, &mut buf), Ok(Some(2)));
    assert_eq!(reader.poll(&mut src, &mut buf), Ok(None));
    assert!(!reader.in_progress());
}

#[test]
fn test_reader_keeps_partial_packet() {
    let mut reader = PacketReader::new();
    let mut buf = [0u8; 32];

    let mut first = Trickle {
        data: &[0x90, 0x03, 0x00],
        step: 8,
    };
    assert_eq!(reader.poll(&mut first, &mut buf), Ok(None));
    assert!(reader.in_progress());

    let mut rest = Trickle {
        data: &[0x05, 0x01],
        step: 8,
    };
    assert_eq!(reader.poll(&mut rest, &mut buf), Ok(Some(5)));
    assert_eq!(codec::parse_packet_id(&buf[..5]), Ok(Some(5)));
}

#[test]
fn test_reader_rejects_oversized_and_malformed() {
    let mut reader = PacketReader::new();
    let mut buf = [0u8; 8];

    let mut oversized = Trickle {
        data: &[0x30, 0x10],
        step: 8,
    };
    assert_eq!(
        reader.poll(&mut oversized, &mut buf),
        Err(Error::ProtocolError)
    );
    assert!(!reader.in_progress());

    let mut malformed = Trickle {
        data: &[0x30, 0xFF, 0xFF, 0xFF, 0xFF],
        step: 8,
    };
    let mut big = [0u8; 16];
    assert_eq!(
        reader.poll(&mut malformed, &mut big),
        Err(Error::ProtocolError)
    );

    assert_eq!(reader.poll(&mut Broken, &mut buf), Err(Error::ReadError));
}

#[test]
fn test_reader_rejects_overcounting_transport() {
    let mut reader = PacketReader::new();
    let mut buf = [0u8; 8];
    assert_eq!(reader.poll(&mut Overcount, &mut buf), Err(Error::ReadError));
}
