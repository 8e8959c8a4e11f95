//! MQTT 3.1.1 control packet vocabulary.
//!
//! Packet types, quality of service levels, CONNACK return codes and the
//! decoded view of an inbound PUBLISH.

use super::codec;
use crate::network::error::Error;
use heapless::{String, Vec};

// First byte of each control packet, reserved flag bits included.
pub(crate) const CONNECT: u8 = 0x10;
pub(crate) const PUBLISH: u8 = 0x30;
pub(crate) const PUBACK: u8 = 0x40;
pub(crate) const PUBREC: u8 = 0x50;
pub(crate) const PUBREL: u8 = 0x62;
pub(crate) const PUBCOMP: u8 = 0x70;
pub(crate) const SUBSCRIBE: u8 = 0x82;
pub(crate) const UNSUBSCRIBE: u8 = 0xA2;
pub(crate) const PINGREQ: u8 = 0xC0;
pub(crate) const DISCONNECT: u8 = 0xE0;

/// PUBLISH fixed header flag bits.
pub(crate) const FLAG_DUP: u8 = 0x08;
pub(crate) const FLAG_RETAIN: u8 = 0x01;

/// MQTT 3.1.1 protocol name.
pub(crate) const PROTOCOL_NAME: &[u8] = b"MQTT";
/// MQTT protocol level for version 3.1.1.
pub(crate) const PROTOCOL_LEVEL: u8 = 4;

/// MQTT control packet types, the high nibble of the first header byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    /// Client request to connect to the broker.
    Connect = 1,
    /// Connect acknowledgment.
    ConnAck = 2,
    /// Publish message.
    Publish = 3,
    /// Publish acknowledgment (QoS 1).
    PubAck = 4,
    /// Publish received (QoS 2, part 1).
    PubRec = 5,
    /// Publish release (QoS 2, part 2).
    PubRel = 6,
    /// Publish complete (QoS 2, part 3).
    PubComp = 7,
    /// Subscribe request.
    Subscribe = 8,
    /// Subscribe acknowledgment.
    SubAck = 9,
    /// Unsubscribe request.
    Unsubscribe = 10,
    /// Unsubscribe acknowledgment.
    UnsubAck = 11,
    /// Ping request.
    PingReq = 12,
    /// Ping response.
    PingResp = 13,
    /// Client is disconnecting.
    Disconnect = 14,
}

impl PacketType {
    /// Decode the packet type from a fixed header byte.
    pub fn from_header(byte: u8) -> Option<Self> {
        match byte >> 4 {
            1 => Some(Self::Connect),
            2 => Some(Self::ConnAck),
            3 => Some(Self::Publish),
            4 => Some(Self::PubAck),
            5 => Some(Self::PubRec),
            6 => Some(Self::PubRel),
            7 => Some(Self::PubComp),
            8 => Some(Self::Subscribe),
            9 => Some(Self::SubAck),
            10 => Some(Self::Unsubscribe),
            11 => Some(Self::UnsubAck),
            12 => Some(Self::PingReq),
            13 => Some(Self::PingResp),
            14 => Some(Self::Disconnect),
            _ => None,
        }
    }

    /// Whether the variable header starts with a packet identifier.
    pub fn is_acknowledgment(self) -> bool {
        matches!(
            self,
            Self::PubAck | Self::PubRec | Self::PubRel | Self::PubComp | Self::SubAck | Self::UnsubAck
        )
    }
}

/// Quality of Service levels for MQTT messages.
///
/// QoS defines the guarantee of delivery for a specific message. Higher QoS levels
/// provide stronger delivery guarantees but require more network overhead and
/// client state management.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::QoS;
///
/// assert_eq!(QoS::AtMostOnce as u8, 0);
/// assert_eq!(QoS::AtLeastOnce as u8, 1);
/// assert_eq!(QoS::ExactlyOnce as u8, 2);
/// assert_eq!(QoS::from_bits(3), None);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// **QoS 0**: At most once delivery. Fire and forget.
    #[default]
    AtMostOnce = 0,

    /// **QoS 1**: At least once delivery, acknowledged with PUBACK.
    AtLeastOnce = 1,

    /// **QoS 2**: Exactly once delivery, through PUBREC/PUBREL/PUBCOMP.
    ExactlyOnce = 2,
}

impl QoS {
    /// Decode a QoS level from its two-bit wire value.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

/// CONNACK return codes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectReturnCode {
    /// Connection accepted.
    Accepted,
    /// The broker does not support MQTT 3.1.1.
    UnacceptableProtocolVersion,
    /// The client identifier is not allowed.
    IdentifierRejected,
    /// The MQTT service is unavailable.
    ServerUnavailable,
    /// The username or password is malformed.
    BadUsernameOrPassword,
    /// The client is not authorized to connect.
    NotAuthorized,
}

impl ConnectReturnCode {
    /// Decode a CONNACK return code byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Accepted),
            1 => Some(Self::UnacceptableProtocolVersion),
            2 => Some(Self::IdentifierRejected),
            3 => Some(Self::ServerUnavailable),
            4 => Some(Self::BadUsernameOrPassword),
            5 => Some(Self::NotAuthorized),
            _ => None,
        }
    }
}

/// A PUBLISH packet received from the broker, borrowed from the receive
/// buffer.
///
/// The view is only valid inside the publish callback. Use
/// [`PublishPacket`] to keep a copy.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Publish<'a> {
    /// The topic the message was published on.
    pub topic: &'a str,
    /// The message payload.
    pub payload: &'a [u8],
    /// Packet identifier, present for QoS 1 and QoS 2.
    pub packet_id: Option<u16>,
    /// Delivery guarantee requested by the sender.
    pub qos: QoS,
    /// Set when the broker is re-delivering the message.
    pub dup: bool,
    /// Set when the message was a retained one.
    pub retain: bool,
}

impl<'a> Publish<'a> {
    /// Decode a complete PUBLISH packet, fixed header included.
    pub fn parse(packet: &'a [u8]) -> Result<Self, Error> {
        if codec::parse_message_type(packet)? != PacketType::Publish {
            return Err(Error::ProtocolError);
        }
        Ok(Self {
            topic: codec::parse_publish_topic(packet)?,
            payload: codec::parse_publish_payload(packet)?,
            packet_id: codec::parse_packet_id(packet)?,
            qos: codec::parse_qos(packet)?,
            dup: codec::parse_duplicate(packet),
            retain: codec::parse_retain(packet),
        })
    }
}

/// An owned copy of an inbound MQTT publish message.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::{Publish, PublishPacket, QoS};
///
/// let view = Publish {
///     topic: "sensors/temperature",
///     payload: b"23.5",
///     packet_id: None,
///     qos: QoS::AtMostOnce,
///     dup: false,
///     retain: false,
/// };
/// let packet = PublishPacket::try_from(&view).unwrap();
///
/// assert_eq!(packet.topic.as_str(), "sensors/temperature");
/// assert_eq!(&packet.payload[..], b"23.5");
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic on which the message was published.
    ///
    /// Maximum length is 256 characters to fit within embedded memory constraints.
    pub topic: String<256>,

    /// The message payload data.
    ///
    /// Maximum size is 1024 bytes to balance functionality with memory usage.
    pub payload: Vec<u8, 1024>,

    /// Packet identifier, present for QoS 1 and QoS 2.
    pub packet_id: Option<u16>,

    /// Delivery guarantee requested by the sender.
    pub qos: QoS,

    /// Whether the message was retained by the broker.
    pub retain: bool,
}

impl TryFrom<&Publish<'_>> for PublishPacket {
    type Error = Error;

    fn try_from(publish: &Publish<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            topic: String::try_from(publish.topic).map_err(|_| Error::InvalidParameter)?,
            payload: Vec::from_slice(publish.payload).map_err(|_| Error::InvalidParameter)?,
            packet_id: publish.packet_id,
            qos: publish.qos,
            retain: publish.retain,
        })
    }
}
