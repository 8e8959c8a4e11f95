//! MQTT 3.1.1 wire codec.
//!
//! Pure encode/decode routines for the fixed header, the variable-width
//! remaining length field and the fields of a received PUBLISH. Nothing in
//! here does I/O except [`PacketReader`], which pulls bytes from any
//! [`Read`] implementation into a caller-owned buffer.
//!
//! Decoders take a complete packet, fixed header included, and return
//! slices into it. Encoders write into caller-provided buffers and fail with
//! [`Error::InvalidParameter`] instead of truncating.

use super::packet::{
    CONNECT, FLAG_DUP, FLAG_RETAIN, PROTOCOL_LEVEL, PROTOCOL_NAME, PacketType, QoS,
};
use crate::network::Read;
use crate::network::error::Error;
use heapless::Vec;

/// Largest remaining length this client encodes (two length bytes).
pub const MAX_REMAINING_LENGTH: usize = 16_383;

/// Longest remaining length field accepted on input.
pub const MAX_LENGTH_BYTES: usize = 4;

/// Largest fixed header this client emits: the type byte plus two length bytes.
pub const MAX_FIXED_HEADER_LEN: usize = 3;

/// Size of the CONNECT variable header: protocol name, level, flags and keep-alive.
pub const CONNECT_HEADER_LEN: usize = 10;

const CONNECT_FLAG_USERNAME: u8 = 0x80;
const CONNECT_FLAG_PASSWORD: u8 = 0x40;
const CONNECT_FLAG_WILL_RETAIN: u8 = 0x20;
const CONNECT_FLAG_WILL: u8 = 0x04;
const CONNECT_FLAG_CLEAN_SESSION: u8 = 0x02;

/// Encode the remaining length field for an MQTT packet.
///
/// Each output byte carries seven bits of the value, least significant
/// group first; the top bit says another byte follows. Values above
/// [`MAX_REMAINING_LENGTH`] are rejected, which caps the size of every
/// packet this client sends.
///
/// Returns the number of bytes written to `out`.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::codec::encode_remaining_length;
///
/// let mut out = [0u8; 2];
/// assert_eq!(encode_remaining_length(321, &mut out), Ok(2));
/// assert_eq!(out, [0xC1, 0x02]);
/// ```
pub fn encode_remaining_length(len: usize, out: &mut [u8]) -> Result<usize, Error> {
    if len > MAX_REMAINING_LENGTH {
        return Err(Error::InvalidParameter);
    }
    let mut value = len;
    let mut written = 0;
    loop {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        let slot = out.get_mut(written).ok_or(Error::InvalidParameter)?;
        *slot = byte;
        written += 1;
        if value == 0 {
            return Ok(written);
        }
    }
}

/// Incremental decoder for the remaining length field.
///
/// Bytes are fed one at a time as they arrive from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingLength {
    value: usize,
    multiplier: usize,
    count: usize,
}

impl Default for RemainingLength {
    fn default() -> Self {
        Self::new()
    }
}

impl RemainingLength {
    /// Create a decoder expecting the first length byte.
    pub const fn new() -> Self {
        Self {
            value: 0,
            multiplier: 1,
            count: 0,
        }
    }

    /// Feed the next length byte.
    ///
    /// Returns `Ok(Some(len))` once the continuation bit clears and
    /// `Ok(None)` while more bytes are needed. A fifth byte is malformed.
    pub fn push(&mut self, byte: u8) -> Result<Option<usize>, Error> {
        if self.count == MAX_LENGTH_BYTES {
            return Err(Error::ProtocolError);
        }
        self.value += (byte & 0x7F) as usize * self.multiplier;
        self.multiplier *= 128;
        self.count += 1;
        if byte & 0x80 == 0 {
            Ok(Some(self.value))
        } else if self.count == MAX_LENGTH_BYTES {
            Err(Error::ProtocolError)
        } else {
            Ok(None)
        }
    }
}

/// Decode a remaining length field from the start of `bytes`.
///
/// Returns the value and the number of bytes it occupied.
///
/// # Errors
///
/// [`Error::ProtocolError`] if the field runs past four bytes or past the
/// end of `bytes`.
pub fn decode_remaining_length(bytes: &[u8]) -> Result<(usize, usize), Error> {
    let mut decoder = RemainingLength::new();
    for (index, &byte) in bytes.iter().enumerate() {
        if let Some(value) = decoder.push(byte)? {
            return Ok((value, index + 1));
        }
    }
    Err(Error::ProtocolError)
}

/// Split a complete packet into its fixed header byte, header length and
/// remaining length, checking that the body is all there.
fn fixed_header(packet: &[u8]) -> Result<(u8, usize, usize), Error> {
    let (&first, rest) = packet.split_first().ok_or(Error::ProtocolError)?;
    let (remaining, consumed) = decode_remaining_length(rest)?;
    let header_len = 1 + consumed;
    if packet.len() < header_len + remaining {
        return Err(Error::ProtocolError);
    }
    Ok((first, header_len, remaining))
}

/// The variable header and payload of a complete packet.
pub fn body(packet: &[u8]) -> Result<&[u8], Error> {
    let (_, header_len, remaining) = fixed_header(packet)?;
    Ok(&packet[header_len..header_len + remaining])
}

/// Extract the control packet type from the first header byte.
pub fn parse_message_type(packet: &[u8]) -> Result<PacketType, Error> {
    packet
        .first()
        .and_then(|&byte| PacketType::from_header(byte))
        .ok_or(Error::ProtocolError)
}

/// Extract the QoS bits from the first header byte.
pub fn parse_qos(packet: &[u8]) -> Result<QoS, Error> {
    let first = packet.first().ok_or(Error::ProtocolError)?;
    QoS::from_bits((first >> 1) & 0x03).ok_or(Error::ProtocolError)
}

/// Extract the DUP flag from the first header byte.
pub fn parse_duplicate(packet: &[u8]) -> bool {
    packet.first().is_some_and(|byte| byte & FLAG_DUP != 0)
}

/// Extract the RETAIN flag from the first header byte.
pub fn parse_retain(packet: &[u8]) -> bool {
    packet.first().is_some_and(|byte| byte & FLAG_RETAIN != 0)
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, Error> {
    match bytes.get(offset..offset + 2) {
        Some(&[high, low]) => Ok(u16::from_be_bytes([high, low])),
        _ => Err(Error::ProtocolError),
    }
}

/// Length of the topic-length prefix plus topic at the start of a PUBLISH body.
fn topic_field_len(body: &[u8]) -> Result<usize, Error> {
    let len = 2 + read_u16(body, 0)? as usize;
    if body.len() < len {
        return Err(Error::ProtocolError);
    }
    Ok(len)
}

/// Extract the packet identifier.
///
/// A PUBLISH carries one only at QoS 1 and 2, after the topic. The
/// acknowledgment family carries it first thing after the fixed header.
/// Other packets have none.
pub fn parse_packet_id(packet: &[u8]) -> Result<Option<u16>, Error> {
    let kind = parse_message_type(packet)?;
    let body = body(packet)?;
    match kind {
        PacketType::Publish => {
            if parse_qos(packet)? == QoS::AtMostOnce {
                return Ok(None);
            }
            read_u16(body, topic_field_len(body)?).map(Some)
        }
        kind if kind.is_acknowledgment() => read_u16(body, 0).map(Some),
        _ => Ok(None),
    }
}

/// Extract the topic of a PUBLISH packet.
pub fn parse_publish_topic(packet: &[u8]) -> Result<&str, Error> {
    let body = body(packet)?;
    let end = topic_field_len(body)?;
    core::str::from_utf8(&body[2..end]).map_err(|_| Error::ProtocolError)
}

/// Extract the application payload of a PUBLISH packet.
///
/// The payload is what remains of the body after the topic and, for
/// QoS 1 and 2, the packet identifier.
pub fn parse_publish_payload(packet: &[u8]) -> Result<&[u8], Error> {
    let body = body(packet)?;
    let mut offset = topic_field_len(body)?;
    if parse_qos(packet)? != QoS::AtMostOnce {
        offset += 2;
    }
    body.get(offset..).ok_or(Error::ProtocolError)
}

/// Assemble a packet from its header byte and body parts.
///
/// The remaining length is the total size of `parts`. Returns the number
/// of bytes written to `out`.
pub fn encode_packet(out: &mut [u8], header: u8, parts: &[&[u8]]) -> Result<usize, Error> {
    let remaining: usize = parts.iter().map(|part| part.len()).sum();
    let first = out.first_mut().ok_or(Error::InvalidParameter)?;
    *first = header;
    let mut offset = 1 + encode_remaining_length(remaining, &mut out[1..])?;
    if offset + remaining > out.len() {
        return Err(Error::InvalidParameter);
    }
    for part in parts {
        out[offset..offset + part.len()].copy_from_slice(part);
        offset += part.len();
    }
    Ok(offset)
}

/// Encode a four byte acknowledgment-family packet: header, length 2, id.
pub fn encode_ack(out: &mut [u8], header: u8, packet_id: u16) -> Result<usize, Error> {
    encode_packet(out, header, &[&packet_id.to_be_bytes()])
}

/// Encode a two byte packet with an empty body (PINGREQ, DISCONNECT).
pub fn encode_empty(out: &mut [u8], header: u8) -> Result<usize, Error> {
    encode_packet(out, header, &[])
}

fn put<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes).map_err(|_| Error::InvalidParameter)
}

fn put_str<const N: usize>(buf: &mut Vec<u8, N>, value: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(value.len()).map_err(|_| Error::InvalidParameter)?;
    put(buf, &len.to_be_bytes())?;
    put(buf, value)
}

/// Build a PUBLISH variable header into `vh`: topic length, topic and, for
/// QoS 1 and 2, the packet identifier.
pub fn encode_publish_header<const N: usize>(
    vh: &mut Vec<u8, N>,
    topic: &str,
    packet_id: Option<u16>,
) -> Result<(), Error> {
    vh.clear();
    put_str(vh, topic.as_bytes())?;
    if let Some(id) = packet_id {
        put(vh, &id.to_be_bytes())?;
    }
    Ok(())
}

/// Build a SUBSCRIBE or UNSUBSCRIBE body into `buf`: packet identifier,
/// topic filter and, for SUBSCRIBE, the requested QoS byte.
pub fn encode_subscription<const N: usize>(
    buf: &mut Vec<u8, N>,
    packet_id: u16,
    topic: &str,
    qos: Option<QoS>,
) -> Result<(), Error> {
    buf.clear();
    put(buf, &packet_id.to_be_bytes())?;
    put_str(buf, topic.as_bytes())?;
    if let Some(qos) = qos {
        put(buf, &[qos as u8])?;
    }
    Ok(())
}

/// A last-will message registered with the broker at connect time.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LastWill<'a> {
    /// Topic the broker publishes the will on.
    pub topic: &'a str,
    /// Will message payload.
    pub message: &'a [u8],
    /// QoS of the will publish.
    pub qos: QoS,
    /// Whether the broker retains the will message.
    pub retain: bool,
}

/// Everything a CONNECT packet carries.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ConnectFields<'a> {
    /// Client identifier.
    pub client_id: &'a str,
    /// Optional username.
    pub username: Option<&'a str>,
    /// Optional password; MQTT 3.1.1 only allows it with a username.
    pub password: Option<&'a [u8]>,
    /// Optional last-will message.
    pub will: Option<LastWill<'a>>,
    /// Keep-alive interval in seconds, 0 disables it.
    pub keep_alive_seconds: u16,
    /// Ask the broker to discard any previous session.
    pub clean_session: bool,
}

/// Encode a CONNECT packet, building its variable header and payload in
/// `scratch` first.
pub fn encode_connect<const N: usize>(
    out: &mut [u8],
    scratch: &mut Vec<u8, N>,
    fields: &ConnectFields<'_>,
) -> Result<usize, Error> {
    let mut flags = 0;
    if fields.clean_session {
        flags |= CONNECT_FLAG_CLEAN_SESSION;
    }
    if let Some(will) = &fields.will {
        flags |= CONNECT_FLAG_WILL | ((will.qos as u8) << 3);
        if will.retain {
            flags |= CONNECT_FLAG_WILL_RETAIN;
        }
    }
    if fields.username.is_some() {
        flags |= CONNECT_FLAG_USERNAME;
    }
    if fields.password.is_some() {
        flags |= CONNECT_FLAG_PASSWORD;
    }

    // --- Variable Header ---
    scratch.clear();
    put_str(scratch, PROTOCOL_NAME)?;
    put(scratch, &[PROTOCOL_LEVEL, flags])?;
    put(scratch, &fields.keep_alive_seconds.to_be_bytes())?;

    // --- Payload ---
    put_str(scratch, fields.client_id.as_bytes())?;
    if let Some(will) = &fields.will {
        put_str(scratch, will.topic.as_bytes())?;
        put_str(scratch, will.message)?;
    }
    if let Some(username) = fields.username {
        put_str(scratch, username.as_bytes())?;
    }
    if let Some(password) = fields.password {
        put_str(scratch, password)?;
    }

    encode_packet(out, CONNECT, &[scratch.as_slice()])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Length(RemainingLength),
    Body { total: usize },
}

/// Reassembles one packet at a time from a non-blocking byte stream.
///
/// The fixed header byte and the length bytes are read one at a time, then
/// the body is read in as many chunks as the transport hands out. Progress
/// is kept between calls, so a packet split across several polls is never
/// lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketReader {
    stage: Stage,
    filled: usize,
}

impl Default for PacketReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketReader {
    /// Create a reader waiting for the first byte of a packet.
    pub const fn new() -> Self {
        Self {
            stage: Stage::Header,
            filled: 0,
        }
    }

    /// Drop any partially received packet.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether a packet is partially received.
    pub fn in_progress(&self) -> bool {
        self.filled > 0
    }

    /// Pull bytes from `src` into `buf` until a packet is complete or the
    /// transport has nothing more to give.
    ///
    /// Returns `Ok(Some(len))` when `buf[..len]` holds a complete packet,
    /// fixed header included, and `Ok(None)` when more data is needed.
    ///
    /// # Errors
    ///
    /// * [`Error::ReadError`] - The transport failed; treat the link as lost
    /// * [`Error::ProtocolError`] - Malformed length, or a packet larger than `buf`
    pub fn poll<R: Read>(&mut self, src: &mut R, buf: &mut [u8]) -> Result<Option<usize>, Error> {
        loop {
            match self.stage {
                Stage::Header => {
                    if buf.is_empty() {
                        return Err(Error::ProtocolError);
                    }
                    if read(src, &mut buf[..1])? == 0 {
                        return Ok(None);
                    }
                    self.filled = 1;
                    self.stage = Stage::Length(RemainingLength::new());
                }
                Stage::Length(mut length) => {
                    if self.filled >= buf.len() {
                        self.reset();
                        return Err(Error::ProtocolError);
                    }
                    if read(src, &mut buf[self.filled..self.filled + 1])? == 0 {
                        return Ok(None);
                    }
                    let byte = buf[self.filled];
                    self.filled += 1;
                    match length.push(byte) {
                        Ok(Some(remaining)) => {
                            let total = self.filled + remaining;
                            if total > buf.len() {
                                self.reset();
                                return Err(Error::ProtocolError);
                            }
                            self.stage = Stage::Body { total };
                        }
                        Ok(None) => self.stage = Stage::Length(length),
                        Err(e) => {
                            self.reset();
                            return Err(e);
                        }
                    }
                }
                Stage::Body { total } => {
                    if self.filled == total {
                        self.reset();
                        return Ok(Some(total));
                    }
                    let n = read(src, &mut buf[self.filled..total])?;
                    if n == 0 {
                        return Ok(None);
                    }
                    self.filled += n;
                }
            }
        }
    }
}

/// A transport that claims more bytes than it was offered is broken.
fn read<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize, Error> {
    match src.read(buf) {
        Ok(n) if n <= buf.len() => Ok(n),
        _ => Err(Error::ReadError),
    }
}
