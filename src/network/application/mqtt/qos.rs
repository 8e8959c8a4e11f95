//! Outbound packet construction: publish, subscribe, unsubscribe and the
//! acknowledgments a receiver owes the broker.
//!
//! Every request checks its arguments before touching the buffers, checks
//! that the broker session is active, then assembles the packet in the send
//! buffer and transmits it in one go. Identifiers come from the session
//! counter, which moves only when the broker acknowledges.

use super::client::Client;
use super::codec;
use super::event::Handler;
use super::packet::{
    FLAG_RETAIN, PINGREQ, PacketType, PUBACK, PUBCOMP, PUBLISH, PUBREC, PUBREL, QoS, SUBSCRIBE,
    UNSUBSCRIBE,
};
use super::platform::Platform;
use crate::network::error::Error;
use crate::network::{Connect, Resolve};

impl<N, P, H, const TX: usize, const RX: usize> Client<N, P, H, TX, RX>
where
    N: Connect + Resolve,
    P: Platform,
    H: Handler,
{
    /// Publish `payload` on `topic` at QoS 0.
    ///
    /// Returns 0, the identifier of a QoS 0 publish.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidParameter`] - Empty or wildcard topic, topic longer
    ///   than the configured maximum, or a packet that does not fit the send
    ///   buffer
    /// * [`Error::Offline`] - The broker has not accepted the session
    /// * [`Error::WriteError`] - The transport failed
    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<u16, Error> {
        self.publish_with_qos(topic, payload, retain, QoS::AtMostOnce)
    }

    /// Publish `payload` on `topic` at the given QoS.
    ///
    /// Returns the packet identifier the message was sent with. For QoS 1
    /// the broker answers with PUBACK, for QoS 2 with PUBREC; both arrive as
    /// [`Event`](super::Event)s.
    pub fn publish_with_qos(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
        qos: QoS,
    ) -> Result<u16, Error> {
        self.session.check_topic(topic)?;
        if topic.contains(['+', '#']) {
            return Err(Error::InvalidParameter);
        }
        self.ensure_active()?;

        let packet_id = match qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce | QoS::ExactlyOnce => Some(self.session.sequence.current()),
        };
        codec::encode_publish_header(&mut self.session.scratch, topic, packet_id)?;

        let mut header = PUBLISH | ((qos as u8) << 1);
        if retain {
            header |= FLAG_RETAIN;
        }
        let len = codec::encode_packet(
            &mut self.session.tx,
            header,
            &[self.session.scratch.as_slice(), payload],
        )?;
        self.transmit(len)?;
        Ok(packet_id.unwrap_or(0))
    }

    /// Subscribe to `topic` with the requested maximum QoS.
    ///
    /// Returns the packet identifier; the broker's SUBACK carries the same
    /// one.
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<u16, Error> {
        self.session.check_topic(topic)?;
        self.ensure_active()?;

        let packet_id = self.session.sequence.current();
        codec::encode_subscription(&mut self.session.scratch, packet_id, topic, Some(qos))?;
        let len = codec::encode_packet(
            &mut self.session.tx,
            SUBSCRIBE,
            &[self.session.scratch.as_slice()],
        )?;
        self.transmit(len)?;

        debug!("SUBSCRIBE {} id {}", topic, packet_id);
        Ok(packet_id)
    }

    /// Unsubscribe from `topic`.
    pub fn unsubscribe(&mut self, topic: &str) -> Result<u16, Error> {
        self.session.check_topic(topic)?;
        self.ensure_active()?;

        let packet_id = self.session.sequence.current();
        codec::encode_subscription(&mut self.session.scratch, packet_id, topic, None)?;
        let len = codec::encode_packet(
            &mut self.session.tx,
            UNSUBSCRIBE,
            &[self.session.scratch.as_slice()],
        )?;
        self.transmit(len)?;

        debug!("UNSUBSCRIBE {} id {}", topic, packet_id);
        Ok(packet_id)
    }

    /// Acknowledge an inbound QoS 1 publish.
    pub fn publish_ack(&mut self, packet_id: u16) -> Result<(), Error> {
        self.send_ack(PUBACK, packet_id)
    }

    /// Answer an inbound QoS 2 publish with PUBREC.
    pub fn publish_received(&mut self, packet_id: u16) -> Result<(), Error> {
        self.send_ack(PUBREC, packet_id)
    }

    /// Release an outbound QoS 2 publish after the broker's PUBREC.
    pub fn publish_release(&mut self, packet_id: u16) -> Result<(), Error> {
        self.send_ack(PUBREL, packet_id)
    }

    /// Complete an inbound QoS 2 publish after the broker's PUBREL.
    pub fn publish_complete(&mut self, packet_id: u16) -> Result<(), Error> {
        self.send_ack(PUBCOMP, packet_id)
    }

    /// Send a PINGREQ now, regardless of the keep-alive schedule.
    pub fn ping(&mut self) -> Result<(), Error> {
        self.ensure_active()?;
        self.send_control(PINGREQ)
    }

    fn send_ack(&mut self, header: u8, packet_id: u16) -> Result<(), Error> {
        if packet_id == 0 {
            return Err(Error::InvalidParameter);
        }
        self.ensure_active()?;
        let len = codec::encode_ack(&mut self.session.tx, header, packet_id)?;
        self.transmit(len)
    }

    /// Send a two byte packet with no body.
    pub(crate) fn send_control(&mut self, header: u8) -> Result<(), Error> {
        let len = codec::encode_empty(&mut self.session.tx, header)?;
        self.transmit(len)
    }

    /// Send the first `len` bytes of the send buffer.
    pub(crate) fn transmit(&mut self, len: usize) -> Result<(), Error> {
        self.binding.send(&self.session.tx[..len])?;
        self.session.keep_alive.touch();
        if let Some(kind) = PacketType::from_header(self.session.tx[0]) {
            trace!("sent {:?} ({} bytes)", kind, len);
        }
        Ok(())
    }
}
