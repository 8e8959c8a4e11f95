//! Session events and the callbacks that receive them.

use super::packet::Publish;
use crate::network::error::Error;

/// A generic session event: connect acknowledgment, the acknowledgment
/// family, or an error that is about to tear the session down.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event<'a> {
    /// The broker answered CONNECT.
    ConnAck {
        /// The broker still holds state from a previous session.
        session_present: bool,
        /// Raw return code; 0 means accepted.
        return_code: u8,
    },
    /// A QoS 1 publish was acknowledged.
    PubAck(u16),
    /// A QoS 2 publish was received by the broker.
    PubRec(u16),
    /// The broker released an inbound QoS 2 publish.
    PubRel(u16),
    /// A QoS 2 publish completed.
    PubComp(u16),
    /// A subscription was acknowledged.
    SubAck {
        /// Identifier of the SUBSCRIBE being acknowledged.
        packet_id: u16,
        /// Granted QoS per topic filter, or 0x80 for failure.
        return_codes: &'a [u8],
    },
    /// An unsubscription was acknowledged.
    UnsubAck(u16),
    /// A transport or protocol failure.
    Error(Error),
}

/// Callbacks registered with a client session.
///
/// All methods default to doing nothing, so implementors only override
/// what they care about. They are called from inside
/// [`Client::poll`](super::Client::poll) and must not block.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::{Event, Handler, Publish};
///
/// #[derive(Default)]
/// struct Counter {
///     messages: usize,
///     drops: usize,
/// }
///
/// impl Handler for Counter {
///     fn on_publish(&mut self, _publish: &Publish<'_>) {
///         self.messages += 1;
///     }
///
///     fn on_disconnect(&mut self) {
///         self.drops += 1;
///     }
/// }
/// ```
pub trait Handler {
    /// A generic event arrived.
    fn on_event(&mut self, event: Event<'_>) {
        let _ = event;
    }

    /// A PUBLISH arrived on a subscribed topic.
    ///
    /// QoS 1 and 2 deliveries are not acknowledged automatically; call
    /// [`Client::publish_ack`](super::Client::publish_ack) or
    /// [`Client::publish_received`](super::Client::publish_received).
    fn on_publish(&mut self, publish: &Publish<'_>) {
        let _ = publish;
    }

    /// The session went back to idle after being online.
    fn on_disconnect(&mut self) {}
}

/// A handler that ignores everything.
impl Handler for () {}
