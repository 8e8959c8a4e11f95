//! Client configuration loaded from JSON.
//!
//! Devices usually ship their broker settings in flash as a small JSON
//! document. [`Config`] borrows its strings from that document, so parsing
//! allocates nothing.

use super::session::{AddressKind, DEFAULT_PORT, Options};
use crate::network::error::Error;
use serde::Deserialize;

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_keep_alive() -> u16 {
    60
}

const fn default_clean_session() -> bool {
    true
}

const fn default_max_topic_len() -> usize {
    128
}

/// Broker settings and client options.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::{AddressKind, Config};
///
/// let config = Config::from_json(
///     r#"{"client_id":"node-7","server":"broker.local","username":"node","password":"secret"}"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.port, 1883);
/// assert_eq!(config.keep_alive_seconds, 60);
/// assert!(config.clean_session);
/// assert_eq!(config.address_kind(), AddressKind::Hostname);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Config<'a> {
    /// Client identifier.
    pub client_id: &'a str,
    /// Broker address, literal or hostname.
    pub server: &'a str,
    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// How to read `server`; guessed from its shape when absent.
    #[serde(default)]
    pub address_kind: Option<AddressKind>,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u16,
    /// Ask the broker to discard any previous session.
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,
    /// Longest topic the application uses.
    #[serde(default = "default_max_topic_len")]
    pub max_topic_len: usize,
    /// Optional username.
    #[serde(default, borrow)]
    pub username: Option<&'a str>,
    /// Optional password.
    #[serde(default, borrow)]
    pub password: Option<&'a str>,
}

impl<'a> Config<'a> {
    /// Parse a JSON document.
    ///
    /// Strings must not contain escape sequences, since they are borrowed
    /// from `json` as is.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if the document is malformed or a
    /// required field is missing.
    pub fn from_json(json: &'a str) -> Result<Self, Error> {
        match serde_json_core::from_str::<Config<'a>>(json) {
            Ok((config, _)) => Ok(config),
            Err(_) => {
                warn!("malformed client configuration");
                Err(Error::InvalidParameter)
            }
        }
    }

    /// The address kind, explicit or guessed from `server`.
    pub fn address_kind(&self) -> AddressKind {
        self.address_kind
            .unwrap_or_else(|| AddressKind::detect(self.server))
    }

    /// The options to initialize a client with.
    pub fn options(&self) -> Options<'a> {
        Options {
            client_id: self.client_id,
            max_topic_len: self.max_topic_len,
        }
    }
}
