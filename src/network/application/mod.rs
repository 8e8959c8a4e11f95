//! # Application Layer Network Protocols
//!
//! Application layer (OSI Layer 7) protocols built on the core network
//! traits. Every protocol here follows the same rules:
//!
//! - **Connection Agnostic**: Work with any type implementing [`Connection`](crate::network::Connection)
//! - **No-std Compatible**: Designed for embedded systems without heap allocation
//! - **Resource Conscious**: Use fixed-size buffers and minimal memory
//! - **Error Handling**: Report failures through [`Error`](crate::network::error::Error)

/// MQTT client implementation.
///
/// Provides a poll-driven MQTT 3.1.1 client session for lightweight
/// publish-subscribe messaging, commonly used in IoT applications.
pub mod mqtt;
