//! # libiot-mqtt - MQTT 3.1.1 client for IoT devices
//!
//! A poll-driven MQTT 3.1.1 client session for embedded systems. It runs in
//! `no_std` environments on fixed-size buffers and talks to the broker
//! through a small set of network traits the target implements once for its
//! TCP/IP stack.
//!
//! ## Features
//!
//! - Wire codec for every MQTT 3.1.1 control packet the client sends or receives
//! - Connection state machine driven from the host's periodic scheduler
//! - QoS 0, 1 and 2 publishing, subscribe and unsubscribe
//! - Keep-alive scheduling with PINGREQ
//! - Asynchronous hostname resolution without callbacks
//! - Username/password authentication and last-will messages
//! - JSON configuration through `serde-json-core`
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libiot-mqtt = "0.1.0"
//! ```
//!
//! Then implement [`network::Connect`], [`network::Resolve`] and
//! [`network::application::mqtt::Platform`] for the target, create a
//! [`network::application::mqtt::Client`] and call its `poll` method
//! periodically.
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `log`: Route diagnostics through the `log` facade
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://shishir-dey.github.io/libiot/")]

// Must come first so the logging macros are visible in every module.
#[macro_use]
mod fmt;

/// Network abstraction layer and the MQTT client built on it.
///
/// The traits here describe the byte streams, connectors and resolvers a
/// target provides; the protocol implementation lives in
/// [`network::application::mqtt`].
pub mod network;
