//! Wire Protocol
//!
//! Defines the messages exchanged between clients and storage nodes, and the
//! one-connection-per-exchange transport that carries them.
//!
//! Every message is a single JSON object built from the fields
//! `command, host, port, filename, content, status, message`. A request names
//! its `command`; a response carries a `status` of exactly `"OK"` or `"ERROR"`.
//! Transport failures never escape as panics: the initiating side always gets
//! a [`transport::TransportError`] value back.

pub mod transport;
pub mod types;
