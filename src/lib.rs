//! A transport-agnostic, allocation-free MQTT 3.1.1 client protocol engine
//! for constrained devices.
//!
//! This crate performs no I/O of its own. The caller supplies a
//! [`transport::Transport`], a [`transport::Clock`], an
//! [`transport::EventHandler`], and a single fixed byte buffer; the
//! [`engine::Connection`] drives the connection through a cooperative
//! [`engine::Connection::process_loop`] that the caller invokes repeatedly,
//! typically once per scheduler tick.
//!
//! No thread is spawned, nothing on the heap is allocated by this crate, and
//! every packet — outbound or inbound — is assembled inside the one buffer
//! the caller hands to [`engine::Connection::init`].
#![cfg_attr(not(any(feature = "std", test)), no_std)]
pub mod engine;
pub mod error;
pub mod header;
pub mod packet;
pub mod state;
pub mod time;
pub mod transport;
pub mod varint;

pub use engine::{Connection, ConnectOptions, ConnectionStatus};
pub use error::MqttStatus;
pub use packet::{PacketType, QoS};
pub use transport::{Clock, Event, EventHandler, IncomingPublish, Transport};
