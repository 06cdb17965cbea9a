//! The three seams the engine is generic over, replacing the C original's
//! function pointers and opaque `void*` contexts with traits. An adapter
//! implements these against whatever concrete transport (TCP socket, serial
//! port, mock) and clock source (`std::time`, an RTOS tick counter) the
//! caller has available.
use crate::error::MqttStatus;
use crate::packet::suback::SubAck;
use crate::packet::QoS;

/// A byte-stream transport: something the engine can write packets to and
/// read packets from. Never called with `buf.is_empty()`.
pub trait Transport {
    /// Write as many of `buf`'s bytes as possible without blocking
    /// indefinitely. Returns the number of bytes written, or an error on a
    /// fatal I/O failure. A return of `0` signals no progress, which the
    /// engine treats as [`MqttStatus::SendFailed`] after any permitted retry.
    fn send(&mut self, buf: &[u8]) -> Result<usize, MqttStatus>;

    /// Read as many bytes as are currently available into `buf`, up to its
    /// length. Returns `0` when no data is available right now — not EOF.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, MqttStatus>;
}

/// A monotonic millisecond clock. 32-bit wraparound is tolerated by every
/// consumer in this crate (see [`crate::time`]).
pub trait Clock {
    fn get_time_ms(&mut self) -> u32;
}

/// Information describing an incoming packet, handed to [`EventHandler`]
/// alongside a decoded publish when relevant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IncomingPublish<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
    pub duplicate: bool,
}

/// The event an engine dispatch produced, handed to the caller's
/// [`EventHandler`] synchronously from within `process_loop`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    /// An inbound PUBLISH was received and (if QoS ≥ 1) acknowledged.
    Publish(IncomingPublish<'a>),
    /// An outbound QoS ≥ 1 publish with this packet id reached `Publish-Done`.
    PublishAcked { packet_identifier: u16 },
    /// A SUBACK was received, carrying the per-filter granted QoS or failure
    /// in the same order the filters were requested in.
    SubAck(SubAck<'a>),
    /// An UNSUBACK was received for this packet id.
    UnsubAck { packet_identifier: u16 },
}

/// The caller's sink for engine-produced events. Invoked synchronously from
/// within `process_loop`; must not call back into the engine.
pub trait EventHandler {
    fn on_event(&mut self, event: Event<'_>);
}
