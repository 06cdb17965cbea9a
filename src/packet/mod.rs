//! The MQTT 3.1.1 packet codec: pure, stateless functions that serialize into and
//! deserialize out of caller-owned buffers. No I/O, no allocation.
use crate::error::MqttStatus;

pub mod ack;
pub mod connack;
pub mod connect;
pub mod disconnect;
pub mod ping;
pub mod publish;
pub mod suback;
pub mod subscribe;
pub mod unsuback;
pub mod unsubscribe;

/// The 14 MQTT 3.1.1 control packet types, identified by the upper nibble of the
/// first fixed-header byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl PacketType {
    /// Decode the packet type from the upper nibble of a fixed-header first byte.
    pub fn from_header_byte(byte: u8) -> Result<Self, MqttStatus> {
        match byte >> 4 {
            1 => Ok(Self::Connect),
            2 => Ok(Self::ConnAck),
            3 => Ok(Self::Publish),
            4 => Ok(Self::PubAck),
            5 => Ok(Self::PubRec),
            6 => Ok(Self::PubRel),
            7 => Ok(Self::PubComp),
            8 => Ok(Self::Subscribe),
            9 => Ok(Self::SubAck),
            10 => Ok(Self::Unsubscribe),
            11 => Ok(Self::UnsubAck),
            12 => Ok(Self::PingReq),
            13 => Ok(Self::PingResp),
            14 => Ok(Self::Disconnect),
            _ => Err(MqttStatus::BadResponse),
        }
    }
}

/// Quality-of-service levels for a PUBLISH exchange.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum QoS {
    /// Fire-and-forget; no acknowledgement, no packet identifier.
    AtMostOnce = 0,
    /// Acknowledged by a single PUBACK.
    AtLeastOnce = 1,
    /// Acknowledged by the four-way PUBREC/PUBREL/PUBCOMP handshake.
    ExactlyOnce = 2,
}

impl QoS {
    pub fn from_bits(bits: u8) -> Result<Self, MqttStatus> {
        match bits {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            _ => Err(MqttStatus::BadResponse),
        }
    }
}

/// The fixed-header information the header reader (`header::FixedHeaderReader`)
/// hands back: packet type, the remaining length that follows it, and the raw
/// first byte (needed to re-check flag bits such as PUBLISH's DUP/QoS/RETAIN
/// or PUBREL's reserved nibble once the rest of the packet is assembled).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PacketInfo {
    pub packet_type: PacketType,
    pub remaining_length: u32,
    pub header_byte: u8,
}

/// Read a big-endian `u16` from the start of `bytes`.
pub(crate) fn read_u16(bytes: &[u8]) -> Result<u16, MqttStatus> {
    if bytes.len() < 2 {
        return Err(MqttStatus::BadResponse);
    }
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Write a big-endian `u16` into the start of `buf`.
pub(crate) fn write_u16(value: u16, buf: &mut [u8]) -> Result<(), MqttStatus> {
    if buf.len() < 2 {
        return Err(MqttStatus::NoMemory);
    }
    buf[..2].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Read a length-prefixed UTF-8 string field (`[len_hi, len_lo, bytes...]`).
/// Returns the string and the number of bytes the field occupied.
pub(crate) fn read_utf8_field(bytes: &[u8]) -> Result<(&str, usize), MqttStatus> {
    let (raw, consumed) = read_binary_field(bytes)?;
    let s = core::str::from_utf8(raw).map_err(|_| MqttStatus::BadResponse)?;
    if s.contains('\u{0}') {
        return Err(MqttStatus::BadResponse);
    }
    Ok((s, consumed))
}

/// Read a length-prefixed binary field (`[len_hi, len_lo, bytes...]`).
pub(crate) fn read_binary_field(bytes: &[u8]) -> Result<(&[u8], usize), MqttStatus> {
    let len = read_u16(bytes)? as usize;
    if bytes.len() < 2 + len {
        return Err(MqttStatus::BadResponse);
    }
    Ok((&bytes[2..2 + len], 2 + len))
}

/// Whether `filter` is a well-formed topic filter for SUBSCRIBE/UNSUBSCRIBE:
/// non-empty, no embedded NUL, and the `#`/`+` wildcards (if present) each
/// occupy an entire topic level, with `#` only as the last level.
pub(crate) fn topic_filter_is_valid(filter: &str) -> bool {
    if filter.is_empty() || filter.contains('\u{0}') {
        return false;
    }
    let level_count = filter.split('/').count();
    for (i, level) in filter.split('/').enumerate() {
        if level.contains('#') && (level != "#" || i != level_count - 1) {
            return false;
        }
        if level.contains('+') && level != "+" {
            return false;
        }
    }
    true
}

/// Size, in bytes, a length-prefixed field of `len` payload bytes occupies on the wire.
pub(crate) const fn field_size(len: usize) -> usize {
    2 + len
}

/// Write a length-prefixed field (`[len_hi, len_lo, bytes...]`) into `buf`.
/// Returns the number of bytes written.
pub(crate) fn write_field(data: &[u8], buf: &mut [u8]) -> Result<usize, MqttStatus> {
    let size = field_size(data.len());
    if buf.len() < size {
        return Err(MqttStatus::NoMemory);
    }
    if data.len() > u16::MAX as usize {
        return Err(MqttStatus::BadParameter);
    }
    write_u16(data.len() as u16, buf)?;
    buf[2..size].copy_from_slice(data);
    Ok(size)
}
