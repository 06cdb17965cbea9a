//! Incremental fixed-header reader: feeds bytes one (or a few) at a time and
//! reports when a complete `(packet type, remaining length)` pair is known,
//! so the engine can size its read buffer before the rest of the packet
//! arrives.
use crate::error::MqttStatus;
use crate::packet::{PacketInfo, PacketType};
use crate::varint::{self, DecodeProgress};

/// State of an in-progress fixed-header read, carried across calls to
/// [`FixedHeaderReader::feed`] as bytes trickle in from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedHeaderReader {
    first_byte: Option<u8>,
    length_bytes: heapless::Vec<u8, 4>,
}

impl Default for FixedHeaderReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedHeaderReader {
    pub fn new() -> Self {
        Self {
            first_byte: None,
            length_bytes: heapless::Vec::new(),
        }
    }

    /// Reset to start decoding a fresh fixed header.
    pub fn reset(&mut self) {
        self.first_byte = None;
        self.length_bytes.clear();
    }

    /// Feed the next byte from the transport. Returns `Some(PacketInfo)` once
    /// the fixed header is fully decoded; the reader resets itself before
    /// returning `Some` so it is ready to decode the next packet's header.
    pub fn feed(&mut self, byte: u8) -> Result<Option<PacketInfo>, MqttStatus> {
        let first_byte = match self.first_byte {
            None => {
                self.first_byte = Some(byte);
                return Ok(None);
            }
            Some(first_byte) => first_byte,
        };

        if self.length_bytes.push(byte).is_err() {
            self.reset();
            return Err(MqttStatus::BadResponse);
        }

        match varint::decode_incremental(&self.length_bytes) {
            Ok(DecodeProgress::Incomplete) => Ok(None),
            Ok(DecodeProgress::Done { value, .. }) => {
                let packet_type = PacketType::from_header_byte(first_byte);
                self.reset();
                Ok(Some(PacketInfo {
                    packet_type: packet_type?,
                    remaining_length: value,
                    header_byte: first_byte,
                }))
            }
            Err(status) => {
                self.reset();
                Err(status)
            }
        }
    }

    /// Whether a header byte has been consumed but the length field is not
    /// yet complete. Used by the engine to size a single-byte read request.
    pub fn in_progress(&self) -> bool {
        self.first_byte.is_some()
    }
}
