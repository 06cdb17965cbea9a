//! UNSUBACK: the server's acknowledgement of an UNSUBSCRIBE. Shares the
//! generic 4-byte ack shape.
use super::PacketType;
use crate::error::MqttStatus;
use crate::packet::ack::{deserialize_ack, get_ack_packet_size, serialize_ack};

pub fn get_unsuback_packet_size() -> (u32, usize) {
    get_ack_packet_size()
}

pub fn serialize_unsuback(packet_identifier: u16, buf: &mut [u8]) -> Result<usize, MqttStatus> {
    serialize_ack(PacketType::UnsubAck, 0, packet_identifier, buf)
}

pub fn deserialize_unsuback(packet: &[u8]) -> Result<u16, MqttStatus> {
    deserialize_ack(PacketType::UnsubAck, 0, packet)
}
