//! DISCONNECT: graceful connection teardown, two fixed bytes.
use super::PacketType;
use crate::error::MqttStatus;

const DISCONNECT: [u8; 2] = [(PacketType::Disconnect as u8) << 4, 0];

pub fn get_disconnect_packet_size() -> (u32, usize) {
    (0, DISCONNECT.len())
}

pub fn serialize_disconnect(buf: &mut [u8]) -> Result<usize, MqttStatus> {
    if buf.len() < DISCONNECT.len() {
        return Err(MqttStatus::NoMemory);
    }
    buf[..DISCONNECT.len()].copy_from_slice(&DISCONNECT);
    Ok(DISCONNECT.len())
}
