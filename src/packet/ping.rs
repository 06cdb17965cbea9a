//! PINGREQ and PINGRESP: zero-payload keep-alive packets, two bytes each.
use super::PacketType;
use crate::error::MqttStatus;

const PINGREQ: [u8; 2] = [(PacketType::PingReq as u8) << 4, 0];
const PINGRESP: [u8; 2] = [(PacketType::PingResp as u8) << 4, 0];

pub fn get_pingreq_packet_size() -> (u32, usize) {
    (0, PINGREQ.len())
}

pub fn serialize_pingreq(buf: &mut [u8]) -> Result<usize, MqttStatus> {
    if buf.len() < PINGREQ.len() {
        return Err(MqttStatus::NoMemory);
    }
    buf[..PINGREQ.len()].copy_from_slice(&PINGREQ);
    Ok(PINGREQ.len())
}

pub fn get_pingresp_packet_size() -> (u32, usize) {
    (0, PINGRESP.len())
}

pub fn serialize_pingresp(buf: &mut [u8]) -> Result<usize, MqttStatus> {
    if buf.len() < PINGRESP.len() {
        return Err(MqttStatus::NoMemory);
    }
    buf[..PINGRESP.len()].copy_from_slice(&PINGRESP);
    Ok(PINGRESP.len())
}

/// Validate that `packet` is a well-formed PINGRESP: exactly the two fixed bytes.
pub fn deserialize_pingresp(packet: &[u8]) -> Result<(), MqttStatus> {
    if packet == PINGRESP {
        Ok(())
    } else {
        Err(MqttStatus::BadResponse)
    }
}
