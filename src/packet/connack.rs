//! CONNACK: the server's reply to CONNECT.
use super::PacketType;
use crate::error::MqttStatus;

/// The reason a server refused a connection, carried in CONNACK's return code byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadUsernameOrPassword = 4,
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    fn from_byte(byte: u8) -> Result<Self, MqttStatus> {
        match byte {
            0 => Ok(Self::Accepted),
            1 => Ok(Self::UnacceptableProtocolVersion),
            2 => Ok(Self::IdentifierRejected),
            3 => Ok(Self::ServerUnavailable),
            4 => Ok(Self::BadUsernameOrPassword),
            5 => Ok(Self::NotAuthorized),
            _ => Err(MqttStatus::BadResponse),
        }
    }
}

/// A decoded CONNACK.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnAck {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

/// Parse a complete 4-byte CONNACK packet.
pub fn deserialize_connack(packet: &[u8]) -> Result<ConnAck, MqttStatus> {
    if packet.len() != 4 {
        return Err(MqttStatus::BadResponse);
    }
    if packet[0] != (PacketType::ConnAck as u8) << 4 {
        return Err(MqttStatus::BadResponse);
    }
    if packet[1] != 2 {
        return Err(MqttStatus::BadResponse);
    }
    // [MQTT-3.2.2-1] Bits 7-1 of the connect acknowledge flags are reserved.
    if packet[2] & 0xFE != 0 {
        return Err(MqttStatus::BadResponse);
    }
    let session_present = packet[2] & 0x01 != 0;
    let return_code = ConnectReturnCode::from_byte(packet[3])?;

    // [MQTT-3.2.2-4] If not Accepted, session_present must be false.
    if return_code != ConnectReturnCode::Accepted && session_present {
        return Err(MqttStatus::BadResponse);
    }

    Ok(ConnAck {
        session_present,
        return_code,
    })
}
