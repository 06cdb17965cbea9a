//! CONNECT: the first packet a client sends after the transport connects.
use super::{field_size, write_field, write_u16, PacketType, QoS};
use crate::error::MqttStatus;
use crate::varint;

/// A will message to publish on the client's behalf if the connection is lost
/// ungracefully.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Will<'a> {
    pub topic: &'a str,
    pub message: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

/// Everything needed to serialize a CONNECT packet. Fields borrow from the
/// caller; nothing here owns an allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnectInfo<'a> {
    pub client_id: &'a str,
    pub clean_session: bool,
    pub keep_alive_seconds: u16,
    pub will: Option<Will<'a>>,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
}

impl<'a> ConnectInfo<'a> {
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            clean_session: true,
            keep_alive_seconds: 0,
            will: None,
            username: None,
            password: None,
        }
    }

    fn validate(&self) -> Result<(), MqttStatus> {
        // [MQTT-3.1.3-7] A zero-length client id requires clean_session = true.
        if self.client_id.is_empty() && !self.clean_session {
            return Err(MqttStatus::BadParameter);
        }
        if self.client_id.contains('\u{0}') {
            return Err(MqttStatus::BadParameter);
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(MqttStatus::BadParameter);
        }
        Ok(())
    }

    fn connect_flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.clean_session || self.client_id.is_empty() {
            flags |= 0x02;
        }
        if let Some(will) = &self.will {
            flags |= 0x04;
            flags |= (will.qos as u8) << 3;
            if will.retain {
                flags |= 0x20;
            }
        }
        if self.username.is_some() {
            flags |= 0x80;
        }
        if self.password.is_some() {
            flags |= 0x40;
        }
        flags
    }

    fn variable_header_len(&self) -> usize {
        // "MQTT" field (6) + protocol level (1) + connect flags (1) + keep alive (2)
        10
    }

    fn payload_len(&self) -> usize {
        let mut len = field_size(self.client_id.len());
        if let Some(will) = &self.will {
            len += field_size(will.topic.len());
            len += field_size(will.message.len());
        }
        if let Some(username) = self.username {
            len += field_size(username.len());
        }
        if let Some(password) = self.password {
            len += field_size(password.len());
        }
        len
    }
}

/// Compute `(remaining_length, total_size)` for a CONNECT packet without serializing it.
pub fn get_connect_packet_size(info: &ConnectInfo) -> Result<(u32, usize), MqttStatus> {
    info.validate()?;
    let remaining_length = (info.variable_header_len() + info.payload_len()) as u32;
    let total_size = 1 + varint::encoded_size(remaining_length) + remaining_length as usize;
    Ok((remaining_length, total_size))
}

/// Serialize a CONNECT packet into `buf`. Returns the number of bytes written.
pub fn serialize_connect(info: &ConnectInfo, buf: &mut [u8]) -> Result<usize, MqttStatus> {
    let (remaining_length, total_size) = get_connect_packet_size(info)?;
    if buf.len() < total_size {
        return Err(MqttStatus::NoMemory);
    }

    buf[0] = (PacketType::Connect as u8) << 4;
    let mut offset = 1 + varint::encode(remaining_length, &mut buf[1..])?;

    offset += write_field(b"MQTT", &mut buf[offset..])?;
    buf[offset] = 0x04; // protocol level: MQTT 3.1.1
    offset += 1;
    buf[offset] = info.connect_flags();
    offset += 1;
    write_u16(info.keep_alive_seconds, &mut buf[offset..])?;
    offset += 2;

    offset += write_field(info.client_id.as_bytes(), &mut buf[offset..])?;
    if let Some(will) = &info.will {
        offset += write_field(will.topic.as_bytes(), &mut buf[offset..])?;
        offset += write_field(will.message, &mut buf[offset..])?;
    }
    if let Some(username) = info.username {
        offset += write_field(username.as_bytes(), &mut buf[offset..])?;
    }
    if let Some(password) = info.password {
        offset += write_field(password, &mut buf[offset..])?;
    }

    debug_assert_eq!(offset, total_size);
    Ok(offset)
}
