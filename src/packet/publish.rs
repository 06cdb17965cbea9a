//! PUBLISH: application data, carrying an optional packet identifier depending
//! on QoS.
use super::{field_size, read_u16, read_utf8_field, write_field, write_u16, PacketType, QoS};
use crate::error::MqttStatus;
use crate::varint;

/// Everything needed to serialize a PUBLISH packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PublishInfo<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
    pub duplicate: bool,
    /// Ignored when `qos` is `AtMostOnce`; must be non-zero otherwise.
    pub packet_identifier: u16,
}

impl<'a> PublishInfo<'a> {
    pub fn new(topic: &'a str, payload: &'a [u8]) -> Self {
        Self {
            topic,
            payload,
            qos: QoS::AtMostOnce,
            retain: false,
            duplicate: false,
            packet_identifier: 0,
        }
    }

    fn has_packet_identifier(&self) -> bool {
        self.qos != QoS::AtMostOnce
    }

    fn validate(&self) -> Result<(), MqttStatus> {
        if self.topic.is_empty() || self.topic.contains(['#', '+', '\u{0}']) {
            return Err(MqttStatus::BadParameter);
        }
        if self.has_packet_identifier() && self.packet_identifier == 0 {
            return Err(MqttStatus::BadParameter);
        }
        Ok(())
    }

    fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.duplicate {
            flags |= 0x08;
        }
        flags |= (self.qos as u8) << 1;
        if self.retain {
            flags |= 0x01;
        }
        flags
    }

    fn variable_header_len(&self) -> usize {
        field_size(self.topic.len()) + if self.has_packet_identifier() { 2 } else { 0 }
    }
}

pub fn get_publish_packet_size(info: &PublishInfo) -> Result<(u32, usize), MqttStatus> {
    info.validate()?;
    let remaining_length = (info.variable_header_len() + info.payload.len()) as u32;
    let total_size = 1 + varint::encoded_size(remaining_length) + remaining_length as usize;
    Ok((remaining_length, total_size))
}

pub fn serialize_publish(info: &PublishInfo, buf: &mut [u8]) -> Result<usize, MqttStatus> {
    let (remaining_length, total_size) = get_publish_packet_size(info)?;
    if buf.len() < total_size {
        return Err(MqttStatus::NoMemory);
    }

    buf[0] = (PacketType::Publish as u8) << 4 | info.flags();
    let mut offset = 1 + varint::encode(remaining_length, &mut buf[1..])?;

    offset += write_field(info.topic.as_bytes(), &mut buf[offset..])?;
    if info.has_packet_identifier() {
        write_u16(info.packet_identifier, &mut buf[offset..])?;
        offset += 2;
    }
    buf[offset..offset + info.payload.len()].copy_from_slice(info.payload);
    offset += info.payload.len();

    debug_assert_eq!(offset, total_size);
    Ok(offset)
}

/// A PUBLISH as decoded from the wire. `topic` and `payload` borrow from the
/// packet buffer supplied to [`deserialize_publish`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Publish<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
    pub duplicate: bool,
    /// `0` when `qos` is `AtMostOnce`.
    pub packet_identifier: u16,
}

/// Parse a complete PUBLISH packet, `packet` being the fixed header byte
/// through the end of the payload.
pub fn deserialize_publish(packet: &[u8]) -> Result<Publish<'_>, MqttStatus> {
    if packet.is_empty() {
        return Err(MqttStatus::BadResponse);
    }
    if packet[0] >> 4 != PacketType::Publish as u8 {
        return Err(MqttStatus::BadResponse);
    }
    let flags = packet[0] & 0x0F;
    let duplicate = flags & 0x08 != 0;
    let qos = QoS::from_bits((flags & 0x06) >> 1)?;
    let retain = flags & 0x01 != 0;

    if duplicate && qos == QoS::AtMostOnce {
        return Err(MqttStatus::BadResponse);
    }

    let (remaining_length, header_len) = varint::decode(&packet[1..])?;
    let body = &packet[1 + header_len..];
    if body.len() != remaining_length as usize {
        return Err(MqttStatus::BadResponse);
    }

    let (topic, consumed) = read_utf8_field(body)?;
    let mut offset = consumed;

    let packet_identifier = if qos != QoS::AtMostOnce {
        let id = read_u16(&body[offset..])?;
        if id == 0 {
            return Err(MqttStatus::BadResponse);
        }
        offset += 2;
        id
    } else {
        0
    };

    Ok(Publish {
        topic,
        payload: &body[offset..],
        qos,
        retain,
        duplicate,
        packet_identifier,
    })
}
