//! UNSUBSCRIBE: request to stop receiving PUBLISH packets for one or more
//! topic filters.
use super::{field_size, topic_filter_is_valid, write_field, write_u16, PacketType};
use crate::error::MqttStatus;
use crate::varint;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnsubscribeInfo<'a> {
    pub packet_identifier: u16,
    pub filters: &'a [&'a str],
}

impl<'a> UnsubscribeInfo<'a> {
    fn validate(&self) -> Result<(), MqttStatus> {
        if self.packet_identifier == 0 || self.filters.is_empty() {
            return Err(MqttStatus::BadParameter);
        }
        if self.filters.iter().any(|f| !topic_filter_is_valid(f)) {
            return Err(MqttStatus::BadParameter);
        }
        Ok(())
    }

    fn payload_len(&self) -> usize {
        self.filters.iter().map(|f| field_size(f.len())).sum()
    }
}

pub fn get_unsubscribe_packet_size(info: &UnsubscribeInfo) -> Result<(u32, usize), MqttStatus> {
    info.validate()?;
    let remaining_length = (2 + info.payload_len()) as u32;
    let total_size = 1 + varint::encoded_size(remaining_length) + remaining_length as usize;
    Ok((remaining_length, total_size))
}

pub fn serialize_unsubscribe(info: &UnsubscribeInfo, buf: &mut [u8]) -> Result<usize, MqttStatus> {
    let (remaining_length, total_size) = get_unsubscribe_packet_size(info)?;
    if buf.len() < total_size {
        return Err(MqttStatus::NoMemory);
    }

    // [MQTT-3.10.1-1] UNSUBSCRIBE's reserved header bits are fixed at 0b0010.
    buf[0] = (PacketType::Unsubscribe as u8) << 4 | 0b0010;
    let mut offset = 1 + varint::encode(remaining_length, &mut buf[1..])?;

    write_u16(info.packet_identifier, &mut buf[offset..])?;
    offset += 2;

    for filter in info.filters {
        offset += write_field(filter.as_bytes(), &mut buf[offset..])?;
    }

    debug_assert_eq!(offset, total_size);
    Ok(offset)
}
