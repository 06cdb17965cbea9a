//! SUBSCRIBE: request to receive PUBLISH packets matching one or more topic
//! filters, each with a requested maximum QoS.
use super::{field_size, topic_filter_is_valid, write_field, write_u16, PacketType, QoS};
use crate::error::MqttStatus;
use crate::varint;

/// A single (topic filter, requested QoS) entry. The caller owns the backing
/// slice; this crate never allocates one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TopicFilter<'a> {
    pub filter: &'a str,
    pub requested_qos: QoS,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubscribeInfo<'a> {
    pub packet_identifier: u16,
    pub filters: &'a [TopicFilter<'a>],
}

impl<'a> SubscribeInfo<'a> {
    fn validate(&self) -> Result<(), MqttStatus> {
        if self.packet_identifier == 0 || self.filters.is_empty() {
            return Err(MqttStatus::BadParameter);
        }
        if self.filters.iter().any(|f| !topic_filter_is_valid(f.filter)) {
            return Err(MqttStatus::BadParameter);
        }
        Ok(())
    }

    fn payload_len(&self) -> usize {
        self.filters
            .iter()
            .map(|f| field_size(f.filter.len()) + 1)
            .sum()
    }
}

pub fn get_subscribe_packet_size(info: &SubscribeInfo) -> Result<(u32, usize), MqttStatus> {
    info.validate()?;
    let remaining_length = (2 + info.payload_len()) as u32;
    let total_size = 1 + varint::encoded_size(remaining_length) + remaining_length as usize;
    Ok((remaining_length, total_size))
}

pub fn serialize_subscribe(info: &SubscribeInfo, buf: &mut [u8]) -> Result<usize, MqttStatus> {
    let (remaining_length, total_size) = get_subscribe_packet_size(info)?;
    if buf.len() < total_size {
        return Err(MqttStatus::NoMemory);
    }

    // [MQTT-3.8.1-1] SUBSCRIBE's reserved header bits are fixed at 0b0010.
    buf[0] = (PacketType::Subscribe as u8) << 4 | 0b0010;
    let mut offset = 1 + varint::encode(remaining_length, &mut buf[1..])?;

    write_u16(info.packet_identifier, &mut buf[offset..])?;
    offset += 2;

    for entry in info.filters {
        offset += write_field(entry.filter.as_bytes(), &mut buf[offset..])?;
        buf[offset] = entry.requested_qos as u8;
        offset += 1;
    }

    debug_assert_eq!(offset, total_size);
    Ok(offset)
}
