//! The publish state tracker: a fixed-capacity slot table recording the
//! in-flight QoS ≥ 1 PUBLISH exchanges on one connection, and the legal
//! transitions between their acknowledgement states.
//!
//! The table is a compile-time-bounded array walked linearly rather than a
//! heap-backed collection (see the design note on state tracker storage);
//! lookups are O(N) and acceptable because N — the number of concurrently
//! in-flight exchanges — is small.
use crate::error::MqttStatus;
use crate::packet::QoS;

/// Which side of the connection originated the PUBLISH this record tracks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Originator {
    /// This client sent the original PUBLISH.
    Send,
    /// This client received the original PUBLISH.
    Receive,
}

/// A state in the publish acknowledgement lattice. `StateNull` is never
/// stored; it is the tracker's internal signal that no legal transition
/// exists, surfaced to callers as [`MqttStatus::IllegalState`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PublishState {
    PublishSend,
    PubAckPending,
    PubRecPending,
    PubRelPending,
    PubCompPending,
    PubAckSend,
    PubRecSend,
    PubRelSend,
    PubCompSend,
    PublishDone,
}

#[derive(Debug, Copy, Clone)]
struct Record {
    packet_id: u16,
    qos: QoS,
    originator: Originator,
    state: PublishState,
}

/// Fixed-capacity table of in-flight publish state records. `N` bounds the
/// number of concurrently in-flight QoS ≥ 1 exchanges this connection
/// supports.
#[derive(Debug)]
pub struct StateTracker<const N: usize> {
    slots: heapless::Vec<Option<Record>, N>,
}

impl<const N: usize> Default for StateTracker<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StateTracker<N> {
    pub fn new() -> Self {
        let mut slots = heapless::Vec::new();
        for _ in 0..N {
            let _ = slots.push(None);
        }
        Self { slots }
    }

    fn find(&self, packet_id: u16, originator: Originator) -> Option<usize> {
        self.slots.iter().position(|slot| {
            matches!(slot, Some(r) if r.packet_id == packet_id && r.originator == originator)
        })
    }

    fn free_slot(&mut self) -> Result<usize, MqttStatus> {
        self.slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(MqttStatus::NoMemory)
    }

    fn set_state(&mut self, index: usize, state: PublishState) {
        if state == PublishState::PublishDone {
            self.slots[index] = None;
        } else if let Some(record) = &mut self.slots[index] {
            record.state = state;
        }
    }

    /// Number of records currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Begin tracking an outbound PUBLISH, called before attempting to send
    /// it. The record starts in `PublishSend`.
    pub fn begin_outbound(&mut self, packet_id: u16, qos: QoS) -> Result<PublishState, MqttStatus> {
        if qos == QoS::AtMostOnce {
            return Err(MqttStatus::BadParameter);
        }
        let index = self.free_slot()?;
        self.slots[index] = Some(Record {
            packet_id,
            qos,
            originator: Originator::Send,
            state: PublishState::PublishSend,
        });
        Ok(PublishState::PublishSend)
    }

    /// Resolve the outcome of the send attempt for an outbound record.
    /// A failed send frees the slot immediately (`Publish-Done`) so the
    /// caller can retry with a fresh packet identifier; a successful send
    /// advances to the QoS-appropriate pending state.
    pub fn resolve_outbound_send(
        &mut self,
        packet_id: u16,
        send_succeeded: bool,
    ) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Send)
            .ok_or(MqttStatus::IllegalState)?;
        let record = self.slots[index].as_ref().unwrap();
        if record.state != PublishState::PublishSend {
            return Err(MqttStatus::IllegalState);
        }

        let next = if !send_succeeded {
            PublishState::PublishDone
        } else {
            match record.qos {
                QoS::AtLeastOnce => PublishState::PubAckPending,
                QoS::ExactlyOnce => PublishState::PubRecPending,
                QoS::AtMostOnce => return Err(MqttStatus::IllegalState),
            }
        };
        self.set_state(index, next);
        Ok(next)
    }

    /// A PUBACK arrived for an outbound QoS 1 publish.
    pub fn recv_puback(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Send)
            .ok_or(MqttStatus::BadResponse)?;
        self.expect(index, PublishState::PubAckPending)?;
        self.set_state(index, PublishState::PublishDone);
        Ok(PublishState::PublishDone)
    }

    /// A PUBREC arrived for an outbound QoS 2 publish.
    pub fn recv_pubrec(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Send)
            .ok_or(MqttStatus::BadResponse)?;
        self.expect(index, PublishState::PubRecPending)?;
        self.set_state(index, PublishState::PubRelSend);
        Ok(PublishState::PubRelSend)
    }

    /// The engine successfully sent the PUBREL responding to a PUBREC.
    pub fn sent_pubrel(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Send)
            .ok_or(MqttStatus::IllegalState)?;
        self.expect(index, PublishState::PubRelSend)?;
        self.set_state(index, PublishState::PubCompPending);
        Ok(PublishState::PubCompPending)
    }

    /// A PUBCOMP arrived, completing an outbound QoS 2 publish.
    pub fn recv_pubcomp(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Send)
            .ok_or(MqttStatus::BadResponse)?;
        self.expect(index, PublishState::PubCompPending)?;
        self.set_state(index, PublishState::PublishDone);
        Ok(PublishState::PublishDone)
    }

    /// An inbound PUBLISH was received. Creates the record (or, for QoS 2
    /// duplicates already in `PubRel-Pending`, re-drives the existing one
    /// without disturbing its state). Returns the state and whether this
    /// was a duplicate that the caller must not re-deliver to its callback.
    pub fn recv_publish(&mut self, packet_id: u16, qos: QoS) -> Result<(PublishState, bool), MqttStatus> {
        match qos {
            QoS::AtMostOnce => Err(MqttStatus::BadParameter),
            QoS::AtLeastOnce => {
                let index = self.free_slot()?;
                self.slots[index] = Some(Record {
                    packet_id,
                    qos,
                    originator: Originator::Receive,
                    state: PublishState::PubAckSend,
                });
                Ok((PublishState::PubAckSend, false))
            }
            QoS::ExactlyOnce => {
                if let Some(index) = self.find(packet_id, Originator::Receive) {
                    let state = self.slots[index].as_ref().unwrap().state;
                    if state == PublishState::PubRelPending {
                        return Ok((state, true));
                    }
                    return Err(MqttStatus::IllegalState);
                }
                let index = self.free_slot()?;
                self.slots[index] = Some(Record {
                    packet_id,
                    qos,
                    originator: Originator::Receive,
                    state: PublishState::PubRecSend,
                });
                Ok((PublishState::PubRecSend, false))
            }
        }
    }

    /// The engine successfully sent the PUBACK acknowledging an inbound
    /// QoS 1 publish.
    pub fn sent_puback(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Receive)
            .ok_or(MqttStatus::IllegalState)?;
        self.expect(index, PublishState::PubAckSend)?;
        self.set_state(index, PublishState::PublishDone);
        Ok(PublishState::PublishDone)
    }

    /// The engine successfully sent the PUBREC acknowledging an inbound
    /// QoS 2 publish.
    pub fn sent_pubrec(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Receive)
            .ok_or(MqttStatus::IllegalState)?;
        self.expect(index, PublishState::PubRecSend)?;
        self.set_state(index, PublishState::PubRelPending);
        Ok(PublishState::PubRelPending)
    }

    /// A PUBREL arrived, releasing an inbound QoS 2 publish for final
    /// acknowledgement.
    pub fn recv_pubrel(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Receive)
            .ok_or(MqttStatus::BadResponse)?;
        self.expect(index, PublishState::PubRelPending)?;
        self.set_state(index, PublishState::PubCompSend);
        Ok(PublishState::PubCompSend)
    }

    /// The engine successfully sent the PUBCOMP completing an inbound
    /// QoS 2 publish.
    pub fn sent_pubcomp(&mut self, packet_id: u16) -> Result<PublishState, MqttStatus> {
        let index = self
            .find(packet_id, Originator::Receive)
            .ok_or(MqttStatus::IllegalState)?;
        self.expect(index, PublishState::PubCompSend)?;
        self.set_state(index, PublishState::PublishDone);
        Ok(PublishState::PublishDone)
    }

    fn expect(&self, index: usize, state: PublishState) -> Result<(), MqttStatus> {
        match &self.slots[index] {
            Some(record) if record.state == state => Ok(()),
            _ => Err(MqttStatus::IllegalState),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn outbound_qos1_lattice() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        assert_eq!(
            tracker.begin_outbound(1, QoS::AtLeastOnce),
            Ok(PublishState::PublishSend)
        );
        assert_eq!(
            tracker.resolve_outbound_send(1, true),
            Ok(PublishState::PubAckPending)
        );
        assert_eq!(tracker.recv_puback(1), Ok(PublishState::PublishDone));
        assert_eq!(tracker.in_flight_count(), 0);
    }

    #[test]
    fn outbound_qos2_lattice() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        tracker.begin_outbound(2, QoS::ExactlyOnce).unwrap();
        assert_eq!(
            tracker.resolve_outbound_send(2, true),
            Ok(PublishState::PubRecPending)
        );
        assert_eq!(tracker.recv_pubrec(2), Ok(PublishState::PubRelSend));
        assert_eq!(tracker.sent_pubrel(2), Ok(PublishState::PubCompPending));
        assert_eq!(tracker.recv_pubcomp(2), Ok(PublishState::PublishDone));
        assert_eq!(tracker.in_flight_count(), 0);
    }

    #[test]
    fn failed_send_frees_the_slot_for_retry() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        tracker.begin_outbound(3, QoS::AtLeastOnce).unwrap();
        assert_eq!(
            tracker.resolve_outbound_send(3, false),
            Ok(PublishState::PublishDone)
        );
        assert_eq!(tracker.in_flight_count(), 0);
        // The slot is free: a fresh attempt with the same id succeeds.
        assert!(tracker.begin_outbound(3, QoS::AtLeastOnce).is_ok());
    }

    #[test]
    fn inbound_qos1_lattice() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        let (state, duplicate) = tracker.recv_publish(5, QoS::AtLeastOnce).unwrap();
        assert_eq!(state, PublishState::PubAckSend);
        assert!(!duplicate);
        assert_eq!(tracker.sent_puback(5), Ok(PublishState::PublishDone));
    }

    #[test]
    fn inbound_qos2_lattice() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        let (state, duplicate) = tracker.recv_publish(6, QoS::ExactlyOnce).unwrap();
        assert_eq!(state, PublishState::PubRecSend);
        assert!(!duplicate);
        assert_eq!(tracker.sent_pubrec(6), Ok(PublishState::PubRelPending));
        assert_eq!(tracker.recv_pubrel(6), Ok(PublishState::PubCompSend));
        assert_eq!(tracker.sent_pubcomp(6), Ok(PublishState::PublishDone));
    }

    #[test]
    fn duplicate_inbound_qos2_publish_is_idempotent() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        tracker.recv_publish(7, QoS::ExactlyOnce).unwrap();
        tracker.sent_pubrec(7).unwrap();

        let (state, duplicate) = tracker.recv_publish(7, QoS::ExactlyOnce).unwrap();
        assert_eq!(state, PublishState::PubRelPending);
        assert!(duplicate);
    }

    #[test]
    fn puback_for_unknown_id_is_bad_response() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        assert_eq!(tracker.recv_puback(99), Err(MqttStatus::BadResponse));
    }

    #[test]
    fn ack_in_wrong_state_is_illegal_state() {
        let mut tracker: StateTracker<4> = StateTracker::new();
        tracker.begin_outbound(8, QoS::AtLeastOnce).unwrap();
        // Never resolved the send; still `PublishSend`, not `PubAckPending`.
        assert_eq!(tracker.recv_puback(8), Err(MqttStatus::IllegalState));
    }

    #[test]
    fn table_capacity_is_enforced() {
        let mut tracker: StateTracker<1> = StateTracker::new();
        tracker.begin_outbound(1, QoS::AtLeastOnce).unwrap();
        assert_eq!(
            tracker.begin_outbound(2, QoS::AtLeastOnce),
            Err(MqttStatus::NoMemory)
        );
    }
}
