//! The connection engine: a transport-agnostic MQTT 3.1.1 client state
//! machine driven by a single cooperative `process_loop`. Owns no thread, no
//! socket, and no heap allocation; it borrows a transport, a clock, an event
//! sink, and a caller-supplied buffer for the duration of each call.
use log::{debug, error, trace};

use crate::error::MqttStatus;
use crate::header::FixedHeaderReader;
use crate::packet::connect::{ConnectInfo, Will};
use crate::packet::publish::PublishInfo;
use crate::packet::subscribe::SubscribeInfo;
use crate::packet::unsubscribe::UnsubscribeInfo;
use crate::packet::{ack, connack, connect, disconnect, ping, publish, suback, unsuback, PacketType, QoS};
use crate::state::StateTracker;
use crate::time;
use crate::transport::{Clock, Event, EventHandler, IncomingPublish, Transport};
use crate::varint;

/// Lifecycle of the connection as seen by the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    NotConnected,
    Connected,
    Disconnecting,
}

/// Connection-level configuration for [`Connection::connect`]. Every
/// variable-length field borrows from the caller; nothing here allocates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnectOptions<'a> {
    pub client_id: &'a str,
    pub clean_session: bool,
    pub keep_alive_seconds: u16,
    pub will: Option<Will<'a>>,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    /// How long to wait for PINGRESP after sending PINGREQ before the
    /// connection is declared dead.
    pub ping_resp_timeout_ms: u32,
}

impl<'a> ConnectOptions<'a> {
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            clean_session: true,
            keep_alive_seconds: 60,
            will: None,
            username: None,
            password: None,
            ping_resp_timeout_ms: 5_000,
        }
    }

    pub fn with_keep_alive_seconds(mut self, keep_alive_seconds: u16) -> Self {
        self.keep_alive_seconds = keep_alive_seconds;
        self
    }

    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = clean_session;
        self
    }

    pub fn with_will(mut self, will: Will<'a>) -> Self {
        self.will = Some(will);
        self
    }

    pub fn with_credentials(mut self, username: &'a str, password: &'a [u8]) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    fn connect_info(&self) -> ConnectInfo<'a> {
        ConnectInfo {
            client_id: self.client_id,
            clean_session: self.clean_session,
            keep_alive_seconds: self.keep_alive_seconds,
            will: self.will,
            username: self.username,
            password: self.password,
        }
    }
}

/// The connection engine. `N` bounds the number of concurrently in-flight
/// QoS ≥ 1 publish exchanges; `buf` is the single fixed buffer used for both
/// outbound serialization and inbound packet assembly.
pub struct Connection<'buf, T, C, H, const N: usize> {
    transport: T,
    clock: C,
    event_handler: H,
    buf: &'buf mut [u8],
    status: ConnectionStatus,
    next_packet_id: u16,
    keep_alive_interval_sec: u16,
    ping_resp_timeout_ms: u32,
    last_packet_time: u32,
    ping_req_send_time: u32,
    waiting_for_ping_resp: bool,
    control_packet_sent: bool,
    header_reader: FixedHeaderReader,
    state_tracker: StateTracker<N>,
}

impl<'buf, T: Transport, C: Clock, H: EventHandler, const N: usize> Connection<'buf, T, C, H, N> {
    /// Construct the engine. `buf` must be non-empty; every packet this
    /// connection sends or receives is assembled inside it.
    pub fn init(transport: T, clock: C, event_handler: H, buf: &'buf mut [u8]) -> Result<Self, MqttStatus> {
        if buf.is_empty() {
            error!("mqtt init: buffer must be non-empty");
            return Err(MqttStatus::BadParameter);
        }
        Ok(Self {
            transport,
            clock,
            event_handler,
            buf,
            status: ConnectionStatus::NotConnected,
            next_packet_id: 1,
            keep_alive_interval_sec: 0,
            ping_resp_timeout_ms: 0,
            last_packet_time: 0,
            ping_req_send_time: 0,
            waiting_for_ping_resp: false,
            control_packet_sent: false,
            header_reader: FixedHeaderReader::new(),
            state_tracker: StateTracker::new(),
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Borrow the underlying transport, e.g. to poll socket-level state the
    /// engine itself has no opinion about.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn event_handler(&self) -> &H {
        &self.event_handler
    }

    /// Allocate the next packet identifier. Wraps `0xFFFF` back to `1`;
    /// `0` is never returned.
    pub fn next_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        self.next_packet_id = if id == u16::MAX { 1 } else { id + 1 };
        id
    }

    fn send_all(&mut self, len: usize) -> Result<(), MqttStatus> {
        let mut sent = 0;
        while sent < len {
            let n = self.transport.send(&self.buf[sent..len])?;
            if n == 0 {
                return Err(MqttStatus::SendFailed);
            }
            sent += n;
        }
        self.last_packet_time = self.clock.get_time_ms();
        self.control_packet_sent = true;
        Ok(())
    }

    /// Read exactly one fixed header, one byte at a time. Returns `None`
    /// (not an error) if no data is available to start a new header; a
    /// partially-read header persists across calls via `self.header_reader`.
    fn read_fixed_header(&mut self) -> Result<Option<crate::packet::PacketInfo>, MqttStatus> {
        loop {
            let mut byte = [0u8; 1];
            let n = self.transport.recv(&mut byte)?;
            if n == 0 {
                return Ok(None);
            }
            if let Some(info) = self.header_reader.feed(byte[0])? {
                return Ok(Some(info));
            }
        }
    }

    /// Reassemble a complete packet (header byte, remaining-length field,
    /// body) into `self.buf` so the pure codec functions — which parse a
    /// whole packet at once — can run against it.
    fn assemble_packet(&mut self, info: &crate::packet::PacketInfo) -> Result<usize, MqttStatus> {
        let length_size = varint::encoded_size(info.remaining_length);
        let total = 1 + length_size + info.remaining_length as usize;
        if total > self.buf.len() {
            debug!("mqtt: incoming packet of {total} bytes exceeds buffer capacity");
            return Err(MqttStatus::NoMemory);
        }
        self.buf[0] = info.header_byte;
        varint::encode(info.remaining_length, &mut self.buf[1..])?;
        let body_offset = 1 + length_size;
        self.recv_exact_into_offset(body_offset, info.remaining_length as usize)?;
        Ok(total)
    }

    fn recv_exact_into_offset(&mut self, offset: usize, len: usize) -> Result<(), MqttStatus> {
        let mut read = 0;
        while read < len {
            let n = self.transport.recv(&mut self.buf[offset + read..offset + len])?;
            if n == 0 {
                return Err(MqttStatus::RecvFailed);
            }
            read += n;
        }
        Ok(())
    }

    /// Send CONNECT and wait for CONNACK. Returns the session-present flag.
    pub fn connect(&mut self, options: &ConnectOptions) -> Result<bool, MqttStatus> {
        let result = self.connect_inner(options);
        match &result {
            Ok(session_present) => debug!("mqtt connect: accepted, session_present={session_present}"),
            Err(status) => error!("mqtt connect failed: {status}"),
        }
        result
    }

    fn connect_inner(&mut self, options: &ConnectOptions) -> Result<bool, MqttStatus> {
        let info = options.connect_info();
        let (_, total) = connect::get_connect_packet_size(&info)?;
        if total > self.buf.len() {
            return Err(MqttStatus::NoMemory);
        }
        connect::serialize_connect(&info, self.buf)?;
        self.send_all(total)?;

        let header = self.read_fixed_header()?.ok_or(MqttStatus::RecvFailed)?;
        if header.packet_type != PacketType::ConnAck {
            return Err(MqttStatus::BadResponse);
        }
        let packet_len = self.assemble_packet(&header)?;
        let connack = connack::deserialize_connack(&self.buf[..packet_len])?;
        if connack.return_code != connack::ConnectReturnCode::Accepted {
            return Err(MqttStatus::ServerRefused);
        }

        self.status = ConnectionStatus::Connected;
        self.keep_alive_interval_sec = options.keep_alive_seconds;
        self.ping_resp_timeout_ms = options.ping_resp_timeout_ms;
        self.last_packet_time = self.clock.get_time_ms();
        Ok(connack.session_present)
    }

    pub fn subscribe(&mut self, info: &SubscribeInfo) -> Result<(), MqttStatus> {
        let result = (|| {
            let (_, total) = crate::packet::subscribe::get_subscribe_packet_size(info)?;
            if total > self.buf.len() {
                return Err(MqttStatus::NoMemory);
            }
            crate::packet::subscribe::serialize_subscribe(info, self.buf)?;
            self.send_all(total)
        })();
        match &result {
            Ok(()) => debug!("mqtt subscribe: sent, packet_id={}", info.packet_identifier),
            Err(status) => error!("mqtt subscribe failed: {status}"),
        }
        result
    }

    pub fn unsubscribe(&mut self, info: &UnsubscribeInfo) -> Result<(), MqttStatus> {
        let result = (|| {
            let (_, total) = crate::packet::unsubscribe::get_unsubscribe_packet_size(info)?;
            if total > self.buf.len() {
                return Err(MqttStatus::NoMemory);
            }
            crate::packet::unsubscribe::serialize_unsubscribe(info, self.buf)?;
            self.send_all(total)
        })();
        match &result {
            Ok(()) => debug!("mqtt unsubscribe: sent, packet_id={}", info.packet_identifier),
            Err(status) => error!("mqtt unsubscribe failed: {status}"),
        }
        result
    }

    pub fn publish(&mut self, info: &PublishInfo) -> Result<(), MqttStatus> {
        let result = self.publish_inner(info);
        match &result {
            Ok(()) => debug!("mqtt publish: sent, qos={:?}, packet_id={}", info.qos, info.packet_identifier),
            Err(status) => error!("mqtt publish failed: {status}"),
        }
        result
    }

    fn publish_inner(&mut self, info: &PublishInfo) -> Result<(), MqttStatus> {
        let tracked = info.qos != QoS::AtMostOnce;
        if tracked {
            self.state_tracker.begin_outbound(info.packet_identifier, info.qos)?;
        }

        let outcome = (|| {
            let (_, total) = publish::get_publish_packet_size(info)?;
            if total > self.buf.len() {
                return Err(MqttStatus::NoMemory);
            }
            publish::serialize_publish(info, self.buf)?;
            self.send_all(total)
        })();

        if tracked {
            self.state_tracker
                .resolve_outbound_send(info.packet_identifier, outcome.is_ok())?;
        }
        outcome
    }

    pub fn ping(&mut self) -> Result<(), MqttStatus> {
        let result = (|| {
            let (_, total) = ping::get_pingreq_packet_size();
            if total > self.buf.len() {
                return Err(MqttStatus::NoMemory);
            }
            ping::serialize_pingreq(self.buf)?;
            self.send_all(total)?;
            self.waiting_for_ping_resp = true;
            self.ping_req_send_time = self.clock.get_time_ms();
            Ok(())
        })();
        match &result {
            Ok(()) => debug!("mqtt ping: sent"),
            Err(status) => error!("mqtt ping failed: {status}"),
        }
        result
    }

    /// Send DISCONNECT. The connection transitions to `Disconnecting` before
    /// the send and to `NotConnected` only if it succeeds; DISCONNECT has no
    /// acknowledgement, so the caller must tear the transport down regardless
    /// of the outcome.
    pub fn disconnect(&mut self) -> Result<(), MqttStatus> {
        self.status = ConnectionStatus::Disconnecting;
        let result = (|| {
            let (_, total) = disconnect::get_disconnect_packet_size();
            if total > self.buf.len() {
                return Err(MqttStatus::NoMemory);
            }
            disconnect::serialize_disconnect(self.buf)?;
            self.send_all(total)
        })();
        match &result {
            Ok(()) => {
                self.status = ConnectionStatus::NotConnected;
                debug!("mqtt disconnect: sent");
            }
            Err(status) => error!("mqtt disconnect failed, connection left in Disconnecting: {status}"),
        }
        result
    }

    /// Drive one work step: receive and dispatch at most one inbound packet,
    /// then evaluate keep-alive. Runs until `timeout_ms` has elapsed;
    /// `timeout_ms=0` guarantees exactly one iteration.
    pub fn process_loop(&mut self, timeout_ms: u32) -> Result<(), MqttStatus> {
        let entry_time = self.clock.get_time_ms();
        loop {
            let result = self.process_loop_iteration();
            match &result {
                Ok(()) => trace!("mqtt process_loop: iteration complete"),
                Err(status) => {
                    error!("mqtt process_loop failed: {status}");
                    return result;
                }
            }

            let now = self.clock.get_time_ms();
            if time::elapsed_at_least(now, entry_time, timeout_ms) {
                return Ok(());
            }
        }
    }

    fn process_loop_iteration(&mut self) -> Result<(), MqttStatus> {
        self.control_packet_sent = false;

        match self.read_fixed_header()? {
            None => {}
            Some(header) => {
                let packet_len = self.assemble_packet(&header)?;
                self.dispatch(&header, packet_len)?;
            }
        }

        self.run_keep_alive()
    }

    fn dispatch(&mut self, header: &crate::packet::PacketInfo, packet_len: usize) -> Result<(), MqttStatus> {
        debug!("mqtt: decoded inbound {:?}, {} byte(s)", header.packet_type, packet_len);
        match header.packet_type {
            PacketType::Publish => self.dispatch_publish(packet_len),
            PacketType::PubAck => {
                let id = ack::deserialize_ack(PacketType::PubAck, 0, &self.buf[..packet_len])?;
                self.state_tracker.recv_puback(id)?;
                self.event_handler.on_event(Event::PublishAcked { packet_identifier: id });
                Ok(())
            }
            PacketType::PubComp => {
                let id = ack::deserialize_ack(PacketType::PubComp, 0, &self.buf[..packet_len])?;
                self.state_tracker.recv_pubcomp(id)?;
                self.event_handler.on_event(Event::PublishAcked { packet_identifier: id });
                Ok(())
            }
            PacketType::PubRec => {
                let id = ack::deserialize_ack(PacketType::PubRec, 0, &self.buf[..packet_len])?;
                self.state_tracker.recv_pubrec(id)?;
                self.send_pubrel(id)
            }
            PacketType::PubRel => {
                let id = ack::deserialize_ack(PacketType::PubRel, 0b0010, &self.buf[..packet_len])?;
                self.state_tracker.recv_pubrel(id)?;
                self.send_pubcomp(id)
            }
            PacketType::SubAck => {
                let suback = suback::deserialize_suback(&self.buf[..packet_len])?;
                self.event_handler.on_event(Event::SubAck(suback));
                Ok(())
            }
            PacketType::UnsubAck => {
                let id = unsuback::deserialize_unsuback(&self.buf[..packet_len])?;
                self.event_handler.on_event(Event::UnsubAck { packet_identifier: id });
                Ok(())
            }
            PacketType::PingResp => {
                ping::deserialize_pingresp(&self.buf[..packet_len])?;
                self.waiting_for_ping_resp = false;
                Ok(())
            }
            _ => {
                debug!("mqtt: unexpected packet type {:?} in process_loop", header.packet_type);
                Err(MqttStatus::BadResponse)
            }
        }
    }

    fn dispatch_publish(&mut self, packet_len: usize) -> Result<(), MqttStatus> {
        let decoded = publish::deserialize_publish(&self.buf[..packet_len])?;
        let (topic, payload, qos, retain, duplicate, packet_identifier) = (
            decoded.topic,
            decoded.payload,
            decoded.qos,
            decoded.retain,
            decoded.duplicate,
            decoded.packet_identifier,
        );

        let is_duplicate_resend = match qos {
            QoS::AtMostOnce => false,
            _ => {
                let (_, duplicate_resend) = self.state_tracker.recv_publish(packet_identifier, qos)?;
                duplicate_resend
            }
        };

        if !is_duplicate_resend {
            self.event_handler.on_event(Event::Publish(IncomingPublish {
                topic,
                payload,
                qos,
                retain,
                duplicate,
            }));
        }

        match qos {
            QoS::AtMostOnce => Ok(()),
            QoS::AtLeastOnce => self.send_puback(packet_identifier),
            QoS::ExactlyOnce => {
                if is_duplicate_resend {
                    // Already in `PubRel-Pending`; re-send PUBREC without
                    // disturbing the tracked state.
                    self.send_ack(PacketType::PubRec, 0, packet_identifier)
                } else {
                    self.send_pubrec(packet_identifier)
                }
            }
        }
    }

    fn send_ack(&mut self, packet_type: PacketType, flags: u8, packet_identifier: u16) -> Result<(), MqttStatus> {
        let (_, total) = ack::get_ack_packet_size();
        if total > self.buf.len() {
            return Err(MqttStatus::NoMemory);
        }
        ack::serialize_ack(packet_type, flags, packet_identifier, self.buf)?;
        self.send_all(total)
    }

    fn send_puback(&mut self, packet_identifier: u16) -> Result<(), MqttStatus> {
        self.send_ack(PacketType::PubAck, 0, packet_identifier)?;
        self.state_tracker.sent_puback(packet_identifier)?;
        Ok(())
    }

    fn send_pubrec(&mut self, packet_identifier: u16) -> Result<(), MqttStatus> {
        self.send_ack(PacketType::PubRec, 0, packet_identifier)?;
        self.state_tracker.sent_pubrec(packet_identifier)?;
        Ok(())
    }

    fn send_pubrel(&mut self, packet_identifier: u16) -> Result<(), MqttStatus> {
        self.send_ack(PacketType::PubRel, 0b0010, packet_identifier)?;
        self.state_tracker.sent_pubrel(packet_identifier)?;
        Ok(())
    }

    fn send_pubcomp(&mut self, packet_identifier: u16) -> Result<(), MqttStatus> {
        self.send_ack(PacketType::PubComp, 0, packet_identifier)?;
        self.state_tracker.sent_pubcomp(packet_identifier)?;
        Ok(())
    }

    fn run_keep_alive(&mut self) -> Result<(), MqttStatus> {
        if self.keep_alive_interval_sec == 0 {
            return Ok(());
        }
        let now = self.clock.get_time_ms();

        if self.waiting_for_ping_resp {
            if time::elapsed_at_least(now, self.ping_req_send_time, self.ping_resp_timeout_ms) {
                return Err(MqttStatus::KeepAliveTimeout);
            }
            return Ok(());
        }

        let keep_alive_ms = self.keep_alive_interval_sec as u32 * 1000;
        if time::elapsed_at_least(now, self.last_packet_time, keep_alive_ms) {
            self.ping()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::test_support::{MockClock, MockTransport, RecordingHandler};

    type TestConnection<'a> = Connection<'a, MockTransport, MockClock, RecordingHandler, 4>;

    fn connack_bytes(session_present: bool, return_code: u8) -> [u8; 4] {
        [0x20, 0x02, session_present as u8, return_code]
    }

    #[test]
    fn connect_succeeds_on_accepted_connack() {
        let mut buf = [0u8; 256];
        let transport = MockTransport::default();
        let mut conn: TestConnection =
            Connection::init(transport, MockClock::default(), RecordingHandler::default(), &mut buf).unwrap();
        conn.transport.queue_recv(&connack_bytes(true, 0));

        let options = ConnectOptions::new("device-1");
        let session_present = conn.connect(&options).unwrap();
        assert!(session_present);
        assert_eq!(conn.status(), ConnectionStatus::Connected);
        assert_eq!(conn.transport.written[0], 0x10);
    }

    #[test]
    fn connect_reports_server_refusal() {
        let mut buf = [0u8; 256];
        let transport = MockTransport::default();
        let mut conn: TestConnection =
            Connection::init(transport, MockClock::default(), RecordingHandler::default(), &mut buf).unwrap();
        conn.transport.queue_recv(&connack_bytes(false, 5));

        let options = ConnectOptions::new("device-1");
        assert_eq!(conn.connect(&options), Err(MqttStatus::ServerRefused));
        assert_eq!(conn.status(), ConnectionStatus::NotConnected);
    }

    #[test]
    fn init_rejects_empty_buffer() {
        let mut buf: [u8; 0] = [];
        let result: Result<TestConnection, _> =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf);
        assert_eq!(result.err(), Some(MqttStatus::BadParameter));
    }

    #[test]
    fn next_packet_id_wraps_from_max_to_one() {
        let mut buf = [0u8; 64];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();
        conn.next_packet_id = u16::MAX;
        assert_eq!(conn.next_packet_id(), u16::MAX);
        assert_eq!(conn.next_packet_id(), 1);
    }

    #[test]
    fn inbound_publish_qos1_sends_puback_and_invokes_callback() {
        let mut buf = [0u8; 256];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();

        let mut wire = [0u8; 64];
        let mut info = PublishInfo::new("sensors/temp", b"21.5");
        info.qos = QoS::AtLeastOnce;
        info.packet_identifier = 0x1234;
        let written = publish::serialize_publish(&info, &mut wire).unwrap();
        conn.transport.queue_recv(&wire[..written]);

        conn.process_loop(0).unwrap();

        assert_eq!(conn.event_handler.publishes.len(), 1);
        assert_eq!(conn.event_handler.publishes[0].0.as_str(), "sensors/temp");
        // PUBACK for id 0x1234: [0x40, 0x02, 0x12, 0x34]
        assert_eq!(&conn.transport.written[..4], [0x40, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn keep_alive_sends_pingreq_after_interval_elapses() {
        let mut buf = [0u8; 64];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();
        conn.keep_alive_interval_sec = 1;
        conn.last_packet_time = 0;
        conn.clock.now = 1000;

        conn.process_loop(0).unwrap();

        assert!(conn.waiting_for_ping_resp);
        assert_eq!(conn.ping_req_send_time, 1000);
        assert_eq!(&conn.transport.written[..2], [0xC0, 0x00]);
    }

    #[test]
    fn keep_alive_timeout_surfaces() {
        let mut buf = [0u8; 64];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();
        conn.keep_alive_interval_sec = 1;
        conn.waiting_for_ping_resp = true;
        conn.ping_req_send_time = 0;
        conn.ping_resp_timeout_ms = 500;
        conn.clock.now = 1000;

        assert_eq!(conn.process_loop(0), Err(MqttStatus::KeepAliveTimeout));
    }

    #[test]
    fn no_data_available_is_not_an_error() {
        let mut buf = [0u8; 64];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();
        assert_eq!(conn.process_loop(0), Ok(()));
    }

    #[test]
    fn disconnect_returns_to_not_connected_on_success() {
        let mut buf = [0u8; 64];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();
        conn.status = ConnectionStatus::Connected;
        conn.disconnect().unwrap();
        assert_eq!(conn.status(), ConnectionStatus::NotConnected);
        assert_eq!(&conn.transport.written[..2], [0xE0, 0x00]);
    }

    #[test]
    fn disconnect_failure_leaves_status_disconnecting() {
        let mut buf = [0u8; 64];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();
        conn.status = ConnectionStatus::Connected;
        conn.transport.fail_send = true;
        assert_eq!(conn.disconnect(), Err(MqttStatus::SendFailed));
        assert_eq!(conn.status(), ConnectionStatus::Disconnecting);
    }

    #[test]
    fn outbound_qos2_round_trip_through_process_loop() {
        let mut buf = [0u8; 64];
        let mut conn: TestConnection =
            Connection::init(MockTransport::default(), MockClock::default(), RecordingHandler::default(), &mut buf)
                .unwrap();

        let mut info = PublishInfo::new("a/b", b"x");
        info.qos = QoS::ExactlyOnce;
        info.packet_identifier = 7;
        conn.publish(&info).unwrap();

        let mut pubrec = [0u8; 4];
        ack::serialize_ack(PacketType::PubRec, 0, 7, &mut pubrec).unwrap();
        conn.transport.queue_recv(&pubrec);
        conn.process_loop(0).unwrap();

        let mut pubcomp = [0u8; 4];
        ack::serialize_ack(PacketType::PubComp, 0, 7, &mut pubcomp).unwrap();
        conn.transport.queue_recv(&pubcomp);
        conn.process_loop(0).unwrap();

        assert_eq!(conn.event_handler.acked, [7]);
    }
}
