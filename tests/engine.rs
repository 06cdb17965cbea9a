//! End-to-end scenarios driving the full engine against an in-memory
//! transport double and a caller-controlled clock. No real broker involved;
//! the engine has no network dependency to exercise.
use std::collections::VecDeque;

use tjiftmq::packet::ack;
use tjiftmq::packet::publish::PublishInfo;
use tjiftmq::packet::subscribe::{SubscribeInfo, TopicFilter};
use tjiftmq::packet::{PacketType, QoS};
use tjiftmq::transport::{Clock, Event, EventHandler, Transport};
use tjiftmq::{Connection, ConnectOptions, ConnectionStatus, MqttStatus};

#[derive(Default)]
struct ChannelTransport {
    written: Vec<u8>,
    inbound: VecDeque<u8>,
    fail_send: bool,
    fail_recv: bool,
}

impl ChannelTransport {
    fn queue(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, buf: &[u8]) -> Result<usize, MqttStatus> {
        if self.fail_send {
            return Err(MqttStatus::SendFailed);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, MqttStatus> {
        if self.fail_recv {
            return Err(MqttStatus::RecvFailed);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.inbound.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

#[derive(Default)]
struct ManualClock {
    now: u32,
}

impl Clock for ManualClock {
    fn get_time_ms(&mut self) -> u32 {
        self.now
    }
}

#[derive(Default)]
struct RecordingHandler {
    publishes: Vec<(String, Vec<u8>)>,
    acked: Vec<u16>,
    subacked: Vec<u16>,
    granted_qos: Vec<tjiftmq::packet::suback::ReturnCode>,
}

impl EventHandler for RecordingHandler {
    fn on_event(&mut self, event: Event<'_>) {
        match event {
            Event::Publish(p) => self.publishes.push((p.topic.to_string(), p.payload.to_vec())),
            Event::PublishAcked { packet_identifier } => self.acked.push(packet_identifier),
            Event::SubAck(suback) => {
                self.subacked.push(suback.packet_identifier);
                self.granted_qos
                    .extend(suback.return_codes().map(|r| r.unwrap()));
            }
            Event::UnsubAck { packet_identifier } => self.subacked.push(packet_identifier),
        }
    }
}

type TestConnection<'a> = Connection<'a, ChannelTransport, ManualClock, RecordingHandler, 8>;

fn connack(session_present: bool, return_code: u8) -> [u8; 4] {
    [0x20, 0x02, session_present as u8, return_code]
}

#[test]
fn connect_then_subscribe_then_receive_publish() {
    let mut buf = [0u8; 512];
    let mut conn: TestConnection = Connection::init(
        ChannelTransport::default(),
        ManualClock::default(),
        RecordingHandler::default(),
        &mut buf,
    )
    .unwrap();

    conn_transport_mut(&mut conn).queue(&connack(false, 0));
    let options = ConnectOptions::new("integration-client");
    assert!(!conn.connect(&options).unwrap());
    assert_eq!(conn.status(), ConnectionStatus::Connected);

    let filters = [TopicFilter {
        filter: "sensors/+",
        requested_qos: QoS::AtLeastOnce,
    }];
    conn.subscribe(&SubscribeInfo {
        packet_identifier: 1,
        filters: &filters,
    })
    .unwrap();

    let suback = [0x90, 0x03, 0x00, 0x01, 0x01];
    conn_transport_mut(&mut conn).queue(&suback);
    conn.process_loop(0).unwrap();

    let mut wire = [0u8; 64];
    let mut publish_info = PublishInfo::new("sensors/temp", b"21.5");
    publish_info.qos = QoS::AtLeastOnce;
    publish_info.packet_identifier = 42;
    let written = tjiftmq::packet::publish::serialize_publish(&publish_info, &mut wire).unwrap();
    conn_transport_mut(&mut conn).queue(&wire[..written]);
    conn.process_loop(0).unwrap();

    assert_eq!(event_handler(&conn).subacked, [1]);
    assert_eq!(
        event_handler(&conn).granted_qos,
        [tjiftmq::packet::suback::ReturnCode::Granted(QoS::AtLeastOnce)]
    );
    assert_eq!(event_handler(&conn).publishes.len(), 1);
    assert_eq!(event_handler(&conn).publishes[0].0, "sensors/temp");
    // The PUBACK for the just-received publish should be on the wire.
    let written_bytes = &conn_transport(&conn).written;
    let puback_start = written_bytes.len() - 4;
    assert_eq!(&written_bytes[puback_start..], [0x40, 0x02, 0x00, 0x2A]);
}

#[test]
fn inbound_pubrec_during_outbound_qos2_drives_pubrel() {
    let mut buf = [0u8; 256];
    let mut conn: TestConnection = Connection::init(
        ChannelTransport::default(),
        ManualClock::default(),
        RecordingHandler::default(),
        &mut buf,
    )
    .unwrap();

    let mut info = PublishInfo::new("a/b", b"payload");
    info.qos = QoS::ExactlyOnce;
    info.packet_identifier = 7;
    conn.publish(&info).unwrap();

    let mut pubrec = [0u8; 4];
    ack::serialize_ack(PacketType::PubRec, 0, 7, &mut pubrec).unwrap();
    conn_transport_mut(&mut conn).queue(&pubrec);
    conn.process_loop(0).unwrap();

    // PUBREL for id 7, reserved flags 0b0010: [0x62, 0x02, 0x00, 0x07]
    let written = &conn_transport(&conn).written;
    assert_eq!(&written[written.len() - 4..], [0x62, 0x02, 0x00, 0x07]);
}

#[test]
fn keep_alive_fires_after_interval() {
    let mut buf = [0u8; 64];
    let mut conn: TestConnection = Connection::init(
        ChannelTransport::default(),
        ManualClock::default(),
        RecordingHandler::default(),
        &mut buf,
    )
    .unwrap();

    conn_transport_mut(&mut conn).queue(&connack(false, 0));
    let options = ConnectOptions::new("client").with_keep_alive_seconds(1);
    conn.connect(&options).unwrap();

    clock_mut(&mut conn).now = 1000;
    conn.process_loop(0).unwrap();

    let written = &conn_transport(&conn).written;
    assert_eq!(&written[written.len() - 2..], [0xC0, 0x00]);
}

#[test]
fn keep_alive_timeout_is_surfaced() {
    let mut buf = [0u8; 64];
    let mut conn: TestConnection = Connection::init(
        ChannelTransport::default(),
        ManualClock::default(),
        RecordingHandler::default(),
        &mut buf,
    )
    .unwrap();

    conn_transport_mut(&mut conn).queue(&connack(false, 0));
    let options = ConnectOptions::new("client").with_keep_alive_seconds(1);
    conn.connect(&options).unwrap();

    clock_mut(&mut conn).now = 1000;
    conn.process_loop(0).unwrap(); // sends PINGREQ

    clock_mut(&mut conn).now = 1000 + conn_ping_resp_timeout();
    assert_eq!(conn.process_loop(0), Err(MqttStatus::KeepAliveTimeout));
}

#[test]
fn recv_failed_propagates_from_process_loop() {
    let mut buf = [0u8; 64];
    let mut conn: TestConnection = Connection::init(
        ChannelTransport::default(),
        ManualClock::default(),
        RecordingHandler::default(),
        &mut buf,
    )
    .unwrap();
    conn_transport_mut(&mut conn).fail_recv = true;
    assert_eq!(conn.process_loop(0), Err(MqttStatus::RecvFailed));
}

fn conn_transport<'a>(conn: &'a TestConnection<'_>) -> &'a ChannelTransport {
    conn.transport()
}

fn conn_transport_mut<'a>(conn: &'a mut TestConnection<'_>) -> &'a mut ChannelTransport {
    conn.transport_mut()
}

fn clock_mut<'a>(conn: &'a mut TestConnection<'_>) -> &'a mut ManualClock {
    conn.clock_mut()
}

fn event_handler<'a>(conn: &'a TestConnection<'_>) -> &'a RecordingHandler {
    conn.event_handler()
}

fn conn_ping_resp_timeout() -> u32 {
    // Matches `ConnectOptions::new`'s default.
    5_000
}
