//! Wires the engine to a plain blocking `TcpStream`, demonstrating the
//! `Transport`/`Clock`/`EventHandler` seams against a real broker.
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Instant;

use tjiftmq::packet::publish::PublishInfo;
use tjiftmq::packet::QoS;
use tjiftmq::transport::{Clock, Event, EventHandler, Transport};
use tjiftmq::{Connection, ConnectOptions, MqttStatus};

struct TcpTransport {
    stream: TcpStream,
}

impl Transport for TcpTransport {
    fn send(&mut self, buf: &[u8]) -> Result<usize, MqttStatus> {
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(MqttStatus::SendFailed),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, MqttStatus> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(MqttStatus::RecvFailed),
        }
    }
}

struct WallClock {
    start: Instant,
}

impl Clock for WallClock {
    fn get_time_ms(&mut self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

struct PrintingEventHandler;

impl EventHandler for PrintingEventHandler {
    fn on_event(&mut self, event: Event<'_>) {
        match event {
            Event::Publish(p) => {
                println!("publish on {}: {} bytes", p.topic, p.payload.len());
            }
            Event::PublishAcked { packet_identifier } => {
                println!("publish {packet_identifier} acknowledged");
            }
            Event::SubAck(suback) => {
                for code in suback.return_codes() {
                    println!("subscribe {} result: {code:?}", suback.packet_identifier);
                }
            }
            Event::UnsubAck { packet_identifier } => {
                println!("unsubscribe {packet_identifier} acknowledged");
            }
        }
    }
}

fn main() -> std::io::Result<()> {
    simple_logger::init_with_level(log::Level::Debug).expect("logger already initialized");

    let stream = TcpStream::connect("127.0.0.1:1883")?;
    stream.set_nonblocking(true)?;

    let mut buf = [0u8; 1024];
    let mut conn: Connection<_, _, _, 8> = Connection::init(
        TcpTransport { stream },
        WallClock { start: Instant::now() },
        PrintingEventHandler,
        &mut buf,
    )
    .expect("buffer is non-empty");

    let options = ConnectOptions::new("tjiftmq-demo").with_keep_alive_seconds(30);
    conn.connect(&options).expect("connect");

    let info = PublishInfo {
        qos: QoS::AtLeastOnce,
        packet_identifier: 1,
        ..PublishInfo::new("tjiftmq/demo", b"hello")
    };
    conn.publish(&info).expect("publish");

    loop {
        if let Err(status) = conn.process_loop(100) {
            eprintln!("process_loop error: {status}");
            break;
        }
    }

    Ok(())
}
