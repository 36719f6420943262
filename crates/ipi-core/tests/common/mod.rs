#![allow(dead_code)]

use ipi_driver::core::io::messages::{ForceMessage, InitMessage, PositionMessage};
use ipi_driver::core::io::wire::{self, Command, HEADER_LEN, Reply, WireBuffer};
use ipi_driver::engine::config::{Address, DriverConfig, DriverConfigBuilder};
use ipi_driver::core::units::WireUnits;
use nalgebra::{Matrix3, Vector3};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The server end of one connection, speaking the protocol from the other side.
pub struct ServerSession {
    stream: TcpStream,
}

impl ServerSession {
    pub fn send(&mut self, command: Command) {
        self.stream.write_all(&command.header()).unwrap();
    }

    pub fn init(&mut self, replica: i32, info: &str) {
        let mut buf = WireBuffer::new();
        buf.put_header(Command::Init.header());
        InitMessage {
            replica,
            info: info.as_bytes().to_vec(),
        }
        .encode(&mut buf)
        .unwrap();
        self.stream.write_all(buf.as_bytes()).unwrap();
    }

    pub fn positions(&mut self, cell: Matrix3<f64>, positions: Vec<Vector3<f64>>) {
        let inverse = cell.try_inverse().unwrap();
        let mut buf = WireBuffer::new();
        buf.put_header(Command::PosData.header());
        PositionMessage {
            cell,
            inverse,
            positions,
        }
        .encode(&mut buf)
        .unwrap();
        self.stream.write_all(buf.as_bytes()).unwrap();
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    pub fn reply(&mut self) -> Reply {
        let mut header = [0u8; HEADER_LEN];
        wire::read_full(&mut self.stream, &mut header, "reply").unwrap();
        Reply::parse(&header).unwrap()
    }

    pub fn status(&mut self) -> Reply {
        self.send(Command::Status);
        self.reply()
    }

    /// Sends `GETFORCE` and decodes the `FORCEREADY` payload.
    pub fn forces(&mut self) -> ForceMessage {
        self.send(Command::GetForce);
        assert_eq!(self.reply(), Reply::ForceReady);
        ForceMessage::decode(&mut self.stream, 1_000_000).unwrap()
    }

    /// Returns true once the client has closed its end.
    pub fn client_closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(std::io::Read::read(&mut self.stream, &mut byte), Ok(0) | Err(_))
    }
}

/// A loopback listener that runs `script` against each of `sessions` accepted
/// connections, in order.
pub fn spawn_server<T, F>(sessions: usize, script: F) -> (u16, JoinHandle<Vec<T>>)
where
    T: Send + 'static,
    F: Fn(usize, &mut ServerSession) -> T + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        (0..sessions)
            .map(|i| {
                let (stream, _) = listener.accept().unwrap();
                stream
                    .set_read_timeout(Some(Duration::from_secs(10)))
                    .unwrap();
                script(i, &mut ServerSession { stream })
            })
            .collect()
    });
    (port, handle)
}

pub fn client_config(port: u16, wire_units: WireUnits) -> DriverConfig {
    DriverConfigBuilder::new()
        .address(Address::tcp("127.0.0.1", port))
        .connect_timeout(Duration::from_secs(2))
        .wire_units(wire_units)
        .build()
        .unwrap()
}

pub fn f64_relative_equal(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    ((a - b) / a.abs().max(b.abs())).abs() < 1e-12
}
