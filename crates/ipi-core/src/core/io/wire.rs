//! Binary framing of the i-PI socket protocol.
//!
//! Control messages are ASCII tokens right-padded with spaces to a fixed width of
//! [`HEADER_LEN`] bytes, so they need no length prefix. Payload fields are raw
//! little-endian values:
//!
//! ```text
//! ┌──────────────┬─────────────────────┬──────────────────────┐
//! │ token        │ int32 (counts)      │ float64 (quantities) │
//! │ 12 bytes     │ 4 bytes LE          │ 8 bytes LE           │
//! └──────────────┴─────────────────────┴──────────────────────┘
//! ```
//!
//! 3×3 matrices travel as nine doubles in row-major order; vectors as consecutive
//! `x, y, z` triples.

use nalgebra::{Matrix3, Vector3};
use phf::{Map, phf_map};
use std::fmt;
use std::io::{self, ErrorKind, Read};
use thiserror::Error;
use tracing::trace;

/// Width of every command and reply token.
pub const HEADER_LEN: usize = 12;
/// Size of an encoded integer.
pub const INT_SIZE: usize = 4;
/// Size of an encoded double.
pub const FLOAT_SIZE: usize = 8;

const MATRIX_SIZE: usize = 9 * FLOAT_SIZE;
const VECTOR_SIZE: usize = 3 * FLOAT_SIZE;
const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("Short read while decoding {context}: expected {expected} bytes, received {received}")]
    ShortRead {
        context: &'static str,
        expected: usize,
        received: usize,
    },

    #[error("Unknown command token: {0:?}")]
    UnknownCommand(String),

    #[error("Command {command} is not valid in state {state}")]
    UnexpectedCommand {
        command: Command,
        state: &'static str,
    },

    #[error("Invalid atom count: {0}")]
    InvalidAtomCount(i64),

    #[error("Atom count {count} exceeds the limit of {limit}")]
    TooManyAtoms { count: usize, limit: usize },

    #[error("Invalid {context} length: {length}")]
    InvalidLength { context: &'static str, length: i64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A token sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Status,
    Init,
    PosData,
    GetForce,
    Exit,
}

/// A token sent by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reply {
    NeedInit,
    Ready,
    HaveData,
    ForceReady,
}

static COMMANDS: Map<&'static str, Command> = phf_map! {
    "STATUS" => Command::Status,
    "INIT" => Command::Init,
    "POSDATA" => Command::PosData,
    "GETFORCE" => Command::GetForce,
    "EXIT" => Command::Exit,
};

static REPLIES: Map<&'static str, Reply> = phf_map! {
    "NEEDINIT" => Reply::NeedInit,
    "READY" => Reply::Ready,
    "HAVEDATA" => Reply::HaveData,
    "FORCEREADY" => Reply::ForceReady,
};

fn pad(token: &str) -> [u8; HEADER_LEN] {
    let mut header = [b' '; HEADER_LEN];
    header[..token.len()].copy_from_slice(token.as_bytes());
    header
}

impl Command {
    pub const fn token(self) -> &'static str {
        match self {
            Command::Status => "STATUS",
            Command::Init => "INIT",
            Command::PosData => "POSDATA",
            Command::GetForce => "GETFORCE",
            Command::Exit => "EXIT",
        }
    }

    pub fn header(self) -> [u8; HEADER_LEN] {
        pad(self.token())
    }

    /// Decodes a padded token. Surrounding spaces and NUL bytes are ignored.
    pub fn parse(raw: &[u8]) -> Result<Self, FramingError> {
        let text = String::from_utf8_lossy(raw);
        let token = text.trim_matches(|c: char| c == ' ' || c == '\0');
        COMMANDS
            .get(token)
            .copied()
            .ok_or_else(|| FramingError::UnknownCommand(token.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Reply {
    pub const fn token(self) -> &'static str {
        match self {
            Reply::NeedInit => "NEEDINIT",
            Reply::Ready => "READY",
            Reply::HaveData => "HAVEDATA",
            Reply::ForceReady => "FORCEREADY",
        }
    }

    pub fn header(self) -> [u8; HEADER_LEN] {
        pad(self.token())
    }

    pub fn parse(raw: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(raw);
        let token = text.trim_matches(|c: char| c == ' ' || c == '\0');
        REPLIES.get(token).copied()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}

/// Fills `buf` completely; running out of input is a [`FramingError::ShortRead`].
pub fn read_full(
    reader: &mut impl Read,
    buf: &mut [u8],
    context: &'static str,
) -> Result<(), FramingError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FramingError::ShortRead {
                    context,
                    expected: buf.len(),
                    received: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(FramingError::ShortRead {
                    context,
                    expected: buf.len(),
                    received: filled,
                });
            }
            Err(e) => return Err(FramingError::Io(e)),
        }
    }
    Ok(())
}

/// Reads one command token.
///
/// Returns `Ok(None)` when the peer has gone away before the first byte of the
/// token: end of stream, reset or abort. A token cut off part way is a framing
/// error.
pub fn read_command(reader: &mut impl Read) -> Result<Option<Command>, FramingError> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(FramingError::ShortRead {
                    context: "command token",
                    expected: HEADER_LEN,
                    received: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if filled == 0 && is_disconnect(e.kind()) => return Ok(None),
            Err(e) => return Err(FramingError::Io(e)),
        }
    }
    trace!("Received raw header {:?}", String::from_utf8_lossy(&header));
    Command::parse(&header).map(Some)
}

pub fn read_i32(reader: &mut impl Read, context: &'static str) -> Result<i32, FramingError> {
    let mut buf = [0u8; INT_SIZE];
    read_full(reader, &mut buf, context)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn read_f64(reader: &mut impl Read, context: &'static str) -> Result<f64, FramingError> {
    let mut buf = [0u8; FLOAT_SIZE];
    read_full(reader, &mut buf, context)?;
    Ok(f64::from_le_bytes(buf))
}

pub fn read_matrix3(
    reader: &mut impl Read,
    context: &'static str,
) -> Result<Matrix3<f64>, FramingError> {
    let mut buf = [0u8; MATRIX_SIZE];
    read_full(reader, &mut buf, context)?;
    let values: Vec<f64> = buf.chunks_exact(FLOAT_SIZE).map(decode_f64).collect();
    Ok(Matrix3::from_row_slice(&values))
}

/// Reads `count` consecutive `x, y, z` triples.
pub fn read_vectors(
    reader: &mut impl Read,
    count: usize,
    context: &'static str,
) -> Result<Vec<Vector3<f64>>, FramingError> {
    let buf = read_bytes(reader, count * VECTOR_SIZE, context)?;
    Ok(buf
        .chunks_exact(VECTOR_SIZE)
        .map(|chunk| {
            Vector3::new(
                decode_f64(&chunk[0..8]),
                decode_f64(&chunk[8..16]),
                decode_f64(&chunk[16..24]),
            )
        })
        .collect())
}

/// Reads exactly `len` bytes.
///
/// The buffer grows with the bytes actually received, so a bogus declared length
/// ends in a [`FramingError::ShortRead`] instead of a huge up-front allocation.
pub fn read_bytes(
    reader: &mut impl Read,
    len: usize,
    context: &'static str,
) -> Result<Vec<u8>, FramingError> {
    let mut buf = Vec::with_capacity(len.min(READ_CHUNK));
    match reader.by_ref().take(len as u64).read_to_end(&mut buf) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
        Err(e) => return Err(FramingError::Io(e)),
    }
    if buf.len() < len {
        return Err(FramingError::ShortRead {
            context,
            expected: len,
            received: buf.len(),
        });
    }
    Ok(buf)
}

/// Reads an atom count and checks it against `limit`.
pub fn read_atom_count(
    reader: &mut impl Read,
    limit: usize,
    context: &'static str,
) -> Result<usize, FramingError> {
    let raw = read_i32(reader, context)?;
    let count =
        usize::try_from(raw).map_err(|_| FramingError::InvalidAtomCount(i64::from(raw)))?;
    if count > limit {
        return Err(FramingError::TooManyAtoms { count, limit });
    }
    Ok(count)
}

/// Reads a length-prefixed byte string.
pub fn read_prefixed_bytes(
    reader: &mut impl Read,
    context: &'static str,
) -> Result<Vec<u8>, FramingError> {
    let raw = read_i32(reader, context)?;
    let len = usize::try_from(raw).map_err(|_| FramingError::InvalidLength {
        context,
        length: i64::from(raw),
    })?;
    read_bytes(reader, len, context)
}

#[inline]
fn decode_f64(bytes: &[u8]) -> f64 {
    let mut buf = [0u8; FLOAT_SIZE];
    buf.copy_from_slice(bytes);
    f64::from_le_bytes(buf)
}

/// An outgoing message assembled in memory and written in one piece.
#[derive(Debug, Default, Clone)]
pub struct WireBuffer {
    buf: Vec<u8>,
}

impl WireBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_header(&mut self, header: [u8; HEADER_LEN]) -> &mut Self {
        self.buf.extend_from_slice(&header);
        self
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_matrix3(&mut self, matrix: &Matrix3<f64>) -> &mut Self {
        for row in matrix.row_iter() {
            for value in row.iter() {
                self.put_f64(*value);
            }
        }
        self
    }

    pub fn put_vectors(&mut self, vectors: &[Vector3<f64>]) -> &mut Self {
        self.buf.reserve(vectors.len() * VECTOR_SIZE);
        for v in vectors {
            self.put_f64(v.x).put_f64(v.y).put_f64(v.z);
        }
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Writes an i32 count, failing if `count` does not fit.
    pub fn put_count(&mut self, count: usize, context: &'static str) -> Result<&mut Self, FramingError> {
        let value = i32::try_from(count).map_err(|_| FramingError::InvalidLength {
            context,
            length: i64::try_from(count).unwrap_or(i64::MAX),
        })?;
        Ok(self.put_i32(value))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
