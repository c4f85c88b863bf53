//! Frame sources and capture files
//!
//! A [`FrameSource`] hands the pipeline one raw frame at a time. Live frames
//! arrive as ZeroMQ messages from the demodulator's PUB socket, or as UDP
//! datagrams (one frame per message either way). Recorded frames are
//! replayed from capture files holding one hex-encoded frame per line, the
//! same format [`CaptureWriter`] produces.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Lines, Write};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Largest datagram accepted from the socket
const MAX_DATAGRAM: usize = 65_536;

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePoll {
    /// A frame's raw bytes
    Frame(Vec<u8>),
    /// Nothing arrived within the timeout
    Idle,
    /// The source is exhausted
    Closed,
}

/// Supplier of raw frames
pub trait FrameSource {
    /// Wait up to `timeout` for the next frame
    fn poll_frame(&mut self, timeout: Duration) -> Result<SourcePoll>;
}

/// Decode one hex capture line into frame bytes
pub fn decode_hex_frame(line: &str) -> Result<Vec<u8>> {
    let line = line.trim();
    let line = line.strip_prefix("0x").unwrap_or(line);
    Ok(hex::decode(line)?)
}

/// Frames published by the demodulator on a ZeroMQ PUB socket
pub struct ZmqFrameSource {
    // keeps the socket's context alive
    _context: zmq::Context,
    socket: zmq::Socket,
    endpoint: String,
}

impl ZmqFrameSource {
    /// Subscribe to every message published at `tcp://{host}:{port}`
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_endpoint(&format!("tcp://{}:{}", host, port))
    }

    /// Subscribe to every message published at a ZeroMQ endpoint
    pub fn connect_endpoint(endpoint: &str) -> Result<Self> {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::SUB)?;
        socket.connect(endpoint)?;
        socket.set_subscribe(b"")?;
        info!("subscribed to {}", endpoint);
        Ok(Self {
            _context: context,
            socket,
            endpoint: endpoint.to_string(),
        })
    }

    /// Endpoint the socket is connected to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for ZmqFrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZmqFrameSource")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl FrameSource for ZmqFrameSource {
    fn poll_frame(&mut self, timeout: Duration) -> Result<SourcePoll> {
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        if self.socket.poll(zmq::POLLIN, timeout_ms)? == 0 {
            return Ok(SourcePoll::Idle);
        }
        let bytes = self.socket.recv_bytes(0)?;
        debug!(endpoint = %self.endpoint, size = bytes.len(), "message received");
        Ok(SourcePoll::Frame(bytes))
    }
}

/// Frames received as UDP datagrams
#[derive(Debug)]
pub struct UdpFrameSource {
    socket: UdpSocket,
    buffer: Vec<u8>,
    timeout: Option<Duration>,
}

impl UdpFrameSource {
    /// Bind a socket on `addr`
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        info!("listening on udp://{}", socket.local_addr()?);
        Ok(Self {
            socket,
            buffer: vec![0u8; MAX_DATAGRAM],
            timeout: None,
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl FrameSource for UdpFrameSource {
    fn poll_frame(&mut self, timeout: Duration) -> Result<SourcePoll> {
        // a zero read timeout is rejected by the OS
        let timeout = timeout.max(Duration::from_millis(1));
        if self.timeout != Some(timeout) {
            self.socket.set_read_timeout(Some(timeout))?;
            self.timeout = Some(timeout);
        }

        match self.socket.recv_from(&mut self.buffer) {
            Ok((size, peer)) => {
                debug!(%peer, size, "datagram received");
                Ok(SourcePoll::Frame(self.buffer[..size].to_vec()))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                Ok(SourcePoll::Idle)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Frames replayed from a hex capture
#[derive(Debug)]
pub struct ReplaySource<B> {
    lines: Lines<B>,
    line_no: usize,
    skipped: usize,
}

impl ReplaySource<BufReader<File>> {
    /// Open a capture file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        info!("replaying {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<B: BufRead> ReplaySource<B> {
    /// Replay from any buffered reader
    pub fn new(reader: B) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines rejected as invalid hex
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<B: BufRead> FrameSource for ReplaySource<B> {
    fn poll_frame(&mut self, _timeout: Duration) -> Result<SourcePoll> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match decode_hex_frame(trimmed) {
                Ok(bytes) => return Ok(SourcePoll::Frame(bytes)),
                Err(e) => {
                    warn!(line = self.line_no, "skipping capture line: {}", e);
                    self.skipped += 1;
                }
            }
        }
        Ok(SourcePoll::Closed)
    }
}

/// Appends raw frames to a capture file as hex lines
#[derive(Debug)]
pub struct CaptureWriter {
    writer: BufWriter<File>,
    frames: u64,
}

impl CaptureWriter {
    /// Open `path` for appending, creating it if needed
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("saving frames to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            frames: 0,
        })
    }

    /// Append one frame
    pub fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        writeln!(self.writer, "{}", hex::encode(bytes))?;
        self.writer.flush()?;
        self.frames += 1;
        Ok(())
    }

    /// Frames written since opening
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
