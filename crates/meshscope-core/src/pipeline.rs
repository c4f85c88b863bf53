//! Per-frame orchestration
//!
//! ```text
//! bytes → extract → [capture] → trial decrypt → raw record
//!                                     │
//!                                     └─ matched → decode → identity upsert → resolve names → traffic record
//! ```
//!
//! Frames are handled strictly one at a time. No per-frame failure escapes
//! [`Pipeline::process`]; sink failures are logged and counted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::crypto::{self, EncryptionClass};
use crate::error::Result;
use crate::flags::FlagFields;
use crate::frame::RawFrame;
use crate::keys::KeyRegistry;
use crate::message::{DecodeContext, Message, MessageDecoder};
use crate::sink::{IdentityStore, IdentityUpdate, RawFrameLog, RawFrameRecord, TrafficLog, TrafficRecord};
use crate::transport::{CaptureWriter, FrameSource, SourcePoll};

/// How long one poll waits for a frame
pub const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Pause after a poll that returned nothing
pub const IDLE_SLEEP: Duration = Duration::from_millis(100);

/// Pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub frames: u64,
    pub malformed: u64,
    pub undecrypted: u64,
    pub decoded: u64,
    pub public: u64,
    pub private: u64,
    pub sink_errors: u64,
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames: {} decoded ({} public, {} private), {} undecrypted, {} malformed, {} sink errors",
            self.frames,
            self.decoded,
            self.public,
            self.private,
            self.undecrypted,
            self.malformed,
            self.sink_errors
        )
    }
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Shorter than a header; nothing was written
    Malformed,
    /// No key produced a valid envelope
    Undecrypted,
    /// Decoded and logged
    Decoded(Message),
}

/// Frame pipeline over an identity store and two logs
pub struct Pipeline<I, T, R> {
    keys: KeyRegistry,
    decoder: MessageDecoder,
    identities: I,
    traffic: T,
    raw: R,
    capture: Option<CaptureWriter>,
    stats: PipelineStats,
}

impl<I: IdentityStore, T: TrafficLog, R: RawFrameLog> Pipeline<I, T, R> {
    /// Create a pipeline with the built-in message decoders
    pub fn new(keys: KeyRegistry, identities: I, traffic: T, raw: R) -> Self {
        Self {
            keys,
            decoder: MessageDecoder::with_builtin(),
            identities,
            traffic,
            raw,
            capture: None,
            stats: PipelineStats::default(),
        }
    }

    /// Replace the message decoder
    pub fn with_decoder(mut self, decoder: MessageDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Save every well-formed frame to a capture file
    pub fn with_capture(mut self, capture: CaptureWriter) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Counters so far
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Configured keys
    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    /// Identity store
    pub fn identities(&self) -> &I {
        &self.identities
    }

    /// Decoded traffic log
    pub fn traffic(&self) -> &T {
        &self.traffic
    }

    /// Raw frame log
    pub fn raw_log(&self) -> &R {
        &self.raw
    }

    /// Consume the pipeline, returning its sinks
    pub fn into_parts(self) -> (I, T, R) {
        (self.identities, self.traffic, self.raw)
    }

    fn sink_result(&mut self, sink: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!("{} write failed: {}", sink, e);
            self.stats.sink_errors += 1;
        }
    }

    /// Process one frame received now
    pub fn process(&mut self, bytes: &[u8]) -> FrameOutcome {
        self.process_at(bytes, Utc::now())
    }

    /// Process one frame with an explicit receive time
    pub fn process_at(&mut self, bytes: &[u8], timestamp: DateTime<Utc>) -> FrameOutcome {
        self.stats.frames += 1;

        let frame = match RawFrame::parse(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}", e);
                self.stats.malformed += 1;
                return FrameOutcome::Malformed;
            }
        };

        debug!(
            source = %frame.sender,
            dest = %frame.dest,
            packet_id = format!("{:08x}", frame.packet_id),
            flags = format!("{:02x}", frame.flags),
            channel_hash = format!("{:02x}", frame.channel_hash),
            payload_len = frame.payload.len(),
            "frame"
        );

        if let Some(capture) = self.capture.as_mut() {
            if let Err(e) = capture.write_frame(bytes) {
                warn!("capture write failed: {}", e);
                self.stats.sink_errors += 1;
            }
        }

        let decoded = crypto::try_decrypt(&frame, &self.keys);
        let flag_fields = FlagFields::from(Some(frame.flags));

        let raw_record = RawFrameRecord {
            timestamp,
            source: frame.sender,
            dest: frame.dest,
            packet_id: frame.packet_id,
            channel_hash: frame.channel_hash,
            flags: frame.flags,
            flag_fields,
            packet_size: bytes.len(),
            decrypted: decoded.is_decrypted(),
            encryption_class: decoded.encryption_class,
        };
        let result = self.raw.log_raw(&raw_record);
        self.sink_result("raw frame log", result);

        let Some(envelope) = decoded.envelope else {
            warn!(source = %frame.sender, packet_id = format!("{:08x}", frame.packet_id), "no suitable key");
            self.stats.undecrypted += 1;
            return FrameOutcome::Undecrypted;
        };

        match decoded.encryption_class {
            Some(EncryptionClass::Public) => self.stats.public += 1,
            Some(EncryptionClass::Private) => self.stats.private += 1,
            None => {}
        }

        let channel_name = self.keys.channel_name_for(frame.channel_hash).map(str::to_string);
        match &channel_name {
            Some(name) => info!(channel = %name, "decrypted"),
            None => info!(channel_hash = format!("{:02x}", frame.channel_hash), "decrypted on unknown channel"),
        }

        let ctx = DecodeContext::new(frame.sender, frame.dest);
        let message = self.decoder.decode_envelope(&envelope, &ctx);

        // identity first so this frame's own record carries the new name
        if let Some(identity) = message.node_identity() {
            let update = IdentityUpdate::from_identity(frame.sender, identity, timestamp);
            let result = self.identities.upsert_identity(update);
            self.sink_result("identity store", result);
        }
        for id in [frame.sender, frame.dest] {
            let result = self.identities.touch(id, timestamp);
            self.sink_result("identity store", result);
        }

        let source_name = self.identities.resolve_name(frame.sender);
        let dest_name = self.identities.resolve_name(frame.dest);
        info!(
            from = source_name.as_deref().unwrap_or("unknown"),
            to = dest_name.as_deref().unwrap_or("unknown"),
            msg_type = message.msg_type,
            "traffic"
        );

        let record = TrafficRecord {
            timestamp,
            source: frame.sender,
            source_name,
            dest: frame.dest,
            dest_name,
            packet_id: frame.packet_id,
            channel_hash: frame.channel_hash,
            channel_name,
            port: message.port.to_u32(),
            msg_type: message.msg_type.to_string(),
            payload: message.payload.clone(),
            encryption_class: decoded.encryption_class,
            flags: flag_fields,
        };
        let result = self.traffic.log_decoded(&record);
        self.sink_result("traffic log", result);

        match serde_json::to_string(&message) {
            Ok(json) => info!("message: {}", json),
            Err(e) => warn!("failed to serialize message: {}", e),
        }

        self.stats.decoded += 1;
        FrameOutcome::Decoded(message)
    }

    /// Poll `source` until it closes or `running` is cleared, then close the sinks
    ///
    /// Returns the transport error that stopped the loop, if any.
    pub fn run<S: FrameSource>(&mut self, source: &mut S, running: &AtomicBool) -> Result<()> {
        let mut outcome = Ok(());

        while running.load(Ordering::SeqCst) {
            match source.poll_frame(POLL_TIMEOUT) {
                Ok(SourcePoll::Frame(bytes)) => {
                    self.process(&bytes);
                }
                Ok(SourcePoll::Idle) => std::thread::sleep(IDLE_SLEEP),
                Ok(SourcePoll::Closed) => {
                    info!("frame source closed");
                    break;
                }
                Err(e) => {
                    error!("transport error: {}", e);
                    outcome = Err(e);
                    break;
                }
            }
        }

        let closed = self.close();
        outcome.and(closed)
    }

    /// Flush and close every sink, returning the first failure
    pub fn close(&mut self) -> Result<()> {
        let results = [self.identities.close(), self.traffic.close(), self.raw.close()];
        let mut first = Ok(());
        for result in results {
            if let Err(e) = result {
                error!("failed to close sink: {}", e);
                self.stats.sink_errors += 1;
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        info!("{}", self.stats);
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{NodeId, HEADER_SIZE};
    use crate::keys::CandidateKey;
    use crate::message::Payload;
    use crate::sink::NodeDirectory;

    type MemoryPipeline = Pipeline<NodeDirectory, Vec<TrafficRecord>, Vec<RawFrameRecord>>;

    fn pipeline() -> MemoryPipeline {
        Pipeline::new(
            KeyRegistry::with_default_key("LongFast"),
            NodeDirectory::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    fn text_frame(dest: NodeId) -> Vec<u8> {
        let sender = NodeId::from_u32(0x12345678);
        let frame = RawFrame {
            dest,
            sender,
            packet_id: 42,
            flags: 0x63,
            channel_hash: 0x08,
            payload: crypto::transform(
                &CandidateKey::default_key(),
                sender,
                42,
                &[0x08, 0x01, 0x12, 0x02, b'h', b'i'],
            )
            .unwrap(),
        };
        frame.to_bytes()
    }

    #[test]
    fn test_malformed_frame_writes_nothing() {
        let mut p = pipeline();
        assert_eq!(p.process(&[0u8; HEADER_SIZE - 1]), FrameOutcome::Malformed);
        assert!(p.raw_log().is_empty());
        assert!(p.traffic().is_empty());
        assert!(p.identities().is_empty());
        assert_eq!(p.stats().malformed, 1);
    }

    #[test]
    fn test_decoded_text_frame() {
        let mut p = pipeline();
        let outcome = p.process(&text_frame(NodeId::BROADCAST));
        let FrameOutcome::Decoded(message) = outcome else {
            panic!("expected a decoded frame");
        };
        assert_eq!(message.payload, Payload::Text("hi".into()));

        assert_eq!(p.raw_log().len(), 1);
        assert!(p.raw_log()[0].decrypted);
        assert_eq!(p.raw_log()[0].encryption_class, Some(EncryptionClass::Public));

        let record = &p.traffic()[0];
        assert_eq!(record.channel_name.as_deref(), Some("LongFast"));
        assert_eq!(record.dest_name.as_deref(), Some("broadcast"));
        assert_eq!(record.source_name, None);
        assert_eq!(record.msg_type, "TEXT_MESSAGE_APP");
        assert_eq!(record.flags.hop_limit, Some(3));
        assert_eq!(p.stats().public, 1);
    }

    #[test]
    fn test_direct_text_redacted_in_record() {
        let mut p = pipeline();
        p.process(&text_frame(NodeId::from_u32(0x01020304)));
        let record = &p.traffic()[0];
        assert_eq!(record.payload, Payload::Text(crate::message::REDACTED_TEXT.into()));
        assert_eq!(record.dest_name, None);
    }

    #[test]
    fn test_undecrypted_frame() {
        let mut p = Pipeline::new(
            KeyRegistry::new("LongFast"),
            NodeDirectory::new(),
            Vec::<TrafficRecord>::new(),
            Vec::<RawFrameRecord>::new(),
        );
        assert_eq!(p.process(&text_frame(NodeId::BROADCAST)), FrameOutcome::Undecrypted);
        assert_eq!(p.raw_log().len(), 1);
        assert!(!p.raw_log()[0].decrypted);
        assert_eq!(p.raw_log()[0].encryption_class, None);
        assert!(p.traffic().is_empty());
        assert_eq!(p.stats().undecrypted, 1);
    }

    #[test]
    fn test_envelope_parsed_once_by_trial_decrypt() {
        let mut p = pipeline().with_decoder(MessageDecoder::new());
        let FrameOutcome::Decoded(message) = p.process(&text_frame(NodeId::BROADCAST)) else {
            panic!("expected a decoded frame");
        };
        assert_eq!(
            message.payload,
            Payload::Unstructured {
                port: 1,
                marker: crate::message::UNSTRUCTURED_MARKER,
                raw: hex::encode(b"hi"),
            }
        );
        assert_eq!(p.traffic().len(), 1);
        assert_eq!(p.stats().decoded, 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = PipelineStats {
            frames: 3,
            decoded: 2,
            public: 2,
            malformed: 1,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.starts_with("3 frames: 2 decoded (2 public, 0 private)"));
    }
}
