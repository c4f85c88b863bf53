//! # Meshtastic Frame Decoding Library
//!
//! This crate turns raw Meshtastic LoRa frames, as delivered by an SDR
//! demodulator, into structured, logged messages.
//!
//! ## Overview
//!
//! Each frame is a 16-byte cleartext header followed by an AES-CTR encrypted
//! payload. Decoding proceeds in stages:
//!
//! - **Extraction**: Split the header into addressing, flags and channel hash
//! - **Trial decryption**: Try every configured channel key until one yields a valid envelope
//! - **Message decoding**: Dispatch the envelope's payload on its port number
//! - **Logging**: Record every frame, decoded traffic and node identities
//!
//! ## Signal Flow
//!
//! ```text
//! SDR → ZeroMQ/UDP/replay → RawFrame → try_decrypt → Envelope → MessageDecoder → sinks
//! ```
//!
//! ## Example
//!
//! ```rust
//! use meshscope_core::{KeyRegistry, NodeDirectory, Pipeline, RawFrameRecord, TrafficRecord};
//!
//! let keys = KeyRegistry::with_default_key("LongFast");
//! let mut pipeline = Pipeline::new(
//!     keys,
//!     NodeDirectory::new(),
//!     Vec::<TrafficRecord>::new(),
//!     Vec::<RawFrameRecord>::new(),
//! );
//!
//! // A frame too short to hold a header is dropped without writing anything
//! pipeline.process(&[0u8; 4]);
//! assert_eq!(pipeline.stats().malformed, 1);
//! assert!(pipeline.raw_log().is_empty());
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod flags;
pub mod frame;
pub mod keys;
pub mod message;
pub mod pipeline;
pub mod port;
pub mod preset;
pub mod proto;
pub mod sink;
pub mod telemetry;
pub mod transport;

// Re-export main types
pub use crypto::{try_decrypt, DecodedResult, EncryptionClass};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use flags::{FlagBits, FlagFields};
pub use frame::{NodeId, RawFrame};
pub use keys::{compute_channel_hash, CandidateKey, KeyRegistry, DEFAULT_PSK};
pub use message::{DecodeContext, Message, MessageDecoder, Payload};
pub use pipeline::{FrameOutcome, Pipeline, PipelineStats};
pub use port::PortNum;
pub use preset::ModemPreset;
pub use sink::{
    IdentityStore, IdentityUpdate, JsonLinesLog, NodeDirectory, RawFrameLog, RawFrameRecord, TrafficLog,
    TrafficRecord,
};
pub use telemetry::Telemetry;
pub use transport::{CaptureWriter, FrameSource, ReplaySource, SourcePoll, UdpFrameSource, ZmqFrameSource};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::frame::{NodeId, RawFrame};
    pub use crate::keys::{CandidateKey, KeyRegistry};
    pub use crate::message::{Message, MessageDecoder, Payload};
    pub use crate::pipeline::Pipeline;
    pub use crate::sink::{IdentityStore, RawFrameLog, TrafficLog};
    pub use crate::transport::FrameSource;
}
