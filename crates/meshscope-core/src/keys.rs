//! Channel keys and the channel-hash registry
//!
//! Keys are configured as base64 text, one per line, optionally prefixed with
//! a channel name:
//!
//! ```text
//! # default public channel
//! AQ==
//! Friends:8k3JQZUvAFM6Kb0kHbZ0gGCqWzx7lBkHfTuHn7o5U8s=
//! ```
//!
//! A key that decodes to a single byte is the firmware's shorthand for "the
//! default key with a different final byte"; it is expanded before
//! validation. Every accepted key is indexed by its channel hash, the
//! XOR-fold of the channel name and the expanded key bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default Pre-Shared Key (PSK) for the default channel
/// This is the well-known key used by default Meshtastic channels
pub const DEFAULT_PSK: [u8; 16] = [
    0xd4, 0xf1, 0xbb, 0x3a, 0x20, 0x29, 0x07, 0x59,
    0xf0, 0xbc, 0xff, 0xab, 0xcf, 0x4e, 0x69, 0x01,
];

/// Base64 form of [`DEFAULT_PSK`], used when no key file is available
pub const DEFAULT_PSK_BASE64: &str = "1PG7OiApB1nwvP+rz05pAQ==";

/// Expand the single-byte shorthand and check the AES key length
pub fn expand_key(decoded: &[u8]) -> Result<Vec<u8>> {
    let key = if decoded.len() == 1 {
        let mut key = DEFAULT_PSK.to_vec();
        key[DEFAULT_PSK.len() - 1] = decoded[0];
        key
    } else {
        decoded.to_vec()
    };

    match key.len() {
        16 | 32 => Ok(key),
        len => Err(Error::InvalidKeyLength(len)),
    }
}

/// XOR-fold a channel name and key into the one-byte channel hash
pub fn compute_channel_hash(channel_name: &str, key: &[u8]) -> u8 {
    channel_name
        .as_bytes()
        .iter()
        .chain(key)
        .fold(0u8, |acc, b| acc ^ b)
}

/// A validated AES-128 or AES-256 key
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateKey {
    key: Vec<u8>,
    channel_name: Option<String>,
}

impl CandidateKey {
    /// Create from raw (already expanded) key bytes
    pub fn from_bytes(key: &[u8], channel_name: Option<&str>) -> Result<Self> {
        match key.len() {
            16 | 32 => Ok(Self {
                key: key.to_vec(),
                channel_name: channel_name.map(str::to_string),
            }),
            len => Err(Error::InvalidKeyLength(len)),
        }
    }

    /// Decode a base64 key, expanding the single-byte shorthand
    pub fn from_base64(text: &str, channel_name: Option<&str>) -> Result<Self> {
        let decoded = BASE64
            .decode(text.trim())
            .map_err(|e| Error::InvalidKeyConfiguration(format!("'{}' is not base64: {}", text, e)))?;
        let key = expand_key(&decoded)?;
        Self::from_bytes(&key, channel_name)
    }

    /// The well-known default channel key
    pub fn default_key() -> Self {
        Self {
            key: DEFAULT_PSK.to_vec(),
            channel_name: None,
        }
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Get the configured channel name, if any
    pub fn channel_name(&self) -> Option<&str> {
        self.channel_name.as_deref()
    }

    /// Check if this is the well-known default key
    pub fn is_default(&self) -> bool {
        self.key == DEFAULT_PSK
    }

    /// Key size in bits (128 or 256)
    pub fn bits(&self) -> usize {
        self.key.len() * 8
    }
}

impl fmt::Debug for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateKey")
            .field("channel_name", &self.channel_name)
            .field("bits", &self.bits())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Ordered keyring plus the channel hash → name table
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    keys: Vec<CandidateKey>,
    channels: HashMap<u8, String>,
    default_channel: String,
}

impl KeyRegistry {
    /// Create an empty registry; unnamed keys are registered under `default_channel`
    pub fn new(default_channel: &str) -> Self {
        Self {
            keys: Vec::new(),
            channels: HashMap::new(),
            default_channel: default_channel.to_string(),
        }
    }

    /// Registry holding only the default key
    pub fn with_default_key(default_channel: &str) -> Self {
        let mut registry = Self::new(default_channel);
        registry.add(CandidateKey::default_key());
        registry
    }

    /// Append a key and index its channel hash (last write wins on collision)
    pub fn add(&mut self, key: CandidateKey) {
        let name = key
            .channel_name()
            .unwrap_or(&self.default_channel)
            .to_string();
        let hash = compute_channel_hash(&name, key.as_bytes());
        if let Some(previous) = self.channels.insert(hash, name.clone()) {
            if previous != name {
                debug!(hash = format!("{:02x}", hash), %previous, %name, "channel hash collision");
            }
        }
        debug!(hash = format!("{:02x}", hash), channel = %name, bits = key.bits(), "registered channel");
        self.keys.push(key);
    }

    /// Parse one configuration line (`key` or `name:key`)
    ///
    /// Returns `Ok(false)` for blank and comment lines.
    pub fn add_line(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(false);
        }

        // base64 never contains ':'
        let key = match line.split_once(':') {
            Some((name, raw)) => {
                // an empty name means the default channel
                let name = Some(name.trim()).filter(|n| !n.is_empty());
                CandidateKey::from_base64(raw, name)?
            }
            None => CandidateKey::from_base64(line, None)?,
        };
        self.add(key);
        Ok(true)
    }

    /// Build a registry from key file contents, skipping invalid keys
    pub fn parse_key_lines(text: &str, default_channel: &str) -> Self {
        let mut registry = Self::new(default_channel);
        for (lineno, line) in text.lines().enumerate() {
            if let Err(e) = registry.add_line(line) {
                warn!(line = lineno + 1, "skipping key: {}", e);
            }
        }
        if registry.is_empty() {
            warn!("no keys loaded");
        } else {
            info!("loaded {} keys", registry.len());
        }
        registry
    }

    /// Load a key file, falling back to the default key when it cannot be read
    pub fn from_key_file(path: &Path, default_channel: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse_key_lines(&text, default_channel),
            Err(e) => {
                warn!(
                    "cannot read key file {}: {}; using the default key",
                    path.display(),
                    e
                );
                Self::with_default_key(default_channel)
            }
        }
    }

    /// Keys in registration (trial) order
    pub fn keys(&self) -> &[CandidateKey] {
        &self.keys
    }

    /// Channel name registered for a hash
    pub fn channel_name_for(&self, hash: u8) -> Option<&str> {
        self.channels.get(&hash).map(String::as_str)
    }

    /// Name used for keys configured without one
    pub fn default_channel(&self) -> &str {
        &self.default_channel
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if no keys are configured
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
