//! Output sinks: node identities, decoded traffic, and raw frame logs
//!
//! The pipeline talks to three collaborator traits. File-backed
//! implementations write JSON (one object per line for the logs, a single
//! document for the node directory); `Vec` implementations collect records
//! in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::crypto::EncryptionClass;
use crate::error::Result;
use crate::flags::FlagFields;
use crate::frame::NodeId;
use crate::message::{NodeIdentity, Payload};

fn hex_u32<S: Serializer>(value: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{:08x}", value))
}

fn hex_u8<S: Serializer>(value: &u8, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{:02x}", value))
}

/// Fields learned about a node from one announcement; `None` leaves the stored value alone
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityUpdate {
    pub id: NodeId,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub hw_model: Option<i32>,
    pub role: Option<i32>,
    pub public_key: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl IdentityUpdate {
    /// Build an update from a decoded identity announcement
    pub fn from_identity(id: NodeId, identity: &NodeIdentity, timestamp: DateTime<Utc>) -> Self {
        let text = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            id,
            long_name: text(&identity.long_name),
            short_name: text(&identity.short_name),
            hw_model: Some(identity.hw_model),
            role: Some(identity.role),
            public_key: identity.public_key.clone(),
            timestamp,
        }
    }
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficRecord {
    pub timestamp: DateTime<Utc>,
    pub source: NodeId,
    pub source_name: Option<String>,
    pub dest: NodeId,
    pub dest_name: Option<String>,
    #[serde(serialize_with = "hex_u32")]
    pub packet_id: u32,
    #[serde(serialize_with = "hex_u8")]
    pub channel_hash: u8,
    pub channel_name: Option<String>,
    pub port: u32,
    pub msg_type: String,
    pub payload: Payload,
    pub encryption_class: Option<EncryptionClass>,
    #[serde(flatten)]
    pub flags: FlagFields,
}

/// One received frame, decrypted or not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFrameRecord {
    pub timestamp: DateTime<Utc>,
    pub source: NodeId,
    pub dest: NodeId,
    #[serde(serialize_with = "hex_u32")]
    pub packet_id: u32,
    #[serde(serialize_with = "hex_u8")]
    pub channel_hash: u8,
    #[serde(serialize_with = "hex_u8")]
    pub flags: u8,
    #[serde(flatten)]
    pub flag_fields: FlagFields,
    /// Header plus payload bytes
    pub packet_size: usize,
    pub decrypted: bool,
    pub encryption_class: Option<EncryptionClass>,
}

/// Node identity store
pub trait IdentityStore {
    /// Merge an identity announcement
    fn upsert_identity(&mut self, update: IdentityUpdate) -> Result<()>;

    /// Record that a node was seen without learning anything about it
    fn touch(&mut self, id: NodeId, timestamp: DateTime<Utc>) -> Result<()>;

    /// Display name for a node, `None` when nothing is known
    fn resolve_name(&self, id: NodeId) -> Option<String>;

    /// Flush and release resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Decoded traffic log
pub trait TrafficLog {
    /// Append one record
    fn log_decoded(&mut self, record: &TrafficRecord) -> Result<()>;

    /// Flush and release resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Raw frame log
pub trait RawFrameLog {
    /// Append one record
    fn log_raw(&mut self, record: &RawFrameRecord) -> Result<()>;

    /// Flush and release resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Append-only JSON Lines file of `R` records
#[derive(Debug)]
pub struct JsonLinesLog<R> {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
    _record: PhantomData<fn(&R)>,
}

impl<R: Serialize> JsonLinesLog<R> {
    /// Open `path` for appending, creating it if needed
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!("appending to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            written: 0,
            _record: PhantomData,
        })
    }

    /// Serialize one record as a line
    pub fn append(&mut self, record: &R) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered lines to disk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Records written since opening
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrafficLog for JsonLinesLog<TrafficRecord> {
    fn log_decoded(&mut self, record: &TrafficRecord) -> Result<()> {
        self.append(record)
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

impl RawFrameLog for JsonLinesLog<RawFrameRecord> {
    fn log_raw(&mut self, record: &RawFrameRecord) -> Result<()> {
        self.append(record)
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

impl TrafficLog for Vec<TrafficRecord> {
    fn log_decoded(&mut self, record: &TrafficRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl RawFrameLog for Vec<RawFrameRecord> {
    fn log_raw(&mut self, record: &RawFrameRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Everything known about one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub hw_model: Option<i32>,
    pub role: Option<i32>,
    pub public_key: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl NodeRecord {
    fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            long_name: None,
            short_name: None,
            hw_model: None,
            role: None,
            public_key: None,
            first_seen: timestamp,
            last_seen: timestamp,
        }
    }

    /// `long (short)`, or whichever name is known
    pub fn display_name(&self) -> Option<String> {
        match (&self.long_name, &self.short_name) {
            (Some(long), Some(short)) => Some(format!("{} ({})", long, short)),
            (Some(long), None) => Some(long.clone()),
            (None, Some(short)) => Some(short.clone()),
            (None, None) => None,
        }
    }
}

/// In-memory node table with optional JSON persistence
///
/// A persisted directory is rewritten after every identity upsert, so names
/// survive an unclean exit. `touch` only updates memory; seen times are
/// flushed on the next upsert or on close.
#[derive(Debug, Default)]
pub struct NodeDirectory {
    nodes: BTreeMap<NodeId, NodeRecord>,
    path: Option<PathBuf>,
}

impl NodeDirectory {
    /// Create an empty, unpersisted directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a directory persisted at `path`, loading it if it exists
    pub fn open(path: &Path) -> Result<Self> {
        let nodes = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let nodes: BTreeMap<NodeId, NodeRecord> = serde_json::from_reader(reader)?;
            info!("loaded {} nodes from {}", nodes.len(), path.display());
            nodes
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            nodes,
            path: Some(path.to_path_buf()),
        })
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    /// Iterate nodes in ID order
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeRecord)> {
        self.nodes.iter()
    }

    /// Number of known nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no nodes are known
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Write the directory to its backing file, if any
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &self.nodes)?;
            writer.flush()?;
            debug!("saved {} nodes to {}", self.nodes.len(), path.display());
        }
        Ok(())
    }
}

impl IdentityStore for NodeDirectory {
    fn upsert_identity(&mut self, update: IdentityUpdate) -> Result<()> {
        if update.id.is_broadcast() {
            return Ok(());
        }
        let record = self
            .nodes
            .entry(update.id)
            .or_insert_with(|| NodeRecord::new(update.timestamp));

        if update.long_name.is_some() {
            record.long_name = update.long_name;
        }
        if update.short_name.is_some() {
            record.short_name = update.short_name;
        }
        if update.hw_model.is_some() {
            record.hw_model = update.hw_model;
        }
        if update.role.is_some() {
            record.role = update.role;
        }
        if update.public_key.is_some() {
            record.public_key = update.public_key;
        }
        record.last_seen = update.timestamp;
        self.save()
    }

    fn touch(&mut self, id: NodeId, timestamp: DateTime<Utc>) -> Result<()> {
        if !id.is_broadcast() {
            self.nodes
                .entry(id)
                .or_insert_with(|| NodeRecord::new(timestamp))
                .last_seen = timestamp;
        }
        Ok(())
    }

    fn resolve_name(&self, id: NodeId) -> Option<String> {
        if id.is_broadcast() {
            return Some("broadcast".to_string());
        }
        self.nodes.get(&id).and_then(NodeRecord::display_name)
    }

    fn close(&mut self) -> Result<()> {
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn update(id: u32, long: Option<&str>, short: Option<&str>, secs: i64) -> IdentityUpdate {
        IdentityUpdate {
            id: NodeId::from_u32(id),
            long_name: long.map(str::to_string),
            short_name: short.map(str::to_string),
            hw_model: None,
            role: None,
            public_key: None,
            timestamp: at(secs),
        }
    }

    #[test]
    fn test_resolve_name_forms() {
        let mut dir = NodeDirectory::new();
        dir.upsert_identity(update(1, Some("Alpha"), Some("A"), 0)).unwrap();
        dir.upsert_identity(update(2, Some("Bravo"), None, 0)).unwrap();
        dir.upsert_identity(update(3, None, Some("C"), 0)).unwrap();
        dir.touch(NodeId::from_u32(4), at(0)).unwrap();

        assert_eq!(dir.resolve_name(NodeId::from_u32(1)).as_deref(), Some("Alpha (A)"));
        assert_eq!(dir.resolve_name(NodeId::from_u32(2)).as_deref(), Some("Bravo"));
        assert_eq!(dir.resolve_name(NodeId::from_u32(3)).as_deref(), Some("C"));
        assert_eq!(dir.resolve_name(NodeId::from_u32(4)), None);
        assert_eq!(dir.resolve_name(NodeId::from_u32(5)), None);
        assert_eq!(dir.resolve_name(NodeId::BROADCAST).as_deref(), Some("broadcast"));
    }

    #[test]
    fn test_upsert_coalesces() {
        let mut dir = NodeDirectory::new();
        let mut first = update(7, Some("Old Name"), Some("ON"), 100);
        first.hw_model = Some(9);
        dir.upsert_identity(first).unwrap();
        dir.upsert_identity(update(7, Some("New Name"), None, 200)).unwrap();

        let record = dir.get(NodeId::from_u32(7)).unwrap();
        assert_eq!(record.long_name.as_deref(), Some("New Name"));
        assert_eq!(record.short_name.as_deref(), Some("ON"));
        assert_eq!(record.hw_model, Some(9));
        assert_eq!(record.first_seen, at(100));
        assert_eq!(record.last_seen, at(200));
    }

    #[test]
    fn test_broadcast_never_stored() {
        let mut dir = NodeDirectory::new();
        dir.touch(NodeId::BROADCAST, at(0)).unwrap();
        dir.upsert_identity(update(0xffffffff, Some("Everyone"), None, 0)).unwrap();
        assert!(dir.is_empty());
    }

    #[test]
    fn test_directory_persistence() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nodes.json");

        let mut dir = NodeDirectory::open(&path).unwrap();
        dir.upsert_identity(update(0xa1b2c3d4, Some("Persisted"), Some("P"), 5)).unwrap();
        dir.close().unwrap();

        let reopened = NodeDirectory::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(
            reopened.resolve_name(NodeId::from_u32(0xa1b2c3d4)).as_deref(),
            Some("Persisted (P)")
        );
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"a1b2c3d4\""));
    }

    #[test]
    fn test_upsert_persists_without_close() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nodes.json");

        let mut dir = NodeDirectory::open(&path).unwrap();
        dir.upsert_identity(update(0x0badcafe, Some("Crashed"), Some("CR"), 5)).unwrap();
        dir.touch(NodeId::from_u32(0x00c0ffee), at(6)).unwrap();

        let reopened = NodeDirectory::open(&path).unwrap();
        assert_eq!(
            reopened.resolve_name(NodeId::from_u32(0x0badcafe)).as_deref(),
            Some("Crashed (CR)")
        );
        assert!(reopened.get(NodeId::from_u32(0x00c0ffee)).is_none());

        dir.close().unwrap();
        let reopened = NodeDirectory::open(&path).unwrap();
        assert!(reopened.get(NodeId::from_u32(0x00c0ffee)).is_some());
    }

    #[test]
    fn test_identity_update_from_announcement() {
        let identity = NodeIdentity {
            id: "!00000001".into(),
            long_name: "Node One".into(),
            short_name: String::new(),
            hw_model: 4,
            role: 0,
            public_key: None,
        };
        let update = IdentityUpdate::from_identity(NodeId::from_u32(1), &identity, at(0));
        assert_eq!(update.long_name.as_deref(), Some("Node One"));
        assert_eq!(update.short_name, None);
        assert_eq!(update.hw_model, Some(4));
    }

    #[test]
    fn test_json_lines_log() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("packets_raw.jsonl");
        let record = RawFrameRecord {
            timestamp: at(0),
            source: NodeId::from_u32(0x12345678),
            dest: NodeId::BROADCAST,
            packet_id: 0xbeef,
            channel_hash: 0x08,
            flags: 0x63,
            flag_fields: FlagFields::from(Some(0x63)),
            packet_size: 22,
            decrypted: false,
            encryption_class: None,
        };

        let mut log: JsonLinesLog<RawFrameRecord> = JsonLinesLog::create(&path).unwrap();
        log.log_raw(&record).unwrap();
        log.log_raw(&record).unwrap();
        RawFrameLog::close(&mut log).unwrap();
        assert_eq!(log.written(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["packet_id"], "0000beef");
        assert_eq!(value["channel_hash"], "08");
        assert_eq!(value["flags"], "63");
        assert_eq!(value["hop_limit"], 3);
        assert_eq!(value["hop_start"], 3);
        assert_eq!(value["want_ack"], false);
        assert_eq!(value["decrypted"], false);
        assert!(value["encryption_class"].is_null());
    }
}
