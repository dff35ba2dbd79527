//! Row id generation
//!
//! A row id is the hex encoding of `node ∥ uvarint(time offset) ∥ uvarint(counter)`.
//! The node is a hardware address (or random bytes), the time offset is the
//! number of milliseconds between a fixed epoch and process start, and the
//! counter is a process-wide atomic. Ids are unique within a process and
//! probabilistically unique across processes; they are not secrets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use prost::encoding::{decode_varint, encode_varint};
use tracing::debug;

use crate::error::RowIdError;

/// Length of the node identifier in bytes
pub const NODE_ID_LEN: usize = 6;

/// Parts recovered from a row id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowIdParts {
    pub node: [u8; NODE_ID_LEN],
    pub time_offset: u64,
    pub counter: u64,
}

#[derive(Debug)]
pub struct RowIdGenerator {
    node: [u8; NODE_ID_LEN],
    time_offset: u64,
    // node ∥ uvarint(time_offset), shared by every id
    prefix: Vec<u8>,
    counter: AtomicU64,
}

impl RowIdGenerator {
    /// Generator for this process: hardware node id, offset captured now
    pub fn new() -> Self {
        Self::with_node(node_id(), time_offset_since_epoch(Utc::now()))
    }

    /// Generator with a configured node id, offset captured now
    pub fn for_node(node: [u8; NODE_ID_LEN]) -> Self {
        Self::with_node(node, time_offset_since_epoch(Utc::now()))
    }

    /// Generator with a fixed node id and time offset
    pub fn with_node(node: [u8; NODE_ID_LEN], time_offset: u64) -> Self {
        let mut prefix = Vec::with_capacity(NODE_ID_LEN + 10);
        prefix.extend_from_slice(&node);
        encode_varint(time_offset, &mut prefix);
        Self {
            node,
            time_offset,
            prefix,
            counter: AtomicU64::new(0),
        }
    }

    /// Process-wide generator
    pub fn global() -> &'static RowIdGenerator {
        static GENERATOR: OnceLock<RowIdGenerator> = OnceLock::new();
        GENERATOR.get_or_init(RowIdGenerator::new)
    }

    /// Next unique row id
    pub fn next_id(&self) -> String {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut buf = Vec::with_capacity(self.prefix.len() + 10);
        buf.extend_from_slice(&self.prefix);
        encode_varint(counter, &mut buf);
        hex::encode(buf)
    }

    pub fn node(&self) -> [u8; NODE_ID_LEN] {
        self.node
    }

    pub fn time_offset(&self) -> u64 {
        self.time_offset
    }

    /// Split a row id back into its parts
    pub fn decode(id: &str) -> Result<RowIdParts, RowIdError> {
        let bytes = hex::decode(id)?;
        if bytes.len() < NODE_ID_LEN {
            return Err(RowIdError::Truncated);
        }
        let mut node = [0u8; NODE_ID_LEN];
        node.copy_from_slice(&bytes[..NODE_ID_LEN]);

        let mut rest = &bytes[NODE_ID_LEN..];
        let time_offset = decode_varint(&mut rest).map_err(|_| RowIdError::Truncated)?;
        let counter = decode_varint(&mut rest).map_err(|_| RowIdError::Truncated)?;
        if !rest.is_empty() {
            return Err(RowIdError::TrailingBytes);
        }
        Ok(RowIdParts {
            node,
            time_offset,
            counter,
        })
    }
}

impl Default for RowIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed epoch for row id time offsets (2020-01-01T00:00:00Z)
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_577_836_800, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn time_offset_since_epoch(now: DateTime<Utc>) -> u64 {
    let millis = (now - epoch()).num_milliseconds();
    u64::try_from(millis).unwrap_or(0)
}

/// Hardware address of the first network interface, or random bytes
fn node_id() -> [u8; NODE_ID_LEN] {
    if let Some(node) = hardware_address() {
        return node;
    }
    let mut node: [u8; NODE_ID_LEN] = rand::random();
    // Multicast bit set: never a real interface address
    node[0] |= 0x01;
    debug!("no hardware address found, using random row id node");
    node
}

#[cfg(target_os = "linux")]
fn hardware_address() -> Option<[u8; NODE_ID_LEN]> {
    let mut interfaces: Vec<_> = std::fs::read_dir("/sys/class/net")
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    interfaces.sort();
    interfaces.into_iter().find_map(|path| {
        let address = std::fs::read_to_string(path.join("address")).ok()?;
        parse_mac(address.trim())
    })
}

#[cfg(not(target_os = "linux"))]
fn hardware_address() -> Option<[u8; NODE_ID_LEN]> {
    None
}

/// Parse `aa:bb:cc:dd:ee:ff`, rejecting the all-zero loopback address
fn parse_mac(s: &str) -> Option<[u8; NODE_ID_LEN]> {
    let mut node = [0u8; NODE_ID_LEN];
    let mut parts = s.split(':');
    for byte in node.iter_mut() {
        *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() || node.iter().all(|b| *b == 0) {
        return None;
    }
    Some(node)
}
