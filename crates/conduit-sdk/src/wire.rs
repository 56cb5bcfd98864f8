//! Metadata wire format, schema v1
//!
//! Member descriptors cross the boundary as a flat sequence of strings:
//!
//! ```text
//! slot 0      schema tag        "conduit-meta/1"
//! slot 1      total descriptors  decimal
//! slot 2..    descriptors, SLOTS_PER_MEMBER slots each:
//!             name, signature, flags, declaring_type
//! ```
//!
//! `index` addresses descriptors, not slots. A batch starting at `index`
//! carries descriptors `[index, min(index + batch_size, total))`; a batch
//! past the end carries the header only. Any index may be requested again.

use crate::error::{BridgeError, BridgeResult};
use crate::metadata::MetadataEntry;

/// Schema tag written in slot 0
pub const SCHEMA_TAG: &str = "conduit-meta/1";

/// Number of header slots
pub const HEADER_SLOTS: usize = 2;

/// Number of consecutive slots one descriptor occupies
pub const SLOTS_PER_MEMBER: usize = 4;

/// A decoded batch
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataBatch {
    /// Total descriptor count of the type
    pub total: usize,
    /// Descriptors carried by this batch
    pub entries: Vec<MetadataEntry>,
}

impl MetadataBatch {
    /// Index of the first descriptor not covered by a batch that started at `index`
    pub fn next_index(&self, index: usize) -> Option<usize> {
        let next = index + self.entries.len();
        if next < self.total && !self.entries.is_empty() {
            Some(next)
        } else {
            None
        }
    }
}

/// Encode one batch of `members`, starting at descriptor `index`
pub fn encode_batch(members: &[MetadataEntry], index: usize, batch_size: usize) -> Vec<String> {
    let start = index.min(members.len());
    let end = start.saturating_add(batch_size).min(members.len());

    let mut slots = Vec::with_capacity(HEADER_SLOTS + (end - start) * SLOTS_PER_MEMBER);
    slots.push(SCHEMA_TAG.to_string());
    slots.push(members.len().to_string());
    for entry in &members[start..end] {
        slots.push(entry.name.clone());
        slots.push(entry.signature.clone());
        slots.push(entry.flags());
        slots.push(entry.declaring_type.clone());
    }
    slots
}

/// Decode one batch produced by [`encode_batch`]
pub fn decode_batch(slots: &[String]) -> BridgeResult<MetadataBatch> {
    if slots.len() < HEADER_SLOTS {
        return Err(BridgeError::MalformedMetadata(format!(
            "batch has {} slots, header needs {}",
            slots.len(),
            HEADER_SLOTS
        )));
    }
    if slots[0] != SCHEMA_TAG {
        return Err(BridgeError::MalformedMetadata(format!(
            "unsupported schema '{}'",
            slots[0]
        )));
    }
    let total: usize = slots[1]
        .parse()
        .map_err(|_| BridgeError::MalformedMetadata(format!("bad member count '{}'", slots[1])))?;

    let body = &slots[HEADER_SLOTS..];
    if body.len() % SLOTS_PER_MEMBER != 0 {
        return Err(BridgeError::MalformedMetadata(format!(
            "{} body slots is not a multiple of {}",
            body.len(),
            SLOTS_PER_MEMBER
        )));
    }

    let entries = body
        .chunks_exact(SLOTS_PER_MEMBER)
        .map(|c| MetadataEntry::from_slots(&c[0], &c[1], &c[2], &c[3]))
        .collect::<BridgeResult<Vec<_>>>()?;

    if entries.len() > total {
        return Err(BridgeError::MalformedMetadata(format!(
            "batch carries {} members but type declares {}",
            entries.len(),
            total
        )));
    }

    Ok(MetadataBatch { total, entries })
}
