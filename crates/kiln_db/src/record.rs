//! Versioned byte layout of a stored [`RuleResult`].
//!
//! ```text
//! [u32 LE header length][bincode RecordHeader][bincode RuleResult]
//! ```
//!
//! The header carries magic bytes, the record format version, and a checksum
//! of the payload, so a damaged or foreign blob is reported as corrupt rather
//! than decoded into a wrong result.

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::result::RuleResult;

/// Magic bytes identifying a kiln result record.
const RECORD_MAGIC: [u8; 4] = *b"KRES";

/// Current record format version. Increment on breaking changes to the
/// header or to [`RuleResult`]'s field layout.
pub const RECORD_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: ContentHash,
}

/// Encodes a result into its stored form.
pub fn encode_record(result: &RuleResult) -> Result<Vec<u8>, DbError> {
    let payload = bincode::serde::encode_to_vec(result, bincode::config::standard())
        .map_err(|e| DbError::Serialization {
            reason: e.to_string(),
        })?;

    let header = RecordHeader {
        magic: RECORD_MAGIC,
        format_version: RECORD_FORMAT_VERSION,
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| DbError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| DbError::Serialization {
        reason: "record header exceeds u32 length".to_string(),
    })?;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decodes a stored record for the rule `key`.
///
/// Any structural problem (truncation, wrong magic, unknown format version,
/// checksum mismatch, undecodable payload) is [`DbError::Corrupt`].
pub fn decode_record(key: &str, raw: &[u8]) -> Result<RuleResult, DbError> {
    let corrupt = |reason: String| DbError::Corrupt {
        key: key.to_string(),
        reason,
    };

    let len_bytes: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| corrupt("record shorter than its length prefix".to_string()))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_end = 4usize
        .checked_add(header_len)
        .filter(|&end| end <= raw.len())
        .ok_or_else(|| corrupt("truncated record header".to_string()))?;

    let (header, _): (RecordHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..header_end], bincode::config::standard())
            .map_err(|e| corrupt(format!("undecodable header: {e}")))?;

    if header.magic != RECORD_MAGIC {
        return Err(corrupt("bad magic bytes".to_string()));
    }
    if header.format_version != RECORD_FORMAT_VERSION {
        return Err(corrupt(format!(
            "format version {} (expected {RECORD_FORMAT_VERSION})",
            header.format_version
        )));
    }

    let payload = &raw[header_end..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(corrupt(format!(
            "checksum mismatch: expected {}, got {actual}",
            header.checksum
        )));
    }

    let (result, _): (RuleResult, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .map_err(|e| corrupt(format!("undecodable payload: {e}")))?;
    Ok(result)
}
