//! # Batch Format
//!
//! Binary serialization for transfer-record batches.
//!
//! File I/O and transport are the caller's business; these are pure
//! transformations.
//!
//! Format: Header (5 bytes) + postcard-serialized `Vec<TransferRecord>`.
//! - 4 bytes: Magic ("RVGR")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::record::TransferRecord;
use crate::{RevgraphError, primitives};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted size of an encoded batch.
///
/// Checked before any decoding so corrupted or hostile input cannot force
/// a large allocation.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 256 * 1024 * 1024; // 256 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header preceding every encoded batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl BatchHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), RevgraphError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(RevgraphError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(RevgraphError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RevgraphError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(RevgraphError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for BatchHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a batch (header + payload).
pub fn batch_to_bytes(records: &[TransferRecord]) -> Result<Vec<u8>, RevgraphError> {
    let payload = postcard::to_stdvec(records)
        .map_err(|e| RevgraphError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&BatchHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a batch produced by `batch_to_bytes`.
pub fn batch_from_bytes(bytes: &[u8]) -> Result<Vec<TransferRecord>, RevgraphError> {
    if bytes.len() < HEADER_SIZE {
        return Err(RevgraphError::SerializationError(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(RevgraphError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let header = BatchHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        RevgraphError::SerializationError(format!("Failed to decode record batch: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityId;
    use crate::model::{Comment, Entity, Task};

    fn sample() -> Vec<TransferRecord> {
        let mut task = Task::with_id(EntityId::from_u128(1), "Check mass budget");
        task.author = Some(EntityId::from_u128(4));
        let mut comment = Comment::with_id(EntityId::from_u128(2), "Over budget");
        comment.created_inside = Some(EntityId::from_u128(1));
        vec![Entity::from(task).to_record(), Entity::from(comment).to_record()]
    }

    #[test]
    fn header_roundtrip() {
        let bytes = BatchHeader::new().to_bytes();
        let restored = BatchHeader::from_bytes(&bytes).expect("parse header");
        assert_eq!(restored, BatchHeader::new());
        assert_eq!(&bytes[0..4], b"RVGR");
    }

    #[test]
    fn encode_decode_is_bit_exact() {
        let bytes1 = batch_to_bytes(&sample()).expect("encode");
        let decoded = batch_from_bytes(&bytes1).expect("decode");
        assert_eq!(decoded, sample());

        let bytes2 = batch_to_bytes(&decoded).expect("re-encode");
        assert_eq!(bytes1, bytes2, "encode -> decode -> encode must be identical");
    }

    #[test]
    fn empty_batch_roundtrips() {
        let bytes = batch_to_bytes(&[]).expect("encode");
        assert!(batch_from_bytes(&bytes).expect("decode").is_empty());
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = batch_to_bytes(&sample()).expect("encode");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            batch_from_bytes(&bytes),
            Err(RevgraphError::SerializationError(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = batch_to_bytes(&sample()).expect("encode");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(batch_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_input_rejected() {
        assert!(batch_from_bytes(b"RVG").is_err());
        let bytes = batch_to_bytes(&sample()).expect("encode");
        assert!(batch_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}
