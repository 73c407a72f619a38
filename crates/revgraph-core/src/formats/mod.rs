//! Serialization formats for record batches.

pub mod persistence;

pub use persistence::{
    BatchHeader, MAX_PERSISTENCE_PAYLOAD_SIZE, batch_from_bytes, batch_to_bytes,
};
