//! # Orbit Codec
//!
//! Parses base64-encoded program log lines into typed events (C2) and
//! classifies transactions as swaps via the log-heuristic / instruction-scan
//! pair the Ingestion Engine uses (§4.4). Never panics or returns an `Err`
//! to its caller on malformed input — undecodable events are dropped.

pub mod decoder;
pub mod discriminator;
pub mod instruction_scan;
pub mod schema;

pub use decoder::decode_logs;
pub use discriminator::{event_discriminator, instruction_discriminator};
pub use instruction_scan::{is_swap_transaction, logs_mention_swap, RawInstruction};
