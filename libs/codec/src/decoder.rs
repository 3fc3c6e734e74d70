//! C2: parses base64-encoded program log lines into typed, named events.
//!
//! Malformed base64 and decode failures never propagate to the caller — they
//! produce no event and are logged at `debug` (§4.1). Events are returned in
//! the order they appear in `logs`.

use base64::Engine;
use types::DecodedEvent;

use crate::discriminator::event_discriminator;
use crate::schema::{FieldType, KNOWN_EVENTS};

const EVENT_LOG_PREFIX: &str = "Program data: ";

/// Decode every self-CPI event log line in `logs` into a [`DecodedEvent`].
/// Lines that aren't event logs, that fail to base64-decode, or whose
/// discriminator doesn't match a registered schema are silently skipped.
pub fn decode_logs(logs: &[String]) -> Vec<DecodedEvent> {
    let mut events = Vec::new();
    for line in logs {
        let Some(encoded) = line.strip_prefix(EVENT_LOG_PREFIX) else {
            continue;
        };
        match decode_one(encoded) {
            Some(event) => events.push(event),
            None => tracing::debug!(line = %line, "skipping undecodable event log line"),
        }
    }
    events
}

fn decode_one(encoded: &str) -> Option<DecodedEvent> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    if bytes.len() < 8 {
        return None;
    }
    let (disc, payload) = bytes.split_at(8);
    let name = KNOWN_EVENTS
        .iter()
        .find(|(name, _)| event_discriminator(name) == disc)
        .map(|(name, _)| *name)?;
    let schema = KNOWN_EVENTS.get(name)?;
    let data = decode_fields(schema, payload)?;
    Some(DecodedEvent {
        name: name.to_string(),
        data,
    })
}

fn decode_fields(
    schema: &[(&'static str, FieldType)],
    payload: &[u8],
) -> Option<std::collections::BTreeMap<String, serde_json::Value>> {
    let mut out = std::collections::BTreeMap::new();
    let mut cursor = 0usize;
    for (field_name, field_type) in schema {
        let width = field_type.width();
        let slice = payload.get(cursor..cursor + width)?;
        let value = match field_type {
            FieldType::U8 => serde_json::json!(slice[0]),
            FieldType::Bool => serde_json::json!(slice[0] != 0),
            FieldType::U16 => serde_json::json!(u16::from_le_bytes(slice.try_into().ok()?)),
            FieldType::U32 => serde_json::json!(u32::from_le_bytes(slice.try_into().ok()?)),
            FieldType::U64 => serde_json::json!(u64::from_le_bytes(slice.try_into().ok()?).to_string()),
            FieldType::I64 => serde_json::json!(i64::from_le_bytes(slice.try_into().ok()?)),
            FieldType::U128 => serde_json::json!(u128::from_le_bytes(slice.try_into().ok()?).to_string()),
            FieldType::Pubkey => {
                let arr: [u8; 32] = slice.try_into().ok()?;
                serde_json::json!(bs58::encode(arr).into_string())
            }
        };
        out.insert(field_name.to_string(), value);
        cursor += width;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discriminator::event_discriminator;

    fn encode_event(name: &str, fields: &[u8]) -> String {
        let mut bytes = event_discriminator(name).to_vec();
        bytes.extend_from_slice(fields);
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn decodes_known_event() {
        let mut fields = Vec::new();
        fields.extend_from_slice(&[7u8; 32]); // pool
        fields.extend_from_slice(&[9u8; 32]); // user
        fields.extend_from_slice(&1_000_000_000u64.to_le_bytes()); // amount_base
        fields.extend_from_slice(&3_000_000u64.to_le_bytes()); // amount_quote
        let encoded = encode_event("LiquidityDeposited", &fields);
        let logs = vec![format!("Program data: {encoded}")];
        let events = decode_logs(&logs);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "LiquidityDeposited");
        assert_eq!(
            events[0].data.get("amount_base").unwrap(),
            &serde_json::json!("1000000000")
        );
    }

    #[test]
    fn skips_malformed_base64() {
        let logs = vec!["Program data: not-valid-base64-!!!".to_string()];
        assert!(decode_logs(&logs).is_empty());
    }

    #[test]
    fn skips_unknown_discriminator() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        let logs = vec![format!("Program data: {encoded}")];
        assert!(decode_logs(&logs).is_empty());
    }

    #[test]
    fn one_bad_event_does_not_affect_siblings() {
        let good = encode_event("NftUnstaked", &[[1u8; 32], [2u8; 32]].concat());
        let logs = vec![
            "Program data: !!!not-base64".to_string(),
            format!("Program data: {good}"),
        ];
        let events = decode_logs(&logs);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "NftUnstaked");
    }

    #[test]
    fn preserves_log_order() {
        let a = encode_event("NftUnstaked", &[[1u8; 32], [2u8; 32]].concat());
        let mut b_fields = Vec::new();
        b_fields.extend_from_slice(&[3u8; 32]);
        b_fields.extend_from_slice(&[4u8; 32]);
        b_fields.extend_from_slice(&[5u8; 32]);
        b_fields.extend_from_slice(&10u16.to_le_bytes());
        let b = encode_event("PoolInitialized", &b_fields);
        let logs = vec![format!("Program data: {a}"), format!("Program data: {b}")];
        let events = decode_logs(&logs);
        assert_eq!(events[0].name, "NftUnstaked");
        assert_eq!(events[1].name, "PoolInitialized");
    }
}
