//! Swap classification (§4.4 step 3): two independent signals, either
//! sufficient. The log-string heuristic is cheap and runs first; the
//! instruction scan is the fallback for programs whose logs don't mention
//! the instruction name.

use base64::Engine;
use types::Pubkey;

use crate::discriminator::instruction_discriminator;

const SWAP_LOG_MARKERS: &[&str] = &["swapexecuted", "instruction: swap"];

/// A single top-level or CPI instruction as decoded from a transaction
/// message: the program it targets plus its raw instruction data, which may
/// be base58 or base64 encoded depending on the RPC's response encoding.
pub struct RawInstruction<'a> {
    pub program_id: &'a Pubkey,
    pub data_base58: Option<&'a str>,
    pub data_base64: Option<&'a str>,
}

/// Log-string heuristic: any log line contains a known swap marker,
/// case-insensitive. Also matches any caller-supplied extra instruction
/// name (e.g. a venue-specific swap instruction name).
pub fn logs_mention_swap(logs: &[String], extra_markers: &[&str]) -> bool {
    logs.iter().any(|line| {
        let lower = line.to_lowercase();
        SWAP_LOG_MARKERS.iter().any(|m| lower.contains(m))
            || extra_markers.iter().any(|m| lower.contains(&m.to_lowercase()))
    })
}

/// Instruction scan: any instruction targeting `program_id` whose first 8
/// bytes equal the `swap` discriminator.
pub fn instructions_contain_swap(instructions: &[RawInstruction<'_>], program_id: &Pubkey, swap_ix_name: &str) -> bool {
    let expected = instruction_discriminator(swap_ix_name);
    instructions.iter().any(|ix| {
        ix.program_id == program_id && decode_instruction_data(ix).map(|d| starts_with(&d, &expected)).unwrap_or(false)
    })
}

fn decode_instruction_data(ix: &RawInstruction<'_>) -> Option<Vec<u8>> {
    if let Some(b58) = ix.data_base58 {
        if let Ok(bytes) = bs58::decode(b58).into_vec() {
            return Some(bytes);
        }
    }
    if let Some(b64) = ix.data_base64 {
        if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(b64) {
            return Some(bytes);
        }
    }
    None
}

fn starts_with(data: &[u8], prefix: &[u8; 8]) -> bool {
    data.len() >= 8 && &data[0..8] == prefix
}

/// §4.4 step 3-4: a transaction is "definitively a swap" if either signal
/// fires; otherwise it is classified as not-a-swap.
pub fn is_swap_transaction(
    logs: &[String],
    instructions: &[RawInstruction<'_>],
    program_id: &Pubkey,
    swap_ix_name: &str,
    extra_log_markers: &[&str],
) -> bool {
    logs_mention_swap(logs, extra_log_markers) || instructions_contain_swap(instructions, program_id, swap_ix_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_heuristic_is_case_insensitive() {
        let logs = vec!["Program log: Instruction: Swap".to_string()];
        assert!(logs_mention_swap(&logs, &[]));
    }

    #[test]
    fn instruction_scan_matches_discriminator() {
        let program = Pubkey::new_unchecked("Orbit1111111111111111111111111111111111111");
        let data = instruction_discriminator("swap").to_vec();
        let b58 = bs58::encode(&data).into_string();
        let ix = RawInstruction {
            program_id: &program,
            data_base58: Some(&b58),
            data_base64: None,
        };
        assert!(instructions_contain_swap(&[ix], &program, "swap"));
    }

    #[test]
    fn non_swap_discriminator_is_not_classified_as_swap() {
        let program = Pubkey::new_unchecked("Orbit1111111111111111111111111111111111111");
        let data = instruction_discriminator("deposit").to_vec();
        let b58 = bs58::encode(&data).into_string();
        let ix = RawInstruction {
            program_id: &program,
            data_base58: Some(&b58),
            data_base64: None,
        };
        assert!(!instructions_contain_swap(&[ix], &program, "swap"));
        assert!(!is_swap_transaction(&[], &[ix], &program, "swap", &[]));
    }

    #[test]
    fn wrong_program_id_is_ignored() {
        let swap_program = Pubkey::new_unchecked("Orbit1111111111111111111111111111111111111");
        let other_program = Pubkey::new_unchecked("Other111111111111111111111111111111111111");
        let data = instruction_discriminator("swap").to_vec();
        let b58 = bs58::encode(&data).into_string();
        let ix = RawInstruction {
            program_id: &other_program,
            data_base58: Some(&b58),
            data_base64: None,
        };
        assert!(!instructions_contain_swap(&[ix], &swap_program, "swap"));
    }
}
