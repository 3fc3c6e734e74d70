//! 8-byte discriminators, computed the way Anchor-style programs derive them:
//! the first 8 bytes of `SHA-256(namespace + ":" + name)`.

use sha2::{Digest, Sha256};

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[0..8]);
    out
}

/// Instruction discriminator: `SHA-256("global:" + name)[0..8]` (§4.1, glossary).
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator("global", name)
}

/// Event discriminator, following the same namespaced-hash convention as
/// instructions but under the `"event"` namespace. Used by [`crate::decoder`]
/// to recognize self-CPI event logs without an IDL.
pub fn event_discriminator(name: &str) -> [u8; 8] {
    discriminator("event", name)
}
