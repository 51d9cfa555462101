// Cryptographic utilities

use base64::Engine;
use sha2::{Digest, Sha256};

/// SHA-256 base64 digest (STANDARD).
pub fn sha256_base64(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    base64::engine::general_purpose::STANDARD.encode(digest)
}

/// Short, log-safe fingerprint of a secret (hash prefix only; never the raw secret).
pub fn secret_fingerprint(input: &str) -> String {
    if input.is_empty() {
        return "<empty>".to_string();
    }
    let full = sha256_base64(input.as_bytes());
    format!("sha256:{}", &full[..12])
}
