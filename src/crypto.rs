//! Symmetric payload sealing for the in-memory transport
//!
//! The real node encrypts Whisper envelopes itself; the in-memory
//! provider models the shared-secret public channel by sealing
//! payloads with the configured symmetric key. A payload sealed with
//! one key cannot be opened by a subscription holding another.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Sealed payload envelope carried on the public channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedPayload {
    /// Base64-encoded nonce (96-bit for AES-256-GCM)
    pub nonce: String,

    /// Base64-encoded ciphertext
    pub ciphertext: String,
}

/// AES-256-GCM symmetric key derived from hex key material
pub struct SymKey {
    cipher: Aes256Gcm,
}

impl SymKey {
    /// Parse `0x`-prefixed hex key material into a 256-bit key
    pub fn from_hex(material: &str) -> Result<Self> {
        let stripped = material.strip_prefix("0x").unwrap_or(material);
        let bytes = hex::decode(stripped)
            .map_err(|e| RelayError::Key(format!("Invalid sym key material: {}", e)))?;

        if bytes.len() != 32 {
            return Err(RelayError::Key(format!(
                "Sym key material must be 32 bytes, got {}",
                bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&bytes)
            .map_err(|e| RelayError::Key(format!("Invalid sym key: {}", e)))?;
        Ok(Self { cipher })
    }

    /// Seal a plaintext payload
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedPayload> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| RelayError::Crypto(format!("Sealing failed: {}", e)))?;

        Ok(SealedPayload {
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(ciphertext),
        })
    }

    /// Open a sealed payload
    pub fn open(&self, sealed: &SealedPayload) -> Result<Vec<u8>> {
        let nonce_bytes = BASE64
            .decode(&sealed.nonce)
            .map_err(|e| RelayError::Crypto(format!("Invalid nonce encoding: {}", e)))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .map_err(|e| RelayError::Crypto(format!("Invalid ciphertext encoding: {}", e)))?;

        self.cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| RelayError::Crypto(format!("Opening failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &str = "0x0102030405060708010203040506070801020304050607080102030405060708";
    const KEY_B: &str = "0x1112131415161718111213141516171811121314151617181112131415161718";

    #[test]
    fn test_seal_open_roundtrip() {
        let key = SymKey::from_hex(KEY_A).unwrap();
        let sealed = key.seal(b"{\"action\":\"availability\"}").unwrap();
        let opened = key.open(&sealed).unwrap();
        assert_eq!(opened, b"{\"action\":\"availability\"}");
    }

    #[test]
    fn test_wrong_key_fails_to_open() {
        let a = SymKey::from_hex(KEY_A).unwrap();
        let b = SymKey::from_hex(KEY_B).unwrap();

        let sealed = a.seal(b"secret").unwrap();
        assert!(b.open(&sealed).is_err());
    }

    #[test]
    fn test_material_without_prefix() {
        let key = SymKey::from_hex(&KEY_A[2..]).unwrap();
        let sealed = key.seal(b"x").unwrap();
        assert_eq!(key.open(&sealed).unwrap(), b"x");
    }

    #[test]
    fn test_invalid_hex_material() {
        assert!(SymKey::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_wrong_length_material() {
        assert!(SymKey::from_hex("0x0102").is_err());
    }

    #[test]
    fn test_unique_nonce_per_seal() {
        let key = SymKey::from_hex(KEY_A).unwrap();
        let s1 = key.seal(b"same").unwrap();
        let s2 = key.seal(b"same").unwrap();
        assert_ne!(s1.nonce, s2.nonce);
        assert_ne!(s1.ciphertext, s2.ciphertext);
    }
}
