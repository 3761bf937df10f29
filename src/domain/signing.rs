//! Ed25519 signatures over canonical message payloads.
//!
//! A signature is rendered as `ed25519.<signer-id>.<hex>`. The signer tag is
//! checked before any cryptography runs, so a signature minted by one
//! principal never verifies under another principal's id, even over an
//! identical payload.
//!
//! Ed25519 is deterministic: the same key and payload always yield the same
//! signature.

use crate::error::Result;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

const SCHEME: &str = "ed25519";

/// Domain separation for every signed protocol message.
const MESSAGE_DOMAIN: &[u8] = b"AP2_MESSAGE_V1";

/// Serializes the attested fields of a message.
///
/// Callers pass a dedicated payload struct, never the full message, so the
/// attested surface stays explicit. Struct fields serialize in declaration
/// order, which makes the output stable.
pub fn canonical_payload<T: Serialize>(fields: &T) -> Result<String> {
    Ok(serde_json::to_string(fields)?)
}

fn message_digest(signer_id: &str, payload: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(MESSAGE_DOMAIN);
    hasher.update(signer_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(payload.as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// A principal's private signing key, bound to its signer id.
///
/// Owned by exactly one handler. Only the verifying key ever leaves it.
pub struct SigningIdentity {
    signer_id: String,
    key: SigningKey,
}

impl SigningIdentity {
    /// Creates an identity with a fresh random key.
    pub fn generate(signer_id: impl Into<String>) -> Self {
        Self::from_seed(signer_id, rand::random::<[u8; 32]>())
    }

    /// Creates an identity from a fixed 32-byte secret.
    pub fn from_seed(signer_id: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            signer_id: signer_id.into(),
            key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Signs a canonical payload under this identity's signer id.
    pub fn sign(&self, canonical_payload: &str) -> String {
        let digest = message_digest(&self.signer_id, canonical_payload);
        let signature = self.key.sign(&digest);
        format!(
            "{}.{}.{}",
            SCHEME,
            self.signer_id,
            hex::encode(signature.to_bytes())
        )
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("signer_id", &self.signer_id)
            .field("verifying_key", &hex::encode(self.key.verifying_key().as_bytes()))
            .finish()
    }
}

/// Extracts the signer tag embedded in a rendered signature.
pub fn signer_tag(signature: &str) -> Option<&str> {
    split_signature(signature).map(|(tag, _)| tag)
}

fn split_signature(signature: &str) -> Option<(&str, &str)> {
    signature
        .strip_prefix(SCHEME)?
        .strip_prefix('.')?
        .rsplit_once('.')
}

/// Verifies `signature` over `canonical_payload` against a known key.
///
/// Returns `false` for malformed signatures, mismatched signer tags and
/// cryptographic failures alike. Policy on a `false` belongs to the caller.
pub fn verify(
    key: &VerifyingKey,
    signer_id: &str,
    canonical_payload: &str,
    signature: &str,
) -> bool {
    let Some((tag, encoded)) = split_signature(signature) else {
        return false;
    };
    if tag != signer_id {
        return false;
    }
    let Ok(bytes) = hex::decode(encoded) else {
        return false;
    };
    let Ok(bytes) = <[u8; 64]>::try_from(bytes.as_slice()) else {
        return false;
    };
    let digest = message_digest(signer_id, canonical_payload);
    key.verify_strict(&digest, &Signature::from_bytes(&bytes))
        .is_ok()
}

/// Public keys of every principal a party expects to hear from.
///
/// This is the only key material the orchestrator holds.
#[derive(Debug, Clone, Default)]
pub struct KeyDirectory {
    keys: HashMap<String, VerifyingKey>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, signer_id: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(signer_id.into(), key);
    }

    pub fn get(&self, signer_id: &str) -> Option<&VerifyingKey> {
        self.keys.get(signer_id)
    }

    /// Verifies against the registered key. Unknown signers never verify.
    pub fn verify(&self, signer_id: &str, canonical_payload: &str, signature: &str) -> bool {
        match self.keys.get(signer_id) {
            Some(key) => verify(key, signer_id, canonical_payload, signature),
            None => false,
        }
    }
}
