/// Key agreement for conversation secrets
/// x25519 Diffie-Hellman for two-party conversations; for groups the
/// pairwise outputs are folded through SHA-256 into a single secret.
use crate::error::{ChatError, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

/// The local half of every key agreement this client performs
pub struct KeyAgreement {
    secret: StaticSecret,
}

impl KeyAgreement {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Restore a keypair from its 32 secret bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(bytes),
        }
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Public key as a base64-encoded string, the encoding counterparts
    /// publish through the transport
    pub fn public_key_string(&self) -> String {
        general_purpose::STANDARD.encode(PublicKey::from(&self.secret).as_bytes())
    }

    /// Short identity for logs: base58-encoded hash of the public key
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(PublicKey::from(&self.secret).as_bytes());
        let hash = hasher.finalize();
        bs58::encode(&hash[..]).into_string()
    }

    /// Parse a counterpart's public key from its base64 encoding
    pub fn parse_public_key(encoded: &str) -> Result<PublicKey> {
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ChatError::KeyExchange(format!("invalid base64 public key: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ChatError::KeyExchange(format!("public key must be 32 bytes, got {}", bytes.len())))?;
        Ok(PublicKey::from(bytes))
    }

    /// Two-party shared secret: raw Diffie-Hellman output, hex-encoded.
    /// Both sides derive the same value from their own private key and the
    /// other's public key.
    pub fn pairwise_secret(&self, remote_public_key: &str) -> Result<String> {
        let remote = Self::parse_public_key(remote_public_key)?;
        let shared = self.secret.diffie_hellman(&remote);
        Ok(hex::encode(shared.as_bytes()))
    }

    /// Group shared secret: one Diffie-Hellman exchange per counterpart,
    /// outputs sorted bytewise and folded through SHA-256, hex-encoded.
    /// Sorting makes the result independent of the order the participant
    /// list arrives in.
    pub fn group_secret(&self, remote_public_keys: &[String]) -> Result<String> {
        if remote_public_keys.is_empty() {
            return Err(ChatError::KeyExchange(
                "group secret requires at least one counterpart key".to_string(),
            ));
        }

        let mut shares: Vec<[u8; 32]> = Vec::with_capacity(remote_public_keys.len());
        for encoded in remote_public_keys {
            let remote = Self::parse_public_key(encoded)?;
            shares.push(self.secret.diffie_hellman(&remote).to_bytes());
        }
        shares.sort_unstable();

        let mut hasher = Sha256::new();
        for share in &shares {
            hasher.update(share);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

impl Clone for KeyAgreement {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7748 section 6.1 X25519 test vector
    const ALICE_SECRET: &str = "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a";
    const BOB_PUBLIC: &str = "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f";
    const EXPECTED_SHARED: &str = "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742";

    fn b64(hex_bytes: &str) -> String {
        general_purpose::STANDARD.encode(hex::decode(hex_bytes).unwrap())
    }

    #[test]
    fn pairwise_secret_matches_rfc7748_vector() {
        let secret: [u8; 32] = hex::decode(ALICE_SECRET).unwrap().try_into().unwrap();
        let alice = KeyAgreement::from_bytes(secret);

        let shared = alice.pairwise_secret(&b64(BOB_PUBLIC)).unwrap();
        assert_eq!(shared, EXPECTED_SHARED);
    }

    #[test]
    fn pairwise_secret_is_symmetric() {
        let alice = KeyAgreement::generate();
        let bob = KeyAgreement::generate();

        let from_alice = alice.pairwise_secret(&bob.public_key_string()).unwrap();
        let from_bob = bob.pairwise_secret(&alice.public_key_string()).unwrap();
        assert_eq!(from_alice, from_bob);
    }

    #[test]
    fn group_secret_is_order_independent() {
        let local = KeyAgreement::generate();
        let others: Vec<String> = (0..3)
            .map(|_| KeyAgreement::generate().public_key_string())
            .collect();

        let forward = local.group_secret(&others).unwrap();
        let reversed: Vec<String> = others.iter().rev().cloned().collect();
        assert_eq!(forward, local.group_secret(&reversed).unwrap());
    }

    #[test]
    fn group_secret_requires_counterparts() {
        let local = KeyAgreement::generate();
        assert!(matches!(
            local.group_secret(&[]),
            Err(ChatError::KeyExchange(_))
        ));
    }

    #[test]
    fn parse_public_key_rejects_bad_input() {
        assert!(matches!(
            KeyAgreement::parse_public_key("not base64!!!"),
            Err(ChatError::KeyExchange(_))
        ));
        // Valid base64, wrong length
        let short = general_purpose::STANDARD.encode([0u8; 16]);
        assert!(matches!(
            KeyAgreement::parse_public_key(&short),
            Err(ChatError::KeyExchange(_))
        ));
    }
}
