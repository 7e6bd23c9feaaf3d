//! Request signature verification for the interactions endpoint.
//!
//! The messaging platform signs every interaction with ed25519 over `timestamp || body` and sends
//! the hex-encoded signature alongside it. The application's public key is configured up front;
//! requests that fail verification are rejected before they are parsed.
//!
//! # Structs
//! - `InteractionVerifier`: Holds the application's public key and checks request signatures.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::RelayError;

pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// Builds a verifier from the hex-encoded public key shown in the platform's developer portal.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Config` if the key is not 32 hex-encoded bytes forming a valid point.
    pub fn from_hex(public_key: &str) -> Result<Self, RelayError> {
        let bytes = decode_fixed::<32>(public_key.trim())
            .ok_or_else(|| RelayError::Config("public key must be 32 hex-encoded bytes".to_string()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|err| RelayError::Config(format!("invalid public key: {}", err)))?;
        Ok(InteractionVerifier { key })
    }

    /// Verifies an interaction signature.
    ///
    /// # Arguments
    ///
    /// * `timestamp` - Value of the signature timestamp header.
    /// * `body` - The raw request body.
    /// * `signature` - Hex-encoded signature header.
    ///
    /// # Returns
    ///
    /// A `bool` indicating whether the signature is valid.
    ///
    pub fn verify(&self, timestamp: &str, body: &[u8], signature: &str) -> bool {
        let Some(signature) = decode_fixed::<64>(signature) else {
            return false;
        };
        let signature = Signature::from_bytes(&signature);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).is_ok()
    }
}

fn decode_fixed<const N: usize>(input: &str) -> Option<[u8; N]> {
    hex::decode(input).ok()?.try_into().ok()
}

// Tests
#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn verifier() -> InteractionVerifier {
        InteractionVerifier::from_hex(&hex::encode(signing_key().verifying_key().to_bytes())).unwrap()
    }

    fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(signing_key().sign(&message).to_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"type":1}"#;
        assert!(verifier().verify("1700000000", body, &sign("1700000000", body)));
    }

    #[test]
    fn test_tampered_body_or_timestamp() {
        let signature = sign("1700000000", br#"{"type":1}"#);
        assert!(!verifier().verify("1700000000", br#"{"type":2}"#, &signature));
        assert!(!verifier().verify("1700000001", br#"{"type":1}"#, &signature));
    }

    #[test]
    fn test_malformed_signature() {
        assert!(!verifier().verify("1", b"{}", "not-hex"));
        assert!(!verifier().verify("1", b"{}", "abcd"));
    }

    #[test]
    fn test_malformed_public_key() {
        assert!(matches!(InteractionVerifier::from_hex("zz"), Err(RelayError::Config(_))));
        assert!(matches!(InteractionVerifier::from_hex("abcd"), Err(RelayError::Config(_))));
    }
}
