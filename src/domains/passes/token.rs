//! Signed QR payloads.
//!
//! A pass token is `base64(JSON {"id": pass_id, "sig": hex(HMAC-SHA256(key,
//! pass_id))})`. The identifier is not secret; only the binding between the
//! identifier and the issuing service's key matters, so the payload is signed
//! rather than encrypted. The key never appears in the payload.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The single verification failure signal. Deliberately opaque: a malformed
/// envelope, a truncated payload and a forged signature are all
/// indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid or tampered pass code")]
pub struct AuthFailure;

/// Exactly two fields; anything else in the envelope fails verification.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenEnvelope {
    id: String,
    sig: String,
}

/// Encodes and verifies pass tokens under one signing key. The key is
/// injected at construction so tests and key rotation never touch call
/// sites.
#[derive(Clone)]
pub struct PassTokenCodec {
    mac: HmacSha256,
}

impl PassTokenCodec {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret).context("Invalid pass signing key")?;
        Ok(Self { mac })
    }

    /// Derive the scannable payload for a pass id. Pure; the same id under
    /// the same key always yields the same token.
    pub fn encode(&self, pass_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(pass_id.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());

        let envelope = TokenEnvelope {
            id: pass_id.to_string(),
            sig,
        };
        let json = serde_json::to_string(&envelope)
            .expect("a two-string-field envelope always serializes");
        general_purpose::STANDARD.encode(json.as_bytes())
    }

    /// Recover the pass id from an untrusted payload. Fails closed: every
    /// defect collapses into [`AuthFailure`] so nothing about the cause
    /// leaks back to whoever crafted the payload.
    pub fn decode(&self, payload: &str) -> Result<String, AuthFailure> {
        let raw = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| AuthFailure)?;
        let envelope: TokenEnvelope = serde_json::from_slice(&raw).map_err(|_| AuthFailure)?;
        if envelope.id.is_empty() {
            return Err(AuthFailure);
        }
        let sig = hex::decode(&envelope.sig).map_err(|_| AuthFailure)?;

        let mut mac = self.mac.clone();
        mac.update(envelope.id.as_bytes());
        // verify_slice compares in constant time; a plain == would leak the
        // position of the first wrong byte.
        mac.verify_slice(&sig).map_err(|_| AuthFailure)?;

        Ok(envelope.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> PassTokenCodec {
        PassTokenCodec::new(b"test-signing-secret").expect("codec builds")
    }

    #[test]
    fn roundtrip_recovers_the_id() {
        let codec = codec();
        for id in [
            "b5a1f1f0-9f5c-4f7e-9f2a-1d2c3b4a5e6f",
            "x",
            "an id with spaces",
        ] {
            let token = codec.encode(id);
            assert_eq!(codec.decode(&token).as_deref(), Ok(id));
        }
    }

    #[test]
    fn tokens_are_stable_for_the_same_id_and_key() {
        let codec = codec();
        let id = "b5a1f1f0-9f5c-4f7e-9f2a-1d2c3b4a5e6f";
        assert_eq!(codec.encode(id), codec.encode(id));
    }

    #[test]
    fn single_character_mutations_are_rejected() {
        let codec = codec();
        let token = codec.encode("b5a1f1f0-9f5c-4f7e-9f2a-1d2c3b4a5e6f");
        let bytes = token.as_bytes();

        for pos in [0, bytes.len() / 4, bytes.len() / 2, bytes.len() - 1] {
            let mut mutated = bytes.to_vec();
            mutated[pos] = if mutated[pos] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(mutated).expect("ascii stays ascii");
            assert_eq!(codec.decode(&mutated), Err(AuthFailure), "position {pos}");
        }
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        let codec = codec();
        let token = codec.encode("b5a1f1f0-9f5c-4f7e-9f2a-1d2c3b4a5e6f");
        assert_eq!(codec.decode(&token[..token.len() / 2]), Err(AuthFailure));
        assert_eq!(codec.decode(""), Err(AuthFailure));
    }

    #[test]
    fn tokens_do_not_verify_under_a_different_key() {
        let codec_a = PassTokenCodec::new(b"key-one").expect("codec builds");
        let codec_b = PassTokenCodec::new(b"key-two").expect("codec builds");
        let token = codec_a.encode("b5a1f1f0-9f5c-4f7e-9f2a-1d2c3b4a5e6f");
        assert_eq!(codec_b.decode(&token), Err(AuthFailure));
    }

    #[test]
    fn extra_envelope_fields_are_rejected() {
        let codec = codec();
        let id = "b5a1f1f0-9f5c-4f7e-9f2a-1d2c3b4a5e6f";
        // Lift the valid signature out of a real token, then smuggle in a
        // third field.
        let token = codec.encode(id);
        let raw = general_purpose::STANDARD.decode(&token).expect("valid base64");
        let mut value: serde_json::Value =
            serde_json::from_slice(&raw).expect("valid envelope json");
        value["extra"] = serde_json::json!("field");
        let forged = general_purpose::STANDARD.encode(value.to_string());
        assert_eq!(codec.decode(&forged), Err(AuthFailure));
    }

    #[test]
    fn missing_envelope_fields_are_rejected() {
        let codec = codec();
        let forged = general_purpose::STANDARD.encode(r#"{"id":"some-id"}"#);
        assert_eq!(codec.decode(&forged), Err(AuthFailure));
        let forged = general_purpose::STANDARD.encode(r#"{"sig":"abcd"}"#);
        assert_eq!(codec.decode(&forged), Err(AuthFailure));
    }

    #[test]
    fn garbage_inputs_are_rejected() {
        let codec = codec();
        for payload in [
            "not base64 at all!!!",
            "aGVsbG8=",                // base64("hello"), not JSON
            "eyJpZCI6IiIsInNpZyI6IiJ9", // base64 of {"id":"","sig":""}
        ] {
            assert_eq!(codec.decode(payload), Err(AuthFailure), "{payload}");
        }
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        let codec = codec();
        let forged = general_purpose::STANDARD
            .encode(r#"{"id":"some-id","sig":"not-hex-zzzz"}"#);
        assert_eq!(codec.decode(&forged), Err(AuthFailure));
    }
}
