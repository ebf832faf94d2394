//! RSA key material for consumer identities.
//!
//! Keys travel and rest as "opaque" text: the PEM export of a key wrapped in
//! standard base64. Fingerprints are SHA-256 digests over the canonical SPKI
//! DER encoding of the public component, so the same public key always yields
//! the same fingerprint no matter which encoding it arrived in.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::keypair::KeyPair;

/// Length of the short (display) fingerprint in hex characters.
pub const SHORT_FINGERPRINT_LEN: usize = 16;

/// Failures raised while generating, importing or transcoding keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Input could not be decoded or parsed as a key.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Parsed key carries private components.
    #[error("key material is not a bare public key")]
    NotAPublicKey,

    /// Key pair generation failed.
    #[error("key generation failed: {0}")]
    Generation(String),

    /// Key could not be exported.
    #[error("key encoding failed: {0}")]
    Encoding(String),
}

/// Generates and imports RSA key pairs.
#[derive(Debug, Clone, Copy)]
pub struct KeyService {
    bits: usize,
}

impl KeyService {
    /// Modulus size used for generated api keys unless configured otherwise.
    pub const DEFAULT_BITS: usize = 1024;

    /// Creates a key service generating keys of `bits` modulus size.
    #[must_use]
    pub const fn new(bits: usize) -> Self {
        Self { bits }
    }

    /// Modulus size of generated keys.
    #[must_use]
    pub const fn bits(&self) -> usize {
        self.bits
    }

    /// Generates a fresh key pair including private material.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Generation`] when the RNG or prime search fails and
    /// [`KeyError::Encoding`] when the keys cannot be exported.
    pub fn generate(&self) -> Result<KeyPair, KeyError> {
        let mut rng = rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, self.bits)
            .map_err(|e| KeyError::Generation(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        let (fingerprint, public) = export_public(&public_key)?;

        Ok(KeyPair::new(
            fingerprint,
            public,
            Some(encode(private_pem.as_bytes())),
        ))
    }

    /// Imports a public-only key from raw PEM or DER bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::NotAPublicKey`] for parsable private keys and
    /// [`KeyError::InvalidKeyFormat`] for anything else that is not a key.
    pub fn import_public(&self, bytes: &[u8]) -> Result<KeyPair, KeyError> {
        let public_key = parse_public_key(bytes)?;
        let (fingerprint, public) = export_public(&public_key)?;
        Ok(KeyPair::new(fingerprint, public, None))
    }

    /// Decodes base64 key text and imports it as a public-only key.
    ///
    /// # Errors
    ///
    /// Same as [`KeyService::import_public`], plus [`KeyError::InvalidKeyFormat`]
    /// when the text is not valid base64.
    pub fn import_public_text(&self, text: &str) -> Result<KeyPair, KeyError> {
        let bytes = decode(text)?;
        self.import_public(&bytes)
    }
}

impl Default for KeyService {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BITS)
    }
}

/// Computes the fingerprint of DER-encoded public key bytes.
///
/// The long form is the full lowercase hex SHA-256 digest; the short form
/// keeps its last [`SHORT_FINGERPRINT_LEN`] characters.
#[must_use]
pub fn fingerprint(public_der: &[u8], short: bool) -> String {
    let digest = hex::encode(Sha256::digest(public_der));
    if short {
        digest[digest.len() - SHORT_FINGERPRINT_LEN..].to_string()
    } else {
        digest
    }
}

/// Encodes binary key material as base64 text.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes base64 key text, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns [`KeyError::InvalidKeyFormat`] when the text is not valid base64.
pub fn decode(text: &str) -> Result<Vec<u8>, KeyError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(KeyError::InvalidKeyFormat("empty key text".to_string()));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| KeyError::InvalidKeyFormat(e.to_string()))
}

/// Returns the short fingerprint and base64 SPKI PEM of a public key.
fn export_public(public_key: &RsaPublicKey) -> Result<(String, String), KeyError> {
    let der = public_key
        .to_public_key_der()
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    let pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    Ok((fingerprint(der.as_bytes(), true), encode(pem.as_bytes())))
}

fn parse_public_key(bytes: &[u8]) -> Result<RsaPublicKey, KeyError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        let text = text.trim();
        if text.starts_with("-----BEGIN") {
            return parse_public_pem(text);
        }
    }
    parse_public_der(bytes)
}

fn parse_public_pem(text: &str) -> Result<RsaPublicKey, KeyError> {
    if let Ok(key) = RsaPublicKey::from_public_key_pem(text) {
        return Ok(key);
    }
    if let Ok(key) = RsaPublicKey::from_pkcs1_pem(text) {
        return Ok(key);
    }
    if RsaPrivateKey::from_pkcs8_pem(text).is_ok() || RsaPrivateKey::from_pkcs1_pem(text).is_ok() {
        return Err(KeyError::NotAPublicKey);
    }
    Err(KeyError::InvalidKeyFormat(
        "PEM block is not an RSA key".to_string(),
    ))
}

fn parse_public_der(bytes: &[u8]) -> Result<RsaPublicKey, KeyError> {
    if let Ok(key) = RsaPublicKey::from_public_key_der(bytes) {
        return Ok(key);
    }
    if let Ok(key) = RsaPublicKey::from_pkcs1_der(bytes) {
        return Ok(key);
    }
    if RsaPrivateKey::from_pkcs8_der(bytes).is_ok() || RsaPrivateKey::from_pkcs1_der(bytes).is_ok()
    {
        return Err(KeyError::NotAPublicKey);
    }
    Err(KeyError::InvalidKeyFormat(
        "bytes are neither PEM nor DER encoded RSA key material".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};

    fn test_private_key() -> RsaPrivateKey {
        let mut rng = rsa::rand_core::OsRng;
        RsaPrivateKey::new(&mut rng, 1024).unwrap()
    }

    #[test]
    fn test_generate_includes_private_material() {
        let pair = KeyService::default().generate().unwrap();
        assert!(pair.private.is_some());
        assert_eq!(pair.fingerprint.len(), SHORT_FINGERPRINT_LEN);
        assert!(!pair.is_public_only());

        let pem = String::from_utf8(decode(&pair.public).unwrap()).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_generated_public_key_reimports_with_same_fingerprint() {
        let service = KeyService::default();
        let generated = service.generate().unwrap();
        let imported = service.import_public_text(&generated.public).unwrap();

        assert!(imported.is_public_only());
        assert_eq!(imported.fingerprint, generated.fingerprint);
        assert_eq!(imported.public, generated.public);
    }

    #[test]
    fn test_import_accepts_every_public_encoding() {
        let private_key = test_private_key();
        let public_key = RsaPublicKey::from(&private_key);
        let service = KeyService::default();

        let spki_pem = public_key.to_public_key_pem(LineEnding::LF).unwrap();
        let pkcs1_pem = public_key.to_pkcs1_pem(LineEnding::LF).unwrap();
        let spki_der = public_key.to_public_key_der().unwrap();
        let pkcs1_der = public_key.to_pkcs1_der().unwrap();

        let fingerprints: Vec<String> = [
            spki_pem.as_bytes(),
            pkcs1_pem.as_bytes(),
            spki_der.as_bytes(),
            pkcs1_der.as_bytes(),
        ]
        .iter()
        .map(|bytes| service.import_public(bytes).unwrap().fingerprint)
        .collect();

        assert!(fingerprints.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_import_rejects_private_keys() {
        let private_key = test_private_key();
        let service = KeyService::default();

        let pkcs8_pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let pkcs1_pem = private_key.to_pkcs1_pem(LineEnding::LF).unwrap();
        let pkcs8_der = private_key.to_pkcs8_der().unwrap();

        assert_eq!(
            service.import_public(pkcs8_pem.as_bytes()).unwrap_err(),
            KeyError::NotAPublicKey
        );
        assert_eq!(
            service.import_public(pkcs1_pem.as_bytes()).unwrap_err(),
            KeyError::NotAPublicKey
        );
        assert_eq!(
            service.import_public(pkcs8_der.as_bytes()).unwrap_err(),
            KeyError::NotAPublicKey
        );
    }

    #[test]
    fn test_import_rejects_garbage() {
        let service = KeyService::default();

        assert!(matches!(
            service.import_public(b"definitely not a key"),
            Err(KeyError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            service.import_public(b"-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----"),
            Err(KeyError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            service.import_public_text("%%% not base64 %%%"),
            Err(KeyError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_decode_ignores_whitespace_and_rejects_empty() {
        let encoded = encode(b"key material");
        let wrapped = format!("{}\n{}", &encoded[..4], &encoded[4..]);
        assert_eq!(decode(&wrapped).unwrap(), b"key material");
        assert!(decode("   ").is_err());
    }

    #[test]
    fn test_fingerprint_forms() {
        let long = fingerprint(b"public bytes", false);
        let short = fingerprint(b"public bytes", true);

        assert_eq!(long.len(), 64);
        assert_eq!(short.len(), SHORT_FINGERPRINT_LEN);
        assert!(long.ends_with(&short));
        assert_ne!(long, fingerprint(b"other bytes", false));
    }
}
