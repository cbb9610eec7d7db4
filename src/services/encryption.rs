use ring::aead::{
    Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey, AES_256_GCM,
};
use ring::error::Unspecified;
use ring::rand::{SecureRandom, SystemRandom};

const NONCE_LEN: usize = 12;

#[derive(thiserror::Error, Debug)]
pub enum EncryptionError {
    #[error("Sealing failed")]
    SealFailed,

    #[error("Opening failed (wrong key, wrong context or tampered data)")]
    OpenFailed,

    #[error("Sealed data is too short")]
    Truncated,
}

impl From<Unspecified> for EncryptionError {
    fn from(_: Unspecified) -> Self {
        EncryptionError::SealFailed
    }
}

/// Yields a single nonce, once.
struct OneNonce(Option<[u8; NONCE_LEN]>);

impl NonceSequence for OneNonce {
    fn advance(&mut self) -> Result<Nonce, Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(Unspecified)
    }
}

/// 256-bit key for sealing data that leaves this process.
#[derive(Clone)]
pub struct SealKey([u8; 32]);

impl SealKey {
    /// Derives the key from a configured secret with SHA-256, so any secret
    /// length works.
    pub fn derive(secret: &str) -> Self {
        use ring::digest;

        let hash = digest::digest(&digest::SHA256, secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(hash.as_ref());
        Self(key)
    }

    /// Encrypts `plaintext` with AES-256-GCM, authenticating `context` as
    /// associated data.
    ///
    /// Format: [nonce (12 bytes)][ciphertext + tag]
    pub fn seal(&self, context: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| EncryptionError::SealFailed)?;

        let unbound_key = UnboundKey::new(&AES_256_GCM, &self.0)?;
        let mut sealing_key = SealingKey::new(unbound_key, OneNonce(Some(nonce_bytes)));

        let mut in_out = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(Aad::from(context), &mut in_out)
            .map_err(|_| EncryptionError::SealFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }

    /// Reverses [`SealKey::seal`]; fails unless key and context both match.
    pub fn open(&self, context: &[u8], sealed: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(EncryptionError::Truncated);
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(&sealed[..NONCE_LEN]);

        let unbound_key =
            UnboundKey::new(&AES_256_GCM, &self.0).map_err(|_| EncryptionError::OpenFailed)?;
        let mut opening_key = OpeningKey::new(unbound_key, OneNonce(Some(nonce_bytes)));

        let mut in_out = sealed[NONCE_LEN..].to_vec();
        let plaintext = opening_key
            .open_in_place(Aad::from(context), &mut in_out)
            .map_err(|_| EncryptionError::OpenFailed)?;
        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for SealKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = SealKey::derive("test-session-secret");
        let sealed = key.seal(b"ctx", b"Hello, World!").unwrap();

        assert_eq!(key.open(b"ctx", &sealed).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_sealing_is_non_deterministic() {
        let key = SealKey::derive("test-session-secret");

        let a = key.seal(b"ctx", b"same").unwrap();
        let b = key.seal(b"ctx", b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_or_context_fails() {
        let key = SealKey::derive("key-one");
        let sealed = key.seal(b"ctx", b"secret").unwrap();

        assert!(matches!(
            SealKey::derive("key-two").open(b"ctx", &sealed),
            Err(EncryptionError::OpenFailed)
        ));
        assert!(matches!(
            key.open(b"other", &sealed),
            Err(EncryptionError::OpenFailed)
        ));
    }

    #[test]
    fn test_tampered_or_truncated() {
        let key = SealKey::derive("k");
        let mut sealed = key.seal(b"ctx", b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(key.open(b"ctx", &sealed).is_err());
        assert!(matches!(
            key.open(b"ctx", &[0u8; 5]),
            Err(EncryptionError::Truncated)
        ));
    }
}
