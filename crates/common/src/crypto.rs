use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use xsalsa20poly1305::aead::{Aead, KeyInit};
use xsalsa20poly1305::{Key, Nonce, XSalsa20Poly1305};

const NONCE_LEN: usize = 24;

/// Stretches an arbitrary shared secret into a 32 byte symmetric key.
fn derive_key(secret: &str) -> [u8; 32] {
    *blake3::hash(secret.as_bytes()).as_bytes()
}

/// Seals `plaintext` and returns `base64url(nonce || ciphertext)`.
pub fn encrypt(plaintext: &str, secret: &str) -> Result<String> {
    let key = derive_key(secret);
    let cipher = XSalsa20Poly1305::new(Key::from_slice(&key));

    let mut nonce = [0u8; NONCE_LEN];
    rand::fill(&mut nonce[..]);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| anyhow!("failed to seal payload"))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

pub fn decrypt(sealed: &str, secret: &str) -> Result<String> {
    let raw = URL_SAFE_NO_PAD.decode(sealed.trim())?;
    if raw.len() <= NONCE_LEN {
        return Err(anyhow!("sealed payload is too short"));
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let key = derive_key(secret);
    let cipher = XSalsa20Poly1305::new(Key::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| anyhow!("failed to open sealed payload"))?;

    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_payload_opens_with_same_secret() -> Result<()> {
        let sealed = encrypt("{\"user_id\":\"abc\"}", "salt")?;
        assert_eq!(decrypt(&sealed, "salt")?, "{\"user_id\":\"abc\"}");
        Ok(())
    }

    #[test]
    fn wrong_secret_is_rejected() -> Result<()> {
        let sealed = encrypt("payload", "salt")?;
        assert!(decrypt(&sealed, "pepper").is_err());
        assert!(decrypt("not-base64!!", "salt").is_err());
        assert!(decrypt("", "salt").is_err());
        Ok(())
    }
}
