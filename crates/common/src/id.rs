use rand::Rng;

const ALPHABET: &[u8; 64] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Length of generated session ids. 16 symbols of a 64 letter alphabet give 96 bits.
pub const SESSION_ID_LEN: usize = 16;

/// A random id drawn from the URL-safe alphabet `[A-Za-z0-9_-]`.
pub fn url_safe_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_url_safe_and_sized() {
        let id = url_safe_id(SESSION_ID_LEN);
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        assert_ne!(id, url_safe_id(SESSION_ID_LEN));
    }
}
