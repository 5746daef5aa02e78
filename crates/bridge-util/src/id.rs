//! HTML の id 属性に使える乱数文字列

use base64::Engine as _;

use crate::error::UtilError;

/// URL-safe base64 の文字集合（HTML id にそのまま使える）
const ID_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// `random_id` の文字数（1 文字 6 ビット、計 48 ビット）
pub const RANDOM_ID_LEN: usize = 8;

/// `uuid` の元になる乱数バイト数（base64 で 32 文字、192 ビット）
pub const UUID_BYTES: usize = 24;

/// 8 文字の短い乱数 id を作る
pub fn random_id() -> Result<String, UtilError> {
    let mut bytes = [0u8; RANDOM_ID_LEN];
    getrandom::getrandom(&mut bytes)?;
    Ok(id_from_bytes(&bytes))
}

/// 各バイトの下位 6 ビットを文字に対応させる
fn id_from_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| ID_ALPHABET[(b & 0x3f) as usize] as char)
        .collect()
}

/// 32 文字の乱数 id を作る（24 バイトの URL-safe base64、パディングなし）
pub fn uuid() -> Result<String, UtilError> {
    let mut bytes = [0u8; UUID_BYTES];
    getrandom::getrandom(&mut bytes)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_id_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }

    #[test]
    fn test_id_from_bytes_masks_to_six_bits() {
        assert_eq!(id_from_bytes(&[0, 1, 25, 26, 52, 62, 63, 0xFF]), "ABZa0-__");
        assert_eq!(id_from_bytes(&[0x40, 0x80]), "AA");
    }

    #[test]
    fn test_random_id_shape() {
        let id = random_id().unwrap();
        assert_eq!(id.len(), RANDOM_ID_LEN);
        assert!(id.chars().all(is_id_char));
    }

    #[test]
    fn test_uuid_shape() {
        let id = uuid().unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(is_id_char));
    }

    #[test]
    fn test_uuid_alphabet_matches_id_alphabet() {
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode([0xFBu8, 0xFF, 0xBF]);
        assert_eq!(encoded, "-_-_");
    }

    #[test]
    fn test_ids_differ() {
        assert_ne!(uuid().unwrap(), uuid().unwrap());
    }
}
