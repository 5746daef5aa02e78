//! バイト数の人間向け表記

/// 1024 のべき乗ごとの接頭辞（先頭は接頭辞なし）
const MAGNITUDES: [&str; 9] = ["", "K", "M", "G", "T", "P", "E", "Z", "Y"];

/// バイト数を `"<値><接頭辞>B"` の形式にする
///
/// 桁は `floor(log1024(bytes))`（0 バイトは桁 0）。値は小数点以下 `precision` 桁。
///
/// ```
/// use bridge_util::human_size;
/// assert_eq!(human_size(1536, 1), "1.5KB");
/// assert_eq!(human_size(512, 0), "512B");
/// ```
pub fn human_size(bytes: u64, precision: usize) -> String {
    let magnitude = if bytes == 0 {
        0
    } else {
        // floor(log2(bytes)) / 10 == floor(log1024(bytes))
        ((63 - bytes.leading_zeros()) / 10) as usize
    }
    .min(MAGNITUDES.len() - 1);

    let value = bytes as f64 / 1024f64.powi(magnitude as i32);
    format!("{:.*}{}B", precision, value, MAGNITUDES[magnitude])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bytes() {
        assert_eq!(human_size(0, 0), "0B");
        assert_eq!(human_size(1, 2), "1.00B");
        assert_eq!(human_size(1023, 0), "1023B");
    }

    #[test]
    fn test_magnitude_boundaries() {
        assert_eq!(human_size(1024, 1), "1.0KB");
        assert_eq!(human_size(1024 * 1024 - 1, 0), "1024KB");
        assert_eq!(human_size(1024 * 1024, 0), "1MB");
        assert_eq!(human_size(5 * 1024 * 1024 * 1024, 2), "5.00GB");
    }

    #[test]
    fn test_fraction() {
        assert_eq!(human_size(1536, 1), "1.5KB");
        assert_eq!(human_size(3 * 1024 * 1024 + 512 * 1024, 2), "3.50MB");
    }

    #[test]
    fn test_largest_value() {
        assert_eq!(human_size(u64::MAX, 1), "16.0EB");
    }

    proptest! {
        #[test]
        fn prop_value_stays_below_next_magnitude(bytes in any::<u64>()) {
            let text = human_size(bytes, 3);
            let number: String = text.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            let value: f64 = number.parse().unwrap();
            prop_assert!(text.ends_with('B'));
            prop_assert!(value <= 1024.0);
        }
    }
}
