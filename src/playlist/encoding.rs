//! Best-effort text encoding detection for playlist files.
//!
//! Playlists rarely declare a charset. Detection looks for a byte-order mark
//! first and otherwise guesses UTF-16 from the distribution of zero bytes.
//! The guess can be wrong for mixed or malformed files; such files are
//! decoded with replacement characters rather than rejected.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

/// Number of leading bytes inspected by [`detect_encoding`].
pub const DETECTION_PREFIX_LEN: usize = 2048;

/// Zero-byte ratio above which a byte parity is considered UTF-16 padding.
const ZERO_RATIO_THRESHOLD: f64 = 0.20;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Result of encoding detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedEncoding {
    /// Encoding to decode the remaining bytes with.
    pub encoding: &'static Encoding,
    /// Length of the byte-order mark to skip (0 when none).
    pub bom_len: usize,
}

impl DetectedEncoding {
    const fn new(encoding: &'static Encoding, bom_len: usize) -> Self {
        Self { encoding, bom_len }
    }
}

/// Selects an encoding and BOM length from a byte prefix.
///
/// Decision order:
/// 1. `EF BB BF` → UTF-8, skip 3
/// 2. `FF FE` → UTF-16LE, skip 2
/// 3. `FE FF` → UTF-16BE, skip 2
/// 4. zeros at odd offsets > 20% and > 2× even ratio → UTF-16LE
/// 5. zeros at even offsets > 20% and > 2× odd ratio → UTF-16BE
/// 6. UTF-8
#[must_use]
pub fn detect_encoding(prefix: &[u8]) -> DetectedEncoding {
    if prefix.starts_with(&UTF8_BOM) {
        return DetectedEncoding::new(UTF_8, UTF8_BOM.len());
    }
    if prefix.starts_with(&UTF16LE_BOM) {
        return DetectedEncoding::new(UTF_16LE, UTF16LE_BOM.len());
    }
    if prefix.starts_with(&UTF16BE_BOM) {
        return DetectedEncoding::new(UTF_16BE, UTF16BE_BOM.len());
    }

    let sample = &prefix[..prefix.len().min(DETECTION_PREFIX_LEN)];
    if sample.is_empty() {
        return DetectedEncoding::new(UTF_8, 0);
    }

    let (mut zeros_even, mut zeros_odd) = (0usize, 0usize);
    for (i, byte) in sample.iter().enumerate() {
        if *byte == 0 {
            if i % 2 == 0 {
                zeros_even += 1;
            } else {
                zeros_odd += 1;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let len = sample.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let ratio_even = zeros_even as f64 / len;
    #[allow(clippy::cast_precision_loss)]
    let ratio_odd = zeros_odd as f64 / len;

    if ratio_odd > ZERO_RATIO_THRESHOLD && ratio_odd > ratio_even * 2.0 {
        return DetectedEncoding::new(UTF_16LE, 0);
    }
    if ratio_even > ZERO_RATIO_THRESHOLD && ratio_even > ratio_odd * 2.0 {
        return DetectedEncoding::new(UTF_16BE, 0);
    }

    DetectedEncoding::new(UTF_8, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    fn utf16be(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_be_bytes).collect()
    }

    #[test]
    fn test_detect_utf8_bom() {
        let detected = detect_encoding(&[0xEF, 0xBB, 0xBF, b'#', b'E']);
        assert_eq!(detected, DetectedEncoding::new(UTF_8, 3));
    }

    #[test]
    fn test_detect_utf16le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(utf16le("#EXTM3U"));
        assert_eq!(detect_encoding(&bytes), DetectedEncoding::new(UTF_16LE, 2));
    }

    #[test]
    fn test_detect_utf16be_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(utf16be("#EXTM3U"));
        assert_eq!(detect_encoding(&bytes), DetectedEncoding::new(UTF_16BE, 2));
    }

    #[test]
    fn test_detect_utf16le_without_bom_from_odd_zeros() {
        let bytes = utf16le("#EXTM3U\n#EXTINF:-1,Movie\nhttp://h/a.mkv\n");
        assert_eq!(detect_encoding(&bytes), DetectedEncoding::new(UTF_16LE, 0));
    }

    #[test]
    fn test_detect_utf16be_without_bom_from_even_zeros() {
        let bytes = utf16be("#EXTM3U\n#EXTINF:-1,Movie\nhttp://h/a.mkv\n");
        assert_eq!(detect_encoding(&bytes), DetectedEncoding::new(UTF_16BE, 0));
    }

    #[test]
    fn test_detect_plain_ascii_defaults_to_utf8() {
        let detected = detect_encoding(b"#EXTM3U\n#EXTINF:-1,Film\nhttp://h/f.mp4\n");
        assert_eq!(detected, DetectedEncoding::new(UTF_8, 0));
    }

    #[test]
    fn test_detect_empty_prefix_defaults_to_utf8() {
        assert_eq!(detect_encoding(&[]), DetectedEncoding::new(UTF_8, 0));
    }

    #[test]
    fn test_detect_balanced_zeros_defaults_to_utf8() {
        // Zeros at both parities: neither side dominates by 2x.
        let bytes = [0u8, 0, b'a', b'b', 0, 0, b'c', b'd'];
        assert_eq!(detect_encoding(&bytes), DetectedEncoding::new(UTF_8, 0));
    }

    #[test]
    fn test_detect_odd_zeros_below_threshold_defaults_to_utf8() {
        // 1 zero in 10 bytes = 10%, under the 20% threshold.
        let bytes = [b'a', 0, b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i'];
        assert_eq!(detect_encoding(&bytes), DetectedEncoding::new(UTF_8, 0));
    }
}
