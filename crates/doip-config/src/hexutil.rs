//! Small hex/address parsing helpers shared by the loader and the matcher's
//! normalisation step.

/// Parse a 2-byte address given either as `0x1000`/`0X1000` (hex) or as a
/// bare decimal number; bare hex digit strings are accepted as a fallback
/// (configs in this domain commonly write addresses like `1000` meaning hex).
pub fn parse_u16_address(s: &str) -> Result<u16, String> {
    let t = s.trim();
    if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u16::from_str_radix(rest, 16).map_err(|e| format!("invalid address {t:?}: {e}"));
    }
    u16::from_str_radix(t, 10)
        .or_else(|_| u16::from_str_radix(t, 16))
        .map_err(|e| format!("invalid address {t:?}: {e}"))
}

/// Parse a single byte, same conventions as [`parse_u16_address`].
pub fn parse_u8(s: &str) -> Result<u8, String> {
    let t = s.trim();
    if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u8::from_str_radix(rest, 16).map_err(|e| format!("invalid byte {t:?}: {e}"));
    }
    u8::from_str_radix(t, 10)
        .or_else(|_| u8::from_str_radix(t, 16))
        .map_err(|e| format!("invalid byte {t:?}: {e}"))
}

/// Parse a hex byte string, tolerating a leading `0x`/`0X` and `:` or ` `
/// separators (e.g. `"AA:BB:CC:DD:EE:FF"` or `"aabbccddeeff"`).
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let t = s.trim();
    let t = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")).unwrap_or(t);
    let cleaned: String = t.chars().filter(|c| *c != ':' && *c != ' ').collect();
    if !cleaned.len().is_multiple_of(2) {
        return Err(format!("hex string {s:?} has odd length"));
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&cleaned[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

/// Render bytes as an uppercase hex string with no separators — the
/// canonical form the matcher compares requests against.
pub fn to_upper_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_addresses() {
        assert_eq!(parse_u16_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_u16_address("4096").unwrap(), 4096);
        assert_eq!(parse_u16_address("0x0E00").unwrap(), 0x0E00);
    }

    #[test]
    fn parses_hex_bytes_with_separators() {
        assert_eq!(
            parse_hex_bytes("AA:BB:CC:DD:EE:FF").unwrap(),
            vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]
        );
        assert_eq!(parse_hex_bytes("aabbccddeeff").unwrap(), vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }
}
