// Licensed under the Apache-2.0 license

//! Integer literals as they appear in annotations and structured files.

use crate::error::InputError;

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

/// VHDL bit-string literal, `x"1F"` or `b"0101"`.
fn vhdl_bit_string(text: &str) -> Option<(&str, u32)> {
    let radix = match text.as_bytes().first()? {
        b'x' | b'X' => 16,
        b'b' | b'B' => 2,
        _ => return None,
    };
    let inner = text[1..].strip_prefix('"')?.strip_suffix('"')?;
    Some((inner, radix))
}

/// Parses a non-negative integer literal.
///
/// Accepted forms: decimal, `0x`/`0X` hex, `0b`/`0B` binary and VHDL
/// `x"..."`/`b"..."` bit strings. Single `_` separators may appear between
/// digits.
///
/// ```
/// use axion_registers_input::parse_int_literal;
///
/// assert_eq!(parse_int_literal("0x1_000").unwrap(), 0x1000);
/// assert_eq!(parse_int_literal("x\"FF\"").unwrap(), 255);
/// assert!(parse_int_literal("-4").is_err());
/// ```
pub fn parse_int_literal(text: &str) -> Result<u64, InputError> {
    let invalid = || InputError::InvalidInteger(text.to_string());
    let trimmed = text.trim();

    let (digits, radix) = if let Some(rest) = strip_prefix_ci(trimmed, "0x") {
        (rest, 16)
    } else if let Some(rest) = strip_prefix_ci(trimmed, "0b") {
        (rest, 2)
    } else if let Some(bit_string) = vhdl_bit_string(trimmed) {
        bit_string
    } else {
        (trimmed, 10)
    };

    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    if !cleaned.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid());
    }
    u64::from_str_radix(&cleaned, radix).map_err(|_| invalid())
}

/// Parses a literal that must fit in a `u32` (widths, bit offsets, stages).
pub fn parse_u32_literal(text: &str) -> Result<u32, InputError> {
    let value = parse_int_literal(text)?;
    u32::try_from(value).map_err(|_| InputError::InvalidInteger(text.to_string()))
}

/// `true`/`false`, `1`/`0` or `yes`/`no`, case-insensitively.
pub fn parse_bool_literal(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radixes() {
        assert_eq!(parse_int_literal("42").unwrap(), 42);
        assert_eq!(parse_int_literal("0x2A").unwrap(), 42);
        assert_eq!(parse_int_literal("0X2a").unwrap(), 42);
        assert_eq!(parse_int_literal("0b101010").unwrap(), 42);
        assert_eq!(parse_int_literal("X\"2A\"").unwrap(), 42);
        assert_eq!(parse_int_literal("b\"101010\"").unwrap(), 42);
        assert_eq!(parse_int_literal(" 7 ").unwrap(), 7);
    }

    #[test]
    fn test_separators() {
        assert_eq!(parse_int_literal("1_000").unwrap(), 1000);
        assert_eq!(parse_int_literal("0xDEAD_BEEF").unwrap(), 0xDEAD_BEEF);
        assert!(parse_int_literal("_1").is_err());
        assert!(parse_int_literal("1_").is_err());
        assert!(parse_int_literal("1__0").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in ["", "0x", "-1", "+1", "0xG", "12a", "0b2", "x\"12", "ten"] {
            match parse_int_literal(bad) {
                Err(InputError::InvalidInteger(text)) => assert_eq!(text, bad),
                other => panic!("{bad:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_overflow() {
        assert_eq!(parse_int_literal("0xFFFFFFFFFFFFFFFF").unwrap(), u64::MAX);
        assert!(parse_int_literal("0x1_0000_0000_0000_0000").is_err());
        assert!(parse_u32_literal("0x1_0000_0000").is_err());
        assert_eq!(parse_u32_literal("32").unwrap(), 32);
    }

    #[test]
    fn test_bools() {
        assert_eq!(parse_bool_literal("TRUE"), Some(true));
        assert_eq!(parse_bool_literal("0"), Some(false));
        assert_eq!(parse_bool_literal("maybe"), None);
    }
}
