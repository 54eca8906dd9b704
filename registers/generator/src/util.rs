// Licensed under the Apache-2.0 license

//! Utility functions for address arithmetic and literal formatting.
//!
//! This module provides the small numeric helpers shared by the allocators
//! and the VHDL generator: slot counting for wide registers, alignment,
//! truncation of default values, and hex / VHDL literal rendering.

/// Width of one AXI4-Lite data slot in bits.
pub const SLOT_BITS: u32 = 32;

/// Size of one AXI4-Lite data slot in bytes.
pub const SLOT_BYTES: u64 = 4;

/// Number of 32-bit slots a register of `width` bits occupies.
///
/// # Examples
/// ```
/// use axion_registers_generator::util::slot_count;
/// assert_eq!(slot_count(1), 1);
/// assert_eq!(slot_count(32), 1);
/// assert_eq!(slot_count(33), 2);
/// assert_eq!(slot_count(256), 8);
/// ```
pub fn slot_count(width: u32) -> u32 {
    width.max(1).div_ceil(SLOT_BITS)
}

/// Byte size reserved in the address space by a register of `width` bits.
pub fn size_bytes(width: u32) -> u64 {
    slot_count(width) as u64 * SLOT_BYTES
}

/// Rounds `addr` up to the next multiple of `alignment`.
pub fn align_up(addr: u64, alignment: u64) -> u64 {
    match addr % alignment {
        0 => addr,
        rem => addr + (alignment - rem),
    }
}

/// Truncates `value` to its low `width` bits.
pub fn truncate(value: u64, width: u32) -> u64 {
    if width >= 64 {
        value
    } else {
        value & ((1u64 << width) - 1)
    }
}

/// Formats an address as uppercase hex with at least `width` digits.
///
/// # Examples
/// ```
/// use axion_registers_generator::util::format_address;
/// assert_eq!(format_address(0x4, 2), "0x04");
/// assert_eq!(format_address(0x1000, 4), "0x1000");
/// assert_eq!(format_address(0xABCDE, 2), "0xABCDE");
/// ```
pub fn format_address(addr: u64, width: usize) -> String {
    format!("0x{addr:0width$X}")
}

/// Formats an inclusive byte range `[start, end)` as `0xSSSS-0xEEEE`.
pub fn format_range(start: u64, end: u64) -> String {
    format!(
        "{}-{}",
        format_address(start, 4),
        format_address(end.saturating_sub(1), 4)
    )
}

/// Renders `value` as a VHDL literal for a vector of `width` bits.
///
/// Widths that are a multiple of 4 use a hex bit-string (`x"00FF"`),
/// everything else a binary bit-string (`"101"`). Bits above 63 are zero.
///
/// # Examples
/// ```
/// use axion_registers_generator::util::vhdl_literal;
/// assert_eq!(vhdl_literal(0xDEAD_BEEF, 32), "x\"DEADBEEF\"");
/// assert_eq!(vhdl_literal(5, 3), "\"101\"");
/// assert_eq!(vhdl_literal(1, 1), "\"1\"");
/// ```
pub fn vhdl_literal(value: u64, width: u32) -> String {
    let bit = |i: u32| if i < 64 { (value >> i) & 1 } else { 0 };
    if width % 4 == 0 {
        let digits: String = (0..width / 4)
            .rev()
            .map(|d| {
                let nibble = (0..4).fold(0, |acc, b| acc | (bit(d * 4 + b) << b));
                char::from_digit(nibble as u32, 16)
                    .unwrap_or('0')
                    .to_ascii_uppercase()
            })
            .collect();
        format!("x\"{digits}\"")
    } else {
        let digits: String = (0..width)
            .rev()
            .map(|i| if bit(i) == 1 { '1' } else { '0' })
            .collect();
        format!("\"{digits}\"")
    }
}

/// Renders a byte offset so it can be added to `unsigned(BASE_ADDR)`.
///
/// Offsets that fit a VHDL `natural` are emitted as decimal integers,
/// larger ones as a qualified 32-bit unsigned literal.
pub fn vhdl_offset(offset: u64) -> String {
    if offset <= i32::MAX as u64 {
        format!("{offset}")
    } else {
        format!("unsigned'({})", vhdl_literal(offset, 32))
    }
}

/// Wraps `lines` in a box-drawing frame with a title row.
pub fn boxed(title: &str, lines: &[String]) -> String {
    let inner = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0)
        + 2;
    let rule = "═".repeat(inner);
    let pad = |s: &str| {
        let fill = inner - 1 - s.chars().count();
        format!("║ {s}{}║", " ".repeat(fill))
    };
    let mut out = format!("╔{rule}╗\n{}\n╠{rule}╣\n", pad(title));
    for line in lines {
        out.push_str(&pad(line));
        out.push('\n');
    }
    out.push_str(&format!("╚{rule}╝"));
    out
}

/// VHDL reserved words that cannot name a port or signal.
const VHDL_KEYWORDS: &[&str] = &[
    "abs", "access", "after", "alias", "all", "and", "architecture", "array", "assert",
    "attribute", "begin", "block", "body", "buffer", "bus", "case", "component",
    "configuration", "constant", "disconnect", "downto", "else", "elsif", "end", "entity",
    "exit", "file", "for", "function", "generate", "generic", "group", "guarded", "if",
    "impure", "in", "inertial", "inout", "is", "label", "library", "linkage", "literal",
    "loop", "map", "mod", "nand", "new", "next", "nor", "not", "null", "of", "on", "open",
    "or", "others", "out", "package", "port", "postponed", "procedure", "process", "pure",
    "range", "record", "register", "reject", "rem", "report", "return", "rol", "ror",
    "select", "severity", "shared", "signal", "sla", "sll", "sra", "srl", "subtype", "then",
    "to", "transport", "type", "unaffected", "units", "until", "use", "variable", "wait",
    "when", "while", "with", "xnor", "xor",
];

/// Names used by the generated interface logic. Storage words append
/// `_reg`, so the stems of the internal `*_reg` signals are taken too.
const INTERNAL_NAMES: &[&str] = &[
    "module_clk", "base_addr", "wr_en", "wr_addr_hit", "aw_captured", "w_captured",
    "ar_captured", "bvalid_int", "bresp_int", "rvalid_int", "rdata_int", "rresp_int",
    "wr_addr", "wr_data", "wr_strb", "rd_addr", "wr_addr_reg", "wr_data_reg", "wr_strb_reg",
    "rd_addr_reg", "axi_resp_okay", "axi_resp_slverr", "reg_proc", "axi_write_proc",
    "axi_read_proc", "cdc_in_proc", "cdc_out_proc", "rtl",
];

/// Returns true if `name` is usable as a register, field or module name:
/// a VHDL basic identifier that is neither a reserved word nor a name the
/// generated logic uses itself. VHDL is case-insensitive.
pub fn is_vhdl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let lower = name.to_ascii_lowercase();
    !name.ends_with('_')
        && !name.contains("__")
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !lower.starts_with("s_axi_")
        && !VHDL_KEYWORDS.contains(&lower.as_str())
        && !INTERNAL_NAMES.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_count() {
        assert_eq!(slot_count(0), 1);
        assert_eq!(slot_count(8), 1);
        assert_eq!(slot_count(64), 2);
        assert_eq!(slot_count(65), 3);
        assert_eq!(size_bytes(64), 8);
        assert_eq!(size_bytes(1), 4);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(4, 4), 4);
        assert_eq!(align_up(0x13, 4), 0x14);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate(0xFF, 4), 0xF);
        assert_eq!(truncate(0x1_0000_0001, 32), 1);
        assert_eq!(truncate(u64::MAX, 64), u64::MAX);
        assert_eq!(truncate(u64::MAX, 128), u64::MAX);
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0, 2), "0x00");
        assert_eq!(format_address(0x10, 2), "0x10");
        assert_eq!(format_address(0xab, 4), "0x00AB");
        assert_eq!(format_range(0, 8), "0x0000-0x0007");
    }

    #[test]
    fn test_vhdl_literal() {
        assert_eq!(vhdl_literal(0, 8), "x\"00\"");
        assert_eq!(vhdl_literal(0x55, 12), "x\"055\"");
        assert_eq!(vhdl_literal(2, 2), "\"10\"");
        assert_eq!(vhdl_literal(u64::MAX, 72), "x\"00FFFFFFFFFFFFFFFF\"");
    }

    #[test]
    fn test_vhdl_offset() {
        assert_eq!(vhdl_offset(4), "4");
        assert_eq!(vhdl_offset(0x8000_0000), "unsigned'(x\"80000000\")");
    }

    #[test]
    fn test_boxed() {
        let text = boxed("TITLE", &["a".to_string(), "longer line".to_string()]);
        assert!(text.starts_with('╔'));
        assert!(text.contains("║ longer line ║"));
        assert!(text.ends_with('╝'));
    }

    #[test]
    fn test_vhdl_identifier() {
        assert!(is_vhdl_identifier("status_reg"));
        assert!(is_vhdl_identifier("r1"));
        assert!(!is_vhdl_identifier("1r"));
        assert!(!is_vhdl_identifier("bad__name"));
        assert!(!is_vhdl_identifier("trailing_"));
        assert!(!is_vhdl_identifier("has-dash"));
        assert!(!is_vhdl_identifier("Signal"));
        assert!(!is_vhdl_identifier("wr_addr"));
        assert!(!is_vhdl_identifier("S_AXI_AWADDR"));
        assert!(is_vhdl_identifier("ctrl"));
    }
}
