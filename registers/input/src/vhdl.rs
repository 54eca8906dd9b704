// Licensed under the Apache-2.0 license

//! Scanner for `@axion` annotations embedded in VHDL sources.
//!
//! Only three constructs are recognized, each on a single line:
//! - `entity <name> is`
//! - `-- @axion_def <module attributes>`
//! - `signal <name> : <type> [:= <init>]; -- @axion <signal attributes>`
//!
//! Everything else in the file is ignored.

use std::fs;
use std::path::Path;

use axion_registers_generator::{Diagnostic, ModuleDef, RegisterDef, DEFAULT_CDC_STAGES};

use crate::annotation::{ModuleAttributes, SignalAttributes};
use crate::error::InputError;

const SIGNAL_TAG: &str = "@axion";
const MODULE_TAG: &str = "@axion_def";

/// A `signal` declaration carrying an `@axion` comment.
#[derive(Clone, Debug, PartialEq, Eq)]
struct AnnotatedSignal<'a> {
    name: &'a str,
    type_text: &'a str,
    attributes: &'a str,
}

/// Splits a line into code and the text after `--`.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.find("--") {
        Some(pos) => (&line[..pos], Some(&line[pos + 2..])),
        None => (line, None),
    }
}

/// Text following `tag` at the start of a comment, if the comment is that
/// tag. `@axion_def` is not an `@axion` tag.
fn tagged<'a>(comment: &'a str, tag: &str) -> Option<&'a str> {
    let rest = comment.trim_start().strip_prefix(tag)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

fn entity_name(line: &str) -> Option<&str> {
    let mut words = split_comment(line).0.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("entity") {
        return None;
    }
    let name = words.next()?;
    words.next()?.eq_ignore_ascii_case("is").then_some(name)
}

fn annotated_signal(line: &str) -> Option<AnnotatedSignal<'_>> {
    let (code, comment) = split_comment(line);
    let attributes = tagged(comment?, SIGNAL_TAG)?;
    let decl = code.trim_start();
    let keyword = decl.get(..6)?;
    if !keyword.eq_ignore_ascii_case("signal") {
        return None;
    }
    let rest = &decl[6..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, type_text) = rest.split_once(':')?;
    let type_text = type_text.trim_end().strip_suffix(';')?;
    let type_text = match type_text.find(":=") {
        Some(pos) => &type_text[..pos],
        None => type_text,
    };
    Some(AnnotatedSignal {
        name: name.trim(),
        type_text: type_text.trim(),
        attributes,
    })
}

/// Width of a supported signal type: `std_logic`, or a `std_logic_vector`,
/// `unsigned` or `signed` with a literal `downto` or `to` range.
pub fn signal_width(type_text: &str) -> Result<u32, InputError> {
    let unsupported = || InputError::syntax(format!("unsupported signal type '{type_text}'"));
    let lower = type_text.trim().to_ascii_lowercase();
    if lower == "std_logic" || lower == "std_ulogic" {
        return Ok(1);
    }
    let (base, range) = lower.split_once('(').ok_or_else(unsupported)?;
    if !matches!(
        base.trim(),
        "std_logic_vector" | "std_ulogic_vector" | "unsigned" | "signed"
    ) {
        return Err(unsupported());
    }
    let range = range.trim_end().strip_suffix(')').ok_or_else(unsupported)?;
    let words: Vec<&str> = range.split_whitespace().collect();
    let (left, right) = match words.as_slice() {
        [high, "downto", low] => (*high, *low),
        [low, "to", high] => (*high, *low),
        _ => return Err(unsupported()),
    };
    let high: u32 = left.parse().map_err(|_| unsupported())?;
    let low: u32 = right.parse().map_err(|_| unsupported())?;
    if high < low {
        return Err(InputError::syntax(format!("null range in '{type_text}'")));
    }
    Ok(high - low + 1)
}

fn register_def(signal: &AnnotatedSignal<'_>) -> Result<RegisterDef, InputError> {
    let attrs: SignalAttributes = signal.attributes.parse()?;
    let width = signal_width(signal.type_text)?;
    let mut def = RegisterDef::new(signal.name, width, attrs.access_mode)
        .with_strobes(attrs.read_strobe, attrs.write_strobe)
        .with_default(attrs.default_value.unwrap_or(0));
    if let Some(desc) = &attrs.description {
        def = def.with_description(desc);
    }
    if let Some(addr) = attrs.address {
        def = def.at(addr);
    }
    match (&attrs.reg_name, attrs.bit_offset) {
        (Some(reg), offset) => def = def.packed_into(reg, offset),
        (None, Some(_)) => {
            return Err(InputError::syntax(format!(
                "'{}' has BIT_OFFSET but no REG_NAME",
                signal.name
            )))
        }
        (None, None) => {}
    }
    Ok(def)
}

/// Scans VHDL source text.
///
/// Returns `Ok(None)` when the text has no entity or no annotated signal.
/// Errors in individual annotations do not abort the scan: the offending
/// signal is skipped and the error is recorded in
/// [`ModuleDef::parsing_errors`]. A second `@axion_def` is reported the same
/// way.
pub fn parse_vhdl(text: &str, file: &str) -> Result<Option<ModuleDef>, InputError> {
    let mut entity = None;
    let mut module_attrs: Option<ModuleAttributes> = None;
    let mut registers = vec![];
    let mut errors = vec![];

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if entity.is_none() {
            entity = entity_name(line);
        }
        if let Some(attrs) = split_comment(line).1.and_then(|c| tagged(c, MODULE_TAG)) {
            if module_attrs.is_some() {
                errors.push(InputError::syntax("more than one @axion_def").located(file, line_no));
                continue;
            }
            match attrs.parse() {
                Ok(parsed) => module_attrs = Some(parsed),
                Err(e) => errors.push(InputError::located(e, file, line_no)),
            }
            continue;
        }
        if let Some(signal) = annotated_signal(line) {
            match register_def(&signal) {
                Ok(def) => registers.push(def),
                Err(e) => errors.push(e.located(file, line_no)),
            }
        }
    }

    let Some(entity) = entity else {
        log::debug!("{file}: no entity, skipped");
        return Ok(None);
    };
    if registers.is_empty() && errors.is_empty() {
        log::debug!("{file}: no @axion signals, skipped");
        return Ok(None);
    }

    let attrs = module_attrs.unwrap_or_default();
    let mut def = ModuleDef::new(entity).with_base_address(attrs.base_address.unwrap_or(0));
    def.cdc_enabled = attrs.cdc_enabled.unwrap_or(false);
    def.cdc_stages = attrs.cdc_stages.unwrap_or(DEFAULT_CDC_STAGES);
    def.registers = registers;
    def.source = Some(file.to_string());
    for e in &errors {
        log::warn!("{e}");
    }
    def.parsing_errors = errors
        .iter()
        .map(|e| Diagnostic::error(e.to_string()))
        .collect();
    log::debug!(
        "{file}: entity '{}' with {} annotated signals",
        def.name,
        def.registers.len()
    );
    Ok(Some(def))
}

/// Reads and scans one VHDL file.
pub fn parse_vhdl_file(path: &Path) -> Result<Option<ModuleDef>, InputError> {
    let text = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_vhdl(&text, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axion_registers_generator::AccessMode;

    const SENSOR: &str = r#"
library ieee;
use ieee.std_logic_1164.all;

-- @axion_def BASE_ADDR=0x1234 CDC_EN CDC_STAGE=4
entity sensor is
    port (clk : in std_logic);
end entity sensor;

architecture rtl of sensor is
    signal status  : std_logic_vector(31 downto 0); -- @axion RO ADDR=0x00 DESC="Status word"
    signal control : std_logic_vector(0 to 7) := (others => '0'); -- @axion RW DEFAULT=0x5A W_STROBE
    signal go      : std_logic; -- @axion WO R_STROBE
    signal plain   : std_logic; -- a normal comment
    signal counter : unsigned(15 downto 0);
begin
end architecture rtl;
"#;

    #[test]
    fn test_full_file() {
        let def = parse_vhdl(SENSOR, "sensor.vhd").unwrap().unwrap();
        assert_eq!(def.name, "sensor");
        assert_eq!(def.base_address, 0x1234);
        assert!(def.cdc_enabled);
        assert_eq!(def.cdc_stages, 4);
        assert_eq!(def.source.as_deref(), Some("sensor.vhd"));
        assert!(def.parsing_errors.is_empty());

        let names: Vec<&str> = def.registers.iter().map(|r| r.signal_name.as_str()).collect();
        assert_eq!(names, vec!["status", "control", "go"]);

        let status = &def.registers[0];
        assert_eq!(status.width, 32);
        assert_eq!(status.access_mode, AccessMode::ReadOnly);
        assert_eq!(status.address, Some(0));
        assert_eq!(status.description, "Status word");

        let control = &def.registers[1];
        assert_eq!(control.width, 8);
        assert_eq!(control.default_value, 0x5A);
        assert!(control.write_strobe);
        assert_eq!(control.address, None);

        let go = &def.registers[2];
        assert_eq!(go.width, 1);
        assert_eq!(go.access_mode, AccessMode::WriteOnly);
        assert!(go.read_strobe);
    }

    #[test]
    fn test_defaults_without_axion_def() {
        let text = "entity keep is end;\narchitecture rtl of keep is\nsignal s : std_logic; -- @axion RO\nbegin end;";
        let def = parse_vhdl(text, "keep.vhd").unwrap().unwrap();
        assert_eq!(def.base_address, 0);
        assert!(!def.cdc_enabled);
        assert_eq!(def.cdc_stages, DEFAULT_CDC_STAGES);
    }

    #[test]
    fn test_skips_files_without_entity_or_signals() {
        assert!(parse_vhdl("signal s : std_logic; -- @axion RO", "a.vhd")
            .unwrap()
            .is_none());
        assert!(parse_vhdl("entity e is end;\nsignal s : std_logic;", "b.vhd")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_lowercase_keys() {
        let text = "-- @axion_def base_addr=0x1000\nentity low is end;\nsignal s : std_logic_vector(7 downto 0); -- @axion rw addr=0x04 desc=\"Low\"";
        let def = parse_vhdl(text, "low.vhd").unwrap().unwrap();
        assert_eq!(def.base_address, 0x1000);
        assert_eq!(def.registers[0].address, Some(4));
        assert_eq!(def.registers[0].description, "Low");
    }

    #[test]
    fn test_packed_fields() {
        let text = "entity p is end;\n\
            signal en   : std_logic; -- @axion RW REG_NAME=ctrl BIT_OFFSET=0\n\
            signal mode : std_logic_vector(1 downto 0); -- @axion RW REG_NAME=ctrl";
        let def = parse_vhdl(text, "p.vhd").unwrap().unwrap();
        let placement = def.registers[1].placement.as_ref().unwrap();
        assert_eq!(placement.reg_name, "ctrl");
        assert_eq!(placement.bit_offset, None);
        assert_eq!(def.registers[0].placement.as_ref().unwrap().bit_offset, Some(0));
    }

    #[test]
    fn test_bad_annotation_is_recorded_with_location() {
        let text = "entity e is end;\n\
            signal a : std_logic; -- @axion RO ADDR=0xZZ\n\
            signal b : std_logic; -- @axion RO BOGUS\n\
            signal c : std_logic; -- @axion RO";
        let def = parse_vhdl(text, "e.vhd").unwrap().unwrap();
        assert_eq!(def.registers.len(), 1);
        assert_eq!(def.parsing_errors.len(), 2);
        assert!(def.parsing_errors[0].msg.starts_with("e.vhd:2:"));
        assert!(def.parsing_errors[0].msg.contains("0xZZ"));
        assert!(def.parsing_errors[1].msg.contains("BOGUS"));
    }

    #[test]
    fn test_signal_width() {
        assert_eq!(signal_width("std_logic").unwrap(), 1);
        assert_eq!(signal_width("STD_LOGIC_VECTOR(63 DOWNTO 0)").unwrap(), 64);
        assert_eq!(signal_width("signed(3 downto 1)").unwrap(), 3);
        assert_eq!(signal_width("unsigned (0 to 9)").unwrap(), 10);
        assert!(signal_width("integer").is_err());
        assert!(signal_width("std_logic_vector(WIDTH-1 downto 0)").is_err());
        assert!(signal_width("std_logic_vector(0 downto 7)").is_err());
    }

    #[test]
    fn test_axion_def_is_not_a_signal_tag() {
        assert!(tagged(" @axion_def X", SIGNAL_TAG).is_none());
        assert_eq!(tagged(" @axion RO", SIGNAL_TAG), Some(" RO"));
        assert!(tagged("@axionRO", SIGNAL_TAG).is_none());
    }
}
