// Licensed under the Apache-2.0 license

//! Core data types for the register-map compiler.
//!
//! Front-ends produce a [`ModuleDef`] whose registers may or may not carry
//! explicit addresses. The resolution pass turns it into a [`Module`] where
//! every register has a concrete relative and absolute address and packed
//! registers have been materialized from their fields.
//!
//! ## Lifecycle
//!
//! ```text
//! ModuleDef                  # front-end output, addresses optional
//! │   └── registers: Vec<RegisterDef>
//! │
//! │   resolve()
//! ▼
//! Module                     # addresses resolved
//! ├── entries: Vec<RegisterEntry>
//! │   ├── Single(Register)
//! │   └── Packed(PackedRegister)
//! │       └── fields: Vec<Field>
//! └── parsing_errors / diagnostics
//! │
//! │   generate_vhdl()
//! ▼
//! <module>_axion_reg.vhd
//! ```

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ResolutionError, ValidationError};
use crate::util::{self, format_address, slot_count, SLOT_BITS};

/// Synchronizer depth used when CDC is enabled without an explicit stage count.
pub const DEFAULT_CDC_STAGES: u32 = 2;

//=============================================================================
// Access mode
//=============================================================================

/// Bus-side access permission of a register or field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum AccessMode {
    /// Written by hardware, read by the bus.
    #[serde(rename = "RO")]
    ReadOnly,
    /// Written and read by the bus, driven to hardware.
    #[default]
    #[serde(rename = "RW")]
    ReadWrite,
    /// Written by the bus, driven to hardware, reads return zero.
    #[serde(rename = "WO")]
    WriteOnly,
}

impl AccessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "RO",
            AccessMode::ReadWrite => "RW",
            AccessMode::WriteOnly => "WO",
        }
    }

    pub fn is_readable(self) -> bool {
        self != AccessMode::WriteOnly
    }

    pub fn is_writable(self) -> bool {
        self != AccessMode::ReadOnly
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = ValidationError;

    /// Case-insensitive `RO` / `RW` / `WO`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RO" => Ok(AccessMode::ReadOnly),
            "RW" => Ok(AccessMode::ReadWrite),
            "WO" => Ok(AccessMode::WriteOnly),
            _ => Err(ValidationError::InvalidAccessMode(s.trim().to_string())),
        }
    }
}

//=============================================================================
// Definitions (front-end output)
//=============================================================================

/// Request to place a signal as a field of a packed register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPlacement {
    pub reg_name: String,
    /// Explicit low bit. `None` places the field after the highest used bit.
    pub bit_offset: Option<u32>,
}

/// One register (or packed-register field) as declared by a front-end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterDef {
    pub signal_name: String,
    pub width: u32,
    pub access_mode: AccessMode,
    /// Relative address; `None` requests auto-allocation.
    pub address: Option<u64>,
    pub read_strobe: bool,
    pub write_strobe: bool,
    pub default_value: u64,
    pub description: String,
    pub placement: Option<FieldPlacement>,
}

impl RegisterDef {
    pub fn new(signal_name: &str, width: u32, access_mode: AccessMode) -> Self {
        Self {
            signal_name: signal_name.to_string(),
            width,
            access_mode,
            address: None,
            read_strobe: false,
            write_strobe: false,
            default_value: 0,
            description: String::new(),
            placement: None,
        }
    }

    pub fn at(mut self, address: u64) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_default(mut self, value: u64) -> Self {
        self.default_value = value;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_strobes(mut self, read: bool, write: bool) -> Self {
        self.read_strobe = read;
        self.write_strobe = write;
        self
    }

    /// Make this signal a field of the packed register `reg_name`.
    pub fn packed_into(mut self, reg_name: &str, bit_offset: Option<u32>) -> Self {
        self.placement = Some(FieldPlacement {
            reg_name: reg_name.to_string(),
            bit_offset,
        });
        self
    }
}

/// A module as declared by a front-end, before address resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDef {
    pub name: String,
    pub base_address: u64,
    pub cdc_enabled: bool,
    pub cdc_stages: u32,
    pub registers: Vec<RegisterDef>,
    /// Path of the file the module came from, if any.
    pub source: Option<String>,
    /// Problems found by the front-end; carried into the resolved module.
    pub parsing_errors: Vec<Diagnostic>,
}

impl ModuleDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base_address: 0,
            cdc_enabled: false,
            cdc_stages: DEFAULT_CDC_STAGES,
            registers: vec![],
            source: None,
            parsing_errors: vec![],
        }
    }

    pub fn with_base_address(mut self, base: u64) -> Self {
        self.base_address = base;
        self
    }

    pub fn with_cdc(mut self, stages: u32) -> Self {
        self.cdc_enabled = true;
        self.cdc_stages = stages;
        self
    }

    pub fn with_register(mut self, register: RegisterDef) -> Self {
        self.registers.push(register);
        self
    }
}

//=============================================================================
// Resolved model
//=============================================================================

/// A standalone register with a resolved address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Register {
    pub signal_name: String,
    pub width: u32,
    pub access_mode: AccessMode,
    #[serde(rename = "relative_address_int")]
    pub relative_address: u64,
    #[serde(rename = "address_int")]
    pub address: u64,
    pub read_strobe: bool,
    pub write_strobe: bool,
    pub default_value: u64,
    pub description: String,
}

impl Register {
    /// Number of 32-bit bus slots; more than one for wide registers.
    pub fn slots(&self) -> u32 {
        slot_count(self.width)
    }

    pub fn size_bytes(&self) -> u64 {
        util::size_bytes(self.width)
    }

    pub fn is_wide(&self) -> bool {
        self.width > SLOT_BITS
    }

    /// Relative byte range occupied by this register.
    pub fn byte_range(&self) -> Range<u64> {
        self.relative_address..self.relative_address + self.size_bytes()
    }
}

/// One field of a packed register.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub bit_low: u32,
    pub bit_high: u32,
    pub access_mode: AccessMode,
    /// Declared type text, e.g. `std_logic_vector(7 downto 0)`.
    pub signal_type: String,
    pub default_value: u64,
    pub description: String,
    pub read_strobe: bool,
    pub write_strobe: bool,
}

impl Field {
    pub fn width(&self) -> u32 {
        self.bit_high - self.bit_low + 1
    }

    /// The field's bits in its storage word.
    pub fn mask(&self) -> u64 {
        util::truncate(u64::MAX, self.width())
            .checked_shl(self.bit_low)
            .unwrap_or(0)
    }

    /// The default value shifted to the field's position.
    pub fn positioned_default(&self) -> u64 {
        self.default_value.checked_shl(self.bit_low).unwrap_or(0) & self.mask()
    }

    pub fn overlaps(&self, low: u32, high: u32) -> bool {
        self.bit_low <= high && low <= self.bit_high
    }
}

/// Several narrow fields sharing one 32-bit storage word.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackedRegister {
    pub reg_name: String,
    #[serde(rename = "relative_address_int")]
    pub relative_address: u64,
    #[serde(rename = "address_int")]
    pub address: u64,
    pub fields: Vec<Field>,
    /// Highest used bit plus one.
    pub used_bits: u32,
    /// OR of every field default shifted to its position.
    pub default_value: u64,
}

impl PackedRegister {
    pub fn slots(&self) -> u32 {
        slot_count(self.used_bits)
    }

    pub fn size_bytes(&self) -> u64 {
        util::size_bytes(self.used_bits)
    }

    pub fn byte_range(&self) -> Range<u64> {
        self.relative_address..self.relative_address + self.size_bytes()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn read_strobe(&self) -> bool {
        self.fields.iter().any(|f| f.read_strobe)
    }

    pub fn write_strobe(&self) -> bool {
        self.fields.iter().any(|f| f.write_strobe)
    }
}

/// An item in a module's address map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegisterEntry {
    Single(Register),
    Packed(PackedRegister),
}

impl RegisterEntry {
    pub fn name(&self) -> &str {
        match self {
            RegisterEntry::Single(r) => &r.signal_name,
            RegisterEntry::Packed(p) => &p.reg_name,
        }
    }

    pub fn relative_address(&self) -> u64 {
        match self {
            RegisterEntry::Single(r) => r.relative_address,
            RegisterEntry::Packed(p) => p.relative_address,
        }
    }

    pub fn address(&self) -> u64 {
        match self {
            RegisterEntry::Single(r) => r.address,
            RegisterEntry::Packed(p) => p.address,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            RegisterEntry::Single(r) => r.size_bytes(),
            RegisterEntry::Packed(p) => p.size_bytes(),
        }
    }

    pub fn byte_range(&self) -> Range<u64> {
        match self {
            RegisterEntry::Single(r) => r.byte_range(),
            RegisterEntry::Packed(p) => p.byte_range(),
        }
    }

    /// Short access summary used by reports: the register mode, or the
    /// field modes joined with `/` for packed registers.
    pub fn access_summary(&self) -> String {
        match self {
            RegisterEntry::Single(r) => r.access_mode.to_string(),
            RegisterEntry::Packed(p) => {
                let mut modes: Vec<&str> = vec![];
                for f in &p.fields {
                    if !modes.contains(&f.access_mode.as_str()) {
                        modes.push(f.access_mode.as_str());
                    }
                }
                modes.join("/")
            }
        }
    }
}

//=============================================================================
// Diagnostics
//=============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A message attached to a module during parsing or resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub msg: String,
    /// Framed multi-line rendering, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

impl Diagnostic {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            msg: msg.into(),
            formatted: None,
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            msg: msg.into(),
            formatted: None,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            msg: msg.into(),
            formatted: None,
        }
    }
}

impl From<&ResolutionError> for Diagnostic {
    fn from(err: &ResolutionError) -> Self {
        Self {
            severity: Severity::Error,
            msg: err.to_string(),
            formatted: err.formatted_message(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{tag}: {}", self.msg)
    }
}

//=============================================================================
// Module
//=============================================================================

/// A module with every register placed in its address space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub base_address: u64,
    pub cdc_enabled: bool,
    pub cdc_stages: u32,
    /// Address-map entries in allocation order.
    pub entries: Vec<RegisterEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Errors recorded under the partial conflict policy or by the front-end.
    pub parsing_errors: Vec<Diagnostic>,
    /// Informational notes, e.g. wide-register slot expansion.
    pub diagnostics: Vec<Diagnostic>,
}

impl Module {
    pub fn registers(&self) -> impl Iterator<Item = &Register> {
        self.entries.iter().filter_map(|e| match e {
            RegisterEntry::Single(r) => Some(r),
            RegisterEntry::Packed(_) => None,
        })
    }

    pub fn packed_registers(&self) -> impl Iterator<Item = &PackedRegister> {
        self.entries.iter().filter_map(|e| match e {
            RegisterEntry::Packed(p) => Some(p),
            RegisterEntry::Single(_) => None,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&RegisterEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers().find(|r| r.signal_name == name)
    }

    pub fn packed_register(&self, name: &str) -> Option<&PackedRegister> {
        self.packed_registers().find(|p| p.reg_name == name)
    }

    pub fn has_errors(&self) -> bool {
        self.parsing_errors
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Absolute address formatted with the module's base, e.g. `0x00001004`.
    pub fn absolute(&self, relative: u64) -> String {
        format_address(self.base_address.saturating_add(relative), 8)
    }

    /// Converts the resolved module back into a definition with every
    /// address made explicit. Resolving the result yields an equal module.
    pub fn to_def(&self) -> ModuleDef {
        let mut registers = vec![];
        for entry in &self.entries {
            match entry {
                RegisterEntry::Single(r) => registers.push(RegisterDef {
                    signal_name: r.signal_name.clone(),
                    width: r.width,
                    access_mode: r.access_mode,
                    address: Some(r.relative_address),
                    read_strobe: r.read_strobe,
                    write_strobe: r.write_strobe,
                    default_value: r.default_value,
                    description: r.description.clone(),
                    placement: None,
                }),
                RegisterEntry::Packed(p) => {
                    for f in &p.fields {
                        registers.push(RegisterDef {
                            signal_name: f.name.clone(),
                            width: f.width(),
                            access_mode: f.access_mode,
                            address: Some(p.relative_address),
                            read_strobe: f.read_strobe,
                            write_strobe: f.write_strobe,
                            default_value: f.default_value,
                            description: f.description.clone(),
                            placement: Some(FieldPlacement {
                                reg_name: p.reg_name.clone(),
                                bit_offset: Some(f.bit_low),
                            }),
                        });
                    }
                }
            }
        }
        ModuleDef {
            name: self.name.clone(),
            base_address: self.base_address,
            cdc_enabled: self.cdc_enabled,
            cdc_stages: self.cdc_stages,
            registers,
            source: self.source.clone(),
            parsing_errors: self.parsing_errors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_parse() {
        assert_eq!("ro".parse::<AccessMode>().unwrap(), AccessMode::ReadOnly);
        assert_eq!(" Rw ".parse::<AccessMode>().unwrap(), AccessMode::ReadWrite);
        assert_eq!("WO".parse::<AccessMode>().unwrap(), AccessMode::WriteOnly);
        assert_eq!(
            "RX".parse::<AccessMode>(),
            Err(ValidationError::InvalidAccessMode("RX".into()))
        );
    }

    #[test]
    fn test_access_mode_display() {
        assert_eq!(AccessMode::ReadOnly.to_string(), "RO");
        assert!(AccessMode::ReadWrite.is_readable());
        assert!(AccessMode::ReadWrite.is_writable());
        assert!(!AccessMode::ReadOnly.is_writable());
        assert!(!AccessMode::WriteOnly.is_readable());
    }

    #[test]
    fn test_register_geometry() {
        let reg = Register {
            signal_name: "wide".into(),
            width: 64,
            access_mode: AccessMode::ReadWrite,
            relative_address: 0x10,
            address: 0x1010,
            read_strobe: false,
            write_strobe: false,
            default_value: 0,
            description: String::new(),
        };
        assert_eq!(reg.slots(), 2);
        assert_eq!(reg.size_bytes(), 8);
        assert_eq!(reg.byte_range(), 0x10..0x18);
        assert!(reg.is_wide());
    }

    #[test]
    fn test_field_mask() {
        let field = Field {
            name: "mode".into(),
            bit_low: 4,
            bit_high: 7,
            access_mode: AccessMode::ReadWrite,
            signal_type: "std_logic_vector(3 downto 0)".into(),
            default_value: 0,
            description: String::new(),
            read_strobe: false,
            write_strobe: false,
        };
        assert_eq!(field.width(), 4);
        assert_eq!(field.mask(), 0xF0);
        assert_eq!(Field { default_value: 0x1F, ..field.clone() }.positioned_default(), 0xF0);
        assert!(field.overlaps(7, 9));
        assert!(!field.overlaps(8, 9));
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(Diagnostic::error("boom").to_string(), "error: boom");
        assert_eq!(Diagnostic::info("note").to_string(), "info: note");
    }

    #[test]
    fn test_access_mode_serializes_short() {
        let json = serde_json::to_string(&AccessMode::WriteOnly).unwrap();
        assert_eq!(json, "\"WO\"");
    }
}
