// Licensed under the Apache-2.0 license

//! TOML and JSON register descriptions.
//!
//! Both formats share one schema:
//!
//! ```toml
//! module = "sensor"          # or a [module] table with name/base_addr
//! base_addr = "0x1000"       # string literal or integer
//!
//! [config]
//! cdc_en = true
//! cdc_stage = 3
//!
//! [[registers]]
//! name = "status"
//! addr = "0x00"
//! access = "RO"
//! width = 32
//! ```

use std::fs;
use std::path::Path;

use axion_registers_generator::{ModuleDef, RegisterDef, DEFAULT_CDC_STAGES};
use serde::Deserialize;

use crate::error::{InputError, SchemaError};
use crate::literal::parse_int_literal;

const DEFAULT_WIDTH: u32 = 32;

/// Supported structured formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// An integer given either natively or as a literal string.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

impl Number {
    fn value(&self) -> Result<u64, InputError> {
        match self {
            Number::Int(v) => Ok(*v),
            Number::Text(s) => parse_int_literal(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleTable {
    name: Option<String>,
    base_addr: Option<Number>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModuleField {
    Name(String),
    Table(ModuleTable),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigTable {
    #[serde(default)]
    cdc_en: bool,
    cdc_stage: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegisterTable {
    name: String,
    addr: Option<Number>,
    access: Option<String>,
    width: Option<u32>,
    default: Option<Number>,
    description: Option<String>,
    #[serde(default)]
    r_strobe: bool,
    #[serde(default)]
    w_strobe: bool,
    reg_name: Option<String>,
    bit_offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    module: Option<ModuleField>,
    name: Option<String>,
    base_addr: Option<Number>,
    #[serde(default)]
    config: ConfigTable,
    registers: Vec<RegisterTable>,
}

impl RegisterTable {
    fn to_def(&self) -> Result<RegisterDef, InputError> {
        let access = match &self.access {
            Some(text) => text.parse()?,
            None => Default::default(),
        };
        let mut def = RegisterDef::new(&self.name, self.width.unwrap_or(DEFAULT_WIDTH), access)
            .with_strobes(self.r_strobe, self.w_strobe);
        if let Some(addr) = &self.addr {
            def = def.at(addr.value()?);
        }
        if let Some(default) = &self.default {
            def = def.with_default(default.value()?);
        }
        if let Some(desc) = &self.description {
            def = def.with_description(desc);
        }
        match (&self.reg_name, self.bit_offset) {
            (Some(reg), offset) => def = def.packed_into(reg, offset),
            (None, Some(_)) => {
                return Err(InputError::syntax(format!(
                    "register '{}' has bit_offset but no reg_name",
                    self.name
                )))
            }
            (None, None) => {}
        }
        Ok(def)
    }
}

impl Document {
    fn into_def(self, file: &str) -> Result<ModuleDef, InputError> {
        let (name, base) = match self.module {
            Some(ModuleField::Name(name)) => (Some(name), self.base_addr),
            Some(ModuleField::Table(table)) => (table.name, table.base_addr.or(self.base_addr)),
            None => (self.name, self.base_addr),
        };
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| InputError::MissingEntity {
                file: file.to_string(),
            })?;

        let mut def = ModuleDef::new(&name);
        if let Some(base) = base {
            def = def.with_base_address(base.value()?);
        }
        def.cdc_enabled = self.config.cdc_en;
        def.cdc_stages = self.config.cdc_stage.unwrap_or(DEFAULT_CDC_STAGES);
        def.source = Some(file.to_string());
        for (idx, register) in self.registers.iter().enumerate() {
            let register = register
                .to_def()
                .map_err(|e| e.located(file, idx + 1))?;
            def.registers.push(register);
        }
        Ok(def)
    }
}

/// Parses a structured description. Any error fails the whole file; the
/// line of a [`InputError::Syntax`] raised here is the 1-based register
/// index.
pub fn parse_structured(text: &str, format: Format, file: &str) -> Result<ModuleDef, InputError> {
    let schema = |source: SchemaError| InputError::Schema {
        file: file.to_string(),
        source,
    };
    let doc: Document = match format {
        Format::Toml => toml::from_str(text).map_err(|e| schema(e.into()))?,
        Format::Json => serde_json::from_str(text).map_err(|e| schema(e.into()))?,
    };
    let def = doc.into_def(file)?;
    log::debug!(
        "{file}: module '{}' with {} registers",
        def.name,
        def.registers.len()
    );
    Ok(def)
}

/// Reads and parses one `.toml` or `.json` file.
pub fn parse_structured_file(path: &Path) -> Result<ModuleDef, InputError> {
    let file = path.display().to_string();
    let format = Format::from_path(path)
        .ok_or_else(|| InputError::syntax("not a .toml or .json file").located(&file, 0))?;
    let text = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_structured(&text, format, &file)
}
