// Licensed under the Apache-2.0 license

//! Front-ends producing [`ModuleDef`]s for the register-map compiler.
//!
//! Two source flavours are supported:
//! - VHDL files whose signals carry `-- @axion` comments ([`vhdl`])
//! - TOML and JSON descriptions sharing one schema ([`structured`])
//!
//! [`analyze_sources`] walks directories, runs the matching front-end on
//! each file and resolves the result as one batch.
//!
//! ```
//! use axion_registers_input::parse_vhdl;
//!
//! let text = "entity blink is end;\n\
//!             signal led : std_logic; -- @axion RW ADDR=0x4";
//! let def = parse_vhdl(text, "blink.vhd").unwrap().unwrap();
//! assert_eq!(def.name, "blink");
//! assert_eq!(def.registers[0].address, Some(4));
//! ```
//!
//! [`ModuleDef`]: axion_registers_generator::ModuleDef

pub mod analysis;
pub mod annotation;
pub mod error;
pub mod literal;
pub mod structured;
pub mod vhdl;

pub use analysis::{
    analyze_sources, analyze_sources_with_config, discover_sources, is_excluded, parse_source,
    Analysis, SourceError, SourceKind,
};
pub use annotation::{ModuleAttributes, SignalAttributes};
pub use error::{InputError, SchemaError};
pub use literal::parse_int_literal;
pub use structured::{parse_structured, parse_structured_file, Format};
pub use vhdl::{parse_vhdl, parse_vhdl_file};
