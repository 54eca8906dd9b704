// Licensed under the Apache-2.0 license

//! Register-map compiler core: address allocation, bit-field packing and
//! AXI4-Lite VHDL generation.
//!
//! ## Usage
//!
//! ```
//! use axion_registers_generator::{
//!     generate_vhdl, resolve, AccessMode, GeneratorConfig, ModuleDef, RegisterDef,
//! };
//!
//! let def = ModuleDef::new("sensor")
//!     .with_base_address(0x1000)
//!     .with_register(RegisterDef::new("status", 32, AccessMode::ReadOnly))
//!     .with_register(RegisterDef::new("control", 32, AccessMode::ReadWrite).at(0x10));
//!
//! let module = resolve(&def).unwrap();
//! assert_eq!(module.register("status").unwrap().address, 0x1000);
//! assert_eq!(module.register("control").unwrap().address, 0x1010);
//!
//! let vhdl = generate_vhdl(&module, &GeneratorConfig::default());
//! assert!(vhdl.contains("entity sensor_axion_reg is"));
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: definitions (`ModuleDef`) and the resolved model (`Module`)
//! - [`address`]: [`AddressManager`] and the cross-module overlap check
//! - [`bitfield`]: [`BitFieldManager`] for packed registers
//! - [`resolve`](mod@resolve): the resolution pass tying both together
//! - [`config`]: [`ResolveConfig`] and [`GeneratorConfig`]
//! - [`error`]: error taxonomy
//! - [`util`]: address and literal formatting helpers

pub mod address;
pub mod bitfield;
pub mod config;
pub mod error;
pub mod report;
pub mod resolve;
pub mod types;
pub mod util;

mod codegen;

// Re-export main public API
pub use address::{find_cross_module_overlaps, find_overlaps, AddressManager, Allocation};
pub use bitfield::{BitFieldManager, FieldRequest};
pub use codegen::{generate_vhdl, write_vhdl};
pub use config::{ConflictPolicy, GeneratorConfig, ResolveConfig};
pub use error::{
    AddressConflictError, BitOverlapError, CrossModuleConflict, ResolutionError, ValidationError,
};
pub use report::analysis_summary;
pub use resolve::{resolve, resolve_all, resolve_with_config};
pub use types::{
    AccessMode, Diagnostic, Field, FieldPlacement, Module, ModuleDef, PackedRegister, Register,
    RegisterDef, RegisterEntry, Severity, DEFAULT_CDC_STAGES,
};
