// Licensed under the Apache-2.0 license

//! Configuration for address resolution and VHDL generation.
//!
//! This module provides [`ResolveConfig`] which controls how the resolution
//! pass reacts to conflicts, and [`GeneratorConfig`] which controls the
//! naming and optional decorations of the generated RTL.

use serde::Serialize;

/// How the resolution pass reacts to address conflicts and bit overlaps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The first conflict aborts resolution of the module.
    #[default]
    Strict,
    /// Conflicts are recorded in `Module::parsing_errors` and resolution
    /// continues. The conflicting register keeps its requested address.
    Partial,
}

/// Configuration for the resolution pass.
///
/// # Example
///
/// ```
/// use axion_registers_generator::config::{ConflictPolicy, ResolveConfig};
///
/// let config = ResolveConfig::new().partial().start_address(0x100);
/// assert_eq!(config.policy, ConflictPolicy::Partial);
/// assert_eq!(config.start_address, 0x100);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveConfig {
    pub policy: ConflictPolicy,

    /// First relative address handed out by auto-allocation.
    /// Rounded up to a multiple of 4.
    pub start_address: u64,
}

impl ResolveConfig {
    /// Strict policy, auto-allocation starting at offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record conflicts instead of failing.
    pub fn partial(mut self) -> Self {
        self.policy = ConflictPolicy::Partial;
        self
    }

    pub fn policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn start_address(mut self, start: u64) -> Self {
        self.start_address = start;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.policy == ConflictPolicy::Strict
    }
}

/// Configuration for the VHDL generator.
///
/// # Example
///
/// ```
/// use axion_registers_generator::config::GeneratorConfig;
///
/// let config = GeneratorConfig::new().entity_suffix("_regs").header(false);
/// assert_eq!(config.entity_name("uart"), "uart_regs");
/// assert!(!config.emit_header_comment);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Appended to the module name to form the entity and file name.
    pub entity_suffix: String,

    /// Emit the banner comment with the register table.
    pub emit_header_comment: bool,

    /// Tag synchronizer flip-flops with `ASYNC_REG = "TRUE"`.
    pub cdc_async_reg_attribute: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            entity_suffix: "_axion_reg".to_string(),
            emit_header_comment: true,
            cdc_async_reg_attribute: true,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_suffix(mut self, suffix: &str) -> Self {
        self.entity_suffix = suffix.to_string();
        self
    }

    pub fn header(mut self, emit: bool) -> Self {
        self.emit_header_comment = emit;
        self
    }

    pub fn async_reg(mut self, emit: bool) -> Self {
        self.cdc_async_reg_attribute = emit;
        self
    }

    /// Entity name for a module, e.g. `sensor` -> `sensor_axion_reg`.
    pub fn entity_name(&self, module: &str) -> String {
        format!("{module}{}", self.entity_suffix)
    }

    /// Output file name for a module.
    pub fn file_name(&self, module: &str) -> String {
        format!("{}.vhd", self.entity_name(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_config_defaults() {
        let config = ResolveConfig::new();
        assert!(config.is_strict());
        assert_eq!(config.start_address, 0);
    }

    #[test]
    fn test_resolve_config_builder() {
        let config = ResolveConfig::new()
            .policy(ConflictPolicy::Partial)
            .start_address(0x40);
        assert!(!config.is_strict());
        assert_eq!(config.start_address, 0x40);
    }

    #[test]
    fn test_generator_config_defaults() {
        let config = GeneratorConfig::new();
        assert_eq!(config.entity_name("sensor"), "sensor_axion_reg");
        assert_eq!(config.file_name("sensor"), "sensor_axion_reg.vhd");
        assert!(config.emit_header_comment);
        assert!(config.cdc_async_reg_attribute);
    }

    #[test]
    fn test_generator_config_builder() {
        let config = GeneratorConfig::new().async_reg(false).header(false);
        assert!(!config.cdc_async_reg_attribute);
        assert!(!config.emit_header_comment);
    }
}
