// Licensed under the Apache-2.0 license

//! The resolution pass: [`ModuleDef`] in, [`Module`] out.
//!
//! Pass 1 walks the declared registers in source order, validates them and
//! collects packed-register fields into a [`BitFieldManager`]. Pass 2 hands
//! every standalone register and every packed group to the module's
//! [`AddressManager`], again in source order; a packed group is placed at the
//! position of its first field.

use std::collections::HashSet;

use crate::address::{find_overlaps, AddressManager};
use crate::bitfield::{BitFieldManager, FieldRequest};
use crate::config::ResolveConfig;
use crate::error::{ResolutionError, ValidationError};
use crate::types::{Diagnostic, Module, ModuleDef, Register, RegisterDef, RegisterEntry};
use crate::util::{self, is_vhdl_identifier, truncate, SLOT_BITS};

/// Resolves one module with the strict policy.
pub fn resolve(def: &ModuleDef) -> Result<Module, ResolutionError> {
    resolve_with_config(def, &ResolveConfig::default())
}

/// Resolves one module. Under [`ConflictPolicy::Partial`] every error is
/// recorded in `Module::parsing_errors` and the call only fails if the
/// policy is strict.
///
/// [`ConflictPolicy::Partial`]: crate::config::ConflictPolicy::Partial
pub fn resolve_with_config(
    def: &ModuleDef,
    config: &ResolveConfig,
) -> Result<Module, ResolutionError> {
    let mut resolver = Resolver {
        def,
        config,
        errors: def.parsing_errors.clone(),
        notes: vec![],
    };
    let entries = resolver.run()?;
    log::debug!(
        "resolved module '{}': {} entries, {} errors",
        def.name,
        entries.len(),
        resolver.errors.len()
    );
    Ok(Module {
        name: def.name.clone(),
        base_address: def.base_address,
        cdc_enabled: def.cdc_enabled,
        cdc_stages: def.cdc_stages,
        entries,
        source: def.source.clone(),
        parsing_errors: resolver.errors,
        diagnostics: resolver.notes,
    })
}

/// Resolves every module, then checks the absolute address space for
/// overlaps between modules.
///
/// Strict: the first error of any kind is returned. Partial: cross-module
/// conflicts are recorded on both modules involved.
pub fn resolve_all(
    defs: &[ModuleDef],
    config: &ResolveConfig,
) -> Result<Vec<Module>, ResolutionError> {
    let mut modules = defs
        .iter()
        .map(|d| resolve_with_config(d, config))
        .collect::<Result<Vec<_>, _>>()?;

    for conflict in find_overlaps(&modules) {
        if !conflict.is_cross_module() {
            continue;
        }
        let err = ResolutionError::from(conflict.clone());
        if config.is_strict() {
            return Err(err);
        }
        log::warn!("{err}");
        for m in modules.iter_mut() {
            if m.name == conflict.module_a || m.name == conflict.module_b {
                m.parsing_errors.push(Diagnostic::from(&err));
            }
        }
    }
    Ok(modules)
}

enum Slot<'a> {
    Single(&'a RegisterDef),
    Packed(&'a str),
}

struct Resolver<'a> {
    def: &'a ModuleDef,
    config: &'a ResolveConfig,
    errors: Vec<Diagnostic>,
    notes: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    /// Strict: hand the error back. Partial: keep it and carry on.
    fn record(&mut self, err: impl Into<ResolutionError>) -> Result<(), ResolutionError> {
        let err = err.into();
        if self.config.is_strict() {
            return Err(err);
        }
        log::warn!("{err}");
        self.errors.push(Diagnostic::from(&err));
        Ok(())
    }

    fn run(&mut self) -> Result<Vec<RegisterEntry>, ResolutionError> {
        if !self.check_module()? {
            // No absolute address can be formed; the errors are all we keep.
            return Ok(vec![]);
        }
        let mut bitfields = BitFieldManager::new(&self.def.name);
        let slots = self.collect(&mut bitfields)?;
        self.allocate(&slots, &bitfields)
    }

    /// Returns false when the base address leaves the address space.
    fn check_module(&mut self) -> Result<bool, ResolutionError> {
        let def = self.def;
        if !is_vhdl_identifier(&def.name) {
            self.record(ValidationError::InvalidIdentifier(def.name.clone()))?;
        }
        if def.cdc_enabled && def.cdc_stages == 0 {
            self.record(ValidationError::InvalidCdcStages {
                module: def.name.clone(),
                stages: def.cdc_stages,
            })?;
        }
        if def.base_address % AddressManager::ALIGNMENT != 0 {
            self.record(ValidationError::Misaligned {
                module: def.name.clone(),
                name: "BASE_ADDR".to_string(),
                address: def.base_address,
            })?;
        }
        if def.base_address >= AddressManager::ADDRESS_SPACE {
            self.record(ValidationError::OutOfRange {
                module: def.name.clone(),
                name: "BASE_ADDR".to_string(),
                address: def.base_address,
            })?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Pass 1: validate declarations and gather packed fields.
    fn collect(&mut self, bitfields: &mut BitFieldManager) -> Result<Vec<Slot<'a>>, ResolutionError> {
        let def = self.def;
        let mut slots = vec![];
        let mut seen = HashSet::new();

        for reg in &def.registers {
            if !is_vhdl_identifier(&reg.signal_name) {
                self.record(ValidationError::InvalidIdentifier(reg.signal_name.clone()))?;
                continue;
            }
            if reg.width == 0 {
                self.record(ValidationError::InvalidWidth {
                    module: def.name.clone(),
                    name: reg.signal_name.clone(),
                    width: reg.width,
                })?;
                continue;
            }
            if !seen.insert(reg.signal_name.as_str()) {
                self.record(ValidationError::DuplicateName {
                    module: def.name.clone(),
                    name: reg.signal_name.clone(),
                })?;
                continue;
            }

            let Some(placement) = &reg.placement else {
                slots.push(Slot::Single(reg));
                continue;
            };
            let first_field = !bitfields.contains(&placement.reg_name);
            let request = FieldRequest {
                name: reg.signal_name.clone(),
                width: reg.width,
                access_mode: reg.access_mode,
                type_repr: String::new(),
                bit_offset: placement.bit_offset,
                default_value: reg.default_value,
                description: reg.description.clone(),
                read_strobe: reg.read_strobe,
                write_strobe: reg.write_strobe,
            };
            let added = bitfields
                .add_field(&placement.reg_name, reg.address, request)
                .map(|_| ());
            match added {
                Ok(()) if first_field => slots.push(Slot::Packed(&placement.reg_name)),
                Ok(()) => {}
                Err(err) => {
                    self.record(err)?;
                    if first_field && bitfields.contains(&placement.reg_name) {
                        slots.push(Slot::Packed(&placement.reg_name));
                    }
                }
            }
        }

        // A packed register's storage and strobes are named after it, so it
        // must not collide with a standalone signal or a field.
        let mut rejected = HashSet::new();
        let packed: Vec<&str> = bitfields.register_names().collect();
        for name in packed {
            if seen.contains(name) {
                rejected.insert(name);
                self.record(ValidationError::DuplicateName {
                    module: def.name.clone(),
                    name: name.to_string(),
                })?;
            } else if !is_vhdl_identifier(name) {
                rejected.insert(name);
                self.record(ValidationError::InvalidIdentifier(name.to_string()))?;
            }
        }
        self.check_generated_names(&slots, bitfields, &rejected)?;
        Ok(slots)
    }

    /// Every port, storage word, synchronizer stage and strobe the generator
    /// declares must be unique within the entity. VHDL identifiers are
    /// case-insensitive.
    fn check_generated_names(
        &mut self,
        slots: &[Slot<'a>],
        bitfields: &BitFieldManager,
        rejected: &HashSet<&str>,
    ) -> Result<(), ResolutionError> {
        let def = self.def;
        let stages = if def.cdc_enabled { def.cdc_stages } else { 0 };
        let mut names = vec![];
        for slot in slots {
            match slot {
                Slot::Single(reg) => {
                    let strobes = (reg.read_strobe, reg.write_strobe);
                    names.extend(storage_names(&reg.signal_name, strobes));
                    names.extend(port_names(&reg.signal_name, stages));
                }
                Slot::Packed(reg_name) if !rejected.contains(*reg_name) => {
                    let Some(packed) = bitfields.get_register(reg_name) else {
                        continue;
                    };
                    let strobes = (packed.read_strobe(), packed.write_strobe());
                    names.extend(storage_names(reg_name, strobes));
                    for field in &packed.fields {
                        names.extend(port_names(&field.name, stages));
                    }
                }
                Slot::Packed(_) => {}
            }
        }

        let mut declared = HashSet::new();
        for name in names {
            if !declared.insert(name.to_ascii_lowercase()) {
                self.record(ValidationError::DuplicateName {
                    module: def.name.clone(),
                    name,
                })?;
            }
        }
        Ok(())
    }

    /// Pass 2: place every slot in source order.
    fn allocate(
        &mut self,
        slots: &[Slot<'a>],
        bitfields: &BitFieldManager,
    ) -> Result<Vec<RegisterEntry>, ResolutionError> {
        let def = self.def;
        let mut addresses = AddressManager::with_start(&def.name, self.config.start_address);
        let mut entries = vec![];

        for slot in slots {
            match slot {
                Slot::Single(reg) => {
                    let size = util::size_bytes(reg.width);
                    if reg.width > SLOT_BITS {
                        let note = format!(
                            "'{}.{}' is {} bits wide and spans {} AXI slots",
                            def.name,
                            reg.signal_name,
                            reg.width,
                            util::slot_count(reg.width)
                        );
                        log::info!("{note}");
                        self.notes.push(Diagnostic::info(note));
                    }
                    let Some(rel) = self.place(&mut addresses, reg.address, size, &reg.signal_name)?
                    else {
                        continue;
                    };
                    entries.push(RegisterEntry::Single(Register {
                        signal_name: reg.signal_name.clone(),
                        width: reg.width,
                        access_mode: reg.access_mode,
                        relative_address: rel,
                        address: def.base_address + rel,
                        read_strobe: reg.read_strobe,
                        write_strobe: reg.write_strobe,
                        default_value: truncate(reg.default_value, reg.width),
                        description: reg.description.clone(),
                    }));
                }
                Slot::Packed(reg_name) => {
                    let Some(mut packed) = bitfields.get_register(reg_name) else {
                        continue;
                    };
                    if packed.used_bits > SLOT_BITS {
                        self.record(ValidationError::PackedRegisterTooWide {
                            module: def.name.clone(),
                            reg_name: reg_name.to_string(),
                            used_bits: packed.used_bits,
                        })?;
                    }
                    let manual = bitfields.requested_address(reg_name);
                    let Some(rel) =
                        self.place(&mut addresses, manual, packed.size_bytes(), reg_name)?
                    else {
                        continue;
                    };
                    packed.relative_address = rel;
                    packed.address = def.base_address + rel;
                    entries.push(RegisterEntry::Packed(packed));
                }
            }
        }
        Ok(entries)
    }

    fn place(
        &mut self,
        addresses: &mut AddressManager,
        manual: Option<u64>,
        size: u64,
        name: &str,
    ) -> Result<Option<u64>, ResolutionError> {
        match addresses.allocate(manual, size, name) {
            Ok(addr) => Ok(Some(addr)),
            Err(err) => {
                let overlap = matches!(err, ResolutionError::AddressConflict(_));
                self.record(err)?;
                // Partial policy: an overlapping register stays where it was
                // asked to be. A misaligned or out-of-range one is dropped.
                Ok(manual
                    .filter(|_| overlap)
                    .inspect(|&addr| addresses.force(addr, size, name)))
            }
        }
    }
}

/// `<name>_reg` plus whichever strobes are enabled.
fn storage_names(name: &str, (read_strobe, write_strobe): (bool, bool)) -> Vec<String> {
    let mut names = vec![format!("{name}_reg")];
    if read_strobe {
        names.push(format!("{name}_rd_strobe"));
    }
    if write_strobe {
        names.push(format!("{name}_wr_strobe"));
    }
    names
}

/// The port itself and its synchronizer stages.
fn port_names(name: &str, stages: u32) -> Vec<String> {
    std::iter::once(name.to_string())
        .chain((0..stages).map(|n| format!("{name}_sync{n}")))
        .collect()
}
