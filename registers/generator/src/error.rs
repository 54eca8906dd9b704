// Licensed under the Apache-2.0 license

use std::ops::Range;

use thiserror::Error;

use crate::util::{boxed, format_address, format_range};

/// Two registers of one module claim overlapping byte ranges.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "Address Conflict: Address {} in module '{module}' is claimed by '{requested}' ({}) and '{existing}' ({})",
    format_address(*.address, 4),
    format_range(.requested_range.start, .requested_range.end),
    format_range(.existing_range.start, .existing_range.end)
)]
pub struct AddressConflictError {
    pub module: String,
    /// First byte claimed by both registers.
    pub address: u64,
    pub requested: String,
    pub requested_range: Range<u64>,
    pub existing: String,
    pub existing_range: Range<u64>,
}

impl AddressConflictError {
    /// Multi-line framed rendering for terminal reports.
    pub fn formatted_message(&self) -> String {
        boxed(
            "ADDRESS CONFLICT",
            &[
                format!("Module:    {}", self.module),
                format!("Address:   {}", format_address(self.address, 4)),
                format!(
                    "Register:  {} ({})",
                    self.requested,
                    format_range(self.requested_range.start, self.requested_range.end)
                ),
                format!(
                    "Conflicts: {} ({})",
                    self.existing,
                    format_range(self.existing_range.start, self.existing_range.end)
                ),
            ],
        )
    }
}

/// Two fields of one packed register share at least one bit.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "Bit field overlap in '{module}.{register}': '{field}' and '{existing_field}' both use bits [{overlap_high}:{overlap_low}]"
)]
pub struct BitOverlapError {
    pub module: String,
    pub register: String,
    pub field: String,
    pub existing_field: String,
    pub overlap_low: u32,
    pub overlap_high: u32,
}

impl BitOverlapError {
    pub fn formatted_message(&self) -> String {
        boxed(
            "BIT FIELD OVERLAP",
            &[
                format!("Module:    {}", self.module),
                format!("Register:  {}", self.register),
                format!("Field:     {}", self.field),
                format!("Conflicts: {}", self.existing_field),
                format!("Bits:      [{}:{}]", self.overlap_high, self.overlap_low),
            ],
        )
    }
}

/// Registers of two different modules overlap in the absolute address space.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "Address Conflict across modules: '{module_a}.{register_a}' ({}) overlaps '{module_b}.{register_b}' ({})",
    format_range(.range_a.start, .range_a.end),
    format_range(.range_b.start, .range_b.end)
)]
pub struct CrossModuleConflict {
    pub module_a: String,
    pub register_a: String,
    /// Absolute byte range.
    pub range_a: Range<u64>,
    pub module_b: String,
    pub register_b: String,
    pub range_b: Range<u64>,
}

impl CrossModuleConflict {
    pub fn is_cross_module(&self) -> bool {
        self.module_a != self.module_b
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid access mode '{0}' (expected RO, RW or WO)")]
    InvalidAccessMode(String),
    #[error("Register '{name}' in module '{module}' has invalid width {width}")]
    InvalidWidth {
        module: String,
        name: String,
        width: u32,
    },
    #[error(
        "Address {} of '{name}' in module '{module}' is not 4-byte aligned",
        format_address(*.address, 4)
    )]
    Misaligned {
        module: String,
        name: String,
        address: u64,
    },
    #[error(
        "Register '{name}' in module '{module}' at {} does not fit in the 32-bit address space",
        format_address(*.address, 4)
    )]
    OutOfRange {
        module: String,
        name: String,
        address: u64,
    },
    #[error("Module '{module}' declares '{name}' more than once")]
    DuplicateName { module: String, name: String },
    #[error(
        "Packed register '{reg_name}' in module '{module}' has fields at different addresses ({} and {})",
        format_address(*.first, 4),
        format_address(*.second, 4)
    )]
    PackedAddressMismatch {
        module: String,
        reg_name: String,
        first: u64,
        second: u64,
    },
    #[error("Packed register '{reg_name}' in module '{module}' uses {used_bits} bits (limit 32)")]
    PackedRegisterTooWide {
        module: String,
        reg_name: String,
        used_bits: u32,
    },
    #[error("Module '{module}' requests {stages} CDC stages (at least 1 required)")]
    InvalidCdcStages { module: String, stages: u32 },
    #[error("'{0}' is not a valid VHDL identifier")]
    InvalidIdentifier(String),
}

/// Every failure the resolution pass can raise.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    AddressConflict(#[from] AddressConflictError),
    #[error(transparent)]
    BitOverlap(#[from] BitOverlapError),
    #[error(transparent)]
    CrossModule(#[from] CrossModuleConflict),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ResolutionError {
    /// Framed report for conflicts, plain message for validation errors.
    pub fn formatted_message(&self) -> Option<String> {
        match self {
            ResolutionError::AddressConflict(e) => Some(e.formatted_message()),
            ResolutionError::BitOverlap(e) => Some(e.formatted_message()),
            ResolutionError::CrossModule(_) | ResolutionError::Validation(_) => None,
        }
    }
}
