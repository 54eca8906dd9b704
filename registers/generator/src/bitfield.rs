// Licensed under the Apache-2.0 license

//! Packing of narrow fields into shared 32-bit registers.

use crate::error::{BitOverlapError, ResolutionError, ValidationError};
use crate::types::{AccessMode, Field, PackedRegister};
use crate::util::truncate;

/// One field to be placed by [`BitFieldManager::add_field`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRequest {
    pub name: String,
    pub width: u32,
    pub access_mode: AccessMode,
    /// Declared type text; derived from `width` when empty.
    pub type_repr: String,
    /// Explicit low bit; `None` appends after the highest used bit.
    pub bit_offset: Option<u32>,
    pub default_value: u64,
    pub description: String,
    pub read_strobe: bool,
    pub write_strobe: bool,
}

impl FieldRequest {
    pub fn new(name: &str, width: u32, access_mode: AccessMode) -> Self {
        Self {
            name: name.to_string(),
            width,
            access_mode,
            type_repr: String::new(),
            bit_offset: None,
            default_value: 0,
            description: String::new(),
            read_strobe: false,
            write_strobe: false,
        }
    }

    pub fn at_bit(mut self, bit_offset: u32) -> Self {
        self.bit_offset = Some(bit_offset);
        self
    }

    pub fn with_default(mut self, value: u64) -> Self {
        self.default_value = value;
        self
    }
}

fn default_type_repr(width: u32) -> String {
    if width == 1 {
        "std_logic".to_string()
    } else {
        format!("std_logic_vector({} downto 0)", width - 1)
    }
}

#[derive(Clone, Debug)]
struct Group {
    reg_name: String,
    address: Option<u64>,
    fields: Vec<Field>,
}

impl Group {
    fn used_bits(&self) -> u32 {
        self.fields
            .iter()
            .map(|f| f.bit_high.saturating_add(1))
            .max()
            .unwrap_or(0)
    }
}

/// Collects fields per packed register and checks bit-level disjointness.
#[derive(Clone, Debug)]
pub struct BitFieldManager {
    module: String,
    groups: Vec<Group>,
}

impl BitFieldManager {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            groups: vec![],
        }
    }

    /// Adds a field to `reg_name`, creating the group on first use.
    ///
    /// The group's address is the first `Some` seen; a later field that
    /// names a different address is a validation error.
    pub fn add_field(
        &mut self,
        reg_name: &str,
        address: Option<u64>,
        request: FieldRequest,
    ) -> Result<&Field, ResolutionError> {
        if request.width == 0 {
            return Err(ValidationError::InvalidWidth {
                module: self.module.clone(),
                name: request.name,
                width: 0,
            }
            .into());
        }

        let module = self.module.clone();
        let idx = match self.groups.iter().position(|g| g.reg_name == reg_name) {
            Some(idx) => idx,
            None => {
                self.groups.push(Group {
                    reg_name: reg_name.to_string(),
                    address: None,
                    fields: vec![],
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[idx];

        if let (Some(first), Some(second)) = (group.address, address) {
            if first != second {
                return Err(ValidationError::PackedAddressMismatch {
                    module,
                    reg_name: reg_name.to_string(),
                    first,
                    second,
                }
                .into());
            }
        }

        let bit_low = request.bit_offset.unwrap_or_else(|| group.used_bits());
        let bit_high = bit_low.saturating_add(request.width - 1);
        if let Some(existing) = group.fields.iter().find(|f| f.overlaps(bit_low, bit_high)) {
            return Err(BitOverlapError {
                module,
                register: reg_name.to_string(),
                field: request.name,
                existing_field: existing.name.clone(),
                overlap_low: bit_low.max(existing.bit_low),
                overlap_high: bit_high.min(existing.bit_high),
            }
            .into());
        }

        // Only an accepted field may pin the group's address.
        group.address = group.address.or(address);

        let signal_type = if request.type_repr.is_empty() {
            default_type_repr(request.width)
        } else {
            request.type_repr
        };
        log::trace!(
            "{}.{}: field '{}' at [{}:{}]",
            self.module,
            reg_name,
            request.name,
            bit_high,
            bit_low
        );
        group.fields.push(Field {
            name: request.name,
            bit_low,
            bit_high,
            access_mode: request.access_mode,
            signal_type,
            default_value: truncate(request.default_value, request.width),
            description: request.description,
            read_strobe: request.read_strobe,
            write_strobe: request.write_strobe,
        });
        Ok(&group.fields[group.fields.len() - 1])
    }

    /// Materializes a packed register at relative address 0. The caller
    /// places it with [`PackedRegister::relative_address`] / `address`.
    pub fn get_register(&self, reg_name: &str) -> Option<PackedRegister> {
        let group = self.groups.iter().find(|g| g.reg_name == reg_name)?;
        let default_value = group
            .fields
            .iter()
            .fold(0u64, |acc, f| acc | f.positioned_default());
        let rel = group.address.unwrap_or(0);
        Some(PackedRegister {
            reg_name: group.reg_name.clone(),
            relative_address: rel,
            address: rel,
            fields: group.fields.clone(),
            used_bits: group.used_bits(),
            default_value,
        })
    }

    /// Address requested by any field of `reg_name`.
    pub fn requested_address(&self, reg_name: &str) -> Option<u64> {
        self.groups
            .iter()
            .find(|g| g.reg_name == reg_name)
            .and_then(|g| g.address)
    }

    /// Packed register names in first-seen order.
    pub fn register_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.reg_name.as_str())
    }

    pub fn contains(&self, reg_name: &str) -> bool {
        self.groups.iter().any(|g| g.reg_name == reg_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_overlap() {
        let mut bfm = BitFieldManager::new("m");
        bfm.add_field("ctrl", Some(0), FieldRequest::new("a", 8, AccessMode::ReadWrite).at_bit(0))
            .unwrap();
        let err = bfm
            .add_field("ctrl", Some(0), FieldRequest::new("b", 8, AccessMode::ReadWrite).at_bit(4))
            .unwrap_err();
        match err {
            ResolutionError::BitOverlap(e) => {
                assert_eq!(e.field, "b");
                assert_eq!(e.existing_field, "a");
                assert_eq!((e.overlap_low, e.overlap_high), (4, 7));
                assert!(e.to_string().contains("overlap"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rejected_field_leaves_address_unset() {
        let mut bfm = BitFieldManager::new("m");
        bfm.add_field("ctrl", None, FieldRequest::new("a", 8, AccessMode::ReadWrite).at_bit(0))
            .unwrap();
        bfm.add_field("ctrl", Some(0x40), FieldRequest::new("b", 8, AccessMode::ReadWrite).at_bit(4))
            .unwrap_err();
        assert_eq!(bfm.requested_address("ctrl"), None);
        assert_eq!(bfm.get_register("ctrl").unwrap().fields.len(), 1);

        bfm.add_field("ctrl", Some(0x20), FieldRequest::new("c", 4, AccessMode::ReadWrite))
            .unwrap();
        assert_eq!(bfm.requested_address("ctrl"), Some(0x20));
    }

    #[test]
    fn test_auto_packing_is_contiguous() {
        let mut bfm = BitFieldManager::new("m");
        let lows: Vec<u32> = [("a", 1), ("b", 2), ("c", 8)]
            .iter()
            .map(|(n, w)| {
                bfm.add_field("ctrl", None, FieldRequest::new(n, *w, AccessMode::ReadWrite))
                    .unwrap()
                    .bit_low
            })
            .collect();
        assert_eq!(lows, vec![0, 1, 3]);
        assert_eq!(bfm.get_register("ctrl").unwrap().used_bits, 11);
    }

    #[test]
    fn test_auto_after_explicit_gap() {
        let mut bfm = BitFieldManager::new("m");
        bfm.add_field("r", None, FieldRequest::new("hi", 4, AccessMode::ReadOnly).at_bit(8))
            .unwrap();
        let f = bfm
            .add_field("r", None, FieldRequest::new("next", 2, AccessMode::ReadOnly))
            .unwrap();
        assert_eq!((f.bit_low, f.bit_high), (12, 13));
        // An explicit offset may still fill the gap.
        let f = bfm
            .add_field("r", None, FieldRequest::new("low", 8, AccessMode::ReadOnly).at_bit(0))
            .unwrap();
        assert_eq!(f.bit_low, 0);
    }

    #[test]
    fn test_packed_default_value() {
        let mut bfm = BitFieldManager::new("m");
        for (name, off, w, d) in [("a", 0, 1, 1), ("b", 1, 2, 2), ("c", 3, 8, 10)] {
            bfm.add_field(
                "cfg",
                None,
                FieldRequest::new(name, w, AccessMode::ReadWrite)
                    .at_bit(off)
                    .with_default(d),
            )
            .unwrap();
        }
        let reg = bfm.get_register("cfg").unwrap();
        assert_eq!(reg.default_value, 85);
        assert_eq!(reg.fields[2].mask(), 0xFF << 3);
    }

    #[test]
    fn test_field_default_truncated() {
        let mut bfm = BitFieldManager::new("m");
        let f = bfm
            .add_field("r", None, FieldRequest::new("a", 2, AccessMode::ReadWrite).with_default(7))
            .unwrap();
        assert_eq!(f.default_value, 3);
    }

    #[test]
    fn test_address_mismatch() {
        let mut bfm = BitFieldManager::new("m");
        bfm.add_field("r", Some(0x10), FieldRequest::new("a", 1, AccessMode::ReadWrite))
            .unwrap();
        bfm.add_field("r", None, FieldRequest::new("b", 1, AccessMode::ReadWrite))
            .unwrap();
        assert_eq!(bfm.requested_address("r"), Some(0x10));
        let err = bfm
            .add_field("r", Some(0x14), FieldRequest::new("c", 1, AccessMode::ReadWrite))
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::Validation(ValidationError::PackedAddressMismatch { .. })
        ));
    }

    #[test]
    fn test_type_repr_defaults() {
        let mut bfm = BitFieldManager::new("m");
        let f = bfm
            .add_field("r", None, FieldRequest::new("bit", 1, AccessMode::ReadOnly))
            .unwrap();
        assert_eq!(f.signal_type, "std_logic");
        let f = bfm
            .add_field("r", None, FieldRequest::new("vec", 4, AccessMode::ReadOnly))
            .unwrap();
        assert_eq!(f.signal_type, "std_logic_vector(3 downto 0)");
    }

    #[test]
    fn test_zero_width_rejected() {
        let mut bfm = BitFieldManager::new("m");
        assert!(bfm
            .add_field("r", None, FieldRequest::new("z", 0, AccessMode::ReadOnly))
            .is_err());
        assert!(!bfm.contains("r"));
    }

    #[test]
    fn test_register_names_order() {
        let mut bfm = BitFieldManager::new("m");
        for reg in ["z", "a", "z"] {
            bfm.add_field(reg, None, FieldRequest::new(&format!("{reg}_f"), 1, AccessMode::ReadWrite))
                .ok();
        }
        assert_eq!(bfm.register_names().collect::<Vec<_>>(), vec!["z", "a"]);
        assert!(bfm.get_register("missing").is_none());
    }
}
