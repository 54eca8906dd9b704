// Licensed under the Apache-2.0 license

//! Byte-address allocation within one module's address space.
//!
//! An [`AddressManager`] owns a monotonically advancing cursor and the set
//! of byte intervals already handed out. Manual requests are checked for
//! alignment and overlap; automatic requests take the first free aligned
//! interval at or after the cursor. Earlier allocations never move.

use std::ops::Range;

use serde::Serialize;

use crate::error::{AddressConflictError, CrossModuleConflict, ResolutionError, ValidationError};
use crate::types::Module;
use crate::util::{self, align_up, SLOT_BYTES};

/// One occupied interval `[start, start + size)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub name: String,
    pub start: u64,
    pub size: u64,
}

impl Allocation {
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn range(&self) -> Range<u64> {
        self.start..self.end()
    }

    fn intersects(&self, start: u64, end: u64) -> bool {
        self.start < end && start < self.end()
    }
}

/// Allocator for the registers of one module.
#[derive(Clone, Debug)]
pub struct AddressManager {
    module: String,
    start_address: u64,
    cursor: u64,
    allocations: Vec<Allocation>,
}

impl AddressManager {
    /// Every address handed out is a multiple of this.
    pub const ALIGNMENT: u64 = SLOT_BYTES;

    /// Exclusive upper bound of the relative address space.
    pub const ADDRESS_SPACE: u64 = 1 << 32;

    pub fn new(module: &str) -> Self {
        Self::with_start(module, 0)
    }

    /// Auto-allocation begins at `start` (rounded up to the alignment).
    pub fn with_start(module: &str, start: u64) -> Self {
        let start = align_up(start, Self::ALIGNMENT);
        Self {
            module: module.to_string(),
            start_address: start,
            cursor: start,
            allocations: vec![],
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Forget every allocation and rewind the cursor.
    pub fn reset(&mut self) {
        self.cursor = self.start_address;
        self.allocations.clear();
    }

    /// Reserves `size_bytes` (rounded up to whole slots) for `name`.
    ///
    /// With `manual` set the interval starts exactly there or the call
    /// fails; otherwise the first free aligned interval at or after the
    /// cursor is used.
    pub fn allocate(
        &mut self,
        manual: Option<u64>,
        size_bytes: u64,
        name: &str,
    ) -> Result<u64, ResolutionError> {
        let size = align_up(size_bytes.max(1), Self::ALIGNMENT);
        let start = match manual {
            Some(addr) => {
                self.check_manual(addr, size, name)?;
                addr
            }
            None => self.find_free(size, name)?,
        };

        log::debug!(
            "{}: '{}' -> {} ({} bytes)",
            self.module,
            name,
            Self::format_address(start, 4),
            size
        );
        self.allocations.push(Allocation {
            name: name.to_string(),
            start,
            size,
        });
        self.cursor = self.cursor.max(start + size);
        Ok(start)
    }

    /// Reserves the slots needed by a register of `width` bits.
    pub fn allocate_register(
        &mut self,
        manual: Option<u64>,
        width: u32,
        name: &str,
    ) -> Result<u64, ResolutionError> {
        self.allocate(manual, util::size_bytes(width), name)
    }

    /// Records an interval without any checks. Used by the partial conflict
    /// policy to keep a conflicting register at its requested address.
    pub fn force(&mut self, start: u64, size_bytes: u64, name: &str) {
        let size = align_up(size_bytes.max(1), Self::ALIGNMENT);
        self.allocations.push(Allocation {
            name: name.to_string(),
            start,
            size,
        });
        self.cursor = self.cursor.max(start.saturating_add(size));
    }

    fn check_manual(&self, addr: u64, size: u64, name: &str) -> Result<(), ResolutionError> {
        if addr % Self::ALIGNMENT != 0 {
            return Err(ValidationError::Misaligned {
                module: self.module.clone(),
                name: name.to_string(),
                address: addr,
            }
            .into());
        }
        let end = self.end_in_range(addr, size, name)?;
        if let Some(existing) = self.find_overlap(addr, end) {
            return Err(AddressConflictError {
                module: self.module.clone(),
                address: addr.max(existing.start),
                requested: name.to_string(),
                requested_range: addr..end,
                existing: existing.name.clone(),
                existing_range: existing.range(),
            }
            .into());
        }
        Ok(())
    }

    fn find_free(&self, size: u64, name: &str) -> Result<u64, ResolutionError> {
        let mut addr = align_up(self.cursor, Self::ALIGNMENT);
        loop {
            let end = self.end_in_range(addr, size, name)?;
            match self.find_overlap(addr, end) {
                // Every start below the blocker's end still overlaps it.
                Some(blocker) => addr = align_up(blocker.end(), Self::ALIGNMENT),
                None => return Ok(addr),
            }
        }
    }

    fn end_in_range(&self, addr: u64, size: u64, name: &str) -> Result<u64, ResolutionError> {
        match addr.checked_add(size) {
            Some(end) if end <= Self::ADDRESS_SPACE => Ok(end),
            _ => Err(ValidationError::OutOfRange {
                module: self.module.clone(),
                name: name.to_string(),
                address: addr,
            }
            .into()),
        }
    }

    fn find_overlap(&self, start: u64, end: u64) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.intersects(start, end))
    }

    /// Formats an address as `0x` plus at least `width` uppercase hex digits.
    pub fn format_address(addr: u64, width: usize) -> String {
        util::format_address(addr, width)
    }

    /// Sorted start addresses of every allocation.
    pub fn address_map(&self) -> Vec<u64> {
        let mut starts: Vec<u64> = self.allocations.iter().map(|a| a.start).collect();
        starts.sort_unstable();
        starts
    }

    /// Allocations in the order they were made.
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// The cursor: the lowest address auto-allocation will consider next.
    pub fn next_available(&self) -> u64 {
        self.cursor
    }
}

struct Span<'a> {
    module: &'a str,
    register: &'a str,
    range: Range<u64>,
}

/// Finds every pair of registers whose absolute byte ranges intersect.
///
/// Read-only; runs after each module has been resolved on its own.
/// Pairs inside a single module are reported too, see
/// [`CrossModuleConflict::is_cross_module`].
pub fn find_overlaps(modules: &[Module]) -> Vec<CrossModuleConflict> {
    let mut spans: Vec<Span> = modules
        .iter()
        .flat_map(|m| {
            m.entries.iter().map(move |e| {
                let rel = e.byte_range();
                let base = m.base_address;
                Span {
                    module: &m.name,
                    register: e.name(),
                    range: base.saturating_add(rel.start)..base.saturating_add(rel.end),
                }
            })
        })
        .collect();
    spans.sort_by_key(|s| (s.range.start, s.range.end));

    let mut conflicts = vec![];
    for (i, a) in spans.iter().enumerate() {
        for b in spans[i + 1..]
            .iter()
            .take_while(|b| b.range.start < a.range.end)
        {
            conflicts.push(CrossModuleConflict {
                module_a: a.module.to_string(),
                register_a: a.register.to_string(),
                range_a: a.range.clone(),
                module_b: b.module.to_string(),
                register_b: b.register.to_string(),
                range_b: b.range.clone(),
            });
        }
    }
    conflicts
}

/// Like [`find_overlaps`] but only pairs spanning two different modules.
pub fn find_cross_module_overlaps(modules: &[Module]) -> Vec<CrossModuleConflict> {
    find_overlaps(modules)
        .into_iter()
        .filter(CrossModuleConflict::is_cross_module)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(err: ResolutionError) -> AddressConflictError {
        match err {
            ResolutionError::AddressConflict(e) => e,
            other => panic!("expected address conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_auto_allocation_is_sequential() {
        let mut am = AddressManager::new("m");
        let addrs: Vec<u64> = (0..8)
            .map(|i| am.allocate(None, 4, &format!("r{i}")).unwrap())
            .collect();
        assert_eq!(addrs, vec![0, 4, 8, 12, 16, 20, 24, 28]);
        assert!(addrs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(am.next_available(), 32);
    }

    #[test]
    fn test_gaps_are_preserved() {
        let mut am = AddressManager::new("m");
        assert_eq!(am.allocate(Some(0x10), 4, "a").unwrap(), 0x10);
        assert_eq!(am.allocate(None, 4, "b").unwrap(), 0x14);
        assert_eq!(am.allocate(Some(0x20), 4, "c").unwrap(), 0x20);
        assert_eq!(am.address_map(), vec![0x10, 0x14, 0x20]);
    }

    #[test]
    fn test_wide_register_reserves_slots() {
        let mut am = AddressManager::new("m");
        assert_eq!(am.allocate_register(Some(0), 64, "wide").unwrap(), 0);
        assert_eq!(am.allocate_register(None, 32, "next").unwrap(), 0x08);
    }

    #[test]
    fn test_duplicate_manual_address() {
        let mut am = AddressManager::new("mod_x");
        am.allocate(Some(0x0), 4, "reg_a").unwrap();
        let err = conflict(am.allocate(Some(0x0), 4, "reg_b").unwrap_err());
        assert_eq!(err.address, 0);
        assert_eq!(err.requested, "reg_b");
        assert_eq!(err.existing, "reg_a");
        let msg = err.to_string();
        assert!(msg.contains("Address 0x0000"));
        assert!(msg.contains("reg_a") && msg.contains("reg_b"));
    }

    #[test]
    fn test_wide_overlap_detected() {
        let mut am = AddressManager::new("m");
        am.allocate_register(Some(0), 64, "wide").unwrap();
        let err = conflict(am.allocate_register(Some(4), 32, "narrow").unwrap_err());
        assert_eq!(err.address, 4);
        assert_eq!(err.existing_range, 0..8);
        assert_eq!(err.requested_range, 4..8);
    }

    #[test]
    fn test_manual_above_wide_start_is_overlap() {
        let mut am = AddressManager::new("m");
        am.allocate(Some(0x8), 4, "small").unwrap();
        let err = conflict(am.allocate_register(Some(0x4), 64, "wide").unwrap_err());
        assert_eq!(err.address, 0x8);
    }

    #[test]
    fn test_auto_skips_manual_gap() {
        let mut am = AddressManager::new("m");
        am.allocate(Some(0x4), 4, "fixed").unwrap();
        // Cursor is past 0x4 now, so auto never goes back to 0x0.
        assert_eq!(am.allocate(None, 4, "auto").unwrap(), 0x8);
    }

    #[test]
    fn test_auto_probes_past_later_manual() {
        let mut am = AddressManager::with_start("m", 0x0);
        am.allocate(Some(0x0), 4, "a").unwrap();
        am.force(0x4, 8, "blocker");
        am.cursor = 0x4;
        assert_eq!(am.allocate(None, 4, "b").unwrap(), 0xC);
    }

    #[test]
    fn test_misaligned_manual() {
        let mut am = AddressManager::new("m");
        let err = am.allocate(Some(0x6), 4, "odd").unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::Validation(ValidationError::Misaligned { address: 0x6, .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let mut am = AddressManager::new("m");
        let err = am.allocate(Some(0xFFFF_FFFC), 8, "big").unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(am.allocate(Some(0xFFFF_FFFC), 4, "last").unwrap(), 0xFFFF_FFFC);
        assert!(am.allocate(None, 4, "none_left").is_err());
    }

    #[test]
    fn test_start_address_and_reset() {
        let mut am = AddressManager::with_start("m", 0x101);
        assert_eq!(am.next_available(), 0x104);
        assert_eq!(am.allocate(None, 4, "a").unwrap(), 0x104);
        am.reset();
        assert!(am.allocations().is_empty());
        assert_eq!(am.allocate(None, 4, "a").unwrap(), 0x104);
    }

    #[test]
    fn test_format_address() {
        assert_eq!(AddressManager::format_address(0x4, 2), "0x04");
        assert_eq!(AddressManager::format_address(0x1000, 2), "0x1000");
    }
}
