//! Free-slot allocation inside a directory's block chain.
//!
//! Policy: scan the direct array left to right and claim the first free
//! slot; only when the direct array is full does allocation fall back to
//! the single indirect block. Holes left by deletion are reused before the
//! chain grows. Exhaustion of both levels is `NoSpace`, reported to the
//! caller, and is decided before any backend write so a failed allocation
//! leaves the directory untouched.

use crate::dir::EntrySlot;

/// Location of one entry slot within a directory's chain, used both by the
/// allocator (where to place a new entry) and the resolver (where an
/// existing entry was found).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotRef {
    Direct(usize),
    Indirect(usize),
}

/// First free slot in a slot array, or `None` when it is full.
pub fn first_free(slots: &[EntrySlot]) -> Option<usize> {
    slots.iter().position(|slot| slot.is_free())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::{DirBlock, IndirectBlock};
    use crate::store::Record;
    use crate::id::ObjectId;
    use crate::{DIRECT_SLOTS, INDIRECT_SLOTS};

    #[test]
    fn empty_block_allocates_first_slot() {
        let block = DirBlock::zeroed();
        assert_eq!(first_free(&block.direct), Some(0));
    }

    #[test]
    fn holes_are_reused_before_growing() {
        let mut block = DirBlock::zeroed();
        for i in 0..4 {
            block.direct[i].occupy(ObjectId::generate(), &format!("f{}", i));
        }
        block.direct[2].clear();
        assert_eq!(first_free(&block.direct), Some(2));
    }

    #[test]
    fn full_direct_array_reports_none() {
        let mut block = DirBlock::zeroed();
        for i in 0..DIRECT_SLOTS {
            block.direct[i].occupy(ObjectId::generate(), &format!("f{}", i));
        }
        assert_eq!(first_free(&block.direct), None);
    }

    #[test]
    fn indirect_block_scans_the_same_way() {
        let mut indirect = IndirectBlock::zeroed();
        for i in 0..INDIRECT_SLOTS {
            indirect.slots[i].occupy(ObjectId::generate(), &format!("g{}", i));
        }
        assert_eq!(first_free(&indirect.slots), None);

        indirect.slots[INDIRECT_SLOTS - 1].clear();
        assert_eq!(first_free(&indirect.slots), Some(INDIRECT_SLOTS - 1));
    }
}
