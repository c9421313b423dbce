//! Directory block layout.
//!
//! A directory inode points (via its `data` identifier) to exactly one
//! [`DirBlock`]: a fixed array of entry slots plus a pointer to a single
//! [`IndirectBlock`] extension once the direct array is exhausted. Entries
//! hold the child's name and inode identifier inline, so a lookup costs one
//! block fetch per level instead of one fetch per entry.
//!
//! Slots are not compacted after deletion; readers tolerate holes and the
//! `count` field tracks occupancy across the whole chain.

use zerocopy::{AsBytes, FromBytes};

use crate::id::ObjectId;
use crate::store::Record;
use crate::{DIRECT_SLOTS, INDIRECT_SLOTS, NAME_LIMIT};

/// One name/identifier pair inside a directory block. A slot with the nil
/// identifier is free.
#[repr(C)]
#[derive(AsBytes, FromBytes, Copy, Clone)]
pub struct EntrySlot {
    pub id: ObjectId,
    /// Entry name, NUL-padded. Valid names are shorter than `NAME_LIMIT`,
    /// so the terminator always fits.
    name: [u8; NAME_LIMIT],
}

impl EntrySlot {
    pub fn is_free(&self) -> bool {
        self.id.is_nil()
    }

    /// Claims the slot for a child. The caller has validated the name.
    pub fn occupy(&mut self, id: ObjectId, name: &str) {
        debug_assert!(!name.is_empty() && name.len() < NAME_LIMIT);
        self.id = id;
        self.name = [0; NAME_LIMIT];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
    }

    pub fn clear(&mut self) {
        self.id = ObjectId::NIL;
        self.name = [0; NAME_LIMIT];
    }

    /// The stored name bytes, without NUL padding.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LIMIT);
        &self.name[..end]
    }

    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }
}

/// Exact byte comparison; no normalization, names are case-sensitive.
pub fn find_entry(slots: &[EntrySlot], name: &str) -> Option<(usize, ObjectId)> {
    slots.iter().enumerate().find_map(|(i, slot)| {
        if !slot.is_free() && slot.name_bytes() == name.as_bytes() {
            Some((i, slot.id))
        } else {
            None
        }
    })
}

/// The record holding a directory's children.
#[repr(C)]
#[derive(AsBytes, FromBytes, Copy, Clone)]
pub struct DirBlock {
    /// Number of occupied slots across the direct array and the indirect
    /// chain.
    pub count: u32,
    pub direct: [EntrySlot; DIRECT_SLOTS],
    /// Single indirect extension, allocated on first overflow.
    pub indirect: ObjectId,
    /// Reserved for future growth; always nil.
    pub indirect2: ObjectId,
    pub indirect3: ObjectId,
}

impl DirBlock {
    /// Occupied direct slots, in slot order. The indirect chain is appended
    /// by the filesystem context, which owns the extra fetch.
    pub fn entries(&self) -> impl Iterator<Item = &EntrySlot> {
        self.direct.iter().filter(|slot| !slot.is_free())
    }
}

impl Record for DirBlock {
    fn zeroed() -> Self {
        DirBlock {
            count: 0,
            direct: [EntrySlot::zeroed_slot(); DIRECT_SLOTS],
            indirect: ObjectId::NIL,
            indirect2: ObjectId::NIL,
            indirect3: ObjectId::NIL,
        }
    }
}

/// Extension array chained from [`DirBlock::indirect`]. Same slot and
/// sentinel conventions as the direct array.
#[repr(C)]
#[derive(AsBytes, FromBytes, Copy, Clone)]
pub struct IndirectBlock {
    pub slots: [EntrySlot; INDIRECT_SLOTS],
}

impl Record for IndirectBlock {
    fn zeroed() -> Self {
        IndirectBlock {
            slots: [EntrySlot::zeroed_slot(); INDIRECT_SLOTS],
        }
    }
}

impl EntrySlot {
    const fn zeroed_slot() -> Self {
        EntrySlot {
            id: ObjectId::NIL,
            name: [0; NAME_LIMIT],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupy_and_clear_round_trip() {
        let mut slot = EntrySlot::zeroed_slot();
        assert!(slot.is_free());

        let id = ObjectId::generate();
        slot.occupy(id, "notes.txt");
        assert!(!slot.is_free());
        assert_eq!(slot.name_bytes(), b"notes.txt");
        assert_eq!(slot.display_name(), "notes.txt");
        assert_eq!(slot.id, id);

        slot.clear();
        assert!(slot.is_free());
        assert_eq!(slot.name_bytes(), b"");
    }

    #[test]
    fn occupy_overwrites_longer_previous_name() {
        let mut slot = EntrySlot::zeroed_slot();
        slot.occupy(ObjectId::generate(), "a-rather-long-name");
        slot.occupy(ObjectId::generate(), "x");
        assert_eq!(slot.name_bytes(), b"x");
    }

    #[test]
    fn find_entry_skips_holes_and_compares_exactly() {
        let mut block = DirBlock::zeroed();
        let a = ObjectId::generate();
        let b = ObjectId::generate();
        block.direct[1].occupy(a, "Readme");
        block.direct[5].occupy(b, "readme");

        assert_eq!(find_entry(&block.direct, "Readme"), Some((1, a)));
        assert_eq!(find_entry(&block.direct, "readme"), Some((5, b)));
        assert_eq!(find_entry(&block.direct, "READM"), None);
    }

    #[test]
    fn entries_yields_occupied_slots_in_order() {
        let mut block = DirBlock::zeroed();
        block.direct[3].occupy(ObjectId::generate(), "c");
        block.direct[0].occupy(ObjectId::generate(), "a");

        let names: Vec<String> = block.entries().map(|s| s.display_name()).collect();
        assert_eq!(names, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn record_sizes_are_fixed() {
        assert_eq!(std::mem::size_of::<EntrySlot>(), 16 + NAME_LIMIT);
        assert_eq!(DirBlock::SIZE, 4 + 80 * DIRECT_SLOTS + 48);
        assert_eq!(IndirectBlock::SIZE, 80 * INDIRECT_SLOTS);
    }
}
