//! The filesystem context: path-addressed operations over a key-value
//! backend.
//!
//! All state lives in the store; the context only caches the root inode,
//! which has a well-known key instead of a generated identifier. Methods
//! take `&mut self`, so an embedding that shares a context across threads
//! serializes operations by construction.
//!
//! Multi-record updates are ordered so that a record is written before
//! anything pointing at it: child inode, then indirect block, then
//! directory block, then parent inode. A crash mid-sequence leaves
//! unreferenced records behind, never dangling references.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};

use crate::alloc::{first_free, SlotRef};
use crate::data::DataBlock;
use crate::dir::{find_entry, DirBlock, IndirectBlock};
use crate::error::{FsError, Result};
use crate::id::ObjectId;
use crate::inode::Inode;
use crate::path::{components, split_parent, validate_name};
use crate::store::{fetch_record, store_record, KeyValueStore, Record};
use crate::{MAX_FILE_SIZE, ROOT_KEY};

/// Identity applied to newly created objects.
#[derive(Debug, Copy, Clone)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
}

/// Stat-shaped view of an inode, the answer to `getattr`.
#[derive(Debug, Copy, Clone)]
pub struct Attr {
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub mtime: i64,
    pub ctime: i64,
}

impl Attr {
    fn from_inode(inode: &Inode) -> Self {
        Attr {
            mode: inode.mode,
            nlink: inode.nlink,
            uid: inode.uid,
            gid: inode.gid,
            size: inode.size,
            mtime: inode.mtime,
            ctime: inode.ctime,
        }
    }
}

/// Where an inode record lives: the root has a fixed key, everything else
/// is named by a generated identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum NodeRef {
    Root,
    Object(ObjectId),
}

/// The parent side of a resolved path: enough to rewrite the entry that
/// points at the resolved object.
#[derive(Copy, Clone)]
struct ParentRef {
    inode: Inode,
    at: NodeRef,
    block_id: ObjectId,
    slot: SlotRef,
}

/// A fully resolved path. `parent` is `None` only for the root.
#[derive(Copy, Clone)]
struct Resolved {
    inode: Inode,
    at: NodeRef,
    parent: Option<ParentRef>,
}

/// Where a new directory entry will land, decided before any write so a
/// full directory is rejected without side effects.
enum Placement {
    Direct(usize),
    Indirect(ObjectId, IndirectBlock, usize),
}

/// Filesystem context over a [`KeyValueStore`] backend.
pub struct KvFs<S: KeyValueStore> {
    store: S,
    root: Inode,
    creds: Credentials,
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn corrupt(detail: String) -> FsError {
    warn!("corrupt store state: {}", detail);
    FsError::Corruption(detail)
}

impl<S: KeyValueStore> KvFs<S> {
    /// Opens the filesystem in `store`, creating the root directory on
    /// first mount. A root record with the wrong shape fails the mount;
    /// nothing is repaired automatically.
    pub fn mount(mut store: S, creds: Credentials) -> Result<Self> {
        let root = match fetch_record::<Inode, _>(&store, ROOT_KEY)? {
            Some(inode) => {
                debug!("mount: existing root found");
                inode
            }
            None => {
                debug!("mount: initializing empty filesystem");
                let inode = Inode::new_dir(0o755, creds.uid, creds.gid, now());
                store_record(&mut store, ROOT_KEY, &inode)?;
                inode
            }
        };
        Ok(KvFs { store, root, creds })
    }

    /// Hands the backend back, consuming the context.
    pub fn into_store(self) -> S {
        self.store
    }

    // Record plumbing.

    fn get_inode(&self, at: NodeRef) -> Result<Inode> {
        match at {
            NodeRef::Root => Ok(self.root),
            NodeRef::Object(id) => fetch_record(&self.store, id.as_key())?
                .ok_or(FsError::NotFound),
        }
    }

    fn put_inode(&mut self, at: NodeRef, inode: &Inode) -> Result<()> {
        match at {
            NodeRef::Root => {
                store_record(&mut self.store, ROOT_KEY, inode)?;
                self.root = *inode;
            }
            NodeRef::Object(id) => store_record(&mut self.store, id.as_key(), inode)?,
        }
        Ok(())
    }

    /// The directory block an inode points at, if one was ever allocated.
    /// A dangling pointer is corruption, not an empty directory.
    fn get_dir_block(&self, inode: &Inode) -> Result<Option<(ObjectId, DirBlock)>> {
        let id = match inode.data.get() {
            Some(id) => id,
            None => return Ok(None),
        };
        match fetch_record(&self.store, id.as_key())? {
            Some(block) => Ok(Some((id, block))),
            None => Err(corrupt(format!("directory block {:?} missing", id))),
        }
    }

    fn get_indirect(&self, id: ObjectId) -> Result<IndirectBlock> {
        fetch_record(&self.store, id.as_key())?
            .ok_or_else(|| corrupt(format!("indirect block {:?} missing", id)))
    }

    // Resolution.

    /// Finds `name` in a directory, scanning the direct array and then the
    /// indirect chain. Returns the block identifier, the child identifier
    /// and the slot the entry occupies.
    fn lookup_child(
        &self,
        dir: &Inode,
        name: &str,
    ) -> Result<Option<(ObjectId, ObjectId, SlotRef)>> {
        let (block_id, block) = match self.get_dir_block(dir)? {
            Some(found) => found,
            None => return Ok(None),
        };
        if let Some((i, id)) = find_entry(&block.direct, name) {
            return Ok(Some((block_id, id, SlotRef::Direct(i))));
        }
        if let Some(indirect_id) = block.indirect.get() {
            let indirect = self.get_indirect(indirect_id)?;
            if let Some((i, id)) = find_entry(&indirect.slots, name) {
                return Ok(Some((block_id, id, SlotRef::Indirect(i))));
            }
        }
        Ok(None)
    }

    /// Walks an absolute path component by component. An entry that points
    /// at a missing inode is corruption; a missing entry is `NotFound`.
    fn resolve(&self, path: &str) -> Result<Resolved> {
        let parts = components(path)?;
        let mut current = Resolved {
            inode: self.root,
            at: NodeRef::Root,
            parent: None,
        };
        for name in parts {
            if !current.inode.is_dir() {
                return Err(FsError::NotADirectory);
            }
            let (block_id, child_id, slot) = self
                .lookup_child(&current.inode, name)?
                .ok_or(FsError::NotFound)?;
            let child: Inode = fetch_record(&self.store, child_id.as_key())?
                .ok_or_else(|| corrupt(format!("inode {:?} missing", child_id)))?;
            current = Resolved {
                inode: child,
                at: NodeRef::Object(child_id),
                parent: Some(ParentRef {
                    inode: current.inode,
                    at: current.at,
                    block_id,
                    slot,
                }),
            };
        }
        Ok(current)
    }

    // Read side.

    pub fn getattr(&self, path: &str) -> Result<Attr> {
        debug!("getattr {}", path);
        let resolved = self.resolve(path)?;
        Ok(Attr::from_inode(&resolved.inode))
    }

    /// Names in a directory, `.` and `..` included, in slot order with the
    /// direct array first.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        debug!("readdir {}", path);
        let resolved = self.resolve(path)?;
        if !resolved.inode.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let mut names = vec![".".to_string(), "..".to_string()];
        if let Some((_, block)) = self.get_dir_block(&resolved.inode)? {
            for slot in block.entries() {
                names.push(slot.display_name());
            }
            if let Some(indirect_id) = block.indirect.get() {
                let indirect = self.get_indirect(indirect_id)?;
                for slot in indirect.slots.iter().filter(|s| !s.is_free()) {
                    names.push(slot.display_name());
                }
            }
        }
        Ok(names)
    }

    /// Checks that a path can be opened. There is no handle state to
    /// allocate; the path is re-resolved on every read and write.
    pub fn open(&self, path: &str) -> Result<()> {
        debug!("open {}", path);
        self.resolve(path)?;
        Ok(())
    }

    /// Reads up to `size` bytes at `offset`, clamped to the file size. A
    /// file that never had content reads as empty.
    pub fn read(&self, path: &str, offset: usize, size: usize) -> Result<Vec<u8>> {
        debug!("read {} offset={} size={}", path, offset, size);
        let resolved = self.resolve(path)?;
        if resolved.inode.is_dir() {
            return Err(FsError::IsADirectory);
        }
        let data_id = match resolved.inode.data.get() {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let block: DataBlock = fetch_record(&self.store, data_id.as_key())?
            .ok_or_else(|| corrupt(format!("data block {:?} missing", data_id)))?;
        let logical = resolved.inode.size as usize;
        Ok(block.read(offset, size, logical).to_vec())
    }

    // Write side.

    /// Replaces the file's content. The capacity check happens before any
    /// record is touched, so an oversized write changes nothing.
    pub fn write(&mut self, path: &str, content: &[u8]) -> Result<usize> {
        debug!("write {} len={}", path, content.len());
        if content.len() > MAX_FILE_SIZE {
            return Err(FsError::TooLarge);
        }
        let mut resolved = self.resolve(path)?;
        if resolved.inode.is_dir() {
            return Err(FsError::IsADirectory);
        }

        let (data_id, mut block) = match resolved.inode.data.get() {
            Some(id) => {
                let block = fetch_record(&self.store, id.as_key())?
                    .ok_or_else(|| corrupt(format!("data block {:?} missing", id)))?;
                (id, block)
            }
            None => (ObjectId::generate(), DataBlock::zeroed()),
        };
        block.replace(content);
        store_record(&mut self.store, data_id.as_key(), &block)?;

        let stamp = now();
        resolved.inode.data = data_id;
        resolved.inode.size = content.len() as u64;
        resolved.inode.mtime = stamp;
        resolved.inode.ctime = stamp;
        self.put_inode(resolved.at, &resolved.inode)?;
        Ok(content.len())
    }

    /// Moves the logical size without rewriting content. Growth exposes
    /// whatever bytes a previous longer content left in the block.
    pub fn truncate(&mut self, path: &str, new_size: usize) -> Result<()> {
        debug!("truncate {} to {}", path, new_size);
        if new_size >= MAX_FILE_SIZE {
            return Err(FsError::TooLarge);
        }
        let mut resolved = self.resolve(path)?;
        if resolved.inode.is_dir() {
            return Err(FsError::IsADirectory);
        }

        let data_id = match resolved.inode.data.get() {
            Some(id) => {
                let mut block: DataBlock = fetch_record(&self.store, id.as_key())?
                    .ok_or_else(|| corrupt(format!("data block {:?} missing", id)))?;
                block.set_len(new_size);
                store_record(&mut self.store, id.as_key(), &block)?;
                id
            }
            None if new_size > 0 => {
                let id = ObjectId::generate();
                let mut block = DataBlock::zeroed();
                block.set_len(new_size);
                store_record(&mut self.store, id.as_key(), &block)?;
                id
            }
            None => ObjectId::NIL,
        };

        let stamp = now();
        resolved.inode.data = data_id;
        resolved.inode.size = new_size as u64;
        resolved.inode.mtime = stamp;
        resolved.inode.ctime = stamp;
        self.put_inode(resolved.at, &resolved.inode)
    }

    // Creation.

    pub fn create(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("create {} mode={:o}", path, mode);
        let inode = Inode::new_file(mode, self.creds.uid, self.creds.gid, now());
        self.make_node(path, inode)
    }

    pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("mkdir {} mode={:o}", path, mode);
        let inode = Inode::new_dir(mode, self.creds.uid, self.creds.gid, now());
        self.make_node(path, inode)
    }

    /// Shared create/mkdir path: validates the name, finds a slot, then
    /// commits bottom-up so the new entry only becomes visible once the
    /// child inode exists.
    fn make_node(&mut self, path: &str, child: Inode) -> Result<()> {
        let (parent_path, name) = split_parent(path)?;
        validate_name(name)?;

        let parent = self.resolve(parent_path)?;
        if !parent.inode.is_dir() {
            return Err(FsError::NotADirectory);
        }
        if self.lookup_child(&parent.inode, name)?.is_some() {
            return Err(FsError::AlreadyExists);
        }

        let (block_id, mut block) = match self.get_dir_block(&parent.inode)? {
            Some(found) => found,
            None => (ObjectId::generate(), DirBlock::zeroed()),
        };

        // Decide placement before writing anything so a full directory is
        // a clean failure.
        let placement = match first_free(&block.direct) {
            Some(i) => Placement::Direct(i),
            None => match block.indirect.get() {
                Some(id) => {
                    let indirect = self.get_indirect(id)?;
                    match first_free(&indirect.slots) {
                        Some(i) => Placement::Indirect(id, indirect, i),
                        None => return Err(FsError::NoSpace),
                    }
                }
                None => Placement::Indirect(ObjectId::generate(), IndirectBlock::zeroed(), 0),
            },
        };

        let child_id = ObjectId::generate();
        store_record(&mut self.store, child_id.as_key(), &child)?;

        match placement {
            Placement::Direct(i) => {
                block.direct[i].occupy(child_id, name);
            }
            Placement::Indirect(indirect_id, mut indirect, i) => {
                indirect.slots[i].occupy(child_id, name);
                store_record(&mut self.store, indirect_id.as_key(), &indirect)?;
                block.indirect = indirect_id;
            }
        }
        block.count += 1;
        store_record(&mut self.store, block_id.as_key(), &block)?;

        let stamp = now();
        let mut parent_inode = parent.inode;
        parent_inode.data = block_id;
        parent_inode.mtime = stamp;
        parent_inode.ctime = stamp;
        self.put_inode(parent.at, &parent_inode)
    }

    // Removal.

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        debug!("unlink {}", path);
        let resolved = self.resolve(path)?;
        if resolved.inode.is_dir() {
            return Err(FsError::IsADirectory);
        }
        // resolve() only yields a file with a parent attached.
        let parent = match resolved.parent {
            Some(parent) => parent,
            None => return Err(FsError::InvalidPath(path.to_string())),
        };
        if let Some(data_id) = resolved.inode.data.get() {
            self.store.delete(data_id.as_key())?;
        }
        self.remove_entry(resolved.at, parent)
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        debug!("rmdir {}", path);
        let resolved = self.resolve(path)?;
        if !resolved.inode.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let parent = match resolved.parent {
            Some(parent) => parent,
            None => return Err(FsError::InvalidPath(path.to_string())),
        };
        if let Some((block_id, block)) = self.get_dir_block(&resolved.inode)? {
            if block.count != 0 {
                return Err(FsError::NotEmpty);
            }
            if let Some(indirect_id) = block.indirect.get() {
                self.store.delete(indirect_id.as_key())?;
            }
            self.store.delete(block_id.as_key())?;
        }
        self.remove_entry(resolved.at, parent)
    }

    /// Deletes the target's inode record and clears its slot in the parent,
    /// then stamps the parent. The target's own blocks are already gone.
    fn remove_entry(&mut self, target: NodeRef, parent: ParentRef) -> Result<()> {
        if let NodeRef::Object(id) = target {
            self.store.delete(id.as_key())?;
        }

        let mut block: DirBlock = fetch_record(&self.store, parent.block_id.as_key())?
            .ok_or_else(|| corrupt(format!("directory block {:?} missing", parent.block_id)))?;
        match parent.slot {
            SlotRef::Direct(i) => {
                block.direct[i].clear();
            }
            SlotRef::Indirect(i) => {
                let indirect_id = block
                    .indirect
                    .get()
                    .ok_or_else(|| corrupt("indirect slot without indirect block".to_string()))?;
                let mut indirect = self.get_indirect(indirect_id)?;
                indirect.slots[i].clear();
                store_record(&mut self.store, indirect_id.as_key(), &indirect)?;
            }
        }
        block.count = block.count.saturating_sub(1);
        store_record(&mut self.store, parent.block_id.as_key(), &block)?;

        let stamp = now();
        let mut parent_inode = parent.inode;
        parent_inode.mtime = stamp;
        parent_inode.ctime = stamp;
        self.put_inode(parent.at, &parent_inode)
    }

    // Metadata.

    pub fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("chmod {} mode={:o}", path, mode);
        let mut resolved = self.resolve(path)?;
        resolved.inode.set_perm(mode);
        resolved.inode.ctime = now();
        self.put_inode(resolved.at, &resolved.inode)
    }

    pub fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()> {
        debug!("chown {} uid={} gid={}", path, uid, gid);
        let mut resolved = self.resolve(path)?;
        resolved.inode.uid = uid;
        resolved.inode.gid = gid;
        resolved.inode.ctime = now();
        self.put_inode(resolved.at, &resolved.inode)
    }

    pub fn utime(&mut self, path: &str, mtime: i64) -> Result<()> {
        debug!("utime {} mtime={}", path, mtime);
        let mut resolved = self.resolve(path)?;
        resolved.inode.mtime = mtime;
        resolved.inode.ctime = now();
        self.put_inode(resolved.at, &resolved.inode)
    }
}
