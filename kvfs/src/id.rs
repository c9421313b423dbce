use std::fmt;

use uuid::Uuid;
use zerocopy::{AsBytes, FromBytes};

/// Width of a generated identifier, which doubles as the backend key width.
pub const ID_SIZE: usize = 16;

/// A 128-bit identifier naming one record in the backend store.
///
/// The all-zero value is reserved as the "absent" sentinel and is never
/// produced by [`ObjectId::generate`]. In-memory code should go through
/// [`ObjectId::get`] instead of comparing against the sentinel directly.
#[repr(C)]
#[derive(AsBytes, FromBytes, Copy, Clone, PartialEq, Eq)]
pub struct ObjectId([u8; ID_SIZE]);

impl ObjectId {
    pub const NIL: ObjectId = ObjectId([0; ID_SIZE]);

    /// Generates a fresh identifier, assumed globally unique.
    pub fn generate() -> Self {
        loop {
            let id = ObjectId(*Uuid::new_v4().as_bytes());
            // A v4 uuid is never all zeros, but the sentinel must stay
            // unreachable even if the generator changes.
            if !id.is_nil() {
                return id;
            }
        }
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; ID_SIZE]
    }

    /// The occupancy view of an identifier slot: `None` means unused.
    pub fn get(self) -> Option<ObjectId> {
        if self.is_nil() {
            None
        } else {
            Some(self)
        }
    }

    /// The backend key for the record this identifier names.
    pub fn as_key(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
