//! Error types for address space operations

use crate::region::Region;

/// Result type for address space operations
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Errors that can occur while allocating or accessing simulated memory
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// Access falls outside the region it targets
    #[error("region access out of bounds: offset {offset} + len {len} > region size {size} ({region})")]
    OutOfBounds {
        region: Region,
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Address lies inside the reserved null page
    #[error("null or uninitialized pointer dereference at {addr:#x}")]
    NullPointer { addr: usize },

    /// Region handle was not issued by this address space
    #[error("invalid region: {region}")]
    InvalidRegion { region: Region },

    /// Address is above the null page but not inside any allocation
    #[error("unmapped address: {addr:#x}")]
    UnmappedAddress { addr: usize },

    /// Allocation would run the cursor past the end of the address range
    #[error("address space exhausted: cannot allocate {requested} bytes at {cursor:#x} ({regions} regions)")]
    AddressSpaceExhausted {
        requested: usize,
        cursor: usize,
        regions: usize,
    },
}

impl MemoryError {
    /// True for errors that report an access outside a valid byte range
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. } | Self::UnmappedAddress { .. })
    }
}
