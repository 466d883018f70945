//! Region handles

use std::fmt;

/// Handle to an allocated region of the address space
///
/// A region is the half-open byte range `[addr, addr + len)`. Regions are
/// opaque: they are issued by [`AddressSpace::allocate`](crate::AddressSpace::allocate)
/// and only mean something to the address space that issued them.
///
/// Equality is identity of the allocated range. Two zero-length allocations at
/// the same cursor position are still distinct because they carry distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region {
    id: u32,
    addr: usize,
    len: usize,
}

impl Region {
    pub(crate) const fn new(id: u32, addr: usize, len: usize) -> Self {
        Self { id, addr, len }
    }

    /// Allocation ordinal
    pub const fn id(self) -> u32 {
        self.id
    }

    /// First byte address of the region
    pub const fn addr(self) -> usize {
        self.addr
    }

    /// One past the last byte address of the region
    pub const fn end_addr(self) -> usize {
        self.addr + self.len
    }

    /// Size in bytes
    pub const fn len(self) -> usize {
        self.len
    }

    /// True for zero-length regions
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    /// True when `addr` lies inside the region
    pub const fn contains(self, addr: usize) -> bool {
        addr >= self.addr && addr < self.end_addr()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region{}[{:#x}..{:#x})", self.id, self.addr, self.end_addr())
    }
}
