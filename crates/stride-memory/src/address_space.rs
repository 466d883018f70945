//! Arena-style simulated address space
//!
//! All array data lives here. Memory is handed out by a bump cursor that starts
//! just past the reserved null page and only ever moves forward; nothing is freed.
//!
//! ```text
//! 0                 null_reserve                                   cursor
//! |--- null page ---|-- region0 --|-- region1 --|-- region2 --|----->
//! ```
//!
//! Every access is bounds-checked against the region it targets, so a bad
//! offset surfaces as an error instead of silently touching a neighbour.

use crate::config::{MemoryConfig, DEFAULT_NULL_RESERVE};
use crate::error::{MemoryError, Result};
use crate::region::Region;
use crate::storage::MemoryStorage;

/// Simulated byte-addressable memory with a monotonic bump allocator
#[derive(Debug)]
pub struct AddressSpace {
    /// Region descriptors with their backing bytes, in allocation order
    regions: Vec<(Region, Vec<u8>)>,

    /// Next free address
    cursor: usize,

    null_reserve: usize,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    /// Create an address space with the default null reserve
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// Create an address space from `config`
    ///
    /// A zero null reserve would make address 0 allocatable, so it is replaced
    /// by [`DEFAULT_NULL_RESERVE`].
    pub fn with_config(config: MemoryConfig) -> Self {
        let null_reserve = match config.null_reserve {
            0 => {
                tracing::warn!(default = DEFAULT_NULL_RESERVE, "null reserve of 0 bytes replaced by the default");
                DEFAULT_NULL_RESERVE
            }
            reserve => reserve,
        };

        tracing::debug!(null_reserve, "creating address space");
        Self {
            regions: Vec::new(),
            cursor: null_reserve,
            null_reserve,
        }
    }

    /// Carve a zero-initialised region of `size` bytes at the cursor
    ///
    /// Zero-sized requests are legal and produce an empty region that is still
    /// distinct from every other region.
    pub fn allocate(&mut self, size: usize) -> Result<Region> {
        let exhausted = || MemoryError::AddressSpaceExhausted {
            requested: size,
            cursor: self.cursor,
            regions: self.regions.len(),
        };
        let id = u32::try_from(self.regions.len()).map_err(|_| exhausted())?;
        let end = self.cursor.checked_add(size).ok_or_else(exhausted)?;

        let region = Region::new(id, self.cursor, size);
        self.regions.push((region, vec![0u8; size]));
        self.cursor = end;

        tracing::trace!(region = %region, bytes = size, cursor = self.cursor, "allocated region");
        Ok(region)
    }

    /// Read `len` bytes starting at `offset` within `region`
    pub fn read(&self, region: Region, offset: usize, len: usize) -> Result<Vec<u8>> {
        let bytes = self.buffer(region)?;
        let range = checked_range(region, offset, len, bytes.len())?;
        Ok(bytes[range].to_vec())
    }

    /// Fill `dest` from `region` starting at `offset`
    pub fn read_into(&self, region: Region, offset: usize, dest: &mut [u8]) -> Result<()> {
        let bytes = self.buffer(region)?;
        let range = checked_range(region, offset, dest.len(), bytes.len())?;
        dest.copy_from_slice(&bytes[range]);
        Ok(())
    }

    /// Write `src` into `region` starting at `offset`
    pub fn write(&mut self, region: Region, offset: usize, src: &[u8]) -> Result<()> {
        let bytes = self.buffer_mut(region)?;
        let range = checked_range(region, offset, src.len(), bytes.len())?;
        bytes[range].copy_from_slice(src);
        Ok(())
    }

    /// Read a plain-old-data value stored at `offset` within `region`
    ///
    /// Uses native byte order and tolerates unaligned offsets.
    pub fn read_pod<T: bytemuck::Pod>(&self, region: Region, offset: usize) -> Result<T> {
        let bytes = self.buffer(region)?;
        let range = checked_range(region, offset, std::mem::size_of::<T>(), bytes.len())?;
        Ok(bytemuck::pod_read_unaligned(&bytes[range]))
    }

    /// Store a plain-old-data value at `offset` within `region`
    pub fn write_pod<T: bytemuck::Pod>(&mut self, region: Region, offset: usize, value: T) -> Result<()> {
        self.write(region, offset, bytemuck::bytes_of(&value))
    }

    /// Map an absolute address to its region and the offset inside it
    ///
    /// # Errors
    ///
    /// - `NullPointer` for addresses inside the null page
    /// - `UnmappedAddress` for addresses no allocation covers
    pub fn resolve(&self, addr: usize) -> Result<(Region, usize)> {
        if addr < self.null_reserve {
            return Err(MemoryError::NullPointer { addr });
        }

        // Region ends are non-decreasing, so the first region ending past `addr`
        // is the only candidate. Empty regions end at their start and are skipped.
        let idx = self.regions.partition_point(|(region, _)| region.end_addr() <= addr);
        match self.regions.get(idx) {
            Some((region, _)) if region.contains(addr) => Ok((*region, addr - region.addr())),
            _ => Err(MemoryError::UnmappedAddress { addr }),
        }
    }

    /// Read `len` bytes at an absolute address
    ///
    /// The whole range must fall inside the region containing `addr`.
    pub fn read_at(&self, addr: usize, len: usize) -> Result<Vec<u8>> {
        let (region, offset) = self.resolve(addr)?;
        self.read(region, offset, len)
    }

    /// Write `src` at an absolute address
    pub fn write_at(&mut self, addr: usize, src: &[u8]) -> Result<()> {
        let (region, offset) = self.resolve(addr)?;
        self.write(region, offset, src)
    }

    /// Next address the allocator will hand out
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total bytes handed out so far
    pub fn allocated_bytes(&self) -> usize {
        self.cursor - self.null_reserve
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn null_reserve(&self) -> usize {
        self.null_reserve
    }

    /// Size of `region` in bytes, after checking it belongs to this space
    pub fn region_size(&self, region: Region) -> Result<usize> {
        self.buffer(region).map(<[u8]>::len)
    }

    fn lookup(&self, region: Region) -> Result<usize> {
        if region.addr() < self.null_reserve {
            return Err(MemoryError::NullPointer { addr: region.addr() });
        }
        let idx = region.id() as usize;
        match self.regions.get(idx) {
            Some((known, _)) if *known == region => Ok(idx),
            _ => Err(MemoryError::InvalidRegion { region }),
        }
    }

    fn buffer(&self, region: Region) -> Result<&[u8]> {
        let idx = self.lookup(region)?;
        Ok(&self.regions[idx].1)
    }

    fn buffer_mut(&mut self, region: Region) -> Result<&mut [u8]> {
        let idx = self.lookup(region)?;
        Ok(&mut self.regions[idx].1)
    }
}

/// Byte range `[offset, offset + len)` after checking it fits in `size`
fn checked_range(region: Region, offset: usize, len: usize, size: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(MemoryError::OutOfBounds {
            region,
            offset,
            len,
            size,
        }),
    }
}

impl MemoryStorage for AddressSpace {
    fn allocate(&mut self, size: usize) -> Result<Region> {
        AddressSpace::allocate(self, size)
    }

    fn read_into(&self, region: Region, offset: usize, dest: &mut [u8]) -> Result<()> {
        AddressSpace::read_into(self, region, offset, dest)
    }

    fn write(&mut self, region: Region, offset: usize, src: &[u8]) -> Result<()> {
        AddressSpace::write(self, region, offset, src)
    }

    fn region_size(&self, region: Region) -> Result<usize> {
        AddressSpace::region_size(self, region)
    }
}
