//! Memory storage trait
//!
//! Strided views and arrays are generic over [`MemoryStorage`] rather than tied
//! to [`AddressSpace`](crate::AddressSpace), so an alternate backing store (for
//! example one that records every access for replay) can be dropped in without
//! touching address arithmetic.

use crate::error::Result;
use crate::region::Region;

/// Byte storage addressed through regions
///
/// # Contract
///
/// - `allocate` returns a zero-initialised region that overlaps no earlier region
/// - `read_into` / `write` fail rather than truncate when `offset + len` leaves the region
/// - a write is visible to every subsequent read of the same bytes, whichever
///   view issued it
pub trait MemoryStorage {
    /// Allocate a zero-initialised region of `size` bytes
    fn allocate(&mut self, size: usize) -> Result<Region>;

    /// Copy `dest.len()` bytes starting at `offset` within `region` into `dest`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the region was not issued by this storage
    /// - `offset + dest.len()` exceeds the region size
    fn read_into(&self, region: Region, offset: usize, dest: &mut [u8]) -> Result<()>;

    /// Copy `src` into `region` starting at `offset`
    ///
    /// # Errors
    ///
    /// Same bounds contract as [`read_into`](MemoryStorage::read_into).
    fn write(&mut self, region: Region, offset: usize, src: &[u8]) -> Result<()>;

    /// Size of `region` in bytes
    fn region_size(&self, region: Region) -> Result<usize>;
}
