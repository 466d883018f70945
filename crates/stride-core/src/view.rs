//! Strided views over address-space regions
//!
//! A [`StridedView`] locates the elements of an N-dimensional array inside one
//! region: element `(i0, .., in)` lives at byte
//! `offset + i0 * strides[0] + .. + in * strides[n]`. Views never own bytes;
//! re-viewing (slicing, broadcasting) produces a new descriptor over the same
//! region, so writes through one view are visible through all of them.
//!
//! Every constructor checks that all reachable bytes lie inside the region.

use stride_memory::{MemoryStorage, Region};

use crate::codec::{ElementCodec, Value};
use crate::error::{Error, Result};
use crate::shape::{broadcast_strides, numel, row_major_strides};

/// Shape, byte strides and byte offset of an array inside a region
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StridedView {
    shape: Vec<usize>,
    strides: Vec<isize>,
    region: Region,
    offset: isize,
    item_size: usize,
}

impl StridedView {
    /// Allocate a fresh zeroed region and view it as a row-major array
    #[tracing::instrument(skip(mem), fields(bytes))]
    pub fn allocate_contiguous<M>(mem: &mut M, shape: &[usize], item_size: usize) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        let bytes = numel(shape)?
            .checked_mul(item_size)
            .ok_or_else(|| Error::InvalidShape(format!("{shape:?} x {item_size} bytes overflows")))?;
        tracing::Span::current().record("bytes", bytes);

        let region = mem.allocate(bytes)?;
        Ok(Self {
            shape: shape.to_vec(),
            strides: row_major_strides(shape, item_size)?,
            region,
            offset: 0,
            item_size,
        })
    }

    /// Describe an existing region, checking the layout stays inside it
    pub fn new<M>(
        mem: &M,
        region: Region,
        shape: Vec<usize>,
        strides: Vec<isize>,
        offset: isize,
        item_size: usize,
    ) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        if shape.len() != strides.len() {
            return Err(Error::InvalidShape(format!(
                "shape {shape:?} and strides {strides:?} differ in rank"
            )));
        }
        let view = Self {
            shape,
            strides,
            region,
            offset,
            item_size,
        };
        view.check_extent(mem.region_size(region)?)?;
        Ok(view)
    }

    /// Re-view the same region with a new layout
    ///
    /// `new_offset` is relative to this view's offset. No bytes are copied.
    pub fn view<M>(&self, mem: &M, new_shape: Vec<usize>, new_strides: Vec<isize>, new_offset: isize) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        let offset = self.offset.checked_add(new_offset).ok_or_else(|| {
            Error::InvalidShape(format!("offset {} + {new_offset} overflows the address range", self.offset))
        })?;
        Self::new(mem, self.region, new_shape, new_strides, offset, self.item_size)
    }

    /// Present this view as `target` using stride-0 replication
    pub fn broadcast_to<M>(&self, mem: &M, target: &[usize]) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        let (shape, strides) = broadcast_strides(&self.shape, &self.strides, target)?;
        self.view(mem, shape, strides, 0)
    }

    /// Decode the element at `indices`
    pub fn load<M>(&self, mem: &M, indices: &[usize], codec: &dyn ElementCodec) -> Result<Value>
    where
        M: MemoryStorage + ?Sized,
    {
        self.check_codec(codec)?;
        let mut buf = vec![0u8; self.item_size];
        self.load_bytes(mem, indices, &mut buf)?;
        codec.decode(&buf)
    }

    /// Encode `value` into the element at `indices`
    pub fn store<M>(&self, mem: &mut M, indices: &[usize], codec: &dyn ElementCodec, value: &Value) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        self.check_codec(codec)?;
        let mut buf = vec![0u8; self.item_size];
        codec.encode(value, &mut buf)?;
        self.store_bytes(mem, indices, &buf)
    }

    /// Raw bytes of the element at `indices`; `dest` must be `item_size` long
    pub fn load_bytes<M>(&self, mem: &M, indices: &[usize], dest: &mut [u8]) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        let offset = self.element_offset(indices)?;
        mem.read_into(self.region, offset, dest)?;
        Ok(())
    }

    /// Overwrite the element at `indices` with raw bytes
    pub fn store_bytes<M>(&self, mem: &mut M, indices: &[usize], src: &[u8]) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        let offset = self.element_offset(indices)?;
        mem.write(self.region, offset, src)?;
        Ok(())
    }

    /// Byte offset of an element within the region
    ///
    /// Requires one index per axis, each inside its axis.
    pub fn element_offset(&self, indices: &[usize]) -> Result<usize> {
        if indices.len() > self.rank() {
            return Err(Error::TooManyIndices {
                got: indices.len(),
                rank: self.rank(),
            });
        }
        if indices.len() < self.rank() {
            return Err(Error::InvalidShape(format!(
                "{} indices given for a {}-dimensional view",
                indices.len(),
                self.rank()
            )));
        }

        let mut addr = self.offset;
        for (axis, ((&i, &dim), &stride)) in indices.iter().zip(&self.shape).zip(&self.strides).enumerate() {
            if i >= dim {
                return Err(Error::IndexOutOfRange {
                    axis,
                    index: i as isize,
                    dim,
                });
            }
            addr += i as isize * stride;
        }

        usize::try_from(addr).map_err(|_| Error::ViewOutOfBounds {
            start: addr,
            end: addr + self.item_size as isize,
            size: 0,
        })
    }

    /// Half-open byte range `[lo, hi)` touched by this view, `None` when empty
    ///
    /// Fails with [`Error::InvalidShape`] when the element count or any byte
    /// position of the layout overflows.
    pub fn byte_extent(&self) -> Result<Option<(isize, isize)>> {
        if numel(&self.shape)? == 0 {
            return Ok(None);
        }
        let overflow = || {
            Error::InvalidShape(format!(
                "shape {:?} with strides {:?} at offset {} overflows the address range",
                self.shape, self.strides, self.offset
            ))
        };

        let item_size = isize::try_from(self.item_size).map_err(|_| overflow())?;
        let mut lo = self.offset;
        let mut hi = self.offset.checked_add(item_size).ok_or_else(overflow)?;
        for (&dim, &stride) in self.shape.iter().zip(&self.strides) {
            // dim >= 1, the view is not empty
            let span = isize::try_from(dim - 1)
                .ok()
                .and_then(|steps| steps.checked_mul(stride))
                .ok_or_else(overflow)?;
            if span < 0 {
                lo = lo.checked_add(span).ok_or_else(overflow)?;
            } else {
                hi = hi.checked_add(span).ok_or_else(overflow)?;
            }
        }
        Ok(Some((lo, hi)))
    }

    fn check_extent(&self, region_size: usize) -> Result<()> {
        let limit = isize::try_from(region_size).unwrap_or(isize::MAX);
        match self.byte_extent()? {
            Some((lo, hi)) if lo < 0 || hi > limit => {
                tracing::debug!(
                    region = %self.region,
                    shape = ?self.shape,
                    strides = ?self.strides,
                    offset = self.offset,
                    "rejecting view outside its region"
                );
                Err(Error::ViewOutOfBounds {
                    start: lo,
                    end: hi,
                    size: region_size,
                })
            }
            _ => Ok(()),
        }
    }

    fn check_codec(&self, codec: &dyn ElementCodec) -> Result<()> {
        if codec.size() == self.item_size {
            Ok(())
        } else {
            Err(Error::codec(format!(
                "{} codec is {} bytes wide but the view holds {}-byte elements",
                codec.name(),
                codec.size(),
                self.item_size
            )))
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn offset(&self) -> isize {
        self.offset
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Element count; every constructor has already checked it fits
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// True when elements are laid out row-major with no gaps
    pub fn is_contiguous(&self) -> bool {
        if self.numel() <= 1 {
            return true;
        }
        // A byte size past isize::MAX cannot be backed by one region
        row_major_strides(&self.shape, self.item_size).map_or(false, |expected| {
            self.shape
                .iter()
                .zip(&self.strides)
                .zip(expected)
                .all(|((&dim, &stride), expected)| dim == 1 || stride == expected)
        })
    }
}
