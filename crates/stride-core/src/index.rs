//! Index components
//!
//! An index is a sequence of components, one per leading axis. Missing trailing
//! components mean "the whole axis".
//!
//! ```
//! use stride_core::{idx, Index, Slice};
//!
//! let index = idx![0, 1..3, ..];
//! assert_eq!(index[0], Index::Int(0));
//! assert_eq!(index[1], Index::Slice(Slice::new(1, 3)));
//! assert_eq!(index[2], Index::Slice(Slice::full()));
//! ```

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::array::Array;
use crate::error::{Error, Result};

/// Half-open `start..stop` selection along one axis
///
/// `None` bounds default to the start and end of the axis. Only unit steps and
/// non-negative bounds are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    /// The whole axis
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: None,
        }
    }

    pub const fn new(start: isize, stop: isize) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    pub const fn with_step(self, step: isize) -> Self {
        Self {
            step: Some(step),
            ..self
        }
    }

    /// Concrete `(start, stop)` for an axis of length `dim`
    pub fn resolve(&self, axis: usize, dim: usize) -> Result<(usize, usize)> {
        if let Some(step) = self.step.filter(|&step| step != 1) {
            return Err(Error::unsupported(format!("slice step {step} on axis {axis}")));
        }

        let bound = |value: Option<isize>, default: usize| -> Result<usize> {
            match value {
                None => Ok(default),
                Some(v) if v < 0 => Err(Error::unsupported(format!(
                    "negative slice bound {v} on axis {axis}"
                ))),
                Some(v) if v as usize > dim => Err(Error::IndexOutOfRange { axis, index: v, dim }),
                Some(v) => Ok(v as usize),
            }
        };
        let start = bound(self.start, 0)?;
        let stop = bound(self.stop, dim)?;

        if start > stop {
            return Err(Error::unsupported(format!(
                "reversed slice {start}..{stop} on axis {axis}"
            )));
        }
        Ok((start, stop))
    }
}

/// One component of an index
#[derive(Debug, Clone, Copy)]
pub enum Index<'a> {
    /// Select one position and drop the axis
    Int(isize),
    /// Keep a contiguous range of the axis
    Slice(Slice),
    /// Gather the positions listed in an integer array
    Array(&'a Array),
}

impl Index<'_> {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl PartialEq for Index<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Slice(a), Self::Slice(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

/// Check a single integer index against an axis of length `dim`
pub(crate) fn resolve_int(index: isize, axis: usize, dim: usize) -> Result<usize> {
    if index < 0 {
        return Err(Error::unsupported(format!("negative index {index} on axis {axis}")));
    }
    if index as usize >= dim {
        return Err(Error::IndexOutOfRange { axis, index, dim });
    }
    Ok(index as usize)
}

fn saturating_isize(v: usize) -> isize {
    isize::try_from(v).unwrap_or(isize::MAX)
}

macro_rules! impl_index_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Index<'_> {
                fn from(i: $ty) -> Self {
                    Self::Int(i as isize)
                }
            }
        )*
    };
}

impl_index_from_int!(i8, i16, i32, isize, u8, u16);

impl From<i64> for Index<'_> {
    fn from(i: i64) -> Self {
        Self::Int(isize::try_from(i).unwrap_or(if i < 0 { isize::MIN } else { isize::MAX }))
    }
}

impl From<u32> for Index<'_> {
    fn from(i: u32) -> Self {
        Self::Int(saturating_isize(i as usize))
    }
}

impl From<usize> for Index<'_> {
    fn from(i: usize) -> Self {
        Self::Int(saturating_isize(i))
    }
}

impl From<Slice> for Index<'_> {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl From<RangeFull> for Index<'_> {
    fn from(_: RangeFull) -> Self {
        Self::Slice(Slice::full())
    }
}

impl From<Range<usize>> for Index<'_> {
    fn from(r: Range<usize>) -> Self {
        Self::Slice(Slice::new(saturating_isize(r.start), saturating_isize(r.end)))
    }
}

impl From<Range<i32>> for Index<'_> {
    fn from(r: Range<i32>) -> Self {
        Self::Slice(Slice::new(r.start as isize, r.end as isize))
    }
}

impl From<Range<isize>> for Index<'_> {
    fn from(r: Range<isize>) -> Self {
        Self::Slice(Slice::new(r.start, r.end))
    }
}

impl From<RangeFrom<usize>> for Index<'_> {
    fn from(r: RangeFrom<usize>) -> Self {
        Self::Slice(Slice {
            start: Some(saturating_isize(r.start)),
            ..Slice::full()
        })
    }
}

impl From<RangeTo<usize>> for Index<'_> {
    fn from(r: RangeTo<usize>) -> Self {
        Self::Slice(Slice {
            stop: Some(saturating_isize(r.end)),
            ..Slice::full()
        })
    }
}

impl<'a> From<&'a Array> for Index<'a> {
    fn from(array: &'a Array) -> Self {
        Self::Array(array)
    }
}

/// Build an index from a list of components
///
/// Each element is converted with [`Index::from`], so integers, ranges, `..`
/// and `&Array` can be mixed freely.
#[macro_export]
macro_rules! idx {
    ($($component:expr),* $(,)?) => {
        [$($crate::Index::from($component)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_slice_resolve_defaults() -> Result<()> {
        assert_eq!(Slice::full().resolve(0, 5)?, (0, 5));
        assert_eq!(Slice::new(1, 3).resolve(0, 5)?, (1, 3));
        assert_eq!(Slice::new(5, 5).resolve(0, 5)?, (5, 5));
        assert_eq!(Slice::new(0, 4).with_step(1).resolve(0, 5)?, (0, 4));
        Ok(())
    }

    #[test]
    fn test_slice_resolve_errors() {
        assert_eq!(
            Slice::new(0, 6).resolve(2, 5).unwrap_err(),
            Error::IndexOutOfRange { axis: 2, index: 6, dim: 5 }
        );
        assert_eq!(Slice::new(3, 1).resolve(0, 5).unwrap_err().kind(), ErrorKind::UnsupportedIndexing);
        assert_eq!(Slice::full().with_step(-1).resolve(0, 5).unwrap_err().kind(), ErrorKind::UnsupportedIndexing);
        assert_eq!(Slice::new(-2, 3).resolve(0, 5).unwrap_err().kind(), ErrorKind::UnsupportedIndexing);
    }

    #[test]
    fn test_resolve_int() {
        assert_eq!(resolve_int(2, 0, 3), Ok(2));
        assert_eq!(resolve_int(3, 1, 3), Err(Error::IndexOutOfRange { axis: 1, index: 3, dim: 3 }));
        assert_eq!(resolve_int(-1, 0, 3).unwrap_err().kind(), ErrorKind::UnsupportedIndexing);
    }

    #[test]
    fn test_idx_macro_conversions() {
        let index = idx![2usize, 1..3, ..2usize, 4usize.., ..];
        assert_eq!(index[0], Index::Int(2));
        assert_eq!(index[1], Index::Slice(Slice::new(1, 3)));
        assert_eq!(index[2], Index::Slice(Slice { stop: Some(2), ..Slice::full() }));
        assert_eq!(index[3], Index::Slice(Slice { start: Some(4), ..Slice::full() }));
        assert_eq!(index[4], Index::Slice(Slice::full()));
    }

    #[test]
    fn test_large_values_saturate() {
        assert_eq!(Index::from(usize::MAX), Index::Int(isize::MAX));
        assert_eq!(Index::from(i64::MIN), Index::Int(isize::MIN));
    }
}
