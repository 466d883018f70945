//! Shape algebra
//!
//! Pure functions over shapes and byte strides: broadcast compatibility, the
//! derived layout of a basic (int/slice) index, and the stride rewrite behind
//! broadcasting a view.

use crate::error::{Error, Result};
use crate::index::{resolve_int, Index};

/// Layout produced by applying a basic index to a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    pub shape: Vec<usize>,
    pub strides: Vec<isize>,
    /// Byte offset to add to the source view's offset
    pub offset: isize,
}

/// Number of elements in `shape` (1 for rank 0)
///
/// Fails with [`Error::InvalidShape`] when the count does not fit in `usize`.
pub fn numel(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |count, &dim| count.checked_mul(dim))
        .ok_or_else(|| Error::InvalidShape(format!("{shape:?} has more elements than fit in usize")))
}

/// Row-major byte strides: the suffix product of `shape` times `item_size`
///
/// The total byte size must fit in `isize`.
pub fn row_major_strides(shape: &[usize], item_size: usize) -> Result<Vec<isize>> {
    let overflow = || Error::InvalidShape(format!("{shape:?} x {item_size} bytes overflows the address range"));

    let mut strides = vec![0isize; shape.len()];
    let mut step = isize::try_from(item_size).map_err(|_| overflow())?;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = step;
        step = isize::try_from(dim)
            .ok()
            .and_then(|dim| step.checked_mul(dim))
            .ok_or_else(overflow)?;
    }
    Ok(strides)
}

/// Broadcast two shapes together
fn broadcast_pair(shape_a: &[usize], shape_b: &[usize]) -> Result<Vec<usize>> {
    let ndim_a = shape_a.len();
    let ndim_b = shape_b.len();
    let max_ndim = ndim_a.max(ndim_b);

    let mut result_shape = Vec::with_capacity(max_ndim);

    // Iterate from the trailing dimensions
    for i in 0..max_ndim {
        let dim_a = ndim_a.checked_sub(i + 1).map_or(1, |idx| shape_a[idx]);
        let dim_b = ndim_b.checked_sub(i + 1).map_or(1, |idx| shape_b[idx]);

        if dim_a == dim_b || dim_b == 1 {
            result_shape.push(dim_a);
        } else if dim_a == 1 {
            result_shape.push(dim_b);
        } else {
            return Err(Error::NotBroadcastable {
                left: shape_a.to_vec(),
                right: shape_b.to_vec(),
            });
        }
    }

    result_shape.reverse();
    Ok(result_shape)
}

/// Broadcast any number of shapes together
///
/// Shapes are right-aligned; at every axis the dimensions must all be 1 or a
/// single common size. No shapes broadcast to the rank-0 shape `[]`.
///
/// ```
/// use stride_core::broadcast_shapes;
///
/// let out = broadcast_shapes(&[&[3, 4], &[3, 1], &[4, 3, 1]])?;
/// assert_eq!(out, vec![4, 3, 4]);
/// assert!(broadcast_shapes(&[&[3, 4], &[3, 1], &[4, 3, 2]]).is_err());
/// # Ok::<(), stride_core::Error>(())
/// ```
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    shapes
        .iter()
        .try_fold(Vec::new(), |acc, shape| broadcast_pair(&acc, shape))
}

/// Shape, strides and byte offset selected by a basic index
///
/// Integers drop their axis and add `i * stride` to the offset, slices keep the
/// axis with length `stop - start` and add `start * stride`. Axes beyond the
/// index are kept whole. Array components are rejected here; they take the
/// gather path in [`Array::get`](crate::Array::get).
pub fn slice_arrayinfo(shape: &[usize], strides: &[isize], index: &[Index<'_>]) -> Result<ArrayInfo> {
    if shape.len() != strides.len() {
        return Err(Error::InvalidShape(format!(
            "shape {shape:?} and strides {strides:?} differ in rank"
        )));
    }
    if index.len() > shape.len() {
        return Err(Error::TooManyIndices {
            got: index.len(),
            rank: shape.len(),
        });
    }

    let mut info = ArrayInfo {
        shape: Vec::with_capacity(shape.len()),
        strides: Vec::with_capacity(shape.len()),
        offset: 0,
    };

    for (axis, ((&dim, &stride), component)) in shape.iter().zip(strides).zip(index).enumerate() {
        match component {
            Index::Int(i) => {
                let i = resolve_int(*i, axis, dim)?;
                info.offset += i as isize * stride;
            }
            Index::Slice(slice) => {
                let (start, stop) = slice.resolve(axis, dim)?;
                info.shape.push(stop - start);
                info.strides.push(stride);
                info.offset += start as isize * stride;
            }
            Index::Array(_) => {
                return Err(Error::unsupported(format!(
                    "array index on axis {axis} requires a gather"
                )))
            }
        }
    }

    info.shape.extend_from_slice(&shape[index.len()..]);
    info.strides.extend_from_slice(&strides[index.len()..]);
    Ok(info)
}

/// Shape and strides that present `shape`/`strides` as `target`
///
/// Missing leading axes are added with stride 0; size-1 axes stretched to a
/// larger size get stride 0; axes already matching keep their stride.
pub fn broadcast_strides(shape: &[usize], strides: &[isize], target: &[usize]) -> Result<(Vec<usize>, Vec<isize>)> {
    if shape.len() != strides.len() {
        return Err(Error::InvalidShape(format!(
            "shape {shape:?} and strides {strides:?} differ in rank"
        )));
    }

    let not_broadcastable = || Error::NotBroadcastable {
        left: shape.to_vec(),
        right: target.to_vec(),
    };
    let pad = target.len().checked_sub(shape.len()).ok_or_else(not_broadcastable)?;
    if broadcast_pair(shape, target)? != target {
        return Err(not_broadcastable());
    }

    let new_strides = target
        .iter()
        .enumerate()
        .map(|(axis, &t)| match axis.checked_sub(pad) {
            // ratio target/current is 1 whenever the dims already agree
            Some(src) if shape[src] == t => strides[src],
            _ => 0,
        })
        .collect();

    Ok((target.to_vec(), new_strides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::index::Slice;
    use proptest::prelude::*;

    #[test]
    fn test_row_major_strides() -> Result<()> {
        assert_eq!(row_major_strides(&[3, 4, 5], 4)?, vec![80, 20, 4]);
        assert_eq!(row_major_strides(&[7], 8)?, vec![8]);
        assert!(row_major_strides(&[], 4)?.is_empty());
        assert_eq!(numel(&[])?, 1);
        assert_eq!(numel(&[3, 0, 2])?, 0);
        Ok(())
    }

    #[test]
    fn test_overflowing_shapes_are_errors() {
        let err = numel(&[1 << 32, 1 << 32]).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

        // Element count fits but the byte size does not
        assert!(numel(&[1 << 31, 1 << 31]).is_ok());
        assert!(matches!(row_major_strides(&[1 << 31, 1 << 31], 4), Err(Error::InvalidShape(_))));
        assert!(row_major_strides(&[usize::MAX], 1).is_err());
    }

    #[test]
    fn test_broadcast_shapes_three_way() -> Result<()> {
        assert_eq!(broadcast_shapes(&[&[3, 4], &[3, 1], &[4, 3, 1]])?, vec![4, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_broadcast_shapes_incompatible() {
        let err = broadcast_shapes(&[&[3, 4], &[3, 1], &[4, 3, 2]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_broadcast_shapes_edge_cases() -> Result<()> {
        assert_eq!(broadcast_shapes(&[])?, Vec::<usize>::new());
        assert_eq!(broadcast_shapes(&[&[], &[2, 3]])?, vec![2, 3]);
        assert_eq!(broadcast_shapes(&[&[0], &[1]])?, vec![0]);
        assert!(broadcast_shapes(&[&[0], &[3]]).is_err());
        Ok(())
    }

    #[test]
    fn test_slice_arrayinfo_int_drops_axis() -> Result<()> {
        let strides = row_major_strides(&[3, 4, 5], 4)?;
        let info = slice_arrayinfo(&[3, 4, 5], &strides, &[Index::Int(1)])?;
        assert_eq!(info.shape, vec![4, 5]);
        assert_eq!(info.strides, vec![20, 4]);
        assert_eq!(info.offset, 80);
        Ok(())
    }

    #[test]
    fn test_slice_arrayinfo_mixed() -> Result<()> {
        let strides = row_major_strides(&[3, 4, 5], 4)?;

        let info = slice_arrayinfo(&[3, 4, 5], &strides, &[Index::Int(0), Index::Slice(Slice::full()), Index::Int(2)])?;
        assert_eq!(info.shape, vec![4]);
        assert_eq!(info.strides, vec![20]);
        assert_eq!(info.offset, 8);

        let info = slice_arrayinfo(&[3, 4, 5], &strides, &[Index::Int(0), Index::Slice(Slice::new(1, 3))])?;
        assert_eq!(info.shape, vec![2, 5]);
        assert_eq!(info.offset, 20);
        Ok(())
    }

    #[test]
    fn test_slice_arrayinfo_rejects() {
        let strides = row_major_strides(&[3, 4], 4).unwrap();
        let slice = |start, stop| Index::Slice(Slice::new(start, stop));

        let negative = slice_arrayinfo(&[3, 4], &strides, &[slice(-1, 2)]).unwrap_err();
        assert_eq!(negative.kind(), ErrorKind::UnsupportedIndexing);

        let stepped = Index::Slice(Slice::full().with_step(2));
        assert_eq!(
            slice_arrayinfo(&[3, 4], &strides, &[stepped]).unwrap_err().kind(),
            ErrorKind::UnsupportedIndexing
        );

        let past_end = slice_arrayinfo(&[3, 4], &strides, &[slice(0, 4)]).unwrap_err();
        assert_eq!(past_end, Error::IndexOutOfRange { axis: 0, index: 4, dim: 3 });

        let too_many = slice_arrayinfo(&[3, 4], &strides, &[Index::Int(0), Index::Int(0), Index::Int(0)]).unwrap_err();
        assert_eq!(too_many, Error::TooManyIndices { got: 3, rank: 2 });

        assert!(slice_arrayinfo(&[3, 4], &strides, &[Index::Int(3)]).is_err());
    }

    #[test]
    fn test_broadcast_strides_pads_and_zeroes() -> Result<()> {
        let strides = row_major_strides(&[3, 1, 4], 4)?;
        let (shape, new_strides) = broadcast_strides(&[3, 1, 4], &strides, &[5, 3, 4, 4])?;
        assert_eq!(shape, vec![5, 3, 4, 4]);
        assert_eq!(new_strides, vec![0, 16, 0, 4]);
        Ok(())
    }

    #[test]
    fn test_broadcast_strides_rejects() {
        let strides = row_major_strides(&[3, 2], 4).unwrap();
        assert!(broadcast_strides(&[3, 2], &strides, &[3, 4]).is_err());
        // Cannot shrink rank
        assert!(broadcast_strides(&[3, 2], &strides, &[2]).is_err());
        // Broadcasting must produce exactly the target
        let strides = row_major_strides(&[3], 4).unwrap();
        assert!(broadcast_strides(&[3], &strides, &[1]).is_err());
    }

    proptest! {
        #[test]
        fn prop_broadcast_shapes_commutes(
            a in prop::collection::vec(prop_oneof![Just(1usize), 2usize..4], 0..4),
            b in prop::collection::vec(prop_oneof![Just(1usize), 2usize..4], 0..4),
        ) {
            let ab = broadcast_shapes(&[a.as_slice(), b.as_slice()]);
            let ba = broadcast_shapes(&[b.as_slice(), a.as_slice()]);
            prop_assert_eq!(ab.is_ok(), ba.is_ok());
            if let (Ok(ab), Ok(ba)) = (ab, ba) {
                prop_assert_eq!(ab, ba);
            }
        }

        #[test]
        fn prop_broadcast_to_own_result(shape in prop::collection::vec(1usize..4, 0..4), lead in prop::collection::vec(1usize..4, 0..3)) {
            let mut target = lead.clone();
            target.extend(&shape);
            let strides = row_major_strides(&shape, 4).unwrap();
            let (out, new_strides) = broadcast_strides(&shape, &strides, &target).unwrap();
            prop_assert_eq!(out, target);
            prop_assert!(new_strides[..lead.len()].iter().all(|&s| s == 0));
        }
    }
}
