//! Typed arrays
//!
//! An [`Array`] pairs an element codec with a [`StridedView`] and implements
//! the indexing protocol on top of them:
//!
//! - all-integer index: one decoded element
//! - any slice (or fewer components than axes): an aliasing view, no copy
//! - any integer array: a gather into a freshly allocated array
//!
//! Assignment accepts the same integer and slice forms. Assigning through an
//! index array (scatter) is not supported.

use std::sync::Arc;

use stride_memory::MemoryStorage;
use stride_tracing::performance::record_traversal;
use stride_tracing::{perf_event, perf_span};

use crate::codec::{ElementCodec, Value};
use crate::error::{Error, Result};
use crate::index::{resolve_int, Index, Slice};
use crate::loop_nest::LoopNest;
use crate::shape::{broadcast_shapes, numel, row_major_strides, slice_arrayinfo};
use crate::view::StridedView;

/// Result of [`Array::get`]
#[derive(Debug, Clone)]
pub enum Item {
    Value(Value),
    Array(Array),
}

impl Item {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Array(_) => None,
        }
    }

    pub fn into_array(self) -> Option<Array> {
        match self {
            Self::Array(array) => Some(array),
            Self::Value(_) => None,
        }
    }
}

/// Right-hand side of [`Array::set`]
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    /// Written to every selected element
    Value(Value),
    /// Copied element-wise; must match the selection's shape exactly
    Array(&'a Array),
}

impl From<Value> for Operand<'_> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<'a> From<&'a Array> for Operand<'a> {
    fn from(array: &'a Array) -> Self {
        Self::Array(array)
    }
}

/// N-dimensional array of codec-encoded elements
#[derive(Debug, Clone)]
pub struct Array {
    dtype: Arc<dyn ElementCodec>,
    data: StridedView,
}

/// Where one source axis takes its coordinate from during a gather
enum AxisSource {
    /// Integer component
    Fixed(usize),
    /// Index array, resolved per flat position of the broadcast index shape
    Table(Vec<usize>),
    /// Sliced axis, offset by `start`, driven by output axis `out_axis`
    Range { start: usize, out_axis: usize },
}

impl Array {
    /// Allocate a zeroed row-major array
    pub fn allocate<M>(mem: &mut M, dtype: Arc<dyn ElementCodec>, shape: &[usize]) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        let data = StridedView::allocate_contiguous(mem, shape, dtype.size())?;
        Ok(Self { dtype, data })
    }

    /// Wrap an existing view, which must hold elements of the codec's width
    pub fn from_view(dtype: Arc<dyn ElementCodec>, data: StridedView) -> Result<Self> {
        if dtype.size() != data.item_size() {
            return Err(Error::codec(format!(
                "{} codec is {} bytes wide but the view holds {}-byte elements",
                dtype.name(),
                dtype.size(),
                data.item_size()
            )));
        }
        Ok(Self { dtype, data })
    }

    /// Allocate an array and fill it from `values` in row-major order
    pub fn from_values<M>(mem: &mut M, dtype: Arc<dyn ElementCodec>, shape: &[usize], values: &[Value]) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        if values.len() != numel(shape)? {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                actual: vec![values.len()],
            });
        }

        let array = Self::allocate(mem, dtype, shape)?;
        let mut buf = vec![0u8; array.item_size()];
        let mut values = values.iter();
        LoopNest::new(shape).try_fold((), |(), index| {
            // counts agree, checked above
            if let Some(value) = values.next() {
                array.dtype.encode(value, &mut buf)?;
                array.data.store_bytes(mem, index, &buf)?;
            }
            Ok::<_, Error>(())
        })?;
        Ok(array)
    }

    pub fn dtype(&self) -> &Arc<dyn ElementCodec> {
        &self.dtype
    }

    pub fn data(&self) -> &StridedView {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn strides(&self) -> &[isize] {
        self.data.strides()
    }

    pub fn ndim(&self) -> usize {
        self.data.rank()
    }

    pub fn numel(&self) -> usize {
        self.data.numel()
    }

    pub fn item_size(&self) -> usize {
        self.data.item_size()
    }

    /// Index the array
    ///
    /// `mem` is mutable because a gather allocates its result.
    pub fn get<M>(&self, mem: &mut M, index: &[Index<'_>]) -> Result<Item>
    where
        M: MemoryStorage + ?Sized,
    {
        self.check_index_len(index)?;

        if index.iter().any(Index::is_array) {
            return self.gather(mem, index).map(Item::Array);
        }

        match self.int_indices(index)? {
            Some(indices) => self.data.load(mem, &indices, self.dtype.as_ref()).map(Item::Value),
            None => self.slice_view(mem, index).map(Item::Array),
        }
    }

    /// Assign through an integer or slice index
    pub fn set<M>(&self, mem: &mut M, index: &[Index<'_>], operand: Operand<'_>) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        self.check_index_len(index)?;

        if index.iter().any(Index::is_array) {
            return Err(Error::unsupported("assignment through an index array (scatter)"));
        }

        match self.int_indices(index)? {
            Some(indices) => {
                let value = match operand {
                    Operand::Value(value) => value,
                    Operand::Array(src) if src.ndim() == 0 => src.data.load(mem, &[], src.dtype.as_ref())?,
                    Operand::Array(src) => {
                        return Err(Error::ShapeMismatch {
                            expected: Vec::new(),
                            actual: src.shape().to_vec(),
                        })
                    }
                };
                self.data.store(mem, &indices, self.dtype.as_ref(), &value)
            }
            None => {
                let dest = self.slice_view(mem, index)?;
                match operand {
                    Operand::Value(value) => dest.fill(mem, &value),
                    Operand::Array(src) => dest.assign(mem, src),
                }
            }
        }
    }

    /// Rebind this array to a broadcast view of its data
    ///
    /// Views and copies taken earlier keep their own layout.
    pub fn broadcast_to<M>(&mut self, mem: &M, target: &[usize]) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        self.data = self.data.broadcast_to(mem, target)?;
        Ok(())
    }

    /// Independent contiguous copy
    pub fn copy<M>(&self, mem: &mut M) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        let span = perf_span!("copy", elements = self.numel());
        let _guard = span.enter();
        let dest = Self::allocate(mem, Arc::clone(&self.dtype), self.shape())?;
        dest.transfer_from(mem, self)?;
        Ok(dest)
    }

    /// Write `value` into every element
    pub fn fill<M>(&self, mem: &mut M, value: &Value) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        let span = perf_span!("fill", elements = self.numel());
        let _guard = span.enter();
        let mut buf = vec![0u8; self.item_size()];
        self.dtype.encode(value, &mut buf)?;
        LoopNest::new(self.shape()).try_fold((), |(), index| self.data.store_bytes(mem, index, &buf))
    }

    /// All elements in row-major order
    pub fn to_values<M>(&self, mem: &M) -> Result<Vec<Value>>
    where
        M: MemoryStorage + ?Sized,
    {
        LoopNest::new(self.shape()).try_fold(Vec::with_capacity(self.numel()), |mut values, index| {
            values.push(self.data.load(mem, index, self.dtype.as_ref())?);
            Ok(values)
        })
    }

    /// Nested-bracket text form, e.g. `[[0, 1], [2, 3]]`
    pub fn render<M>(&self, mem: &M) -> Result<String>
    where
        M: MemoryStorage + ?Sized,
    {
        let shape = self.shape();
        if shape.is_empty() {
            return Ok(self.data.load(mem, &[], self.dtype.as_ref())?.to_string());
        }
        if self.numel() == 0 {
            return Ok("[]".to_string());
        }

        LoopNest::new(shape).try_fold(String::new(), |mut out, index| {
            if !out.is_empty() {
                out.push_str(", ");
            }
            let opens = index.iter().rev().take_while(|&&i| i == 0).count();
            out.extend(std::iter::repeat('[').take(opens));

            out.push_str(&self.data.load(mem, index, self.dtype.as_ref())?.to_string());

            let closes = index
                .iter()
                .zip(shape)
                .rev()
                .take_while(|&(&i, &dim)| i + 1 == dim)
                .count();
            out.extend(std::iter::repeat(']').take(closes));
            Ok(out)
        })
    }

    fn check_index_len(&self, index: &[Index<'_>]) -> Result<()> {
        if index.len() > self.ndim() {
            return Err(Error::TooManyIndices {
                got: index.len(),
                rank: self.ndim(),
            });
        }
        Ok(())
    }

    /// Element coordinates when `index` is one integer per axis
    fn int_indices(&self, index: &[Index<'_>]) -> Result<Option<Vec<usize>>> {
        if index.len() < self.ndim() {
            return Ok(None);
        }
        let mut indices = Vec::with_capacity(index.len());
        for (axis, (component, &dim)) in index.iter().zip(self.shape()).enumerate() {
            match component {
                Index::Int(i) => indices.push(resolve_int(*i, axis, dim)?),
                _ => return Ok(None),
            }
        }
        Ok(Some(indices))
    }

    fn slice_view<M>(&self, mem: &M, index: &[Index<'_>]) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        let info = slice_arrayinfo(self.shape(), self.strides(), index)?;
        let data = self.data.view(mem, info.shape, info.strides, info.offset)?;
        Ok(Self {
            dtype: Arc::clone(&self.dtype),
            data,
        })
    }

    /// Copy `src` element-wise into this array, which must have its exact shape
    fn assign<M>(&self, mem: &mut M, src: &Array) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        if src.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape().to_vec(),
                actual: src.shape().to_vec(),
            });
        }

        let span = perf_span!("assign", elements = self.numel());
        let _guard = span.enter();
        if src.data.region() == self.data.region() {
            // Overlapping views must not observe their own partial writes
            perf_event!("assign_staged", elements = self.numel());
            let staged = src.copy(mem)?;
            self.transfer_from(mem, &staged)
        } else {
            self.transfer_from(mem, src)
        }
    }

    /// Element-wise copy from a same-shaped array
    fn transfer_from<M>(&self, mem: &mut M, src: &Array) -> Result<()>
    where
        M: MemoryStorage + ?Sized,
    {
        let nest = LoopNest::new(self.shape());
        if Arc::ptr_eq(&self.dtype, &src.dtype) {
            let mut buf = vec![0u8; self.item_size()];
            nest.try_fold((), |(), index| {
                src.data.load_bytes(mem, index, &mut buf)?;
                self.data.store_bytes(mem, index, &buf)
            })
        } else {
            nest.try_fold((), |(), index| {
                let value = src.data.load(mem, index, src.dtype.as_ref())?;
                self.data.store(mem, index, self.dtype.as_ref(), &value)
            })
        }
    }

    /// Advanced indexing into a new contiguous array
    ///
    /// Integer components count as 0-d index arrays. All index arrays are
    /// broadcast together to a shape `B`. When the advanced components are
    /// adjacent, `B` replaces them in place; otherwise `B` leads and the sliced
    /// axes follow in order.
    fn gather<M>(&self, mem: &mut M, index: &[Index<'_>]) -> Result<Self>
    where
        M: MemoryStorage + ?Sized,
    {
        let rank = self.ndim();
        let full = Index::Slice(Slice::full());
        let component = |axis: usize| index.get(axis).copied().unwrap_or(full);

        let advanced: Vec<usize> = (0..rank)
            .filter(|&axis| !matches!(component(axis), Index::Slice(_)))
            .collect();
        let adv_shapes: Vec<&[usize]> = advanced
            .iter()
            .map(|&axis| match component(axis) {
                Index::Array(array) => array.shape(),
                _ => &[][..],
            })
            .collect();
        let b_shape = broadcast_shapes(&adv_shapes)?;

        // Output position of the broadcast block: in place of adjacent advanced
        // components, otherwise in front
        let adjacent = match (advanced.first(), advanced.last()) {
            (Some(&first), Some(&last)) => last - first + 1 == advanced.len(),
            _ => false,
        };
        let b_at = match advanced.first() {
            Some(&first) if adjacent => (0..first).filter(|&axis| !advanced.contains(&axis)).count(),
            _ => 0,
        };

        let mut out_shape = Vec::with_capacity(rank + b_shape.len());
        let mut sources = Vec::with_capacity(rank);
        for axis in 0..rank {
            let dim = self.shape()[axis];
            let source = match component(axis) {
                Index::Slice(slice) => {
                    if out_shape.len() == b_at {
                        out_shape.extend_from_slice(&b_shape);
                    }
                    let (start, stop) = slice.resolve(axis, dim)?;
                    out_shape.push(stop - start);
                    AxisSource::Range {
                        start,
                        out_axis: out_shape.len() - 1,
                    }
                }
                Index::Int(i) => AxisSource::Fixed(resolve_int(i, axis, dim)?),
                Index::Array(array) => AxisSource::Table(self.index_table(mem, array, &b_shape, axis)?),
            };
            sources.push(source);
        }
        if out_shape.len() == b_at {
            // No sliced axis follows the broadcast block
            out_shape.extend_from_slice(&b_shape);
        }

        let result = Self::allocate(mem, Arc::clone(&self.dtype), &out_shape)?;
        let span = perf_span!("gather", elements = result.numel(), index_arrays = adv_shapes.len());
        let _guard = span.enter();

        let b_strides = row_major_strides(&b_shape, 1)?;
        let mut src_index = vec![0usize; rank];
        let mut buf = vec![0u8; self.item_size()];

        LoopNest::new(out_shape.as_slice()).try_fold((), |(), out_index| {
            let b_flat: usize = out_index[b_at..b_at + b_shape.len()]
                .iter()
                .zip(&b_strides)
                .map(|(&i, &s)| i * s as usize)
                .sum();

            for (slot, source) in src_index.iter_mut().zip(&sources) {
                *slot = match source {
                    AxisSource::Fixed(i) => *i,
                    AxisSource::Table(table) => table[b_flat],
                    AxisSource::Range { start, out_axis } => start + out_index[*out_axis],
                };
            }

            self.data.load_bytes(mem, &src_index, &mut buf)?;
            result.data.store_bytes(mem, out_index, &buf)
        })?;

        record_traversal("gather", result.numel(), span.elapsed_us());
        tracing::debug!(shape = ?self.shape(), result = ?out_shape, "gathered");
        Ok(result)
    }

    /// Positions selected by `array` along `axis`, one per flat element of `b_shape`
    fn index_table<M>(&self, mem: &M, array: &Array, b_shape: &[usize], axis: usize) -> Result<Vec<usize>>
    where
        M: MemoryStorage + ?Sized,
    {
        if !array.dtype.is_integer() {
            return Err(Error::unsupported(format!(
                "index array on axis {axis} has non-integer element type {}",
                array.dtype.name()
            )));
        }

        let dim = self.shape()[axis];
        let view = array.data.broadcast_to(mem, b_shape)?;
        LoopNest::new(b_shape).try_fold(Vec::with_capacity(numel(b_shape)?), |mut table, position| {
            let value = view.load(mem, position, array.dtype.as_ref())?;
            let raw = value.as_integer().ok_or_else(|| {
                Error::unsupported(format!("index array on axis {axis} produced non-integer {value}"))
            })?;
            if raw < 0 {
                return Err(Error::unsupported(format!("negative index {raw} on axis {axis}")));
            }
            if raw >= dim as i128 {
                return Err(Error::IndexOutOfRange {
                    axis,
                    index: isize::try_from(raw).unwrap_or(isize::MAX),
                    dim,
                });
            }
            table.push(raw as usize);
            Ok(table)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ByteOrder, RecordCodec, ScalarCodec, ScalarKind};
    use crate::error::ErrorKind;
    use crate::idx;
    use std::sync::Mutex;
    use stride_memory::AddressSpace;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    /// Span names enclosing each event, innermost first
    #[derive(Clone, Default)]
    struct EventScopes(Arc<Mutex<Vec<Vec<&'static str>>>>);

    impl<S> Layer<S> for EventScopes
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
            let names = ctx
                .event_scope(event)
                .map(|scope| scope.map(|span| span.name()).collect())
                .unwrap_or_default();
            self.0.lock().unwrap().push(names);
        }
    }

    fn i32_codec() -> Arc<dyn ElementCodec> {
        Arc::new(ScalarCodec::i32())
    }

    fn arange(mem: &mut AddressSpace, shape: &[usize]) -> Result<Array> {
        let values: Vec<Value> = (0..numel(shape)? as i32).map(Value::I32).collect();
        Array::from_values(mem, i32_codec(), shape, &values)
    }

    fn view_of(item: Item) -> Array {
        item.into_array().expect("expected an array")
    }

    #[test]
    fn test_scalar_round_trip() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = Array::allocate(&mut mem, i32_codec(), &[3, 4])?;
        ary.set(&mut mem, &idx![0, 0], Value::I32(0xcafe).into())?;
        assert_eq!(ary.get(&mut mem, &idx![0, 0])?.into_value(), Some(Value::I32(0xcafe)));
        Ok(())
    }

    #[test]
    fn test_slice_shapes() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[3, 4, 5])?;

        assert_eq!(view_of(ary.get(&mut mem, &idx![0])?).shape(), &[4, 5]);
        assert_eq!(view_of(ary.get(&mut mem, &idx![0, .., 0])?).shape(), &[4]);
        assert_eq!(view_of(ary.get(&mut mem, &idx![0, 1..3])?).shape(), &[2, 5]);
        Ok(())
    }

    #[test]
    fn test_slices_do_not_allocate() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[3, 4])?;
        let before = mem.allocated_bytes();
        let row = view_of(ary.get(&mut mem, &idx![2])?);
        assert_eq!(mem.allocated_bytes(), before);
        assert_eq!(row.data().region(), ary.data().region());
        Ok(())
    }

    #[test]
    fn test_too_many_indices() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[2, 2])?;
        let err = ary.get(&mut mem, &idx![0, 0, 0]).unwrap_err();
        assert_eq!(err, Error::TooManyIndices { got: 3, rank: 2 });
        Ok(())
    }

    #[test]
    fn test_scatter_is_rejected() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[4])?;
        let idx_ary = arange(&mut mem, &[2])?;
        let err = ary.set(&mut mem, &idx![&idx_ary], Value::I32(1).into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedIndexing);
        Ok(())
    }

    #[test]
    fn test_assign_shape_must_match() -> Result<()> {
        let mut mem = AddressSpace::new();
        let dest = Array::allocate(&mut mem, i32_codec(), &[3, 3, 4])?;
        let wrong = arange(&mut mem, &[3, 1])?;
        let err = dest.set(&mut mem, &idx![0], (&wrong).into()).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                expected: vec![3, 4],
                actual: vec![3, 1]
            }
        );
        Ok(())
    }

    #[test]
    fn test_array_operand_into_element() -> Result<()> {
        let mut mem = AddressSpace::new();
        let dest = Array::allocate(&mut mem, i32_codec(), &[2])?;
        let scalar = Array::from_values(&mut mem, i32_codec(), &[], &[Value::I32(5)])?;
        dest.set(&mut mem, &idx![1], (&scalar).into())?;
        assert_eq!(dest.to_values(&mem)?, vec![Value::I32(0), Value::I32(5)]);

        let vector = arange(&mut mem, &[2])?;
        assert!(dest.set(&mut mem, &idx![0], (&vector).into()).is_err());
        Ok(())
    }

    #[test]
    fn test_overlapping_assignment_is_staged() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[5])?;
        let head = view_of(ary.get(&mut mem, &idx![0..4])?);

        // ary[1:5] = ary[0:4]
        ary.set(&mut mem, &idx![1..5], (&head).into())?;
        let expected: Vec<Value> = [0, 0, 1, 2, 3].into_iter().map(Value::I32).collect();
        assert_eq!(ary.to_values(&mem)?, expected);
        Ok(())
    }

    #[test]
    fn test_assign_converts_between_codecs() -> Result<()> {
        let mut mem = AddressSpace::new();
        let big = Arc::new(ScalarCodec::new(ScalarKind::I32, ByteOrder::Big));
        let dest = Array::allocate(&mut mem, big, &[3])?;
        let src = arange(&mut mem, &[3])?;
        dest.set(&mut mem, &idx![..], (&src).into())?;
        assert_eq!(dest.to_values(&mem)?, src.to_values(&mem)?);
        assert_eq!(mem.read(dest.data().region(), 8, 4)?, vec![0, 0, 0, 2]);
        Ok(())
    }

    #[test]
    fn test_mixed_codec_assignment_fails_on_variant() -> Result<()> {
        let mut mem = AddressSpace::new();
        let dest = Array::allocate(&mut mem, Arc::new(ScalarCodec::new(ScalarKind::F32, ByteOrder::Little)), &[2])?;
        let src = arange(&mut mem, &[2])?;
        let err = dest.set(&mut mem, &idx![..], (&src).into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CodecMismatch);
        Ok(())
    }

    #[test]
    fn test_from_view_checks_width() -> Result<()> {
        let mut mem = AddressSpace::new();
        let view = StridedView::allocate_contiguous(&mut mem, &[2], 8)?;
        assert!(Array::from_view(i32_codec(), view.clone()).is_err());
        let float64 = Arc::new(ScalarCodec::new(ScalarKind::F64, ByteOrder::Little));
        assert_eq!(Array::from_view(float64, view)?.shape(), &[2]);
        Ok(())
    }

    #[test]
    fn test_from_values_count_must_match() {
        let mut mem = AddressSpace::new();
        let err = Array::from_values(&mut mem, i32_codec(), &[2, 2], &[Value::I32(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_render() -> Result<()> {
        let mut mem = AddressSpace::new();
        assert_eq!(arange(&mut mem, &[2, 2])?.render(&mem)?, "[[0, 1], [2, 3]]");
        assert_eq!(arange(&mut mem, &[3])?.render(&mem)?, "[0, 1, 2]");
        assert_eq!(arange(&mut mem, &[])?.render(&mem)?, "0");
        assert_eq!(arange(&mut mem, &[2, 0])?.render(&mem)?, "[]");
        assert_eq!(
            arange(&mut mem, &[2, 1, 2])?.render(&mem)?,
            "[[[0, 1]], [[2, 3]]]"
        );
        Ok(())
    }

    #[test]
    fn test_gather_with_two_index_arrays() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[3, 4])?;
        let rows = Array::from_values(&mut mem, i32_codec(), &[2, 1], &[Value::I32(0), Value::I32(2)])?;
        let cols = Array::from_values(&mut mem, i32_codec(), &[3], &[Value::I32(3), Value::I32(0), Value::I32(1)])?;

        let picked = view_of(ary.get(&mut mem, &idx![&rows, &cols])?);
        assert_eq!(picked.shape(), &[2, 3]);
        assert_eq!(picked.render(&mem)?, "[[3, 0, 1], [11, 8, 9]]");
        Ok(())
    }

    #[test]
    fn test_gather_non_adjacent_moves_block_first() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[2, 3, 4])?;
        let first = Array::from_values(&mut mem, i32_codec(), &[2], &[Value::I32(1), Value::I32(0)])?;

        // Advanced components on axes 0 and 2 are split by a slice
        let picked = view_of(ary.get(&mut mem, &idx![&first, .., 3])?);
        assert_eq!(picked.shape(), &[2, 3]);
        assert_eq!(picked.render(&mem)?, "[[15, 19, 23], [3, 7, 11]]");
        Ok(())
    }

    #[test]
    fn test_gather_rejects_bad_index_arrays() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[3])?;

        let negative = Array::from_values(&mut mem, i32_codec(), &[1], &[Value::I32(-1)])?;
        let err = ary.get(&mut mem, &idx![&negative]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedIndexing);

        let too_big = Array::from_values(&mut mem, i32_codec(), &[1], &[Value::I32(3)])?;
        let err = ary.get(&mut mem, &idx![&too_big]).unwrap_err();
        assert_eq!(err, Error::IndexOutOfRange { axis: 0, index: 3, dim: 3 });

        let floats = Array::allocate(&mut mem, Arc::new(ScalarCodec::new(ScalarKind::F32, ByteOrder::Little)), &[1])?;
        let err = ary.get(&mut mem, &idx![&floats]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedIndexing);
        Ok(())
    }

    #[test]
    fn test_gather_result_does_not_alias() -> Result<()> {
        let mut mem = AddressSpace::new();
        let ary = arange(&mut mem, &[3])?;
        let which = Array::from_values(&mut mem, i32_codec(), &[2], &[Value::I32(2), Value::I32(2)])?;
        let picked = view_of(ary.get(&mut mem, &idx![&which])?);

        ary.fill(&mut mem, &Value::I32(-1))?;
        assert_eq!(picked.to_values(&mem)?, vec![Value::I32(2), Value::I32(2)]);
        Ok(())
    }

    #[test]
    fn test_record_elements() -> Result<()> {
        let mut mem = AddressSpace::new();
        let point = Arc::new(RecordCodec::new(
            "point",
            [("x", ScalarKind::I16), ("y", ScalarKind::I16)],
            ByteOrder::Little,
        )?);
        let ary = Array::allocate(&mut mem, point.clone(), &[2])?;
        let p = Value::Record(vec![Value::I16(3), Value::I16(-4)]);
        ary.set(&mut mem, &idx![1], p.clone().into())?;

        let got = ary.get(&mut mem, &idx![1])?.into_value().unwrap();
        assert_eq!(got, p);
        assert_eq!(point.field(&got, "y")?, &Value::I16(-4));
        assert_eq!(ary.render(&mem)?, "[(0, 0), (3, -4)]");
        Ok(())
    }

    #[test]
    fn test_copy_and_fill_events_nest_under_perf_span() -> Result<()> {
        let scopes = EventScopes::default();
        let subscriber = tracing_subscriber::registry().with(scopes.clone());

        tracing::subscriber::with_default(subscriber, || {
            let mut mem = AddressSpace::new();
            let ary = arange(&mut mem, &[2, 3])?;
            let scopes_before = scopes.0.lock().unwrap().len();

            // The copy's allocation logs from inside the perf span
            let copy = ary.copy(&mut mem)?;
            copy.fill(&mut mem, &Value::I32(7))?;
            let recorded = scopes.0.lock().unwrap();
            assert!(recorded.len() > scopes_before);
            assert!(recorded[scopes_before..].iter().all(|names| names.contains(&"perf")));
            Ok(())
        })
    }
}
