//! Handle-based array session
//!
//! A [`Session`] owns one address space, one codec registry and every array
//! created through it. Consumers refer to arrays by opaque [`ArrayHandle`]s, so
//! the dispatch layer above never holds Rust borrows into the runtime.
//!
//! Handles start at 1; 0 is never issued. Releasing a handle only forgets the
//! descriptor: the address space is an arena and its bytes stay allocated.

use std::collections::HashMap;
use std::fmt;

use stride_memory::AddressSpace;
use stride_tracing::performance::record_allocation;

use crate::array::{Array, Item, Operand};
use crate::codec::{CodecRegistry, Value};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::index::{Index, Slice};
use crate::shape;

/// Opaque reference to an array owned by a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayHandle(u64);

impl ArrayHandle {
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArrayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array{}", self.0)
    }
}

/// Index component that names index arrays by handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleIndex {
    Int(isize),
    Slice(Slice),
    Array(ArrayHandle),
}

impl From<isize> for HandleIndex {
    fn from(i: isize) -> Self {
        Self::Int(i)
    }
}

impl From<Slice> for HandleIndex {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl From<ArrayHandle> for HandleIndex {
    fn from(handle: ArrayHandle) -> Self {
        Self::Array(handle)
    }
}

/// Result of [`Session::get`]
#[derive(Debug, Clone, PartialEq)]
pub enum HandleItem {
    Value(Value),
    Array(ArrayHandle),
}

/// Right-hand side of [`Session::set`]
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOperand {
    Value(Value),
    Array(ArrayHandle),
}

/// Owner of an address space and the arrays allocated in it
#[derive(Debug)]
pub struct Session {
    memory: AddressSpace,
    codecs: CodecRegistry,
    arrays: HashMap<ArrayHandle, Array>,
    next_handle: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup(arrays: &HashMap<ArrayHandle, Array>, handle: ArrayHandle) -> Result<&Array> {
    arrays.get(&handle).ok_or(Error::InvalidHandle(handle.id()))
}

fn resolve_index<'a>(arrays: &'a HashMap<ArrayHandle, Array>, index: &[HandleIndex]) -> Result<Vec<Index<'a>>> {
    index
        .iter()
        .map(|component| match *component {
            HandleIndex::Int(i) => Ok(Index::Int(i)),
            HandleIndex::Slice(slice) => Ok(Index::Slice(slice)),
            HandleIndex::Array(handle) => lookup(arrays, handle).map(Index::Array),
        })
        .collect()
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        tracing::debug!(
            null_reserve = config.memory.null_reserve,
            byte_order = ?config.byte_order,
            "creating session"
        );
        Self {
            memory: AddressSpace::with_config(config.memory),
            codecs: CodecRegistry::builtin(config.byte_order),
            arrays: HashMap::new(),
            next_handle: 1,
        }
    }

    fn insert(&mut self, array: Array) -> ArrayHandle {
        let handle = ArrayHandle(self.next_handle);
        self.next_handle += 1;
        tracing::debug!(handle = %handle, shape = ?array.shape(), dtype = array.dtype().name(), "registered array");
        self.arrays.insert(handle, array);
        handle
    }

    /// Allocate a zeroed array of the named element type
    pub fn allocate_array(&mut self, shape: &[usize], dtype: &str) -> Result<ArrayHandle> {
        let codec = self.codecs.get(dtype)?;
        let array = Array::allocate(&mut self.memory, codec, shape)?;
        record_allocation(
            array.numel() * array.item_size(),
            self.memory.region_count(),
            self.memory.cursor(),
        );
        Ok(self.insert(array))
    }

    /// Allocate an array and fill it from `values` in row-major order
    pub fn array_from_values(&mut self, shape: &[usize], dtype: &str, values: &[Value]) -> Result<ArrayHandle> {
        let codec = self.codecs.get(dtype)?;
        let array = Array::from_values(&mut self.memory, codec, shape, values)?;
        Ok(self.insert(array))
    }

    /// Index an array; views and gathers come back as new handles
    pub fn get(&mut self, handle: ArrayHandle, index: &[HandleIndex]) -> Result<HandleItem> {
        let item = {
            let array = lookup(&self.arrays, handle)?;
            let index = resolve_index(&self.arrays, index)?;
            array.get(&mut self.memory, &index)?
        };
        Ok(match item {
            Item::Value(value) => HandleItem::Value(value),
            Item::Array(array) => HandleItem::Array(self.insert(array)),
        })
    }

    pub fn set(&mut self, handle: ArrayHandle, index: &[HandleIndex], operand: HandleOperand) -> Result<()> {
        let array = lookup(&self.arrays, handle)?;
        let index = resolve_index(&self.arrays, index)?;
        let operand = match operand {
            HandleOperand::Value(value) => Operand::Value(value),
            HandleOperand::Array(src) => Operand::Array(lookup(&self.arrays, src)?),
        };
        array.set(&mut self.memory, &index, operand)
    }

    /// Rebind the array behind `handle` to a broadcast view
    pub fn broadcast_to(&mut self, handle: ArrayHandle, shape: &[usize]) -> Result<()> {
        let array = self
            .arrays
            .get_mut(&handle)
            .ok_or(Error::InvalidHandle(handle.id()))?;
        array.broadcast_to(&self.memory, shape)
    }

    pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>> {
        shape::broadcast_shapes(shapes)
    }

    pub fn copy(&mut self, handle: ArrayHandle) -> Result<ArrayHandle> {
        let copy = lookup(&self.arrays, handle)?.copy(&mut self.memory)?;
        Ok(self.insert(copy))
    }

    pub fn shape(&self, handle: ArrayHandle) -> Result<Vec<usize>> {
        Ok(self.array(handle)?.shape().to_vec())
    }

    /// Byte strides of the array behind `handle`
    pub fn strides(&self, handle: ArrayHandle) -> Result<Vec<isize>> {
        Ok(self.array(handle)?.strides().to_vec())
    }

    pub fn array(&self, handle: ArrayHandle) -> Result<&Array> {
        lookup(&self.arrays, handle)
    }

    pub fn to_values(&self, handle: ArrayHandle) -> Result<Vec<Value>> {
        self.array(handle)?.to_values(&self.memory)
    }

    pub fn render(&self, handle: ArrayHandle) -> Result<String> {
        self.array(handle)?.render(&self.memory)
    }

    /// Forget a handle. Its bytes stay allocated, and views taken from it
    /// remain valid.
    pub fn release(&mut self, handle: ArrayHandle) -> Result<()> {
        self.arrays
            .remove(&handle)
            .map(|_| tracing::debug!(handle = %handle, "released array"))
            .ok_or(Error::InvalidHandle(handle.id()))
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.memory
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Register additional element types
    pub fn codecs_mut(&mut self) -> &mut CodecRegistry {
        &mut self.codecs
    }
}
