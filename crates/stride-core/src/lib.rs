//! # stride-core
//!
//! Strided N-dimensional arrays backed by a simulated address space.
//!
//! Every array is an element codec plus a [`StridedView`]: a shape, byte
//! strides and a byte offset into one region of a
//! [`stride_memory::AddressSpace`]. Indexing follows NumPy rules for the
//! supported forms:
//!
//! | Index | Result |
//! |-------|--------|
//! | one integer per axis | decoded element |
//! | integers and slices | view sharing the source bytes |
//! | any integer index array | gathered copy |
//!
//! Broadcasting never copies: replicated axes get stride 0.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use stride_core::{idx, Array, Item, ScalarCodec, Value};
//! use stride_memory::AddressSpace;
//!
//! let mut mem = AddressSpace::new();
//! let values: Vec<Value> = (0..12).map(Value::I32).collect();
//! let ary = Array::from_values(&mut mem, Arc::new(ScalarCodec::i32()), &[3, 4], &values)?;
//!
//! let Item::Array(row) = ary.get(&mut mem, &idx![1])? else { unreachable!() };
//! assert_eq!(row.render(&mem)?, "[4, 5, 6, 7]");
//!
//! ary.set(&mut mem, &idx![1, 2], Value::I32(-1).into())?;
//! assert_eq!(row.get(&mut mem, &idx![2])?.into_value(), Some(Value::I32(-1)));
//! # Ok::<(), stride_core::Error>(())
//! ```
//!
//! For a handle-based interface that owns its memory, see [`Session`].

pub mod array;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod loop_nest;
pub mod session;
pub mod shape;
pub mod view;

pub use array::{Array, Item, Operand};
pub use codec::{ByteOrder, CodecRegistry, ElementCodec, RecordCodec, RecordField, ScalarCodec, ScalarKind, Value};
pub use config::RuntimeConfig;
pub use error::{Error, ErrorKind, Result};
pub use index::{Index, Slice};
pub use loop_nest::{Indices, LoopNest};
pub use session::{ArrayHandle, HandleIndex, HandleItem, HandleOperand, Session};
pub use shape::{broadcast_shapes, broadcast_strides, numel, row_major_strides, slice_arrayinfo, ArrayInfo};
pub use view::StridedView;
