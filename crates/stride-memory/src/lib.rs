//! # stride-memory
//!
//! Simulated byte-addressable memory for the strided array runtime.
//!
//! The address space is an arena: regions are carved from a monotonically
//! increasing cursor, never overlap, never move and are never freed. The first
//! [`MemoryConfig::null_reserve`] bytes are never handed out so that address 0
//! behaves like a null pointer.
//!
//! ## Example
//!
//! ```
//! use stride_memory::AddressSpace;
//!
//! let mut mem = AddressSpace::new();
//! let region = mem.allocate(8)?;
//! mem.write(region, 4, &[1, 2, 3, 4])?;
//! assert_eq!(mem.read(region, 4, 2)?, vec![1, 2]);
//! # Ok::<(), stride_memory::MemoryError>(())
//! ```

pub mod address_space;
pub mod config;
pub mod error;
pub mod region;
pub mod storage;

pub use address_space::AddressSpace;
pub use config::{MemoryConfig, DEFAULT_NULL_RESERVE};
pub use error::{MemoryError, Result};
pub use region::Region;
pub use storage::MemoryStorage;
