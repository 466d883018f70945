//! Runtime configuration

use std::env;

use serde::{Deserialize, Serialize};
use stride_memory::MemoryConfig;

use crate::codec::ByteOrder;

/// Settings for a [`Session`](crate::Session)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub memory: MemoryConfig,
    /// Byte order of the built-in scalar codecs
    pub byte_order: ByteOrder,
}

impl RuntimeConfig {
    /// Build a configuration using environment hints.
    ///
    /// # Environment Variables
    ///
    /// - `STRIDE_NULL_RESERVE` - see [`MemoryConfig::from_env`]
    /// - `STRIDE_BYTE_ORDER` - `little` (default) or `big`
    pub fn from_env() -> Self {
        let mut config = Self {
            memory: MemoryConfig::from_env(),
            ..Self::default()
        };

        if let Ok(value) = env::var("STRIDE_BYTE_ORDER") {
            match ByteOrder::from_env_value(&value) {
                Some(order) => config.byte_order = order,
                None => tracing::warn!(value = %value, "ignoring invalid STRIDE_BYTE_ORDER"),
            }
        }

        config
    }
}
