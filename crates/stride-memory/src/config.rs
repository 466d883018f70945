//! Address space configuration

use std::env;

/// Default size of the reserved null page in bytes
pub const DEFAULT_NULL_RESERVE: usize = 4096;

/// Configuration for an [`AddressSpace`](crate::AddressSpace)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryConfig {
    /// Bytes reserved at address 0. No allocation is ever placed below this
    /// boundary and any access below it is a null pointer dereference.
    pub null_reserve: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            null_reserve: DEFAULT_NULL_RESERVE,
        }
    }
}

impl MemoryConfig {
    /// Build a configuration using environment hints.
    ///
    /// # Environment Variables
    ///
    /// - `STRIDE_NULL_RESERVE` - Size of the reserved null page in bytes (must be > 0)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var("STRIDE_NULL_RESERVE") {
            match value.trim().parse::<usize>() {
                Ok(reserve) if reserve > 0 => config.null_reserve = reserve,
                _ => tracing::warn!(
                    value = %value,
                    default = DEFAULT_NULL_RESERVE,
                    "ignoring invalid STRIDE_NULL_RESERVE"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_reserve() {
        assert_eq!(MemoryConfig::default().null_reserve, DEFAULT_NULL_RESERVE);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_reserve() {
        env::set_var("STRIDE_NULL_RESERVE", "256");
        let config = MemoryConfig::from_env();
        env::remove_var("STRIDE_NULL_RESERVE");
        assert_eq!(config.null_reserve, 256);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_reserve() {
        env::set_var("STRIDE_NULL_RESERVE", "0");
        let config = MemoryConfig::from_env();
        env::remove_var("STRIDE_NULL_RESERVE");
        assert_eq!(config.null_reserve, DEFAULT_NULL_RESERVE);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        env::set_var("STRIDE_NULL_RESERVE", "lots");
        let config = MemoryConfig::from_env();
        env::remove_var("STRIDE_NULL_RESERVE");
        assert_eq!(config.null_reserve, DEFAULT_NULL_RESERVE);
    }
}
