#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Number of idle tasks each per-operation pool keeps for reuse.
    /// 256 by default.
    pub task_pool_capacity: usize,
    /// Whether lazy resolver results are materialized on the blocking thread pool.
    /// Enabled by default.
    pub offload_lazy_lists: bool,
    /// Number of result map buffers kept for reuse within one operation.
    /// 64 by default.
    pub result_buffer_pool_capacity: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            task_pool_capacity: 256,
            offload_lazy_lists: true,
            result_buffer_pool_capacity: 64,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid execution configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ExecutionConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }
}
