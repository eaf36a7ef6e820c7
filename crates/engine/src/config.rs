//! Engine configuration

/// Tunables for opening a persistent engine.
///
/// The defaults leave sizing decisions to the underlying store.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Page cache size in bytes; `None` uses the engine's default.
    pub cache_bytes: Option<usize>,
}

impl EngineConfig {
    /// Configuration with a fixed page cache size.
    pub fn with_cache_bytes(cache_bytes: usize) -> Self {
        EngineConfig {
            cache_bytes: Some(cache_bytes),
        }
    }
}
