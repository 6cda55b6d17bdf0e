//! Long-term memory for WindowScout: stores, retention policy, and the
//! service the workflow recalls from and writes to.

pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod retention;
pub mod search;
pub mod service;

pub use file_backend::FileBackend;
pub use in_memory::InMemoryBackend;
pub use noop::NoopMemory;
pub use retention::RetentionPolicy;
pub use service::{MemoryService, RecalledMemory, format_context};

use std::sync::Arc;
use windowscout_config::AppConfig;
use windowscout_core::memory::MemoryStore;

/// Build the store named by `memory.backend`.
pub fn build_store(config: &AppConfig) -> Arc<dyn MemoryStore> {
    match config.memory.backend.as_str() {
        "in_memory" => Arc::new(InMemoryBackend::new()),
        "none" => Arc::new(NoopMemory),
        _ => Arc::new(FileBackend::new(config.memory_path())),
    }
}

/// Build a [`MemoryService`] from configuration.
pub fn build_service(config: &AppConfig) -> MemoryService {
    MemoryService::new(build_store(config), RetentionPolicy::from_config(&config.memory))
        .with_recall_limit(config.memory.recall_limit)
        .with_max_entry_chars(config.memory.max_entry_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_selection() {
        let mut config = AppConfig::default();
        config.memory.backend = "in_memory".into();
        assert_eq!(build_store(&config).name(), "in_memory");
        config.memory.backend = "none".into();
        assert_eq!(build_store(&config).name(), "none");
    }

    #[test]
    fn file_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.memory.path = Some(dir.path().join("mem.jsonl"));
        let service = build_service(&config);
        assert_eq!(service.store_name(), "file");
        assert_eq!(service.policy().retention_days, 90);
    }
}
