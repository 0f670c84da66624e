//! Process-wide default registry

use super::MeterRegistry;

static GLOBAL_REGISTRY: once_cell::sync::Lazy<MeterRegistry> =
    once_cell::sync::Lazy::new(MeterRegistry::new);

/// Get the process-wide default registry.
///
/// Libraries that cannot be handed a registry record here; applications
/// should prefer an explicitly constructed [`MeterRegistry`].
pub fn global_registry() -> &'static MeterRegistry {
    &GLOBAL_REGISTRY
}
