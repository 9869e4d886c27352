//! Callbacks the extractor reports noteworthy events through.

/// Observer for events raised while extracting one document.
///
/// All methods default to no-ops so implementors only override what they
/// care about.
pub trait ExtractionObserver {
    /// A Direct field was written twice and joined with the default joiner
    fn implicit_join(&mut self, _entity: &str, _field: &str) {}

    /// A section marker with no schema entry; its lines are dropped
    fn unmapped_section(&mut self, _tag: &str) {}

    /// A row of `entity` was closed into its table
    fn row_closed(&mut self, _entity: &str) {}
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExtractionObserver for TracingObserver {
    fn implicit_join(&mut self, entity: &str, field: &str) {
        tracing::debug!(entity, field, "No joiner specified, using default");
    }

    fn unmapped_section(&mut self, tag: &str) {
        tracing::trace!(tag, "Skipping unmapped section");
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ExtractionObserver for NullObserver {}
