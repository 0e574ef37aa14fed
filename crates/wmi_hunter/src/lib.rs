//! WMI Hunter - FilterToConsumerBinding carving for raw WMI repositories
//!
//! Finds WMI event subscription persistence by keyword searching the raw bytes
//! of `OBJECTS.DATA`, without parsing the repository's page or index
//! structures. Deleted records left in unallocated repository space are found
//! the same way as live ones.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐     ┌────────────┐
//! │ OBJECTS.DATA│────▶│ pass 1:      │────▶│ pass 2:       │────▶│ assembler  │
//! │  (windows)  │     │ bindings     │     │ consumers +   │     │ (report)   │
//! │             │     │ → names      │     │ filters       │     │            │
//! └─────────────┘     └──────────────┘     └───────────────┘     └────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Window**: the last few newline-terminated chunks joined into one buffer
//! - **Binding**: `__FilterToConsumerBinding` naming a consumer and a filter
//! - **Detail set**: records recovered for one name, deduplicated by content hash

pub mod config;
pub mod correlate;
pub mod discovery;
pub mod error;
pub mod pass;
pub mod patterns;
pub mod report;
pub mod store;
pub mod window;

pub use config::{AnnotationRule, DecodePolicy, HunterConfig};
pub use error::{HunterError, Result};
pub use pass::PassStats;
pub use report::{render, BindingReport, RenderStyle, Report};
pub use store::{CommandLineConsumer, ConsumerDetail, CorrelationStore, FilterDetail};
pub use window::{ByteSource, FileSource, MemorySource};

use std::time::Instant;

/// Result of a full run over one source.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub report: Report,
    pub discovery: PassStats,
    pub correlation: PassStats,
}

/// Milestones reported while a hunt runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntProgress {
    DiscoveryStarted,
    BindingsFound(usize),
    CorrelationFinished,
}

/// Run binding discovery, detail correlation and assembly over `source`.
pub fn hunt<S: ByteSource>(source: &S, config: &HunterConfig) -> Result<ScanOutcome> {
    hunt_with_progress(source, config, |_| {})
}

/// [`hunt`], calling `on_progress` between passes.
pub fn hunt_with_progress<S, F>(
    source: &S,
    config: &HunterConfig,
    mut on_progress: F,
) -> Result<ScanOutcome>
where
    S: ByteSource,
    F: FnMut(HuntProgress),
{
    config.validate()?;
    let label = source.describe();
    let start = Instant::now();

    tracing::info!(
        source = %label,
        window_chunks = config.window_chunks,
        "Searching for FilterToConsumerBindings"
    );
    on_progress(HuntProgress::DiscoveryStarted);
    let (mut store, discovery) = discovery::discover_bindings(source, config)?;
    tracing::info!(
        bindings = store.binding_count(),
        windows = discovery.windows_scanned,
        chunks = discovery.chunks_read,
        "Binding discovery finished"
    );
    on_progress(HuntProgress::BindingsFound(store.binding_count()));

    let correlation = correlate::correlate_details(source, config, &mut store)?;
    tracing::info!(
        recorded = correlation.recorded,
        duplicates = correlation.duplicates,
        decode_skips = correlation.decode_skips,
        windows = correlation.windows_scanned,
        "Consumer and filter correlation finished"
    );
    on_progress(HuntProgress::CorrelationFinished);
    if discovery.decode_skips + correlation.decode_skips > 0 {
        tracing::warn!(
            skipped = discovery.decode_skips + correlation.decode_skips,
            "Some candidate records were dropped because they were not valid UTF-8"
        );
    }

    let report = report::assemble(&store, config);
    tracing::info!(
        bindings = report.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Hunt complete"
    );

    Ok(ScanOutcome {
        report,
        discovery,
        correlation,
    })
}
