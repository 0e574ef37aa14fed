//! Pass 1: find binding identities.

use crate::config::HunterConfig;
use crate::error::Result;
use crate::pass::{PassStats, SpanDecoder};
use crate::patterns::find_binding;
use crate::store::CorrelationStore;
use crate::window::{self, ByteSource, JoinMode};

/// Pass 1 keeps chunks intact and separates them with a space.
pub const DISCOVERY_JOIN: JoinMode = JoinMode::Separated(b' ');

/// Scan `source` for `__FilterToConsumerBinding` instances.
///
/// The returned store holds every binding found plus empty detail sets for
/// the consumer and filter names they reference.
pub fn discover_bindings<S: ByteSource>(
    source: &S,
    config: &HunterConfig,
) -> Result<(CorrelationStore, PassStats)> {
    let mut store = CorrelationStore::new();
    let mut stats = PassStats::default();
    let decoder = SpanDecoder::new(config.decode_policy);

    let mut scanner = window::scan(source, config.window_chunks, DISCOVERY_JOIN)?;
    while let Some(window) = scanner.next_window()? {
        let Some(binding) = find_binding(window.bytes) else {
            continue;
        };

        let Some(consumer) = decoder.decode(binding.consumer, "consumer name", window.index, &mut stats)?
        else {
            continue;
        };
        let Some(filter) = decoder.decode(binding.filter, "filter name", window.index, &mut stats)?
        else {
            continue;
        };

        let inserted = store.record_binding(consumer, filter);
        if inserted {
            tracing::debug!(
                consumer,
                filter,
                window = window.index,
                "Found FilterToConsumerBinding"
            );
        }
        stats.note_insert(inserted);
    }

    stats.chunks_read = scanner.chunks_read();
    stats.windows_scanned = scanner.windows_emitted();
    Ok((store, stats))
}
