//! Pass 2: recover consumer and filter records for the names found in pass 1.

use crate::config::HunterConfig;
use crate::error::Result;
use crate::pass::{PassStats, SpanDecoder};
use crate::patterns::{
    contains, ConsumerMatcher, FilterMatcher, COMMAND_LINE_MARKER, CONSUMER_MARKER,
};
use crate::store::{CommandLineConsumer, ConsumerDetail, CorrelationStore, FilterDetail};
use crate::window::{self, ByteSource, JoinMode, Window};

/// Pass 2 drops line terminators so records split on `\n` rejoin.
pub const CORRELATION_JOIN: JoinMode = JoinMode::StripTerminators;

/// Re-scan `source` and add consumer/filter details to `store`.
///
/// Only names already present in the store are searched for, so binding
/// discovery must have completed first.
pub fn correlate_details<S: ByteSource>(
    source: &S,
    config: &HunterConfig,
    store: &mut CorrelationStore,
) -> Result<PassStats> {
    let consumers = store
        .consumer_names()
        .map(ConsumerMatcher::new)
        .collect::<Result<Vec<_>>>()?;
    let filters = store
        .filter_names()
        .map(FilterMatcher::new)
        .collect::<Result<Vec<_>>>()?;

    let mut stats = PassStats::default();
    if consumers.is_empty() && filters.is_empty() {
        tracing::debug!("No names to correlate, skipping detail pass");
        return Ok(stats);
    }

    let mut pass = Correlator {
        decoder: SpanDecoder::new(config.decode_policy),
        store,
        stats: &mut stats,
    };

    let mut scanner = window::scan(source, config.window_chunks, CORRELATION_JOIN)?;
    while let Some(window) = scanner.next_window()? {
        if contains(window.bytes, CONSUMER_MARKER) {
            let command_line = contains(window.bytes, COMMAND_LINE_MARKER);
            for matcher in &consumers {
                if command_line {
                    pass.command_line_consumer(matcher, window)?;
                } else {
                    pass.generic_consumer(matcher, window)?;
                }
            }
        }

        for matcher in &filters {
            if matcher.mentioned_in(window.bytes) {
                pass.filter(matcher, window)?;
            }
        }
    }

    stats.chunks_read = scanner.chunks_read();
    stats.windows_scanned = scanner.windows_emitted();
    Ok(stats)
}

struct Correlator<'a> {
    decoder: SpanDecoder,
    store: &'a mut CorrelationStore,
    stats: &'a mut PassStats,
}

impl Correlator<'_> {
    fn command_line_consumer(&mut self, matcher: &ConsumerMatcher, window: Window<'_>) -> Result<()> {
        let Some(cap) = matcher.match_command_line(window.bytes) else {
            return Ok(());
        };

        let Some(consumer_type) = self.text(cap.consumer_type, "consumer type", window)? else {
            return Ok(());
        };
        let Some(arguments) = self.text(cap.arguments, "consumer arguments", window)? else {
            return Ok(());
        };
        let Some(name) = self.text(cap.name, "consumer name", window)? else {
            return Ok(());
        };
        let other = match cap.other {
            Some(span) => match self.text(span, "consumer trailer", window)? {
                Some(text) => Some(text.to_string()),
                None => return Ok(()),
            },
            None => None,
        };

        let detail = ConsumerDetail::CommandLine(CommandLineConsumer {
            consumer_arguments: arguments.to_string(),
            consumer_name: (!name.is_empty()).then(|| name.to_string()),
            consumer_type: consumer_type.to_string(),
            other,
        });
        let inserted = self.store.add_consumer_detail(matcher.name(), detail)?;
        self.stats.note_insert(inserted);
        Ok(())
    }

    fn generic_consumer(&mut self, matcher: &ConsumerMatcher, window: Window<'_>) -> Result<()> {
        let Some(cap) = matcher.match_generic(window.bytes) else {
            return Ok(());
        };

        let mut fields = [""; 4];
        let spans = [
            (cap.consumer_type, "consumer type"),
            (cap.name, "consumer name"),
            (cap.first, "consumer field"),
            (cap.second, "consumer field"),
        ];
        for (slot, (span, field)) in fields.iter_mut().zip(spans) {
            match self.text(span, field, window)? {
                Some(text) => *slot = text,
                None => return Ok(()),
            }
        }

        let [consumer_type, name, first, second] = fields;
        let detail = ConsumerDetail::composite(consumer_type, name, first, second);
        let inserted = self.store.add_consumer_detail(matcher.name(), detail)?;
        self.stats.note_insert(inserted);
        Ok(())
    }

    fn filter(&mut self, matcher: &FilterMatcher, window: Window<'_>) -> Result<()> {
        let Some(cap) = matcher.match_record(window.bytes) else {
            return Ok(());
        };

        let Some(name) = self.text(cap.name, "filter name", window)? else {
            return Ok(());
        };
        let Some(query) = self.text(cap.query, "filter query", window)? else {
            return Ok(());
        };

        let detail = FilterDetail {
            filter_name: name.to_string(),
            filter_query: query.to_string(),
        };
        let inserted = self.store.add_filter_detail(matcher.name(), detail)?;
        self.stats.note_insert(inserted);
        Ok(())
    }

    fn text<'w>(
        &mut self,
        span: &'w [u8],
        field: &'static str,
        window: Window<'_>,
    ) -> Result<Option<&'w str>> {
        self.decoder.decode(span, field, window.index, self.stats)
    }
}
