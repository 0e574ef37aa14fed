//! Bookkeeping shared by the scan passes.

use crate::config::DecodePolicy;
use crate::error::{HunterError, Result};
use serde::Serialize;

/// Counters for one pass over the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub chunks_read: u64,
    pub windows_scanned: u64,
    /// Candidate records extracted, before dedup.
    pub matches: u64,
    /// Records that were new to the store.
    pub recorded: u64,
    /// Candidates that collapsed into an existing record.
    pub duplicates: u64,
    /// Candidates dropped because a span was not UTF-8.
    pub decode_skips: u64,
}

impl PassStats {
    pub(crate) fn note_insert(&mut self, inserted: bool) {
        self.matches += 1;
        if inserted {
            self.recorded += 1;
        } else {
            self.duplicates += 1;
        }
    }
}

/// Applies the configured [`DecodePolicy`] to captured spans.
pub(crate) struct SpanDecoder {
    policy: DecodePolicy,
}

impl SpanDecoder {
    pub(crate) fn new(policy: DecodePolicy) -> Self {
        Self { policy }
    }

    /// `Ok(None)` means the candidate should be skipped.
    pub(crate) fn decode<'s>(
        &self,
        span: &'s [u8],
        field: &'static str,
        window: u64,
        stats: &mut PassStats,
    ) -> Result<Option<&'s str>> {
        match std::str::from_utf8(span) {
            Ok(text) => Ok(Some(text)),
            Err(source) => match self.policy {
                DecodePolicy::Strict => Err(HunterError::DecodeFailure {
                    field,
                    window,
                    source,
                }),
                DecodePolicy::Skip => {
                    stats.decode_skips += 1;
                    tracing::debug!(field, window, error = %source, "Skipping undecodable span");
                    Ok(None)
                }
            },
        }
    }
}
