//! Join bindings with their recovered consumers and filters.

use crate::config::HunterConfig;
use crate::error::Result;
use crate::store::{ConsumerDetail, CorrelationStore, FilterDetail};
use serde::Serialize;
use std::collections::BTreeMap;

/// Names referenced by a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingDetails {
    pub event_consumer_name: String,
    pub event_filter_name: String,
}

/// One entry of the final report.
///
/// Fields are declared in key order so the JSON matches a sorted-key dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingReport {
    pub binding_details: BindingDetails,
    pub binding_name: String,
    pub consumers: Vec<ConsumerDetail>,
    pub filters: Vec<FilterDetail>,
    pub info: String,
}

/// Report keyed by binding id, in id order.
pub type Report = BTreeMap<String, BindingReport>;

/// Build the report from a fully correlated store.
pub fn assemble(store: &CorrelationStore, config: &HunterConfig) -> Report {
    store
        .bindings()
        .map(|binding| {
            let consumers = match store.consumer_details(&binding.consumer_name) {
                Some(details) if !details.is_empty() => details.sorted(),
                _ => vec![ConsumerDetail::Unresolved(binding.consumer_name.clone())],
            };
            let filters = store
                .filter_details(&binding.filter_name)
                .map(|details| details.sorted())
                .unwrap_or_default();

            let entry = BindingReport {
                binding_details: BindingDetails {
                    event_consumer_name: binding.consumer_name.clone(),
                    event_filter_name: binding.filter_name.clone(),
                },
                binding_name: binding.id.clone(),
                consumers,
                filters,
                info: config.annotation_for(&binding.id).to_string(),
            };
            (binding.id.clone(), entry)
        })
        .collect()
}

/// Output layout for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStyle {
    /// Three-space indentation, one key per line.
    #[default]
    Pretty,
    Compact,
}

/// Serialize a report to JSON text.
pub fn render(report: &Report, style: RenderStyle) -> Result<String> {
    match style {
        RenderStyle::Compact => Ok(serde_json::to_string(report)?),
        RenderStyle::Pretty => {
            let mut out = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            report.serialize(&mut serializer)?;
            Ok(String::from_utf8(out)?)
        }
    }
}
