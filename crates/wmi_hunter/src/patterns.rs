//! Byte patterns for the three record kinds.
//!
//! Binding references are fixed patterns. Consumer and filter records are
//! located relative to a name learned during binding discovery, so their
//! matchers are compiled once per name.
//!
//! All patterns run with Unicode disabled: `\w` and `\s` are ASCII classes and
//! `.` matches any byte except `\n`.

use crate::error::Result;
use memchr::memmem;
use regex::bytes::Regex;
use std::sync::LazyLock;

/// Present in every `__FilterToConsumerBinding` instance.
pub const BINDING_MARKER: &[u8] = b"_FilterToConsumerBinding";
/// Present in every event consumer class name.
pub const CONSUMER_MARKER: &[u8] = b"EventConsumer";
/// The one consumer class with a known record layout.
pub const COMMAND_LINE_MARKER: &[u8] = b"CommandLineEventConsumer";

static CONSUMER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?-u)\w*EventConsumer\.Name="([\w\s]*)""#).unwrap());
static FILTER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?-u)_EventFilter\.Name="([\w\s]*)""#).unwrap());

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memmem::find(haystack, needle).is_some()
}

/// Consumer and filter names referenced by one binding instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingRef<'w> {
    pub consumer: &'w [u8],
    pub filter: &'w [u8],
}

/// First binding reference in `window`, if the window holds the binding
/// marker and both name references.
pub fn find_binding(window: &[u8]) -> Option<BindingRef<'_>> {
    if !contains(window, BINDING_MARKER) {
        return None;
    }
    let consumer = CONSUMER_REF.captures(window)?.get(1)?.as_bytes();
    let filter = FILTER_REF.captures(window)?.get(1)?.as_bytes();
    Some(BindingRef { consumer, filter })
}

/// Raw spans of a `CommandLineEventConsumer` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLineCapture<'w> {
    pub consumer_type: &'w [u8],
    pub arguments: &'w [u8],
    pub name: &'w [u8],
    /// Trailing field after the name, absent when empty.
    pub other: Option<&'w [u8]>,
}

/// Raw spans of a consumer record of any other class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericCapture<'w> {
    pub consumer_type: &'w [u8],
    pub name: &'w [u8],
    pub first: &'w [u8],
    pub second: &'w [u8],
}

/// Matchers for the records of one consumer name.
#[derive(Debug, Clone)]
pub struct ConsumerMatcher {
    name: String,
    command_line: Regex,
    generic: Regex,
}

impl ConsumerMatcher {
    pub fn new(name: &str) -> Result<Self> {
        let escaped = regex::escape(name);
        // type NUL NUL args NUL ... name [NUL NUL] other
        let command_line = Regex::new(&format!(
            r"(?-u)(CommandLineEventConsumer)\x00\x00(.*?)\x00.*?({escaped})(?:\x00\x00)?([^\x00]*)"
        ))?;
        // type ... name NUL NUL first NUL NUL second
        let generic = Regex::new(&format!(
            r"(?-u)(\w*EventConsumer).*?({escaped})\x00\x00([^\x00]*)\x00\x00([^\x00]*)"
        ))?;
        Ok(Self {
            name: name.to_string(),
            command_line,
            generic,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn match_command_line<'w>(&self, window: &'w [u8]) -> Option<CommandLineCapture<'w>> {
        let caps = self.command_line.captures(window)?;
        Some(CommandLineCapture {
            consumer_type: caps.get(1)?.as_bytes(),
            arguments: caps.get(2)?.as_bytes(),
            name: caps.get(3)?.as_bytes(),
            other: caps
                .get(4)
                .map(|m| m.as_bytes())
                .filter(|span| !span.is_empty()),
        })
    }

    pub fn match_generic<'w>(&self, window: &'w [u8]) -> Option<GenericCapture<'w>> {
        let caps = self.generic.captures(window)?;
        Some(GenericCapture {
            consumer_type: caps.get(1)?.as_bytes(),
            name: caps.get(2)?.as_bytes(),
            first: caps.get(3)?.as_bytes(),
            second: caps.get(4)?.as_bytes(),
        })
    }
}

/// Raw spans of an `__EventFilter` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterCapture<'w> {
    pub name: &'w [u8],
    pub query: &'w [u8],
}

/// Matcher for the records of one filter name.
#[derive(Debug, Clone)]
pub struct FilterMatcher {
    name: String,
    record: Regex,
}

impl FilterMatcher {
    pub fn new(name: &str) -> Result<Self> {
        let record = Regex::new(&format!(
            r"(?-u)({})\x00\x00([^\x00]*)\x00\x00",
            regex::escape(name)
        ))?;
        Ok(Self {
            name: name.to_string(),
            record,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cheap pre-check before running the record pattern.
    pub fn mentioned_in(&self, window: &[u8]) -> bool {
        contains(window, self.name.as_bytes())
    }

    pub fn match_record<'w>(&self, window: &'w [u8]) -> Option<FilterCapture<'w>> {
        let caps = self.record.captures(window)?;
        Some(FilterCapture {
            name: caps.get(1)?.as_bytes(),
            query: caps.get(2)?.as_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_binding_requires_marker() {
        let refs = br#"CommandLineEventConsumer.Name="Evil" __EventFilter.Name="Trigger""#;
        assert!(find_binding(refs).is_none());

        let mut window = b"__FilterToConsumerBinding ".to_vec();
        window.extend_from_slice(refs);
        let binding = find_binding(&window).unwrap();
        assert_eq!(binding.consumer, b"Evil");
        assert_eq!(binding.filter, b"Trigger");
    }

    #[test]
    fn test_find_binding_requires_both_references() {
        let window = br#"__FilterToConsumerBinding CommandLineEventConsumer.Name="Evil""#;
        assert!(find_binding(window).is_none());
    }

    #[test]
    fn test_find_binding_first_reference_wins() {
        let window = br#"__FilterToConsumerBinding NTEventLogEventConsumer.Name="SCM Event Log Consumer" __EventFilter.Name="SCM Event Log Filter" ActiveScriptEventConsumer.Name="Second""#;
        let binding = find_binding(window).unwrap();
        assert_eq!(binding.consumer, b"SCM Event Log Consumer");
        assert_eq!(binding.filter, b"SCM Event Log Filter");
    }

    #[test]
    fn test_command_line_capture() {
        let matcher = ConsumerMatcher::new("Updater").unwrap();
        let window = b"junkCommandLineEventConsumer\x00\x00cmd.exe /c whoami\x00\xff\x01Updater\x00\x00C:\\Windows\x00tail";
        let cap = matcher.match_command_line(window).unwrap();
        assert_eq!(cap.consumer_type, b"CommandLineEventConsumer");
        assert_eq!(cap.arguments, b"cmd.exe /c whoami");
        assert_eq!(cap.name, b"Updater");
        assert_eq!(cap.other, Some(&b"C:\\Windows"[..]));
    }

    #[test]
    fn test_command_line_capture_without_trailing_field() {
        let matcher = ConsumerMatcher::new("Updater").unwrap();
        let window = b"CommandLineEventConsumer\x00\x00calc.exe\x00Updater\x00";
        let cap = matcher.match_command_line(window).unwrap();
        assert_eq!(cap.arguments, b"calc.exe");
        assert_eq!(cap.other, None);
    }

    #[test]
    fn test_command_line_requires_name() {
        let matcher = ConsumerMatcher::new("Updater").unwrap();
        let window = b"CommandLineEventConsumer\x00\x00calc.exe\x00SomeoneElse\x00\x00x";
        assert!(matcher.match_command_line(window).is_none());
    }

    #[test]
    fn test_generic_capture() {
        let matcher = ConsumerMatcher::new("SCM Event Log Consumer").unwrap();
        let window = b"NTEventLogEventConsumer\x00\x01\x02SCM Event Log Consumer\x00\x00sid\x00\x00Service Control Manager\x00";
        let cap = matcher.match_generic(window).unwrap();
        assert_eq!(cap.consumer_type, b"NTEventLogEventConsumer");
        assert_eq!(cap.name, b"SCM Event Log Consumer");
        assert_eq!(cap.first, b"sid");
        assert_eq!(cap.second, b"Service Control Manager");
    }

    #[test]
    fn test_names_are_literal() {
        // Regex metacharacters in a name must not widen the match
        let matcher = FilterMatcher::new("a.b").unwrap();
        assert!(matcher.match_record(b"axb\x00\x00q\x00\x00").is_none());
        let cap = matcher.match_record(b"a.b\x00\x00q\x00\x00").unwrap();
        assert_eq!(cap.query, b"q");
    }

    #[test]
    fn test_filter_capture() {
        let matcher = FilterMatcher::new("MyFilter").unwrap();
        let window = b"\x07MyFilter\x00\x00SELECT * FROM X\x00\x00root\\cimv2";
        assert!(matcher.mentioned_in(window));
        let cap = matcher.match_record(window).unwrap();
        assert_eq!(cap.name, b"MyFilter");
        assert_eq!(cap.query, b"SELECT * FROM X");
    }

    #[test]
    fn test_filter_requires_closing_delimiter() {
        let matcher = FilterMatcher::new("MyFilter").unwrap();
        assert!(matcher.match_record(b"MyFilter\x00\x00SELECT * FROM X").is_none());
    }
}
