//! Composite entry names.
//!
//! Marks are stored as `namespace + separator + handle + delimiter + segment`
//! and measures append a second `delimiter + segment`. Handles never contain
//! the separator or the delimiter, so the first delimiter after the namespace
//! prefix always ends the handle.

use crate::config::TimelineConfig;
use crate::store::EntryType;

/// Encode the name of a mark.
pub fn encode_mark_name(
    namespace: &str,
    separator: &str,
    delimiter: &str,
    handle: &str,
    segment: usize,
) -> String {
    format!("{namespace}{separator}{handle}{delimiter}{segment}")
}

/// Encode the name of a measure spanning two segments.
pub fn encode_measure_name(
    namespace: &str,
    separator: &str,
    delimiter: &str,
    handle: &str,
    start_segment: usize,
    end_segment: usize,
) -> String {
    format!("{namespace}{separator}{handle}{delimiter}{start_segment}{delimiter}{end_segment}")
}

/// Recover the bare handle from a mark or measure name.
pub fn decode_handle(
    entry_name: &str,
    namespace: &str,
    separator: &str,
    delimiter: &str,
) -> Option<String> {
    split_name(entry_name, namespace, separator, delimiter).map(|(handle, _)| handle.to_string())
}

/// Recover the segment number from a mark name.
pub fn decode_mark_segment(entry_name: &str, delimiter: &str) -> Option<usize> {
    let (_, segment) = entry_name.rsplit_once(delimiter)?;
    parse_segment(segment)
}

/// Recover the `(start, end)` segment pair from a measure name.
pub fn decode_measure_segments(entry_name: &str, delimiter: &str) -> Option<(usize, usize)> {
    let (rest, end) = entry_name.rsplit_once(delimiter)?;
    let (_, start) = rest.rsplit_once(delimiter)?;
    Some((parse_segment(start)?, parse_segment(end)?))
}

fn parse_segment(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n >= 1)
}

/// Split a name into its handle and segment suffixes.
///
/// Suffixes are peeled from the right: segment numbers are all digits and the
/// delimiter has none, so the last delimiter always starts the last suffix even
/// when the handle ends with part of the delimiter.
fn split_name<'a>(
    entry_name: &'a str,
    namespace: &str,
    separator: &str,
    delimiter: &str,
) -> Option<(&'a str, Vec<usize>)> {
    let mut handle = entry_name.strip_prefix(namespace)?.strip_prefix(separator)?;
    let mut segments = Vec::with_capacity(2);
    while handle.contains(delimiter) {
        if segments.len() == 2 {
            return None;
        }
        let (rest, suffix) = handle.rsplit_once(delimiter)?;
        segments.push(parse_segment(suffix)?);
        handle = rest;
    }
    if segments.is_empty() || handle.is_empty() || handle.contains(separator) {
        return None;
    }
    segments.reverse();
    Some((handle, segments))
}

/// Naming codec bound to one instance's namespace, separator and delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCodec {
    namespace: String,
    separator: String,
    delimiter: String,
}

impl NameCodec {
    /// Create a codec from its three parts.
    pub fn new(namespace: &str, separator: &str, delimiter: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            separator: separator.to_string(),
            delimiter: delimiter.to_string(),
        }
    }

    /// Create a codec from a timeline config.
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self::new(
            &config.namespace,
            &config.namespace_separator,
            &config.segment_delimiter,
        )
    }

    /// The namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The namespace separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The segment delimiter.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// `namespace + separator`, carried by every name this codec produces.
    pub fn prefix(&self) -> String {
        format!("{}{}", self.namespace, self.separator)
    }

    /// Whether a raw entry name belongs to this namespace.
    pub fn owns(&self, entry_name: &str) -> bool {
        entry_name
            .strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with(self.separator.as_str()))
    }

    /// Whether a raw entry is one this codec could have written for `entry_type`.
    ///
    /// Stricter than [`owns`](Self::owns): a nested namespace such as
    /// `app::v2` shares the `app::` prefix but never decodes here.
    pub fn recognizes(&self, entry_name: &str, entry_type: EntryType) -> bool {
        match entry_type {
            EntryType::Mark => self.decode_mark(entry_name).is_some(),
            EntryType::Measure => self.decode_measure(entry_name).is_some(),
        }
    }

    /// `namespace + separator + handle`, the registry key for a handle.
    pub fn namespaced_handle(&self, handle: &str) -> String {
        format!("{}{}{}", self.namespace, self.separator, handle)
    }

    pub fn encode_mark_name(&self, handle: &str, segment: usize) -> String {
        encode_mark_name(&self.namespace, &self.separator, &self.delimiter, handle, segment)
    }

    pub fn encode_measure_name(
        &self,
        handle: &str,
        start_segment: usize,
        end_segment: usize,
    ) -> String {
        encode_measure_name(
            &self.namespace,
            &self.separator,
            &self.delimiter,
            handle,
            start_segment,
            end_segment,
        )
    }

    pub fn decode_handle(&self, entry_name: &str) -> Option<String> {
        decode_handle(entry_name, &self.namespace, &self.separator, &self.delimiter)
    }

    /// Decode a mark name into `(handle, segment)`.
    ///
    /// Returns `None` for foreign names and for names with a measure suffix.
    pub fn decode_mark(&self, entry_name: &str) -> Option<(String, usize)> {
        match split_name(entry_name, &self.namespace, &self.separator, &self.delimiter)? {
            (handle, segments) if segments.len() == 1 => Some((handle.to_string(), segments[0])),
            _ => None,
        }
    }

    /// Decode a measure name into `(handle, start, end)`.
    pub fn decode_measure(&self, entry_name: &str) -> Option<(String, usize, usize)> {
        match split_name(entry_name, &self.namespace, &self.separator, &self.delimiter)? {
            (handle, segments) if segments.len() == 2 => {
                Some((handle.to_string(), segments[0], segments[1]))
            }
            _ => None,
        }
    }

    pub fn decode_mark_segment(&self, entry_name: &str) -> Option<usize> {
        self.decode_mark(entry_name).map(|(_, segment)| segment)
    }

    pub fn decode_measure_segments(&self, entry_name: &str) -> Option<(usize, usize)> {
        self.decode_measure(entry_name).map(|(_, start, end)| (start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> NameCodec {
        NameCodec::new("timenstein", "::", "-")
    }

    #[test]
    fn test_encode_names() {
        let codec = codec();
        assert_eq!(codec.encode_mark_name("load", 3), "timenstein::load-3");
        assert_eq!(codec.encode_measure_name("load", 1, 3), "timenstein::load-1-3");
        assert_eq!(codec.namespaced_handle("load"), "timenstein::load");
        assert_eq!(codec.prefix(), "timenstein::");
    }

    #[test]
    fn test_decode_mark() {
        let codec = codec();
        assert_eq!(
            codec.decode_mark("timenstein::page_load-12"),
            Some(("page_load".to_string(), 12))
        );
        assert_eq!(codec.decode_mark("timenstein::load-1-2"), None);
        assert_eq!(codec.decode_mark("timenstein::load"), None);
        assert_eq!(codec.decode_mark("timenstein::load-0"), None);
        assert_eq!(codec.decode_mark("timenstein::load-x"), None);
        assert_eq!(codec.decode_mark("other::load-1"), None);
    }

    #[test]
    fn test_decode_measure() {
        let codec = codec();
        assert_eq!(
            codec.decode_measure("timenstein::api.call-2-5"),
            Some(("api.call".to_string(), 2, 5))
        );
        assert_eq!(codec.decode_measure("timenstein::api-2"), None);
        assert_eq!(codec.decode_measure_segments("timenstein::api-1-4"), Some((1, 4)));
    }

    #[test]
    fn test_free_functions() {
        let name = encode_mark_name("ns", "/", "#", "job", 7);
        assert_eq!(name, "ns/job#7");
        assert_eq!(decode_handle(&name, "ns", "/", "#"), Some("job".to_string()));
        assert_eq!(decode_mark_segment(&name, "#"), Some(7));

        let name = encode_measure_name("ns", "/", "#", "job", 2, 9);
        assert_eq!(decode_measure_segments(&name, "#"), Some((2, 9)));
        assert_eq!(decode_handle(&name, "ns", "/", "#"), Some("job".to_string()));
    }

    #[test]
    fn test_owns_requires_full_prefix() {
        let codec = codec();
        assert!(codec.owns("timenstein::load-1"));
        assert!(!codec.owns("timensteinx::load-1"));
        assert!(!codec.owns("my-timenstein::load-1"));
        assert!(!codec.owns("timenstein:load-1"));
    }

    #[test]
    fn test_handle_overlapping_multi_char_delimiter() {
        let codec = NameCodec::new("ns", "::", "--");
        let mark = codec.encode_mark_name("a-", 1);
        assert_eq!(mark, "ns::a---1");
        assert_eq!(codec.decode_mark(&mark), Some(("a-".to_string(), 1)));
        assert_eq!(decode_handle(&mark, "ns", "::", "--"), Some("a-".to_string()));

        let measure = codec.encode_measure_name("a-", 1, 2);
        assert_eq!(measure, "ns::a---1--2");
        assert_eq!(codec.decode_measure(&measure), Some(("a-".to_string(), 1, 2)));
        assert_eq!(decode_measure_segments(&measure, "--"), Some((1, 2)));

        let lead = codec.encode_mark_name("-x-", 3);
        assert_eq!(codec.decode_mark(&lead), Some(("-x-".to_string(), 3)));
    }

    #[test]
    fn test_recognizes_rejects_nested_namespace() {
        let codec = NameCodec::new("app", "::", "-");
        assert!(codec.recognizes("app::load-1", EntryType::Mark));
        assert!(codec.recognizes("app::load-1-2", EntryType::Measure));
        assert!(!codec.recognizes("app::load-1-2", EntryType::Mark));
        assert!(!codec.recognizes("app::v2::load-1", EntryType::Mark));
        assert!(!codec.recognizes("app::v2::load-1-2", EntryType::Measure));
        assert!(codec.owns("app::v2::load-1"));
    }

    #[test]
    fn test_too_many_suffixes() {
        assert_eq!(codec().decode_handle("timenstein::load-1-2-3"), None);
    }

    #[test]
    fn test_namespace_containing_delimiter() {
        let codec = NameCodec::new("my-app", "::", "-");
        let name = codec.encode_mark_name("load", 4);
        assert_eq!(codec.decode_mark(&name), Some(("load".to_string(), 4)));
    }
}
