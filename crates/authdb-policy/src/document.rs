use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Serialize;
use tracing::debug;

use crate::{PolicyError, Result};

/// Element written in place of the flag when enabling it.
pub const ENABLED_TAG: &str = "<true/>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagState {
    Enabled,
    Disabled,
}

impl FlagState {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"true" => Some(FlagState::Enabled),
            b"false" => Some(FlagState::Disabled),
            _ => None,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == FlagState::Enabled
    }
}

/// Location of a right's flag inside the policy text, as byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMatch {
    /// From the right's `<key>` through the closing `</dict>` of its body
    pub block: Range<usize>,
    /// The self-closing boolean element that follows the flag's `<key>`
    pub flag: Range<usize>,
    pub state: FlagState,
}

impl EntryMatch {
    pub fn block_text<'a>(&self, text: &'a str) -> &'a str {
        &text[self.block.clone()]
    }

    pub fn flag_text<'a>(&self, text: &'a str) -> &'a str {
        &text[self.flag.clone()]
    }

    /// Returns `text` with the boolean element replaced by [`ENABLED_TAG`].
    /// Every byte outside the flag span is carried over untouched.
    pub fn enable(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + ENABLED_TAG.len());
        out.push_str(&text[..self.flag.start]);
        out.push_str(ENABLED_TAG);
        out.push_str(&text[self.flag.end..]);
        out
    }
}

/// Full text of a policy file, read once.
#[derive(Debug, Clone)]
pub struct PolicyDocument {
    path: PathBuf,
    text: String,
}

impl PolicyDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(PolicyError::io(path))?;
        debug!(path = %path.display(), bytes = text.len(), "loaded policy document");
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn locate(&self, right: &str, flag: &str) -> Result<EntryMatch> {
        locate_entry(&self.text, right, flag)
    }
}

/// Finds the boolean `flag` inside the dictionary that follows `<key>right</key>`.
///
/// The document is walked as markup, so keys in comments, CDATA or string
/// values never match. Exactly one qualifying entry must exist: none is
/// [`PolicyError::MarkerNotFound`], several is [`PolicyError::AmbiguousEntry`].
pub fn locate_entry(text: &str, right: &str, flag: &str) -> Result<EntryMatch> {
    let mut matches = scan(text, right, flag)?;
    match matches.len() {
        0 => Err(PolicyError::MarkerNotFound {
            right: right.to_string(),
            flag: flag.to_string(),
        }),
        1 => {
            let entry = matches.remove(0);
            debug!(
                block = ?entry.block,
                flag = ?entry.flag,
                state = ?entry.state,
                "located policy entry"
            );
            Ok(entry)
        }
        count => Err(PolicyError::AmbiguousEntry {
            right: right.to_string(),
            count,
        }),
    }
}

#[derive(Default)]
struct Frame {
    is_dict: bool,
    is_key: bool,
    /// Offset of the right's `<key>` when this dict is that right's body
    right_key_start: Option<usize>,
    /// Last `<key>` child still waiting for its value element
    pending_key: Option<(String, usize)>,
    flag: Option<(Range<usize>, FlagState)>,
}

/// Byte-order mark the reader skips without counting it in its positions.
const UTF8_BOM: &str = "\u{feff}";

fn scan(text: &str, right: &str, flag: &str) -> Result<Vec<EntryMatch>> {
    // Reader positions are relative to the text after the BOM
    let (body, base) = match text.strip_prefix(UTF8_BOM) {
        Some(rest) => (rest, UTF8_BOM.len()),
        None => (text, 0),
    };
    let mut reader = Reader::from_str(body);
    let mut stack: Vec<Frame> = Vec::new();
    let mut key_text: Option<(String, usize)> = None;
    let mut matches = Vec::new();

    loop {
        let start = base + reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| malformed(start, e.to_string()))?;
        let end = base + reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                let qname = e.name();
                let child = open_child(stack.last_mut(), qname.as_ref(), start, right, &mut key_text);
                stack.push(child);
            }
            Event::Empty(e) => {
                if let Some(parent) = stack.last_mut() {
                    let qname = e.name();
                    close_empty(parent, qname.as_ref(), start..end, flag);
                }
            }
            Event::Text(t) => {
                if let Some((buf, _)) = key_text.as_mut() {
                    let unescaped = t.unescape().map_err(|e| malformed(start, e.to_string()))?;
                    buf.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if let Some((buf, _)) = key_text.as_mut() {
                    let raw = std::str::from_utf8(&c).map_err(|e| malformed(start, e.to_string()))?;
                    buf.push_str(raw);
                }
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(malformed(start, "closing tag without an open element"));
                };
                if frame.is_key {
                    if let (Some(key), Some(parent)) = (key_text.take(), stack.last_mut()) {
                        parent.pending_key = Some(key);
                    }
                }
                if let (Some(key_start), Some((flag_span, state))) =
                    (frame.right_key_start, frame.flag)
                {
                    let entry = EntryMatch {
                        block: key_start..end,
                        flag: flag_span,
                        state,
                    };
                    check_spans(text, &entry)?;
                    matches.push(entry);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed(text.len(), "unexpected end of document"));
    }
    Ok(matches)
}

fn open_child(
    parent: Option<&mut Frame>,
    name: &[u8],
    start: usize,
    right: &str,
    key_text: &mut Option<(String, usize)>,
) -> Frame {
    let mut child = Frame {
        is_dict: name == b"dict",
        ..Frame::default()
    };
    let Some(parent) = parent.filter(|p| p.is_dict) else {
        return child;
    };

    if name == b"key" {
        child.is_key = true;
        *key_text = Some((String::new(), start));
    } else if let Some((key, key_start)) = parent.pending_key.take() {
        if child.is_dict && key.trim() == right {
            child.right_key_start = Some(key_start);
        }
    }
    child
}

fn close_empty(parent: &mut Frame, name: &[u8], span: Range<usize>, flag: &str) {
    if !parent.is_dict {
        return;
    }
    if name == b"key" {
        parent.pending_key = Some((String::new(), span.start));
        return;
    }
    let Some((key, _)) = parent.pending_key.take() else {
        return;
    };
    if parent.right_key_start.is_none() || key.trim() != flag || parent.flag.is_some() {
        return;
    }
    if let Some(state) = FlagState::from_tag(name) {
        parent.flag = Some((span, state));
    }
}

/// Both spans must cover whole elements of `text`, or a splice would corrupt it.
fn check_spans(text: &str, entry: &EntryMatch) -> Result<()> {
    for span in [&entry.block, &entry.flag] {
        let covers_element = text
            .get(span.clone())
            .is_some_and(|s| s.starts_with('<') && s.ends_with('>'));
        if !covers_element {
            return Err(malformed(span.start, "element offsets do not line up with the text"));
        }
    }
    Ok(())
}

fn malformed(position: usize, message: impl Into<String>) -> PolicyError {
    PolicyError::Malformed {
        position,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RIGHT: &str = "system.privilege.taskport";
    const FLAG: &str = "allow-root";

    fn policy(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n<dict>\n\t<key>rights</key>\n\t<dict>\n{body}\t</dict>\n</dict>\n</plist>\n"
        )
    }

    fn taskport(value: &str) -> String {
        format!(
            "\t\t<key>system.privilege.taskport</key>\n\t\t<dict>\n\t\t\t<key>allow-root</key>\n\t\t\t{value}\n\t\t\t<key>class</key>\n\t\t\t<string>user</string>\n\t\t</dict>\n"
        )
    }

    #[test]
    fn test_locates_disabled_flag() {
        let text = policy(&taskport("<false/>"));
        let entry = locate_entry(&text, RIGHT, FLAG).unwrap();

        assert_eq!(entry.state, FlagState::Disabled);
        assert_eq!(entry.flag_text(&text), "<false/>");
        assert!(entry.block_text(&text).starts_with("<key>system.privilege.taskport</key>"));
        assert!(entry.block_text(&text).ends_with("</dict>"));
    }

    #[test]
    fn test_locates_enabled_flag() {
        let text = policy(&taskport("<true/>"));
        let entry = locate_entry(&text, RIGHT, FLAG).unwrap();
        assert!(entry.state.is_enabled());
    }

    #[test]
    fn test_enable_changes_only_the_flag() {
        let text = policy(&taskport("<false/>"));
        let entry = locate_entry(&text, RIGHT, FLAG).unwrap();
        let patched = entry.enable(&text);

        assert_eq!(patched, text.replacen("<false/>", "<true/>", 1));
        assert_eq!(patched.len(), text.len() - 1);
    }

    #[test]
    fn test_flag_need_not_be_first_in_dict() {
        let body = "\t\t<key>system.privilege.taskport</key>\n\t\t<dict>\n\t\t\t<key>class</key>\n\t\t\t<string>user</string>\n\t\t\t<key>allow-root</key>\n\t\t\t<false/>\n\t\t</dict>\n";
        let text = policy(body);
        let entry = locate_entry(&text, RIGHT, FLAG).unwrap();
        assert_eq!(entry.flag_text(&text), "<false/>");
    }

    #[test]
    fn test_other_rights_are_ignored() {
        let other = "\t\t<key>system.preferences</key>\n\t\t<dict>\n\t\t\t<key>allow-root</key>\n\t\t\t<false/>\n\t\t</dict>\n";
        let text = policy(&format!("{other}{}", taskport("<true/>")));
        let entry = locate_entry(&text, RIGHT, FLAG).unwrap();

        assert_eq!(entry.state, FlagState::Enabled);
        assert!(entry.flag.start > text.find("system.privilege.taskport").unwrap());
    }

    #[test]
    fn test_missing_right_is_configuration_error() {
        let other = "\t\t<key>system.preferences</key>\n\t\t<dict>\n\t\t\t<key>allow-root</key>\n\t\t\t<false/>\n\t\t</dict>\n";
        let err = locate_entry(&policy(other), RIGHT, FLAG).unwrap_err();

        assert!(matches!(err, PolicyError::MarkerNotFound { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_key_in_comment_or_string_does_not_match() {
        let body = "\t\t<!-- <key>system.privilege.taskport</key> -->\n\t\t<key>note</key>\n\t\t<string>&lt;key&gt;system.privilege.taskport&lt;/key&gt;</string>\n";
        let err = locate_entry(&policy(body), RIGHT, FLAG).unwrap_err();
        assert!(matches!(err, PolicyError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_non_boolean_flag_value_does_not_match() {
        let err = locate_entry(&policy(&taskport("<string>yes</string>")), RIGHT, FLAG).unwrap_err();
        assert!(matches!(err, PolicyError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_duplicate_entries_are_ambiguous() {
        let body = format!("{}{}", taskport("<false/>"), taskport("<false/>"));
        let err = locate_entry(&policy(&body), RIGHT, FLAG).unwrap_err();

        match err {
            PolicyError::AmbiguousEntry { count, .. } => assert_eq!(count, 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        let text = policy(&taskport("<false/>"));
        let truncated = &text[..text.find("</plist>").unwrap()];
        let err = locate_entry(truncated, RIGHT, FLAG).unwrap_err();

        assert!(matches!(err, PolicyError::Malformed { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let text = "<plist><dict><key>a</key></plist>";
        let err = locate_entry(text, RIGHT, FLAG).unwrap_err();
        assert!(matches!(err, PolicyError::Malformed { .. }));
    }

    #[test]
    fn test_byte_order_mark_keeps_offsets_aligned() {
        let text = format!("\u{feff}{}", policy(&taskport("<false/>")));
        let entry = locate_entry(&text, RIGHT, FLAG).unwrap();

        assert_eq!(entry.flag_text(&text), "<false/>");
        assert!(entry.block_text(&text).starts_with("<key>system.privilege.taskport</key>"));
        let patched = entry.enable(&text);
        assert_eq!(patched, text.replacen("<false/>", "<true/>", 1));
        assert!(patched.starts_with('\u{feff}'));
    }

    #[test]
    fn test_cdata_key_text_matches() {
        let body = "\t\t<key><![CDATA[system.privilege.taskport]]></key>\n\t\t<dict>\n\t\t\t<key>allow-root</key>\n\t\t\t<false/>\n\t\t</dict>\n";
        let text = policy(body);
        let entry = locate_entry(&text, RIGHT, FLAG).unwrap();

        assert_eq!(entry.state, FlagState::Disabled);
        assert_eq!(entry.flag_text(&text), "<false/>");
    }

    #[test]
    fn test_escaped_key_text_is_unescaped() {
        let body = "\t\t<key>a&amp;b</key>\n\t\t<dict>\n\t\t\t<key>allow-root</key>\n\t\t\t<false/>\n\t\t</dict>\n";
        let entry = locate_entry(&policy(body), "a&b", FLAG).unwrap();
        assert_eq!(entry.state, FlagState::Disabled);
    }
}
