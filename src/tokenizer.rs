//! Line-level tokenizing of annotation comments.

use crate::error::{ParserError, Result};
use crate::models::SecurityRequirement;

/// Byte offset of the leading `@` in a comment line.
///
/// Leading spaces and slashes are skipped; any other character before an `@`
/// means the line carries no directive.
pub fn find_tag_start(line: &str) -> Option<usize> {
    for (index, c) in line.char_indices() {
        match c {
            ' ' | '\t' | '/' => continue,
            '@' => return Some(index),
            _ => return None,
        }
    }
    None
}

/// Splits `@Tag rest of line` on the first whitespace.
pub fn split_tag_and_rest(text: &str) -> (&str, &str) {
    match text.find(|c: char| c == ' ' || c == '\t') {
        Some(index) => (text[..index].trim(), text[index..].trim()),
        None => (text.trim(), ""),
    }
}

/// A comment line that closes a block: the bare comment marker.
pub fn is_terminator(line: &str) -> bool {
    line.trim().trim_start_matches('/').trim().is_empty()
}

/// Ordered `key -> value` pairs from a key/value run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    entries: Vec<(String, String)>,
}

impl KeyValues {
    /// Sets `key`, keeping the position of an earlier occurrence.
    pub fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Key,
    Value,
    Quoted,
}

/// Scans `name=value name2="quoted value" flag` into ordered pairs.
///
/// A key without a delimiter is a flag mapped to the empty string. Quoted
/// values keep their inner whitespace. A pair still open at the end of input
/// is kept.
pub fn parse_key_value_run(text: &str, delimiter: char) -> KeyValues {
    let mut result = KeyValues::default();
    let mut state = ScanState::Outside;
    let mut key = String::new();
    let mut value = String::new();

    for c in text.chars() {
        match state {
            ScanState::Outside => {
                if !c.is_whitespace() {
                    key.push(c);
                    state = ScanState::Key;
                }
            }
            ScanState::Key => {
                if c == delimiter {
                    state = ScanState::Value;
                } else if c.is_whitespace() {
                    flush(&mut result, &mut key, &mut value);
                    state = ScanState::Outside;
                } else {
                    key.push(c);
                }
            }
            ScanState::Value => {
                if c == '"' && value.is_empty() {
                    state = ScanState::Quoted;
                } else if c.is_whitespace() {
                    flush(&mut result, &mut key, &mut value);
                    state = ScanState::Outside;
                } else {
                    value.push(c);
                }
            }
            ScanState::Quoted => {
                if c == '"' {
                    flush(&mut result, &mut key, &mut value);
                    state = ScanState::Outside;
                } else {
                    value.push(c);
                }
            }
        }
    }

    if state != ScanState::Outside {
        flush(&mut result, &mut key, &mut value);
    }
    result
}

fn flush(result: &mut KeyValues, key: &mut String, value: &mut String) {
    let k = std::mem::take(key);
    let v = std::mem::take(value);
    if !k.is_empty() {
        result.insert(k, v.trim().to_string());
    }
}

/// Base-10 value of a numeric constraint key.
pub fn parse_number(directive: &str, key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ParserError::NumberParseError {
            directive: directive.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
}

pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// `name=scope1,scope2 other` into a security requirement map.
pub fn scope_map(text: &str) -> SecurityRequirement {
    parse_key_value_run(text, '=')
        .iter()
        .map(|(name, scopes)| {
            let scopes = scopes
                .split(',')
                .map(str::trim)
                .filter(|scope| !scope.is_empty())
                .map(str::to_string)
                .collect();
            (name.to_string(), scopes)
        })
        .collect()
}
