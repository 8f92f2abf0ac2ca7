//! Line-oriented `key=value` text codec
//!
//! Reads the full `.properties` grammar (comments, `=`/`:`/whitespace
//! separators, line continuations, backslash and `\uXXXX` escapes) so stores
//! written by earlier tools load unchanged. Writes plain ASCII, one sorted
//! entry per line, escaping anything that would not survive a re-read.

use std::collections::BTreeMap;

use crate::error::FormatError;

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

fn is_whitespace(c: char) -> bool {
    WHITESPACE.contains(&c)
}

/// Parse properties text. Later duplicates of a key replace earlier ones.
pub fn parse(input: &str) -> Result<BTreeMap<String, String>, FormatError> {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut natural_lines = normalized.split('\n');
    let mut entries = BTreeMap::new();

    while let Some(line) = natural_lines.next() {
        let trimmed = line.trim_start_matches(WHITESPACE);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match natural_lines.next() {
                Some(next) => logical.push_str(next.trim_start_matches(WHITESPACE)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical)?;
        entries.insert(key, value);
    }

    Ok(entries)
}

/// Serialize entries, sorted by key, without a header comment
pub fn write(entries: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        escape_into(&mut out, key, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }
    out
}

/// An odd number of trailing backslashes joins the next natural line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> Result<(String, String), FormatError> {
    let chars: Vec<char> = line.chars().collect();

    let mut key_end = chars.len();
    let mut escaped = false;
    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_whitespace(c) {
            key_end = i;
            break;
        }
    }

    let mut value_start = key_end;
    while value_start < chars.len() && is_whitespace(chars[value_start]) {
        value_start += 1;
    }
    if value_start < chars.len() && (chars[value_start] == '=' || chars[value_start] == ':') {
        value_start += 1;
        while value_start < chars.len() && is_whitespace(chars[value_start]) {
            value_start += 1;
        }
    }

    Ok((
        unescape(&chars[..key_end])?,
        unescape(&chars[value_start..])?,
    ))
}

fn unescape(chars: &[char]) -> Result<String, FormatError> {
    // \u escapes are UTF-16 code units, so surrogate pairs are rebuilt at the end
    let mut units: Vec<u16> = Vec::with_capacity(chars.len());
    let mut buf = [0u16; 2];
    let mut iter = chars.iter().copied();

    while let Some(c) = iter.next() {
        let decoded = if c == '\\' {
            match iter.next() {
                Some('t') => '\t',
                Some('n') => '\n',
                Some('r') => '\r',
                Some('f') => '\x0c',
                Some('u') => {
                    let hex: String = iter.by_ref().take(4).collect();
                    let unit = (hex.len() == 4)
                        .then(|| u16::from_str_radix(&hex, 16).ok())
                        .flatten()
                        .ok_or_else(|| {
                            FormatError::Malformed(format!("Malformed \\uxxxx escape: \\u{}", hex))
                        })?;
                    units.push(unit);
                    continue;
                }
                Some(other) => other,
                None => break,
            }
        } else {
            c
        };
        units.extend_from_slice(decoded.encode_utf16(&mut buf));
    }

    String::from_utf16(&units)
        .map_err(|_| FormatError::Malformed("Unpaired surrogate in \\u escape".to_string()))
}

fn escape_into(out: &mut String, text: &str, is_key: bool) {
    let mut buf = [0u16; 2];
    for (i, c) in text.chars().enumerate() {
        match c {
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => {
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
        }
    }
}
