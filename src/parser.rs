use std::io::BufRead;

use crate::error::Error;
use crate::model::{Entry, ParsedEnv};

/// Parse env entries from UTF-8 text.
///
/// This never fails. Lines that are blank, start with `#`, or contain no `=`
/// are skipped. A repeated key keeps its first position and takes the last
/// value.
pub fn parse_str(input: &str) -> ParsedEnv {
    let mut env = ParsedEnv::new();
    for (idx, line) in split_lines(input).enumerate() {
        let line_num = line_number(idx);
        match parse_line(line, line_num) {
            Some(entry) => env.insert(entry),
            None => tracing::trace!(line = line_num, "skipping line"),
        }
    }

    env
}

/// 1-based line number for a 0-based index, saturating at `u32::MAX`.
fn line_number(idx: usize) -> u32 {
    u32::try_from(idx).map_or(u32::MAX, |idx| idx.saturating_add(1))
}

/// Parse env entries from UTF-8 bytes.
pub fn parse_bytes(input: &[u8]) -> Result<ParsedEnv, Error> {
    let text = std::str::from_utf8(input)?;
    Ok(parse_str(text))
}

/// Parse env entries from a buffered reader.
pub fn parse_reader<R: BufRead>(mut reader: R) -> Result<ParsedEnv, Error> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_bytes(&buf)
}

/// Classify a single line. `None` means the line contributes nothing.
///
/// `#` only starts a comment as the first non-whitespace character, so
/// `KEY=a#b` keeps `a#b`. Keys are not validated: `=value` yields the empty
/// key.
pub fn parse_line(line: &str, line_num: u32) -> Option<Entry> {
    let line = trim(line);
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;

    Some(Entry {
        key: trim(key).to_owned(),
        value: strip_quotes(trim(value)).to_owned(),
        line: line_num,
    })
}

/// Remove one matching pair of `"` or `'` around `value`.
///
/// A lone quote character is left alone, as are mismatched pairs. Only the
/// outer layer is removed.
pub fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }

    value
}

/// Split on `\n`, `\r\n`, lone `\r`, and the other line boundaries:
/// vertical tab, form feed, the `\x1c`..`\x1e` separators, NEL, and U+2028 /
/// U+2029.
fn split_lines(input: &str) -> impl Iterator<Item = &str> {
    let mut rest = input;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }

        let Some((idx, ch)) = rest.char_indices().find(|(_, ch)| is_line_break(*ch)) else {
            let line = rest;
            rest = "";
            return Some(line);
        };

        let line = &rest[..idx];
        let mut next = idx + ch.len_utf8();
        if ch == '\r' && rest[next..].starts_with('\n') {
            next += 1;
        }
        rest = &rest[next..];
        Some(line)
    })
}

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r'
            | '\x0b'
            | '\x0c'
            | '\x1c'
            | '\x1d'
            | '\x1e'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Unicode whitespace plus the `\x1c`..`\x1f` separator controls.
fn trim(text: &str) -> &str {
    text.trim_matches(|ch: char| ch.is_whitespace() || ('\x1c'..='\x1f').contains(&ch))
}
