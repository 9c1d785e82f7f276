// sequence.rs — Range template expansion (`{#NAME=START,END} BODY {#}`)
//
// Single left-to-right scan with an explicit stack of open blocks. Inner
// blocks expand first and their output becomes part of the enclosing body,
// which gives the same result as repeatedly rescanning for innermost blocks
// but always terminates.
//
// Preconditions: none; any text is accepted.
// Postconditions: every well-formed, non-poisoned block is replaced by its
//                 expansion; all other text is preserved byte for byte.
// Failure modes: range bounds that overflow i64 or span more than
//                `MAX_RANGE_VALUES` values; a block whose expansion contains
//                the open marker `{#`.
// Side effects: none.

use crate::diag::PreprocessError;

const OPEN: &str = "{#";
const CLOSE: &str = "{#}";

/// Largest number of values a single block may unroll to.
pub const MAX_RANGE_VALUES: u64 = 1 << 20;

// ── Block header ────────────────────────────────────────────────────────────

/// A parsed `{#NAME=START,END}` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeHeader {
    pub name: String,
    pub start: i64,
    pub end: i64,
}

impl RangeHeader {
    /// Loop values in order, inclusive on both ends.
    pub fn values(&self) -> Box<dyn Iterator<Item = i64>> {
        if self.end >= self.start {
            Box::new(self.start..=self.end)
        } else {
            Box::new((self.end..=self.start).rev())
        }
    }

    /// Repeat `body` once per loop value, substituting the loop name.
    ///
    /// `{NAME}` placeholders are replaced together with their braces, then
    /// any remaining bare `NAME` text is replaced.
    pub fn expand(&self, body: &str) -> String {
        let body = body.trim_start();
        let braced = format!("{{{}}}", self.name);
        let mut out = String::new();
        for value in self.values() {
            let text = value.to_string();
            out.push_str(&body.replace(&braced, &text).replace(&self.name, &text));
        }
        out
    }
}

/// Try to parse a header at the start of `text` (which begins with `{#`).
///
/// Returns the header and its byte length, `Ok(None)` when the text is not a
/// header, or an error when the shape is right but a bound overflows or the
/// range is longer than `MAX_RANGE_VALUES`.
pub fn parse_header(text: &str) -> Result<Option<(RangeHeader, usize)>, PreprocessError> {
    let Some(rest) = text.strip_prefix(OPEN) else {
        return Ok(None);
    };
    let name_len = rest
        .char_indices()
        .find(|&(i, c)| !is_name_char(c, i == 0))
        .map_or(rest.len(), |(i, _)| i);
    if name_len == 0 {
        return Ok(None);
    }
    let (name, rest) = rest.split_at(name_len);
    let Some(rest) = rest.strip_prefix('=') else {
        return Ok(None);
    };
    let Some((start_lit, rest)) = split_integer(rest) else {
        return Ok(None);
    };
    let Some(rest) = rest.strip_prefix(',') else {
        return Ok(None);
    };
    let Some((end_lit, rest)) = split_integer(rest) else {
        return Ok(None);
    };
    if !rest.starts_with('}') {
        return Ok(None);
    }

    let bound = |literal: &str| {
        literal
            .parse::<i64>()
            .map_err(|_| PreprocessError::InvalidRangeBound {
                name: name.to_string(),
                literal: literal.to_string(),
            })
    };
    let header = RangeHeader {
        name: name.to_string(),
        start: bound(start_lit)?,
        end: bound(end_lit)?,
    };
    if header.start.abs_diff(header.end) >= MAX_RANGE_VALUES {
        return Err(PreprocessError::InvalidRangeBound {
            name: header.name,
            literal: end_lit.to_string(),
        });
    }
    let len = text.len() - rest.len() + 1;
    Ok(Some((header, len)))
}

fn is_name_char(c: char, first: bool) -> bool {
    if first {
        c.is_ascii_alphabetic() || c == '_'
    } else {
        c.is_ascii_alphanumeric() || c == '_' || c == '.'
    }
}

/// Split an optionally signed run of decimal digits off the front of `text`.
fn split_integer(text: &str) -> Option<(&str, &str)> {
    let sign = usize::from(text.starts_with('-'));
    let digits = text[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len() - sign);
    if digits == 0 {
        return None;
    }
    Some(text.split_at(sign + digits))
}

// ── Scanner ─────────────────────────────────────────────────────────────────

/// An open block awaiting its `{#}`.
struct Frame<'a> {
    header: RangeHeader,
    header_text: &'a str,
    body: String,
    /// Set once the body holds unexpanded `{#` text; such a block is
    /// emitted verbatim instead of expanded.
    poisoned: bool,
}

/// Output sink: the innermost open block, or the final output.
struct Scanner<'a> {
    out: String,
    stack: Vec<Frame<'a>>,
}

impl<'a> Scanner<'a> {
    fn push_text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(frame) => frame.body.push_str(text),
            None => self.out.push_str(text),
        }
    }

    /// Append text containing an unexpanded `{#`.
    fn push_verbatim(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(frame) => {
                frame.body.push_str(text);
                frame.poisoned = true;
            }
            None => self.out.push_str(text),
        }
    }

    fn close(&mut self) -> Result<(), PreprocessError> {
        let Some(frame) = self.stack.pop() else {
            self.out.push_str(CLOSE);
            return Ok(());
        };
        if frame.poisoned {
            let text = format!("{}{}{}", frame.header_text, frame.body, CLOSE);
            self.push_verbatim(&text);
            return Ok(());
        }
        let expanded = frame.header.expand(&frame.body);
        if expanded.contains(OPEN) {
            return Err(PreprocessError::SelfReproducingTemplate {
                name: frame.header.name,
            });
        }
        self.push_text(&expanded);
        Ok(())
    }

    /// Flush blocks left open at end of input, innermost first.
    fn finish(mut self) -> String {
        while let Some(frame) = self.stack.pop() {
            let text = format!("{}{}", frame.header_text, frame.body);
            self.push_verbatim(&text);
        }
        self.out
    }
}

// ── Public API ──────────────────────────────────────────────────────────────

/// Expand every range block in `source`.
pub fn expand_sequences(source: &str) -> Result<String, PreprocessError> {
    let mut scanner = Scanner {
        out: String::with_capacity(source.len()),
        stack: Vec::new(),
    };
    let mut rest = source;

    while let Some(pos) = rest.find(OPEN) {
        scanner.push_text(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with(CLOSE) {
            scanner.close()?;
            rest = &tail[CLOSE.len()..];
        } else if let Some((header, len)) = parse_header(tail)? {
            scanner.stack.push(Frame {
                header,
                header_text: &tail[..len],
                body: String::new(),
                poisoned: false,
            });
            rest = &tail[len..];
        } else {
            scanner.push_verbatim(OPEN);
            rest = &tail[OPEN.len()..];
        }
    }
    scanner.push_text(rest);

    Ok(scanner.finish())
}

// ── Tests ───────────────────────────────────────────────────────────────────
