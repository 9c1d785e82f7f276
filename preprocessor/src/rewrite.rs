// rewrite.rs — Fallible pattern substitution shared by the enum and dispatch passes

use regex::{Captures, Regex};

use crate::diag::PreprocessError;

/// Character class for enum keys and suffixes.
pub const ENUM_NAME: &str = r"[A-Za-z0-9_.\-]+";

/// Character class for dispatch group and function names.
pub const DISPATCH_NAME: &str = r"[A-Za-z0-9_.]+";

/// Replace every non-overlapping match of `re` in `text` with the result of
/// `replace`, left to right. The first error aborts and is returned; no
/// partially rewritten text escapes.
pub fn try_replace_all<F>(re: &Regex, text: &str, mut replace: F) -> Result<String, PreprocessError>
where
    F: FnMut(&Captures<'_>) -> Result<String, PreprocessError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replace(&caps)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Text of capture group `index`, or `""` when it did not participate.
pub fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}
