//! Post-processing: deterministic cleanup of text extracted by pdfium.
//!
//! pdfium returns the text layer more or less as it sits in the content
//! stream: CRLF line breaks, form feeds between text runs, soft hyphens,
//! bullet glyphs instead of list markers, words split across lines. The
//! rules here turn that into Markdown that renders sensibly without
//! changing the words themselves.
//!
//! ## Rule Order
//!
//! Line endings are normalised first because every later rule is
//! line-based. Hyphenation is repaired before trailing whitespace is
//! trimmed so `exam- \nple` is still caught, and the final-newline pass
//! runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw extracted text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip control characters other than `\n` and `\t`
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 4. Re-join words hyphenated across a line break
/// 5. Turn bullet glyphs at the start of a line into `- ` list items
/// 6. Trim trailing whitespace per line
/// 7. Collapse 3+ consecutive blank lines down to 2
/// 8. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_control_chars(&s);
    let s = remove_invisible_chars(&s);
    let s = join_hyphenated_words(&s);
    let s = normalise_bullets(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip control characters ─────────────────────────────────────────

/// Form feeds separate text runs in pdfium output; treat them as breaks.
fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            '\n' | '\t' => Some(c),
            '\u{000C}' | '\u{000B}' => Some('\n'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FFFE}',
        ],
        "",
    )
}

// ── Rule 4: Re-join hyphenated words ─────────────────────────────────────────
//
// Only lowercase-hyphen-newline-lowercase is joined, so compound words at a
// line end ("well-\nKnown") and list dashes are left alone.

static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-[ \t]*\n[ \t]*(\p{Ll})").unwrap());

fn join_hyphenated_words(input: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(input, "$1$2").to_string()
}

// ── Rule 5: Bullet glyphs → Markdown list items ──────────────────────────────

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)[•◦▪▫●○■□‣⁃∙·][ \t]*").unwrap());

fn normalise_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, "$1- ").to_string()
}

// ── Rule 6: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 8: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
