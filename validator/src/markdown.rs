//! Markdown stripping: recover plain text for extraction.

use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("static regex"));
static FENCED_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("static regex"));
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").expect("static regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("static regex"));
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s+").expect("static regex"));
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("static regex"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("static regex"));
static BOLD_U_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^_]+)__").expect("static regex"));
static ITALIC_U_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^_]+)_").expect("static regex"));
static LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").expect("static regex"));
static ORDERED_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("static regex"));
static BLOCKQUOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^>\s+").expect("static regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("static regex"));
static NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("static regex"));

/// First `# ` heading of the document, used as the article title.
pub fn extract_title(markdown: &str) -> Option<String> {
    TITLE_RE
        .captures(markdown)
        .map(|caps| caps[1].trim().to_string())
}

/// Strip markdown structure down to plain prose. The trailing `---` metadata
/// block, code, link syntax, headings, emphasis, list markers and
/// blockquotes are all removed.
pub fn markdown_to_text(markdown: &str) -> String {
    // Metadata after the first "---" separator is dropped.
    let text = match markdown.split_once("---") {
        Some((before, _)) => before,
        None => markdown,
    };

    let text = FENCED_CODE_RE.replace_all(text, "");
    let text = INLINE_CODE_RE.replace_all(&text, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = HEADING_RE.replace_all(&text, "");
    let text = BOLD_RE.replace_all(&text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = BOLD_U_RE.replace_all(&text, "$1");
    let text = ITALIC_U_RE.replace_all(&text, "$1");
    let text = LIST_RE.replace_all(&text, "");
    let text = ORDERED_LIST_RE.replace_all(&text, "");
    let text = BLOCKQUOTE_RE.replace_all(&text, "");
    let text = SPACE_RE.replace_all(&text, " ");
    let text = NEWLINE_RE.replace_all(&text, "\n");

    text.trim().to_string()
}
