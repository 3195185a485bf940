//! Cleans model output before it is spoken.
//!
//! Removes emoji, fenced code blocks and inline code spans, then drops the markdown
//! characters `#`, `*`, `_`, `-` and `~`. Applying it twice gives the same result as
//! applying it once.

use once_cell::sync::Lazy;
use regex::Regex;

/// Keycap sequences (`1️⃣`) go as a whole, base character included.
static EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9#*]\x{FE0F}?\x{20E3}|[\p{Extended_Pictographic}\x{1F1E6}-\x{1F1FF}\x{1F3FB}-\x{1F3FF}\x{FE0F}\x{200D}\x{20E3}]")
        .unwrap_or_else(|_| unreachable!())
});

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap_or_else(|_| unreachable!()));

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`]*`").unwrap_or_else(|_| unreachable!()));

const MARKDOWN_CHARS: [char; 5] = ['#', '*', '_', '-', '~'];

/// Raw text as returned by a backend: one string or a list of fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawText {
    Single(String),
    Fragments(Vec<String>),
}

impl From<String> for RawText {
    fn from(s: String) -> Self {
        RawText::Single(s)
    }
}

impl From<&str> for RawText {
    fn from(s: &str) -> Self {
        RawText::Single(s.to_string())
    }
}

impl From<Vec<String>> for RawText {
    fn from(parts: Vec<String>) -> Self {
        RawText::Fragments(parts)
    }
}

/// Strip emoji, code and markdown markers. Fragments are joined with single spaces.
pub fn sanitize(raw: impl Into<RawText>) -> String {
    let text = match raw.into() {
        RawText::Single(s) => s,
        RawText::Fragments(parts) => parts.join(" "),
    };
    let text = EMOJI.replace_all(&text, "");
    let text = CODE_FENCE.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "");
    text.chars().filter(|c| !MARKDOWN_CHARS.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_markdown_and_emoji() {
        assert_eq!(sanitize("**Hello** 😀 world"), "Hello  world");
        assert_eq!(sanitize("## Title ~~old~~ snake_case"), " Title old snakecase");
    }

    #[test]
    fn removes_code() {
        assert_eq!(
            sanitize("Run this:\n```rust\nfn main() {}\n```\nthen `cargo run` it."),
            "Run this:\n\nthen  it."
        );
    }

    #[test]
    fn hyphens_are_dropped() {
        assert_eq!(sanitize("well-known"), "wellknown");
    }

    #[test]
    fn fragments_are_joined_with_spaces() {
        let parts = vec!["Hello".to_string(), "*there*".to_string()];
        assert_eq!(sanitize(parts), "Hello there");
    }

    #[test]
    fn flags_and_keycaps_are_removed() {
        assert_eq!(sanitize("Go 🇫🇷 team 👍🏽!"), "Go  team !");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(sanitize("It is 42 degrees."), "It is 42 degrees.");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let samples = [
            "**bold** `code` ```block``` 🎉 a-b",
            "`unclosed and ``` fence",
            "``x` ` `",
            "# heading\n- item\n- item 2",
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(once.clone()), once, "input: {:?}", s);
        }
    }

    #[test]
    fn emoji_sequences_go_as_a_whole() {
        assert_eq!(sanitize("Go 🇫🇷 team 👍🏽! © 1️⃣"), "Go  team !  ");
        assert_eq!(sanitize("Press 5⃣ then #️⃣"), "Press  then ");
        assert_eq!(sanitize("Top 10 and #1"), "Top 10 and 1");
    }
}
