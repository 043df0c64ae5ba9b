//! Post-processing: deterministic cleanup of agent-generated Markdown.
//!
//! Agents are asked for bare Markdown with `$…$` / `$$…$$` math, but they
//! still occasionally wrap the answer in a ```` ```markdown ```` fence or fall
//! back to `\(…\)` / `\[…\]` delimiters that the front-end math renderer does
//! not pick up. These passes fix that without touching content.
//!
//! Every pass is a pure `&str → String` function, so the same completion text
//! always yields the same output.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Apply all cleanup passes to a completion.
///
/// Passes (in order):
/// 1. Strip an outer markdown fence
/// 2. Normalise line endings (CRLF → LF)
/// 3. Rewrite `\(…\)` and line-level `\[…\]` math to `$…$` and `$$…$$`
/// 4. Trim trailing whitespace per line
/// 5. Collapse 4+ consecutive newlines down to 3
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = normalise_math_delimiters(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

/// Only unwraps when the body holds no fence lines of its own: with inner
/// code blocks the first and last fences may belong to different blocks.
fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) if !caps[1].lines().any(is_fence_line) => caps[1].to_string(),
        _ => input.to_string(),
    }
}

fn is_fence_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("```") || line.starts_with("~~~")
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Math delimiters ──────────────────────────────────────────────────
//
// Display math is only rewritten when `\[` opens a line, so escaped brackets
// inside prose (`\[1\]` citations) are left alone. Fenced blocks and inline
// code spans are copied through untouched.

static RE_INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\\((.+?)\\\)").unwrap());

static RE_DISPLAY_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^([ \t]*)\\\[(.*?)\\\][ \t]*$").unwrap());

static RE_CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"``[^`]+``|`[^`\n]+`").unwrap());

fn normalise_math_delimiters(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prose = String::new();
    let mut in_fence = false;
    for line in input.split_inclusive('\n') {
        if in_fence {
            out.push_str(line);
            in_fence = !is_fence_line(line);
        } else if is_fence_line(line) {
            out.push_str(&rewrite_math(&prose));
            prose.clear();
            out.push_str(line);
            in_fence = true;
        } else {
            prose.push_str(line);
        }
    }
    out.push_str(&rewrite_math(&prose));
    out
}

/// Rewrite delimiters in a run of prose lines, skipping code spans.
fn rewrite_math(prose: &str) -> String {
    let s = RE_DISPLAY_MATH.replace_all(prose, |caps: &Captures<'_>| {
        format!("{}$${}$$", &caps[1], caps[2].trim())
    });
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for span in RE_CODE_SPAN.find_iter(&s) {
        out.push_str(&rewrite_inline_math(&s[last..span.start()]));
        out.push_str(span.as_str());
        last = span.end();
    }
    out.push_str(&rewrite_inline_math(&s[last..]));
    out
}

fn rewrite_inline_math(text: &str) -> String {
    RE_INLINE_MATH
        .replace_all(text, |caps: &Captures<'_>| format!("${}$", caps[1].trim()))
        .to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 7: Ensure text ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n# Hello\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn test_strip_fences_md_tag() {
        let input = "```md\n# Hello\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello");
    }

    #[test]
    fn test_inner_code_block_kept() {
        let input = "# Code\n\n```rust\nfn main() {}\n```\n\nDone";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_separate_code_blocks_keep_their_fences() {
        let input = "```\nfn a() {}\n```\n\nBetween\n\n```\nfn b() {}\n```";
        assert_eq!(strip_markdown_fences(input), input);
        assert_eq!(clean_markdown(input), format!("{input}\n"));
    }

    #[test]
    fn test_wrapped_answer_with_inner_code_is_left_wrapped() {
        let input = "```markdown\n# Title\n```python\nx = 1\n```\n```";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_inline_math() {
        assert_eq!(
            normalise_math_delimiters(r"Energy \( E = mc^2 \) holds"),
            "Energy $E = mc^2$ holds"
        );
    }

    #[test]
    fn test_display_math() {
        let input = "Sum:\n\\[\n\\sum_i x_i\n\\]\nEnd";
        assert_eq!(normalise_math_delimiters(input), "Sum:\n$$\\sum_i x_i$$\nEnd");
    }

    #[test]
    fn test_citation_brackets_untouched() {
        let input = r"As shown in \[1\] and \[2\].";
        assert_eq!(normalise_math_delimiters(input), input);
    }

    #[test]
    fn test_math_inside_code_block_untouched() {
        let input = "```latex\n\\(x^2\\)\n\\[\n\\sum_i x_i\n\\]\n```\nThen \\(y\\)";
        let out = clean_markdown(input);
        assert!(out.contains("```latex\n\\(x^2\\)\n\\[\n\\sum_i x_i\n\\]\n```"), "{out}");
        assert!(out.ends_with("Then $y$\n"), "{out}");
    }

    #[test]
    fn test_math_inside_code_span_untouched() {
        assert_eq!(
            normalise_math_delimiters(r"Type `\(x\)` to get \(x\)"),
            r"Type `\(x\)` to get $x$"
        );
    }

    #[test]
    fn test_dollar_math_untouched() {
        let input = "Inline $a^2$ and\n$$b^2$$";
        assert_eq!(normalise_math_delimiters(input), input);
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "helloworld");
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_clean_markdown_full_pipeline() {
        let input = "```markdown\n# Title\r\n\r\nKey idea \\(x\\)   \n\n\n\n\n\n## Section\n```";
        let result = clean_markdown(input);
        assert!(result.starts_with("# Title"));
        assert!(result.contains("Key idea $x$\n"));
        assert!(!result.contains("\n\n\n\n"));
        assert!(result.ends_with("## Section\n"));
    }

    #[test]
    fn test_clean_markdown_is_stable() {
        let once = clean_markdown("# A\n\nText \\(y\\)");
        assert_eq!(clean_markdown(&once), once);
    }
}
