//! The normalization contract's ordered think-tag stripping pipeline
//! (SPEC_FULL.md §4.1). Applied in three ordered rules:
//!
//! 1. Remove every complete tag pair of a recognized name, including content.
//! 2. Remove any opened tag of a recognized name with no closing tag through
//!    end of output.
//! 3. Remove any dangling partial opening or closing tag fragment at the end
//!    of output.
//!
//! Idempotent by construction (P6): after one pass there are no complete
//! pairs, no unclosed openings, and no dangling fragments left to strip.

use regex::Regex;
use std::sync::OnceLock;

use super::RECOGNIZED_THINK_TAGS;

fn complete_pair_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        RECOGNIZED_THINK_TAGS
            .iter()
            .map(|tag| Regex::new(&format!(r"(?s)<{tag}>.*?</{tag}>")).expect("valid tag regex"))
            .collect()
    })
}

/// Strip recognized think/reasoning tags from `text`. Returns the cleaned
/// text and the byte count excised (used to estimate think_tokens).
pub fn strip_think_tags(text: &str) -> (String, usize, Option<&'static str>) {
    let original_len = text.len();
    let mut out = text.to_string();
    let mut detected: Option<&'static str> = None;

    // Rule 1: complete pairs, for every recognized tag name.
    for (tag, pattern) in RECOGNIZED_THINK_TAGS.iter().zip(complete_pair_patterns()) {
        if pattern.is_match(&out) {
            detected.get_or_insert(tag);
        }
        out = pattern.replace_all(&out, "").to_string();
    }

    // Rule 2: an opened tag with no closing tag through end of output.
    for tag in RECOGNIZED_THINK_TAGS {
        let open = format!("<{tag}>");
        if let Some(idx) = out.find(&open) {
            let close = format!("</{tag}>");
            if out[idx..].find(&close).is_none() {
                detected.get_or_insert(tag);
                out.truncate(idx);
            }
        }
    }

    // Rule 3: a dangling partial opening or closing tag fragment at the end.
    out = strip_dangling_fragment(&out);

    let think_tokens = original_len.saturating_sub(out.len());
    (out, think_tokens, detected)
}

/// Removes a trailing fragment of `<tag`, `<tag>` (without content), `</tag`,
/// or any proper prefix thereof, for any recognized tag. Only fragments of at
/// least two characters are considered, to avoid false positives on a stray
/// `<` that isn't the start of a tag.
fn strip_dangling_fragment(text: &str) -> String {
    let mut candidates: Vec<String> = Vec::new();
    for tag in RECOGNIZED_THINK_TAGS {
        let open_full = format!("<{tag}>");
        let close_full = format!("</{tag}>");
        for full in [open_full, close_full] {
            for len in 2..full.len() {
                candidates.push(full[..len].to_string());
            }
        }
    }
    // Longest candidate first so we strip the maximal dangling fragment.
    candidates.sort_by_key(|c| std::cmp::Reverse(c.len()));
    for candidate in candidates {
        if text.ends_with(candidate.as_str()) {
            return text[..text.len() - candidate.len()].to_string();
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_complete_pair() {
        let (out, tokens, detected) = strip_think_tags("<think>secret plan</think>The answer is 4.");
        assert_eq!(out, "The answer is 4.");
        assert!(tokens > 0);
        assert_eq!(detected, Some("think"));
    }

    #[test]
    fn strips_multiple_recognized_tags() {
        let (out, _, _) =
            strip_think_tags("<reflection>hmm</reflection>Answer<reasoning>because</reasoning>.");
        assert_eq!(out, "Answer.");
    }

    #[test]
    fn strips_unclosed_opening_tag_through_end() {
        let (out, _, detected) = strip_think_tags("Before.<think>never closes and trails off");
        assert_eq!(out, "Before.");
        assert_eq!(detected, Some("think"));
    }

    #[test]
    fn strips_dangling_partial_fragment() {
        let (out, _, _) = strip_think_tags("Final answer here.<thi");
        assert_eq!(out, "Final answer here.");
    }

    #[test]
    fn leaves_clean_text_untouched() {
        let (out, tokens, detected) = strip_think_tags("Just a normal answer.");
        assert_eq!(out, "Just a normal answer.");
        assert_eq!(tokens, 0);
        assert_eq!(detected, None);
    }

    #[test]
    fn idempotent_after_single_pass() {
        let input = "<think>plan</think>Answer<reas";
        let (once, _, _) = strip_think_tags(input);
        let (twice, tokens_second_pass, _) = strip_think_tags(&once);
        assert_eq!(once, twice);
        assert_eq!(tokens_second_pass, 0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_idempotent(s in "\\PC{0,200}") {
            let (once, _, _) = strip_think_tags(&s);
            let (twice, _, _) = strip_think_tags(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
