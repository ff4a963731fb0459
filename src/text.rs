//! # Text Wrapping
//!
//! Fixed-width line breaking for table cells.
//!
//! Lines are cut every `chars_per_line` characters with no word-boundary
//! awareness. The cut positions depend only on character counts, so the
//! result is the same for every script and every font, and the row
//! arithmetic in the layout engine can rely on it.

/// Wrap `text` into lines of at most `chars_per_line` characters.
///
/// Paragraphs are separated by `'\n'`. A paragraph that is blank after
/// trimming becomes a single empty line. Every non-blank paragraph except
/// the last one is followed by one empty line. Empty input yields no lines.
///
/// `chars_per_line` must be positive; the layout config guarantees this.
pub fn wrap(text: &str, chars_per_line: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    debug_assert!(chars_per_line > 0, "chars_per_line must be positive");
    let width = chars_per_line.max(1);

    let paragraphs: Vec<&str> = text.split('\n').collect();
    let last = paragraphs.len() - 1;
    let mut lines = Vec::new();

    for (index, paragraph) in paragraphs.iter().enumerate() {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let chars: Vec<char> = paragraph.chars().collect();
        lines.extend(chars.chunks(width).map(|chunk| chunk.iter().collect::<String>()));

        if index < last {
            lines.push(String::new());
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap("", 57).is_empty());
        assert!(wrap("", 1).is_empty());
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap("Hallo", 57), vec!["Hallo"]);
    }

    #[test]
    fn slices_at_exact_width() {
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("abcdefgh", 4), vec!["abcd", "efgh"]);
    }

    #[test]
    fn cuts_words_mid_character_run() {
        let lines = wrap("hello world", 3);
        assert_eq!(lines, vec!["hel", "lo ", "wor", "ld"]);
    }

    #[test]
    fn paragraphs_get_a_blank_separator() {
        assert_eq!(wrap("ab\ncd", 10), vec!["ab", "", "cd"]);
    }

    #[test]
    fn blank_paragraph_is_preserved_once() {
        // The blank paragraph itself is the spacer: no extra separator follows it.
        assert_eq!(wrap("ab\n\ncd", 10), vec!["ab", "", "", "cd"]);
        assert_eq!(wrap("ab\n   \ncd", 10), vec!["ab", "", "", "cd"]);
    }

    #[test]
    fn trailing_newline_ends_with_blank_line() {
        assert_eq!(wrap("ab\n", 10), vec!["ab", "", ""]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let lines = wrap("äöüßéèçñ", 3);
        assert_eq!(lines, vec!["äöü", "ßéè", "çñ"]);
        let lines = wrap("日本語のテキスト", 4);
        assert_eq!(lines, vec!["日本語の", "テキスト"]);
    }

    #[test]
    fn no_line_exceeds_width() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\
                    Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.\n\n\
                    Ut enim ad minim veniam, quis nostrud exercitation ullamco.";
        for width in 1..=60 {
            for line in wrap(text, width) {
                assert!(line.chars().count() <= width, "{:?} exceeds {}", line, width);
            }
        }
    }

    #[test]
    fn joining_lines_restores_paragraphs() {
        let text = "first paragraph is long enough to wrap twice\nsecond\n\nfourth";
        let lines = wrap(text, 7);

        // Rebuild: consecutive non-empty lines belong to one paragraph.
        let mut paragraphs: Vec<String> = Vec::new();
        let mut current = String::new();
        for line in &lines {
            if line.is_empty() {
                if !current.is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
            } else {
                current.push_str(line);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }

        let expected: Vec<&str> = text.split('\n').filter(|p| !p.is_empty()).collect();
        assert_eq!(paragraphs, expected);
    }
}
