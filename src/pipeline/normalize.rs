//! Text normalizer: splits a mail body into runs of printable characters.
//!
//! Mail bodies are full of line breaks, tabs, non-breaking spaces and
//! zero-width formatting codes. Each of those ends the current fragment, so
//! a link on its own line comes out as its own fragment. The ASCII space is
//! the only whitespace treated as printable.

/// Split `raw_body` at every non-printable character.
///
/// Empty fragments are dropped; order follows the input. Never fails.
pub fn normalize(raw_body: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();

    for ch in raw_body.chars() {
        if is_printable(ch) {
            current.push(ch);
        } else if !current.is_empty() {
            fragments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }

    fragments
}

/// Whether `ch` renders as a visible glyph (or is the plain ASCII space).
pub fn is_printable(ch: char) -> bool {
    if ch == ' ' {
        return true;
    }
    !(ch.is_control() || ch.is_whitespace() || is_format(ch) || is_private_use(ch))
}

/// Unicode general category Cf.
fn is_format(ch: char) -> bool {
    matches!(
        ch,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

/// Unicode general category Co.
fn is_private_use(ch: char) -> bool {
    matches!(
        ch,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_fragments() {
        assert!(normalize("").is_empty());
    }

    #[test]
    fn only_separators_yield_no_fragments() {
        assert!(normalize("\r\n\t\u{200B}\n\n").is_empty());
    }

    #[test]
    fn splits_on_line_breaks() {
        let body = "New issue opened\r\n\r\nhttps://github.com/acme/widget/issues/42\r\n";
        assert_eq!(
            normalize(body),
            vec!["New issue opened", "https://github.com/acme/widget/issues/42"]
        );
    }

    #[test]
    fn ascii_space_is_printable() {
        assert_eq!(normalize("a b  c"), vec!["a b  c"]);
    }

    #[test]
    fn tabs_and_nbsp_split() {
        assert_eq!(normalize("a\tb\u{00A0}c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn zero_width_and_bidi_codes_split() {
        assert_eq!(
            normalize("left\u{200B}right\u{202E}end\u{FEFF}"),
            vec!["left", "right", "end"]
        );
    }

    #[test]
    fn non_ascii_glyphs_are_kept() {
        assert_eq!(normalize("café « ünïcode » 🎉"), vec!["café « ünïcode » 🎉"]);
    }

    #[test]
    fn fragments_are_printable_and_preserve_content() {
        let body = "\u{0007}one\n\ntwo\u{00AD}three\u{E000}four \r\n";
        let fragments = normalize(body);

        for fragment in &fragments {
            assert!(!fragment.is_empty());
            assert!(fragment.chars().all(is_printable));
        }

        let stripped: String = body.chars().filter(|c| is_printable(*c)).collect();
        assert_eq!(fragments.concat(), stripped);
        assert_eq!(fragments, vec!["one", "two", "three", "four "]);
    }
}
