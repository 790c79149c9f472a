//! Tokeniser for fenced code spans.
//!
//! Three token classes are produced: fence-open, fence-close and plain text.
//! Fences alternate strictly, so a ``` seen while a fence is open always closes it.

const FENCE: &str = "```";

/// A lexical token borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Opening ``` with an optional language tag from the rest of its line.
    FenceOpen { language: Option<&'a str> },
    /// Closing ```.
    FenceClose,
    /// Text between fences: prose outside, code inside.
    Text(&'a str),
}

/// Splits `source` into tokens.
///
/// The language tag and the newline ending the opening fence line are consumed by
/// the fence-open token. A tag is only recognised once its line is terminated, so a
/// partially streamed tag stays in the code text until the newline arrives.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut in_code = false;

    while let Some(pos) = rest.find(FENCE) {
        if pos > 0 {
            tokens.push(Token::Text(&rest[..pos]));
        }
        rest = &rest[pos + FENCE.len()..];

        if in_code {
            tokens.push(Token::FenceClose);
        } else {
            let (language, consumed) = opening_line(rest);
            tokens.push(Token::FenceOpen { language });
            rest = &rest[consumed..];
        }
        in_code = !in_code;
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    tokens
}

/// Reads the remainder of an opening fence line.
///
/// Returns the language tag, if any, and how many bytes belong to the fence line.
fn opening_line(after_fence: &str) -> (Option<&str>, usize) {
    let Some(newline) = after_fence.find('\n') else {
        return (None, 0);
    };
    let line = after_fence[..newline].trim_end_matches('\r');
    let tag = line.trim();

    if tag.is_empty() {
        (None, newline + 1)
    } else if is_language_tag(tag) && !line.contains(FENCE) {
        (Some(tag), newline + 1)
    } else {
        (None, 0)
    }
}

fn is_language_tag(candidate: &str) -> bool {
    candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '#' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_only() {
        assert_eq!(tokenize("hello"), vec![Token::Text("hello")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_fenced_block_with_language() {
        let tokens = tokenize("intro\n```python\nprint(1)\n```\noutro");
        assert_eq!(
            tokens,
            vec![
                Token::Text("intro\n"),
                Token::FenceOpen {
                    language: Some("python")
                },
                Token::Text("print(1)\n"),
                Token::FenceClose,
                Token::Text("\noutro"),
            ]
        );
    }

    #[test]
    fn test_inline_fence_has_no_language() {
        let tokens = tokenize("```print(1)```");
        assert_eq!(
            tokens,
            vec![
                Token::FenceOpen { language: None },
                Token::Text("print(1)"),
                Token::FenceClose,
            ]
        );
    }

    #[test]
    fn test_partial_language_tag_is_not_recognised_yet() {
        assert_eq!(
            tokenize("```pyt"),
            vec![Token::FenceOpen { language: None }, Token::Text("pyt")]
        );
        assert_eq!(
            tokenize("```python\n"),
            vec![Token::FenceOpen {
                language: Some("python")
            }]
        );
    }

    #[test]
    fn test_bare_fence_consumes_its_newline() {
        let tokens = tokenize("```\nx = 1\n```");
        assert_eq!(
            tokens,
            vec![
                Token::FenceOpen { language: None },
                Token::Text("x = 1\n"),
                Token::FenceClose,
            ]
        );
    }
}
