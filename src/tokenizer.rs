//! Splits a raw message body into words and markdown delimiters.

use crate::xml::escape_text;

/// Markdown markers recognized in message bodies.
///
/// The declaration order is the split order: two-character markers come
/// before the one-character markers they contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Bold,
    ItalicStar,
    Underline,
    ItalicUnderscore,
    Strikethrough,
    Space,
    Newline,
}

impl Delimiter {
    pub const SPLIT_ORDER: [Delimiter; 7] = [
        Delimiter::Bold,
        Delimiter::ItalicStar,
        Delimiter::Underline,
        Delimiter::ItalicUnderscore,
        Delimiter::Strikethrough,
        Delimiter::Space,
        Delimiter::Newline,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Bold => "**",
            Delimiter::ItalicStar => "*",
            Delimiter::Underline => "__",
            Delimiter::ItalicUnderscore => "_",
            Delimiter::Strikethrough => "~~",
            Delimiter::Space => " ",
            Delimiter::Newline => "\n",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::SPLIT_ORDER.into_iter().find(|d| d.as_str() == s)
    }

    pub fn char_len(self) -> usize {
        self.as_str().chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, already escaped for markup.
    Word(String),
    Delimiter(Delimiter),
}

/// The token list is built eagerly per message; consumers pull from it one
/// token at a time.
pub type Tokens = std::vec::IntoIter<Token>;

/// Tokenizes `text`, escaping `&` and `<` in every word exactly once.
///
/// Spaces are delimiters too; [`crate::wrap`] renders them as plain words.
pub fn tokenize(text: &str) -> Tokens {
    let mut pieces: Vec<&str> = vec![text];

    for delimiter in Delimiter::SPLIT_ORDER {
        let marker = delimiter.as_str();
        let mut next = Vec::with_capacity(pieces.len());
        for piece in pieces {
            if Delimiter::parse(piece).is_some() {
                next.push(piece);
                continue;
            }
            let mut parts = piece.split(marker);
            if let Some(first) = parts.next() {
                next.push(first);
            }
            for part in parts {
                next.push(marker);
                next.push(part);
            }
        }
        pieces = next;
    }

    pieces
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| match Delimiter::parse(piece) {
            Some(delimiter) => Token::Delimiter(delimiter),
            None => Token::Word(escape_word(piece)),
        })
        .collect::<Vec<_>>()
        .into_iter()
}

/// Escapes `word`, folding entity text the input already carried back to a
/// single level so `&amp;` in a message stays `&amp;`.
fn escape_word(word: &str) -> String {
    let mut escaped = escape_text(word);
    while escaped.contains("&amp;amp;") || escaped.contains("&amp;lt;") {
        escaped = escaped
            .replace("&amp;amp;", "&amp;")
            .replace("&amp;lt;", "&lt;");
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    fn delim(d: Delimiter) -> Token {
        Token::Delimiter(d)
    }

    #[test]
    fn splits_bold_before_italic() {
        let tokens: Vec<_> = tokenize("**hi** there").collect();
        assert_eq!(
            tokens,
            vec![
                delim(Delimiter::Bold),
                word("hi"),
                delim(Delimiter::Bold),
                delim(Delimiter::Space),
                word("there"),
            ]
        );
    }

    #[test]
    fn triple_star_is_bold_then_italic() {
        let tokens: Vec<_> = tokenize("***x").collect();
        assert_eq!(
            tokens,
            vec![
                delim(Delimiter::Bold),
                delim(Delimiter::ItalicStar),
                word("x")
            ]
        );
    }

    #[test]
    fn underscores_and_tildes() {
        let tokens: Vec<_> = tokenize("__a__ _b_ ~~c~~").collect();
        assert_eq!(
            tokens,
            vec![
                delim(Delimiter::Underline),
                word("a"),
                delim(Delimiter::Underline),
                delim(Delimiter::Space),
                delim(Delimiter::ItalicUnderscore),
                word("b"),
                delim(Delimiter::ItalicUnderscore),
                delim(Delimiter::Space),
                delim(Delimiter::Strikethrough),
                word("c"),
                delim(Delimiter::Strikethrough),
            ]
        );
    }

    #[test]
    fn newlines_and_repeated_spaces_are_kept() {
        let tokens: Vec<_> = tokenize("a\n\nb  c").collect();
        assert_eq!(
            tokens,
            vec![
                word("a"),
                delim(Delimiter::Newline),
                delim(Delimiter::Newline),
                word("b"),
                delim(Delimiter::Space),
                delim(Delimiter::Space),
                word("c"),
            ]
        );
    }

    #[test]
    fn escapes_words_once() {
        let tokens: Vec<_> = tokenize("a&b <@1> **&**").collect();
        assert_eq!(
            tokens,
            vec![
                word("a&amp;b"),
                delim(Delimiter::Space),
                word("&lt;@1>"),
                delim(Delimiter::Space),
                delim(Delimiter::Bold),
                word("&amp;"),
                delim(Delimiter::Bold),
            ]
        );
    }

    #[test]
    fn role_mention_keeps_escaped_sigil() {
        let tokens: Vec<_> = tokenize("<@&42>").collect();
        assert_eq!(tokens, vec![word("&lt;@&amp;42>")]);
    }

    #[test]
    fn pre_escaped_entities_stay_single() {
        let tokens: Vec<_> = tokenize("Tom &amp; Jerry &lt;3 &amp;amp;").collect();
        assert_eq!(
            tokens,
            vec![
                word("Tom"),
                delim(Delimiter::Space),
                word("&amp;"),
                delim(Delimiter::Space),
                word("Jerry"),
                delim(Delimiter::Space),
                word("&lt;3"),
                delim(Delimiter::Space),
                word("&amp;"),
            ]
        );
    }

    #[test]
    fn delimiter_lengths_are_in_chars() {
        assert_eq!(Delimiter::Bold.char_len(), 2);
        assert_eq!(Delimiter::Newline.char_len(), 1);
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert_eq!(tokenize("").count(), 0);
    }

    proptest! {
        #[test]
        fn never_double_escapes(text in "[a-z&<;*_~ \n]{0,64}") {
            for token in tokenize(&text) {
                if let Token::Word(w) = token {
                    prop_assert!(!w.contains("&amp;amp;"));
                    prop_assert!(!w.contains("&amp;lt;"));
                    prop_assert!(!w.contains('<'));
                }
            }
        }

        #[test]
        fn escaped_count_matches_input(text in "[b-k&< \n]{0,64}") {
            let amps: usize = tokenize(&text)
                .map(|t| match t {
                    Token::Word(w) => w.matches("&amp;").count(),
                    Token::Delimiter(_) => 0,
                })
                .sum();
            prop_assert_eq!(amps, text.matches('&').count());
        }
    }
}
