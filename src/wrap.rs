//! Greedy line wrapping of a tokenized message body.
//!
//! [`LineWrapper`] yields one [`Line`] per visual line. Formatting
//! that is open at a line break is closed at the end of the fragment and
//! reopened at the start of the next one.

use std::iter::FusedIterator;

use crate::error::RenderError;
use crate::reference::{RenderedWord, Resolver, render_word};
use crate::style::{Style, StyleSet};
use crate::tokenizer::{Delimiter, Token, Tokens, tokenize};
use crate::xml::{display_len, escape_xml};

const CLOSE_SPACE: &str = "</tspan> ";

/// One wrapped line. `clean_len` counts visible characters only, so a line
/// holding nothing but carried style spans is still blank.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Line {
    pub markup: String,
    pub clean_len: usize,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.clean_len == 0
    }
}

/// Single-pass iterator over the wrapped lines of one message.
///
/// The sequence cannot be restarted: build a new wrapper to render again.
/// After the first error the iterator is exhausted.
pub struct LineWrapper<'a, R: Resolver + ?Sized> {
    tokens: Tokens,
    resolver: &'a R,
    fill_start: String,
    width: usize,
    line: Line,
    styles: StyleSet,
    finished: bool,
}

/// Wraps `text` to `width` visible characters per line.
///
/// A trailing newline is always appended so the last line is emitted.
pub fn wrap_lines<'a, R: Resolver + ?Sized>(
    text: &str,
    width: usize,
    accent: &str,
    resolver: &'a R,
) -> LineWrapper<'a, R> {
    let mut terminated = String::with_capacity(text.len() + 1);
    terminated.push_str(text);
    terminated.push('\n');

    LineWrapper {
        tokens: tokenize(&terminated),
        resolver,
        fill_start: format!(r#"<tspan fill="{}">"#, escape_xml(accent)),
        width,
        line: Line::default(),
        styles: StyleSet::default(),
        finished: false,
    }
}

impl<R: Resolver + ?Sized> LineWrapper<'_, R> {
    /// Feeds one token; returns the fragment completed by it, if any.
    fn step(&mut self, token: Token) -> Result<Option<Line>, RenderError> {
        match token {
            Token::Delimiter(Delimiter::Newline) => self.flush().map(Some),
            Token::Delimiter(Delimiter::Space) => self.push_word(" "),
            Token::Delimiter(delimiter) => {
                let completed = self.break_if_full(delimiter.char_len())?;
                if let Some(style) = Style::for_delimiter(delimiter) {
                    self.styles.toggle(style, &mut self.line.markup)?;
                }
                Ok(completed)
            }
            Token::Word(word) => self.push_word(&word),
        }
    }

    fn push_word(&mut self, word: &str) -> Result<Option<Line>, RenderError> {
        let rendered = render_word(word, self.resolver)?;
        let len = display_len(&rendered.text) + display_len(&rendered.tail);
        let completed = self.break_if_full(len)?;
        self.append(rendered, len);
        Ok(completed)
    }

    fn break_if_full(&mut self, incoming: usize) -> Result<Option<Line>, RenderError> {
        // A line holding at most one character is never broken, so an
        // over-long first word overflows instead of being split.
        if self.line.clean_len + incoming > self.width && self.line.clean_len > 1 {
            self.flush().map(Some)
        } else {
            Ok(None)
        }
    }

    fn append(&mut self, word: RenderedWord, len: usize) {
        let markup = &mut self.line.markup;
        if word.accent {
            markup.push_str(&self.fill_start);
            markup.push_str(&word.text);
            markup.push_str("</tspan>");
        } else {
            markup.push_str(&word.text);
        }
        markup.push_str(&word.tail);
        self.line.clean_len += len;
    }

    fn flush(&mut self) -> Result<Line, RenderError> {
        strip_stray_spaces(&mut self.line.markup);
        let carried = self.styles.close_all(&mut self.line.markup);
        let line = std::mem::take(&mut self.line);
        self.styles.reopen(carried, &mut self.line.markup)?;
        Ok(line)
    }
}

impl<R: Resolver + ?Sized> Iterator for LineWrapper<'_, R> {
    type Item = Result<Line, RenderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        while let Some(token) = self.tokens.next() {
            match self.step(token) {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => {}
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
        self.finished = true;
        None
    }
}

impl<R: Resolver + ?Sized> FusedIterator for LineWrapper<'_, R> {}

/// Drops a space right after a closing span when it ends the line or is
/// followed by another space.
fn strip_stray_spaces(markup: &mut String) {
    if !markup.contains(CLOSE_SPACE) {
        return;
    }
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup.as_str();
    while let Some(pos) = rest.find(CLOSE_SPACE) {
        let after = &rest[pos + CLOSE_SPACE.len()..];
        out.push_str(&rest[..pos]);
        if after.is_empty() || after.starts_with(' ') {
            out.push_str("</tspan>");
        } else {
            out.push_str(CLOSE_SPACE);
        }
        rest = after;
    }
    out.push_str(rest);
    *markup = out;
}
