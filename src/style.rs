//! Inline formatting state for one message.

use crate::error::StyleError;
use crate::tokenizer::Delimiter;

const END_SPAN: &str = "</tspan>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl Style {
    /// Order in which carried styles are reopened after a line break.
    pub const REOPEN_ORDER: [Style; 4] = [
        Style::Bold,
        Style::Italic,
        Style::Underline,
        Style::Strikethrough,
    ];

    pub fn for_delimiter(delimiter: Delimiter) -> Option<Self> {
        match delimiter {
            Delimiter::Bold => Some(Style::Bold),
            Delimiter::ItalicStar | Delimiter::ItalicUnderscore => Some(Style::Italic),
            Delimiter::Underline => Some(Style::Underline),
            Delimiter::Strikethrough => Some(Style::Strikethrough),
            Delimiter::Space | Delimiter::Newline => None,
        }
    }

    fn start_span(self) -> &'static str {
        match self {
            Style::Bold => r#"<tspan font-weight="bold">"#,
            Style::Italic => r#"<tspan font-style="italic">"#,
            Style::Underline => r#"<tspan text-decoration="underline">"#,
            Style::Strikethrough => r#"<tspan text-decoration="line-through">"#,
        }
    }
}

/// Which of the four inline styles are currently open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleSet {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl StyleSet {
    pub fn is_open(&self, style: Style) -> bool {
        match style {
            Style::Bold => self.bold,
            Style::Italic => self.italic,
            Style::Underline => self.underline,
            Style::Strikethrough => self.strikethrough,
        }
    }

    fn flag_mut(&mut self, style: Style) -> &mut bool {
        match style {
            Style::Bold => &mut self.bold,
            Style::Italic => &mut self.italic,
            Style::Underline => &mut self.underline,
            Style::Strikethrough => &mut self.strikethrough,
        }
    }

    pub fn open(&mut self, style: Style, out: &mut String) -> Result<(), StyleError> {
        let flag = self.flag_mut(style);
        if *flag {
            return Err(StyleError::AlreadyOpen(style));
        }
        *flag = true;
        out.push_str(style.start_span());
        Ok(())
    }

    pub fn close(&mut self, style: Style, out: &mut String) -> Result<(), StyleError> {
        let flag = self.flag_mut(style);
        if !*flag {
            return Err(StyleError::NotOpen(style));
        }
        *flag = false;
        out.push_str(END_SPAN);
        Ok(())
    }

    /// Closes `style` if open, otherwise opens it. A stray closing marker
    /// therefore acts as an opener.
    pub fn toggle(&mut self, style: Style, out: &mut String) -> Result<(), StyleError> {
        if self.is_open(style) {
            self.close(style, out)
        } else {
            self.open(style, out)
        }
    }

    /// Closes every open style into `out` and returns the set that was open.
    pub fn close_all(&mut self, out: &mut String) -> StyleSet {
        let carried = *self;
        for style in Style::REOPEN_ORDER {
            let flag = self.flag_mut(style);
            if *flag {
                *flag = false;
                out.push_str(END_SPAN);
            }
        }
        carried
    }

    /// Reopens every style in `carried`, always in [`Style::REOPEN_ORDER`].
    pub fn reopen(&mut self, carried: StyleSet, out: &mut String) -> Result<(), StyleError> {
        for style in Style::REOPEN_ORDER {
            if carried.is_open(style) {
                self.open(style, out)?;
            }
        }
        Ok(())
    }

    pub fn any_open(&self) -> bool {
        Style::REOPEN_ORDER.iter().any(|style| self.is_open(*style))
    }
}
