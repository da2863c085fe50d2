//! Mentions of users, channels and roles, and custom emoji tokens.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::RenderError;
use crate::xml::escape_text;

/// Shown for role mentions that cannot be resolved.
pub const INVALID_ROLE: &str = "invalid-role";

// Matched against escaped words, so the opening bracket is `&lt;`.
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^&lt;(.*?)([0-9]+)>").expect("reference pattern is valid"));

/// Local lookups used while rendering mentions.
pub trait Resolver {
    fn user_name(&self, id: u64) -> Option<&str>;
    fn channel_name(&self, id: u64) -> Option<&str>;
    fn role_name(&self, id: u64) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sigil {
    User,
    Channel,
    Role,
    /// Anything else, e.g. `:name:` or `a:name:` for custom emoji.
    Emoji(String),
}

impl Sigil {
    fn parse(raw: &str) -> Self {
        match raw {
            "@" | "@!" => Sigil::User,
            "#" => Sigil::Channel,
            "@&amp;" => Sigil::Role,
            other => Sigil::Emoji(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub sigil: Sigil,
    pub id: u64,
    /// Text following the closing `>` inside the same word.
    pub tail: &'a str,
}

impl<'a> Reference<'a> {
    /// Parses an escaped word such as `&lt;@!123>`.
    pub fn parse(word: &'a str) -> Option<Self> {
        let caps = REFERENCE.captures(word)?;
        // Ids longer than u64 are not references.
        let id = caps[2].parse().ok()?;
        let end = caps.get(0)?.end();
        Some(Reference {
            sigil: Sigil::parse(&caps[1]),
            id,
            tail: &word[end..],
        })
    }
}

/// A word ready to be appended to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedWord {
    /// Escaped display text.
    pub text: String,
    /// Whether `text` is drawn in the accent colour.
    pub accent: bool,
    /// Escaped uncoloured text drawn after `text`.
    pub tail: String,
}

impl RenderedWord {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            accent: false,
            tail: String::new(),
        }
    }

    fn accented(text: String, tail: &str) -> Self {
        Self {
            text,
            accent: true,
            tail: tail.to_string(),
        }
    }
}

/// Resolves an escaped word into its display form.
///
/// Unknown users and channels are errors; unknown roles fall back to
/// [`INVALID_ROLE`].
pub fn render_word<R: Resolver + ?Sized>(
    word: &str,
    resolver: &R,
) -> Result<RenderedWord, RenderError> {
    let Some(reference) = Reference::parse(word) else {
        return Ok(if word.starts_with("http") {
            RenderedWord::accented(word.to_string(), "")
        } else {
            RenderedWord::plain(word)
        });
    };

    let rendered = match reference.sigil {
        Sigil::User => {
            let name = resolver
                .user_name(reference.id)
                .ok_or(RenderError::UnknownUser(reference.id))?;
            RenderedWord::accented(format!("@{}", escape_text(name)), reference.tail)
        }
        Sigil::Channel => {
            let name = resolver
                .channel_name(reference.id)
                .ok_or(RenderError::UnknownChannel(reference.id))?;
            RenderedWord::accented(format!("#{}", escape_text(name)), reference.tail)
        }
        Sigil::Role => {
            let name = resolver.role_name(reference.id).unwrap_or(INVALID_ROLE);
            RenderedWord::accented(format!("@{}", escape_text(name)), reference.tail)
        }
        Sigil::Emoji(_) => RenderedWord::plain(word),
    };
    Ok(rendered)
}
