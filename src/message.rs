use chrono::{DateTime, Utc};

const FILE_STEM_WIDTH: usize = 20;
pub const FILE_EXTENSION: &str = "svg";

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: u64,
    pub display_name: String,
    /// `#rrggbb` from the author's roles, if any.
    pub color: Option<String>,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReactionEmoji {
    /// Built-in emoji, drawn as text.
    Unicode(String),
    /// Guild emoji, drawn as an image.
    Custom { name: String, url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub count: u32,
    pub emoji: ReactionEmoji,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Output file name: the epoch timestamp with its decimal point removed,
    /// right-padded with zeros to a fixed width, e.g. `1589312345.123`
    /// becomes `15893123451230000000.svg`.
    pub fn file_name(&self) -> String {
        format!(
            "{:0<width$}.{}",
            timestamp_digits(&self.created_at),
            FILE_EXTENSION,
            width = FILE_STEM_WIDTH
        )
    }
}

/// `secs.fraction` with the fraction trimmed of trailing zeros (at least one
/// digit kept) and the dot removed.
fn timestamp_digits(at: &DateTime<Utc>) -> String {
    let micros = format!("{:06}", at.timestamp_subsec_micros());
    let fraction = micros.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    format!("{}{}", at.timestamp(), fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message_at(at: DateTime<Utc>) -> Message {
        Message {
            id: 1,
            author: Author {
                id: 2,
                display_name: "Ada".to_string(),
                color: None,
                avatar_url: String::new(),
            },
            created_at: at,
            content: String::new(),
            reactions: Vec::new(),
        }
    }

    #[test]
    fn file_name_pads_to_fixed_width() {
        let at = Utc.timestamp_opt(1_589_312_345, 123_000_000).unwrap();
        assert_eq!(message_at(at).file_name(), "15893123451230000000.svg");
    }

    #[test]
    fn whole_seconds_keep_one_fraction_digit() {
        let at = Utc.timestamp_opt(1_589_312_345, 0).unwrap();
        assert_eq!(message_at(at).file_name(), "15893123450000000000.svg");
    }

    #[test]
    fn microseconds_are_kept() {
        let at = Utc.timestamp_opt(1_589_312_345, 120_450_000).unwrap();
        assert_eq!(timestamp_digits(&at), "158931234512045");
    }
}
