use serde::{Deserialize, Serialize};

const DARK_BACKGROUND: &str = "#36393f";
const DARK_TEXT: &str = "white";
const DARK_ACCENT: &str = "#0096cf";
const DARK_PILL: &str = "white";

const LIGHT_BACKGROUND: &str = "#ffffff";
const LIGHT_TEXT: &str = "#2e3338";
const LIGHT_ACCENT: &str = "#0068e0";
const LIGHT_PILL: &str = "#4f5660";

const FONT_FAMILY: &str = "sans-serif";
const FONT_SIZE_BODY: f32 = 15.0;
const FONT_SIZE_NAME: f32 = 15.0;
const FONT_SIZE_TIMESTAMP: f32 = 10.0;
const FONT_SIZE_REACTION: f32 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_text")]
    pub text_color: String,
    /// Links and resolved mentions.
    #[serde(default = "default_accent")]
    pub accent_color: String,
    /// Author name colour when the author has no coloured role.
    #[serde(default = "default_text")]
    pub name_color: String,
    #[serde(default = "default_pill")]
    pub pill_color: String,

    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size_body")]
    pub font_size_body: f32,
    #[serde(default = "default_font_size_name")]
    pub font_size_name: f32,
    #[serde(default = "default_font_size_timestamp")]
    pub font_size_timestamp: f32,
    #[serde(default = "default_font_size_reaction")]
    pub font_size_reaction: f32,
}

fn default_background() -> String {
    DARK_BACKGROUND.to_string()
}
fn default_text() -> String {
    DARK_TEXT.to_string()
}
fn default_accent() -> String {
    DARK_ACCENT.to_string()
}
fn default_pill() -> String {
    DARK_PILL.to_string()
}
fn default_font_family() -> String {
    FONT_FAMILY.to_string()
}
fn default_font_size_body() -> f32 {
    FONT_SIZE_BODY
}
fn default_font_size_name() -> f32 {
    FONT_SIZE_NAME
}
fn default_font_size_timestamp() -> f32 {
    FONT_SIZE_TIMESTAMP
}
fn default_font_size_reaction() -> f32 {
    FONT_SIZE_REACTION
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Theme {
            background_color: DARK_BACKGROUND.to_string(),
            text_color: DARK_TEXT.to_string(),
            accent_color: DARK_ACCENT.to_string(),
            name_color: DARK_TEXT.to_string(),
            pill_color: DARK_PILL.to_string(),

            font_family: FONT_FAMILY.to_string(),
            font_size_body: FONT_SIZE_BODY,
            font_size_name: FONT_SIZE_NAME,
            font_size_timestamp: FONT_SIZE_TIMESTAMP,
            font_size_reaction: FONT_SIZE_REACTION,
        }
    }

    pub fn light() -> Self {
        Theme {
            background_color: LIGHT_BACKGROUND.to_string(),
            text_color: LIGHT_TEXT.to_string(),
            accent_color: LIGHT_ACCENT.to_string(),
            name_color: LIGHT_TEXT.to_string(),
            pill_color: LIGHT_PILL.to_string(),
            ..Self::dark()
        }
    }

    pub fn from_builtin(name: &str) -> Result<Self, String> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::dark()),
            "light" => Ok(Self::light()),
            _ => Err(format!(
                "Unknown built-in theme '{}'. Available: {}",
                name,
                Self::list_builtins().join(", ")
            )),
        }
    }

    pub fn list_builtins() -> Vec<&'static str> {
        vec!["dark", "light"]
    }
}
