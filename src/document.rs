use crate::error::RenderError;
use crate::images::{ImageCache, ImageSource};
use crate::message::{Message, ReactionEmoji};
use crate::reference::Resolver;
use crate::theme::Theme;
use crate::wrap::wrap_lines;
use crate::xml::escape_xml;

const CANVAS_WIDTH: f32 = 700.0;
const TEXT_X: f32 = 128.0;
const TEXT_Y: f32 = 35.0;
const LINE_STEP: f32 = 20.0;
const REACTIONS_GAP: f32 = 50.0;
const REACTION_STEP: f32 = 50.0;
const BOTTOM_MARGIN: f32 = 30.0;
const AVATAR_SIZE: f32 = 64.0;
const TIMESTAMP_FORMAT: &str = "%b %-d, %Y %H:%M";

/// Builds the SVG document for one message.
pub struct Composer<'a, R: Resolver + ?Sized, S> {
    theme: &'a Theme,
    line_width: usize,
    resolver: &'a R,
    images: &'a ImageCache<S>,
}

impl<'a, R: Resolver + ?Sized, S: ImageSource> Composer<'a, R, S> {
    pub fn new(
        theme: &'a Theme,
        line_width: usize,
        resolver: &'a R,
        images: &'a ImageCache<S>,
    ) -> Self {
        Self {
            theme,
            line_width,
            resolver,
            images,
        }
    }

    pub fn compose(&self, message: &Message) -> Result<String, RenderError> {
        let mut svg_content = String::new();

        self.draw_avatar(&mut svg_content, &message.author.avatar_url)?;
        self.draw_header(&mut svg_content, message);

        let line_count = self.draw_body(&mut svg_content, &message.content)?;
        let reactions_y = line_count as f32 * LINE_STEP + REACTIONS_GAP;
        self.draw_reactions(&mut svg_content, message, reactions_y)?;

        Ok(self.finalize_svg(reactions_y + BOTTOM_MARGIN, &svg_content))
    }

    fn draw_avatar(&self, svg_content: &mut String, url: &str) -> Result<(), RenderError> {
        let avatar = self.images.data_uri(url)?;
        let radius = AVATAR_SIZE / 2.0;
        svg_content.push_str(&format!(
            r#"<defs><pattern id="avatar" x="32" y="10" patternUnits="userSpaceOnUse" width="{size}" height="{size}"><image x="0" y="0" width="{size}" height="{size}" xlink:href="{avatar}" /></pattern></defs>"#,
            size = AVATAR_SIZE,
        ));
        svg_content.push_str(&format!(
            r#"<circle cx="{}" cy="{}" r="{}" fill="url(#avatar)" />"#,
            32.0 + radius,
            10.0 + radius,
            radius,
        ));
        Ok(())
    }

    fn draw_header(&self, svg_content: &mut String, message: &Message) {
        let name_color = message
            .author
            .color
            .as_deref()
            .unwrap_or(&self.theme.name_color);
        svg_content.push_str(&format!(
            r#"<text x="{}" y="25" font-family="{}"><tspan font-size="{}px" font-weight="bold" fill="{}">{}</tspan> <tspan font-size="{}px" fill="{}" fill-opacity="0.8">{}</tspan></text>"#,
            TEXT_X,
            escape_xml(&self.theme.font_family),
            self.theme.font_size_name,
            escape_xml(name_color),
            escape_xml(&message.author.display_name),
            self.theme.font_size_timestamp,
            escape_xml(&self.theme.text_color),
            message.created_at.format(TIMESTAMP_FORMAT),
        ));
    }

    /// Returns the number of lines drawn.
    fn draw_body(&self, svg_content: &mut String, content: &str) -> Result<usize, RenderError> {
        svg_content.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="{}" fill="{}">"#,
            TEXT_X,
            TEXT_Y,
            escape_xml(&self.theme.font_family),
            escape_xml(&self.theme.text_color),
        ));

        let mut line_count = 0;
        for line in wrap_lines(
            content,
            self.line_width,
            &self.theme.accent_color,
            self.resolver,
        ) {
            let line = line?;
            let line = if line.is_blank() {
                self.placeholder()
            } else {
                line.markup
            };
            svg_content.push_str(&format!(
                r#"<tspan font-size="{}px" x="{}" dy="{}">{}</tspan>"#,
                self.theme.font_size_body, TEXT_X, LINE_STEP, line,
            ));
            line_count += 1;
        }

        svg_content.push_str("</text>");
        Ok(line_count)
    }

    /// Keeps empty lines from collapsing: a dash in the background colour.
    fn placeholder(&self) -> String {
        format!(
            r#"<tspan fill="{}">---</tspan>"#,
            escape_xml(&self.theme.background_color)
        )
    }

    fn draw_reactions(
        &self,
        svg_content: &mut String,
        message: &Message,
        y: f32,
    ) -> Result<(), RenderError> {
        for (index, reaction) in message.reactions.iter().enumerate() {
            let x = TEXT_X + index as f32 * REACTION_STEP;

            svg_content.push_str(&format!(
                r#"<rect x="{}" y="{}" width="40" height="20" rx="5" ry="5" fill="{}" fill-opacity="0.2" />"#,
                x,
                y,
                escape_xml(&self.theme.pill_color),
            ));
            svg_content.push_str(&format!(
                r#"<text x="{}" y="{}" font-family="{}" font-size="{}px" fill="{}">{}</text>"#,
                x + 4.0,
                y + 14.0,
                escape_xml(&self.theme.font_family),
                self.theme.font_size_reaction,
                escape_xml(&self.theme.text_color),
                reaction.count,
            ));

            match &reaction.emoji {
                ReactionEmoji::Unicode(glyph) => {
                    svg_content.push_str(&format!(
                        r#"<text x="{}" y="{}" font-size="13">{}</text>"#,
                        x + 21.0,
                        y + 15.0,
                        escape_xml(glyph),
                    ));
                }
                ReactionEmoji::Custom { url, .. } => {
                    let picture = self.images.data_uri(url)?;
                    svg_content.push_str(&format!(
                        r#"<image x="{}" y="{}" width="15" height="15" xlink:href="{}" />"#,
                        x + 21.0,
                        y + 2.5,
                        picture,
                    ));
                }
            }
        }
        Ok(())
    }

    fn finalize_svg(&self, height: f32, svg_content: &str) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {} {}" width="{}" height="{}"><rect width="100%" height="100%" fill="{}" />{}</svg>"#,
            CANVAS_WIDTH,
            height,
            CANVAS_WIDTH,
            height,
            escape_xml(&self.theme.background_color),
            svg_content,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Directory, Member};
    use crate::error::FetchError;
    use crate::message::{Author, Reaction};
    use chrono::{TimeZone, Utc};
    use quick_xml::Reader;
    use quick_xml::events::Event;
    use std::time::Duration;

    struct StaticImages;

    impl ImageSource for StaticImages {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            if url.contains("missing") {
                Err(FetchError::new(url, "404"))
            } else {
                Ok(b"GIF89a\x01\x00\x01\x00\x80\x00\x00".to_vec())
            }
        }
    }

    fn message(content: &str) -> Message {
        Message {
            id: 1,
            author: Author {
                id: 2,
                display_name: "Ada <3".to_string(),
                color: Some("#ff0000".to_string()),
                avatar_url: "https://cdn/avatar.png".to_string(),
            },
            created_at: Utc.with_ymd_and_hms(2020, 5, 2, 9, 7, 0).unwrap(),
            content: content.to_string(),
            reactions: Vec::new(),
        }
    }

    fn render(message: &Message) -> Result<String, RenderError> {
        let theme = Theme::default();
        let mut dir = Directory::default();
        dir.insert_user(
            123,
            Member {
                display_name: "Grace".to_string(),
                role_ids: Vec::new(),
            },
        );
        let images = ImageCache::new(StaticImages, 8, Duration::from_secs(60));
        Composer::new(&theme, 65, &dir, &images).compose(message)
    }

    fn assert_well_formed(svg: &str) {
        let mut reader = Reader::from_str(svg);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("malformed SVG at {}: {e}\n{svg}", reader.buffer_position()),
            }
        }
    }

    #[test]
    fn header_has_name_colour_and_timestamp() {
        let svg = render(&message("hello")).unwrap();
        assert!(svg.contains(r##"fill="#ff0000">Ada &lt;3</tspan>"##));
        assert!(svg.contains("May 2, 2020 09:07"));
        assert!(svg.contains("data:image/gif;base64,"));
        assert_well_formed(&svg);
    }

    #[test]
    fn empty_lines_get_placeholder() {
        let svg = render(&message("a\n\nb")).unwrap();
        assert!(svg.contains(r##"dy="20"><tspan fill="#36393f">---</tspan></tspan>"##));
        assert!(!svg.contains(r#"dy="20"></tspan>"#));
    }

    #[test]
    fn blank_line_inside_bold_gets_placeholder() {
        let svg = render(&message("**a\n\nb**")).unwrap();
        assert_eq!(svg.matches(r##"<tspan fill="#36393f">---</tspan>"##).count(), 1);
        assert!(!svg.contains(r#"<tspan font-weight="bold"></tspan>"#));
        assert_well_formed(&svg);
    }

    #[test]
    fn height_grows_with_lines() {
        // "a\n\nb" renders three lines: 3 * 20 + 50 + 30.
        let svg = render(&message("a\n\nb")).unwrap();
        assert!(svg.contains(r#"height="140""#));
    }

    #[test]
    fn reactions_are_spaced_along_the_row() {
        let mut msg = message("hi");
        msg.reactions = vec![
            Reaction {
                count: 3,
                emoji: ReactionEmoji::Unicode("👍".to_string()),
            },
            Reaction {
                count: 1,
                emoji: ReactionEmoji::Custom {
                    name: "blob".to_string(),
                    url: "https://cdn/emojis/1.png".to_string(),
                },
            },
        ];
        let svg = render(&msg).unwrap();
        // One line: reactions at y = 70.
        assert!(svg.contains(r#"<rect x="128" y="70""#));
        assert!(svg.contains(r#"<rect x="178" y="70""#));
        assert!(svg.contains(">3</text>"));
        assert!(svg.contains(r#"<image x="199" y="72.5""#));
        assert_well_formed(&svg);
    }

    #[test]
    fn mentions_and_formatting_are_well_formed() {
        let svg = render(&message("**hey <@123>** see __https://x.io__ & ~~old~~")).unwrap();
        assert!(svg.contains(">@Grace</tspan>"));
        assert!(svg.contains("&amp;"));
        assert_well_formed(&svg);
    }

    #[test]
    fn missing_custom_emoji_image_fails_the_message() {
        let mut msg = message("hi");
        msg.reactions = vec![Reaction {
            count: 1,
            emoji: ReactionEmoji::Custom {
                name: "gone".to_string(),
                url: "https://cdn/missing.png".to_string(),
            },
        }];
        assert!(matches!(render(&msg), Err(RenderError::Image(_))));
    }

    #[test]
    fn unknown_channel_fails_the_message() {
        assert!(matches!(
            render(&message("in <#5>")),
            Err(RenderError::UnknownChannel(5))
        ));
    }
}
