//! Minimal Discord REST client: channel metadata, guild roles, channels and
//! members, and paginated message history.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::directory::{Directory, Member, Role};
use crate::error::ApiError;
use crate::message::{Author, Message, Reaction, ReactionEmoji};

const CDN_BASE: &str = "https://cdn.discordapp.com";
const AVATAR_SIZE: u32 = 64;
const MEMBERS_PAGE: usize = 1000;
const RATE_LIMIT_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPayload {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RolePayload {
    id: String,
    name: String,
    #[serde(default)]
    color: u32,
    #[serde(default)]
    position: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    #[serde(default)]
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MentionPayload {
    #[serde(flatten)]
    pub user: UserPayload,
    #[serde(default)]
    pub member: Option<MemberPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmojiPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionPayload {
    pub count: u32,
    pub emoji: EmojiPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: UserPayload,
    #[serde(default)]
    pub member: Option<MemberPayload>,
    #[serde(default)]
    pub mentions: Vec<MentionPayload>,
    #[serde(default)]
    pub reactions: Vec<ReactionPayload>,
}

pub fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidId(raw.to_string()))
}

impl UserPayload {
    fn display_name<'a>(&'a self, member: Option<&'a MemberPayload>) -> &'a str {
        member
            .and_then(|m| m.nick.as_deref())
            .or(self.global_name.as_deref())
            .unwrap_or(&self.username)
    }

    pub fn avatar_url(&self) -> Result<String, ApiError> {
        if let Some(hash) = &self.avatar {
            return Ok(format!(
                "{CDN_BASE}/avatars/{}/{hash}.png?size={AVATAR_SIZE}",
                self.id
            ));
        }
        let index = match self.discriminator.as_deref() {
            Some(d) if d != "0" => parse_id(d)? % 5,
            _ => (parse_id(&self.id)? >> 22) % 6,
        };
        Ok(format!("{CDN_BASE}/embed/avatars/{index}.png"))
    }
}

impl MemberPayload {
    fn role_ids(&self) -> Result<Vec<u64>, ApiError> {
        self.roles.iter().map(|r| parse_id(r)).collect()
    }
}

impl EmojiPayload {
    fn to_reaction_emoji(&self) -> Result<ReactionEmoji, ApiError> {
        let name = self.name.clone().unwrap_or_default();
        match &self.id {
            Some(id) => {
                let ext = if self.animated { "gif" } else { "png" };
                Ok(ReactionEmoji::Custom {
                    url: format!("{CDN_BASE}/emojis/{}.{ext}", parse_id(id)?),
                    name,
                })
            }
            None => Ok(ReactionEmoji::Unicode(name)),
        }
    }
}

impl MessagePayload {
    /// Records the author and mentioned users in `directory`, then converts
    /// the payload into a renderable [`Message`].
    pub fn into_message(self, directory: &mut Directory) -> Result<Message, ApiError> {
        let author_id = parse_id(&self.author.id)?;
        match &self.member {
            Some(member) => directory.insert_user(
                author_id,
                Member {
                    display_name: self.author.display_name(Some(member)).to_string(),
                    role_ids: member.role_ids()?,
                },
            ),
            None => directory.observe_user(author_id, self.author.display_name(None)),
        }

        for mention in &self.mentions {
            let id = parse_id(&mention.user.id)?;
            directory.observe_user(id, mention.user.display_name(mention.member.as_ref()));
        }

        let display_name = directory
            .member(author_id)
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| self.author.display_name(None).to_string());

        let reactions = self
            .reactions
            .iter()
            .map(|r| {
                Ok(Reaction {
                    count: r.count,
                    emoji: r.emoji.to_reaction_emoji()?,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(Message {
            id: parse_id(&self.id)?,
            author: Author {
                id: author_id,
                display_name,
                color: directory.member_color(author_id),
                avatar_url: self.author.avatar_url()?,
            },
            created_at: self.timestamp,
            content: self.content,
            reactions,
        })
    }
}

pub struct DiscordClient {
    agent: ureq::Agent,
    api_base: String,
    authorization: String,
}

impl DiscordClient {
    pub fn new(token: &str, api_base: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build();
        let token = token.trim();
        let authorization = if token.starts_with("Bot ") || token.starts_with("Bearer ") {
            token.to_string()
        } else {
            format!("Bot {token}")
        };
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_base: api_base.trim_end_matches('/').to_string(),
            authorization,
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.api_base, path);
        let http = |source: ureq::Error| ApiError::Http {
            path: path.to_string(),
            source: Box::new(source),
        };

        let mut attempt = 0;
        loop {
            let mut response = self
                .agent
                .get(&url)
                .header("Authorization", &self.authorization)
                .call()
                .map_err(http)?;

            let status = response.status().as_u16();
            if status == 429 && attempt < RATE_LIMIT_RETRIES {
                let wait = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(1.0);
                tracing::warn!(path, wait, "rate limited");
                std::thread::sleep(Duration::from_secs_f64(wait.clamp(0.0, 60.0)));
                attempt += 1;
                continue;
            }
            if !(200..300).contains(&status) {
                return Err(ApiError::Status {
                    path: path.to_string(),
                    status,
                });
            }
            return response.body_mut().read_json::<T>().map_err(http);
        }
    }

    pub fn channel(&self, id: u64) -> Result<ChannelPayload, ApiError> {
        self.get(&format!("/channels/{id}"))
    }

    /// Loads everything mentions in `channel` may refer to. Roles and
    /// channels are required; the member list needs a privileged intent and
    /// is skipped when the API refuses it.
    pub fn load_directory(&self, channel: &ChannelPayload) -> Result<Directory, ApiError> {
        let mut directory = Directory::default();
        let channel_id = parse_id(&channel.id)?;
        if let Some(name) = &channel.name {
            directory.insert_channel(channel_id, name.clone());
        }

        let Some(guild_id) = channel.guild_id.as_deref() else {
            return Ok(directory);
        };
        let guild_id = parse_id(guild_id)?;

        let roles: Vec<RolePayload> = self.get(&format!("/guilds/{guild_id}/roles"))?;
        for role in roles {
            directory.insert_role(
                parse_id(&role.id)?,
                Role {
                    name: role.name,
                    color: role.color,
                    position: role.position,
                },
            );
        }

        let channels: Vec<ChannelPayload> = self.get(&format!("/guilds/{guild_id}/channels"))?;
        for other in channels {
            if let Some(name) = other.name {
                directory.insert_channel(parse_id(&other.id)?, name);
            }
        }

        match self.load_members(guild_id, &mut directory) {
            Ok(()) => {}
            Err(ApiError::Status { status: 403, .. }) => {
                tracing::warn!(guild_id, "member list unavailable, using message payloads only");
            }
            Err(err) => return Err(err),
        }

        tracing::info!(
            guild_id,
            users = directory.user_count(),
            "loaded guild directory"
        );
        Ok(directory)
    }

    fn load_members(&self, guild_id: u64, directory: &mut Directory) -> Result<(), ApiError> {
        let mut after = 0u64;
        loop {
            let page: Vec<MemberPayload> = self.get(&format!(
                "/guilds/{guild_id}/members?limit={MEMBERS_PAGE}&after={after}"
            ))?;
            let count = page.len();
            for member in page {
                let Some(user) = &member.user else {
                    continue;
                };
                let id = parse_id(&user.id)?;
                after = after.max(id);
                directory.insert_user(
                    id,
                    Member {
                        display_name: user.display_name(Some(&member)).to_string(),
                        role_ids: member.role_ids()?,
                    },
                );
            }
            if count < MEMBERS_PAGE {
                return Ok(());
            }
        }
    }

    /// Full history of `channel_id`, newest first, fetched lazily one page at
    /// a time.
    pub fn history(&self, channel_id: u64, page_size: u32) -> History<'_> {
        History {
            client: self,
            channel_id,
            page_size,
            before: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }
}

pub struct History<'a> {
    client: &'a DiscordClient,
    channel_id: u64,
    page_size: u32,
    before: Option<u64>,
    buffer: VecDeque<MessagePayload>,
    exhausted: bool,
}

impl History<'_> {
    fn fetch_page(&mut self) -> Result<(), ApiError> {
        let mut path = format!(
            "/channels/{}/messages?limit={}",
            self.channel_id, self.page_size
        );
        if let Some(before) = self.before {
            path.push_str(&format!("&before={before}"));
        }
        let page: Vec<MessagePayload> = self.client.get(&path)?;
        tracing::debug!(channel_id = self.channel_id, count = page.len(), "fetched history page");

        if page.len() < self.page_size as usize {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.before = Some(parse_id(&last.id)?);
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for History<'_> {
    type Item = Result<MessagePayload, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
