use std::collections::HashMap;

use crate::reference::Resolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub display_name: String,
    pub role_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    /// 24-bit RGB; zero means "no colour".
    pub color: u32,
    pub position: i64,
}

/// Users, channels and roles known for the channel being transcribed.
#[derive(Debug, Default, Clone)]
pub struct Directory {
    users: HashMap<u64, Member>,
    channels: HashMap<u64, String>,
    roles: HashMap<u64, Role>,
}

impl Directory {
    pub fn insert_user(&mut self, id: u64, member: Member) {
        self.users.insert(id, member);
    }

    /// Adds a user seen in a message payload without replacing a richer
    /// entry loaded from the guild member list.
    pub fn observe_user(&mut self, id: u64, display_name: &str) {
        self.users.entry(id).or_insert_with(|| Member {
            display_name: display_name.to_string(),
            role_ids: Vec::new(),
        });
    }

    pub fn insert_channel(&mut self, id: u64, name: impl Into<String>) {
        self.channels.insert(id, name.into());
    }

    pub fn insert_role(&mut self, id: u64, role: Role) {
        self.roles.insert(id, role);
    }

    pub fn member(&self, id: u64) -> Option<&Member> {
        self.users.get(&id)
    }

    /// Colour of the member's highest positioned coloured role, as `#rrggbb`.
    pub fn member_color(&self, id: u64) -> Option<String> {
        let member = self.users.get(&id)?;
        member
            .role_ids
            .iter()
            .filter_map(|role_id| self.roles.get(role_id))
            .filter(|role| role.color != 0)
            .max_by_key(|role| role.position)
            .map(|role| format!("#{:06x}", role.color))
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Resolver for Directory {
    fn user_name(&self, id: u64) -> Option<&str> {
        self.users.get(&id).map(|m| m.display_name.as_str())
    }

    fn channel_name(&self, id: u64) -> Option<&str> {
        self.channels.get(&id).map(String::as_str)
    }

    fn role_name(&self, id: u64) -> Option<&str> {
        self.roles.get(&id).map(|r| r.name.as_str())
    }
}
