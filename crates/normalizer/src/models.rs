use serde::{Deserialize, Serialize};

pub const MAX_LANGUAGES: usize = 10;
pub const MAX_TOPICS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerKind {
    User,
    Organization,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl OwnerKind {
    pub fn from_typename(typename: &str) -> Self {
        match typename {
            "User" => OwnerKind::User,
            "Organization" => OwnerKind::Organization,
            _ => OwnerKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::User => "User",
            OwnerKind::Organization => "Organization",
            OwnerKind::Unknown => "",
        }
    }
}

/// Flattened repository row. Every field has a value; absent upstream data
/// becomes the empty string, zero, `false` or an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub nwo: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub homepage_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: String,

    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub disk_usage_kb: u64,

    pub primary_language: String,
    pub languages: Vec<String>,
    pub topics: Vec<String>,

    pub is_fork: bool,
    pub is_archived: bool,
    pub is_private: bool,
    pub is_template: bool,
    pub has_wiki: bool,
    pub has_issues: bool,

    pub license_key: String,
    pub license_name: String,

    pub owner_login: String,
    pub owner_type: OwnerKind,
    pub owner_location: String,
    pub owner_company: String,
    pub owner_bio: String,
    pub owner_email: String,
    pub owner_followers: u64,
    pub owner_created_at: String,

    pub readme_content: String,
}
