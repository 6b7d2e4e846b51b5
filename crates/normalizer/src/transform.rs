use serde_json::Value;
use tracing::debug;

use crate::models::{OwnerKind, RepositoryRecord, MAX_LANGUAGES, MAX_TOPICS};
use crate::payloads::{bool_field, object, str_field, total_count, u64_field};

/// Flattens one repository node. Total over any JSON input: absent, null or
/// mistyped fields resolve to their defaults.
pub fn extract_record(node: &Value) -> RepositoryRecord {
    let owner = object(node, "owner");
    let owner_kind = OwnerKind::from_typename(&str_field(owner, "__typename"));
    if owner_kind == OwnerKind::Unknown && !owner.is_null() {
        debug!(
            nwo = %str_field(node, "nameWithOwner"),
            "repository owner has no recognised kind"
        );
    }

    let mut record = RepositoryRecord {
        nwo: str_field(node, "nameWithOwner"),
        name: str_field(node, "name"),
        description: str_field(node, "description"),
        url: str_field(node, "url"),
        homepage_url: str_field(node, "homepageUrl"),
        created_at: str_field(node, "createdAt"),
        updated_at: str_field(node, "updatedAt"),
        pushed_at: str_field(node, "pushedAt"),

        stars: u64_field(node, "stargazerCount"),
        forks: u64_field(node, "forkCount"),
        watchers: total_count(node, "watchers"),
        open_issues: total_count(node, "issues"),
        disk_usage_kb: u64_field(node, "diskUsage"),

        primary_language: str_field(object(node, "primaryLanguage"), "name"),
        languages: languages(node),
        topics: topics(node),

        is_fork: bool_field(node, "isFork"),
        is_archived: bool_field(node, "isArchived"),
        is_private: bool_field(node, "isPrivate"),
        is_template: bool_field(node, "isTemplate"),
        has_wiki: bool_field(node, "hasWikiEnabled"),
        has_issues: bool_field(node, "hasIssuesEnabled"),

        license_key: str_field(object(node, "licenseInfo"), "key"),
        license_name: str_field(object(node, "licenseInfo"), "name"),

        owner_login: str_field(owner, "login"),
        owner_type: owner_kind,
        owner_location: str_field(owner, "location"),
        owner_email: str_field(owner, "email"),
        readme_content: str_field(object(node, "object"), "text"),
        ..RepositoryRecord::default()
    };

    match owner_kind {
        OwnerKind::User => {
            record.owner_company = str_field(owner, "company");
            record.owner_bio = str_field(owner, "bio");
            record.owner_followers = total_count(owner, "followers");
            record.owner_created_at = str_field(owner, "createdAt");
        }
        // Organizations expose `description` where users expose `bio`.
        OwnerKind::Organization | OwnerKind::Unknown => {
            record.owner_bio = str_field(owner, "description");
        }
    }

    record
}

fn languages(node: &Value) -> Vec<String> {
    names(object(node, "languages"), MAX_LANGUAGES, |entry| {
        entry.get("name").and_then(Value::as_str)
    })
}

fn topics(node: &Value) -> Vec<String> {
    names(object(node, "repositoryTopics"), MAX_TOPICS, |entry| {
        object(entry, "topic").get("name").and_then(Value::as_str)
    })
}

fn names<'a>(
    connection: &'a Value,
    limit: usize,
    pick: impl Fn(&'a Value) -> Option<&'a str>,
) -> Vec<String> {
    connection
        .get("nodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(&pick)
                .take(limit)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
