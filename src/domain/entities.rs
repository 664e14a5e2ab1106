//! Help-center resources as the gateway stores and serves them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub position: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub source_locale: String,
    #[serde(default)]
    pub outdated: bool,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub key_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub category_id: i64,
    pub position: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub source_locale: String,
    #[serde(default)]
    pub outdated: bool,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub section_id: i64,
    #[serde(default)]
    pub author_id: i64,
    #[serde(default)]
    pub comments_disable: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub promoted: bool,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub vote_sum: i64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub edited_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub source_locale: String,
    #[serde(default)]
    pub outdated: bool,
    #[serde(default)]
    pub outdated_locales: Vec<String>,
    #[serde(default)]
    pub label_names: Vec<String>,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub locale: String,
}

/// An article hit from body search, enriched with the category it resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchArticle {
    #[serde(flatten)]
    pub article: Article,
    pub category_id: i64,
    pub category_name: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantSearchResult {
    pub title: String,
    pub category_title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketForm {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub raw_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub raw_display_name: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub end_user_visible: bool,
    #[serde(default)]
    pub ticket_field_ids: Vec<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketField {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub raw_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub raw_description: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub collapsed_for_agents: bool,
    #[serde(default)]
    pub regexp_for_validation: Option<String>,
    #[serde(default)]
    pub title_in_portal: String,
    #[serde(default)]
    pub raw_title_in_portal: String,
    #[serde(default)]
    pub visible_in_portal: bool,
    #[serde(default)]
    pub editable_in_portal: bool,
    #[serde(default)]
    pub required_in_portal: bool,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub removable: bool,
    #[serde(default)]
    pub custom_field_options: Vec<CustomFieldOption>,
    #[serde(default)]
    pub system_field_options: Vec<SystemFieldOption>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldOption {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub raw_name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFieldOption {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(default)]
    pub id: i64,
    pub vote_sum: i64,
    pub vote_count: i64,
    #[serde(default)]
    pub upvote_count: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}
