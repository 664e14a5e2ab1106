//! Contract for the external help-center backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entities::{
    Article, Category, InstantSearchResult, Section, TicketField, TicketForm, Vote,
};
use crate::domain::types::{CountryCode, Locale, SortOrder, VoteDirection};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream responded {status} for {url}")]
    Status { status: u16, url: String },
    #[error("upstream request timed out: {0}")]
    Timeout(String),
    #[error("upstream transport failure: {0}")]
    Transport(String),
    #[error("upstream payload could not be decoded: {0}")]
    Decode(String),
    #[error("no upstream base url configured for country `{0}`")]
    UnknownCountry(CountryCode),
}

/// Body search request; `page` is one-based as the upstream expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub category_ids: Vec<i64>,
    pub query: String,
    pub country: CountryCode,
    pub locale: Locale,
    pub per_page: i64,
    pub page: i64,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub article: Article,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub page: i64,
    pub per_page: i64,
    pub page_count: i64,
    pub count: i64,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn instant_search(
        &self,
        query: &str,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<InstantSearchResult>, UpstreamError>;

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, UpstreamError>;

    async fn create_vote(
        &self,
        article_id: i64,
        direction: VoteDirection,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vote, UpstreamError>;

    async fn show_article(
        &self,
        article_id: i64,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Article, UpstreamError>;

    /// Forward an already validated request payload verbatim.
    async fn create_request(
        &self,
        country: CountryCode,
        payload: &serde_json::Value,
    ) -> Result<(), UpstreamError>;

    async fn list_categories(
        &self,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<Category>, UpstreamError>;

    async fn list_sections(
        &self,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<Section>, UpstreamError>;

    async fn list_articles(
        &self,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<Article>, UpstreamError>;

    async fn list_ticket_forms(&self) -> Result<Vec<TicketForm>, UpstreamError>;

    async fn list_ticket_fields(&self) -> Result<Vec<TicketField>, UpstreamError>;
}
