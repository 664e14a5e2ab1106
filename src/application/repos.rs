//! Service traits describing the data-access adapters the loaders consume.

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{CacheFamily, CacheKey, CacheScope};
use crate::domain::entities::{
    Article, Category, CustomFieldOption, Section, SystemFieldOption, TicketField, TicketForm,
};
use crate::domain::types::{CountryCode, Locale, SortBy, SortOrder};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepoError {
    #[error("resource not found")]
    NotFound,
    #[error("service timeout")]
    Timeout,
    #[error("service unavailable: {message}")]
    Unavailable { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Offset-paged listing request for one `(country, locale)` scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub country: CountryCode,
    pub locale: Locale,
    pub per_page: i64,
    pub offset: i64,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// A page of rows plus the total number of rows matching the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self, query: &ListQuery) -> Result<Listing<Category>, RepoError>;

    /// Look up by numeric id or, failing that, by key name.
    async fn find_category(
        &self,
        id_or_key_name: &str,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError>;

    async fn category_by_section(
        &self,
        section_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError>;

    async fn category_by_article(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError>;

    async fn category_ids(&self, country: CountryCode) -> Result<Vec<i64>, RepoError>;

    async fn category_id_by_key_name(
        &self,
        key_name: &str,
        country: CountryCode,
    ) -> Result<i64, RepoError>;
}

#[async_trait]
pub trait SectionsRepo: Send + Sync {
    async fn list_sections(&self, query: &ListQuery) -> Result<Listing<Section>, RepoError>;

    async fn list_sections_by_category(
        &self,
        category_id: i64,
        query: &ListQuery,
    ) -> Result<Listing<Section>, RepoError>;

    async fn find_section(
        &self,
        section_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Section, RepoError>;

    async fn section_by_article(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Section, RepoError>;
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn list_articles(&self, query: &ListQuery) -> Result<Listing<Article>, RepoError>;

    async fn list_articles_by_category(
        &self,
        category_id: i64,
        labels: &[String],
        query: &ListQuery,
    ) -> Result<Listing<Article>, RepoError>;

    async fn list_articles_by_section(
        &self,
        section_id: i64,
        query: &ListQuery,
    ) -> Result<Listing<Article>, RepoError>;

    async fn find_article(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Article, RepoError>;

    async fn top_articles(
        &self,
        top_n: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Vec<Article>, RepoError>;

    async fn increment_click_counter(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TicketsRepo: Send + Sync {
    async fn find_ticket_form(&self, form_id: i64) -> Result<TicketForm, RepoError>;

    async fn ticket_fields_by_form(
        &self,
        form_id: i64,
        locale: Locale,
    ) -> Result<Vec<TicketField>, RepoError>;

    async fn custom_field_options(
        &self,
        field_id: i64,
    ) -> Result<Vec<CustomFieldOption>, RepoError>;

    async fn system_field_options(
        &self,
        field_id: i64,
    ) -> Result<Vec<SystemFieldOption>, RepoError>;
}

/// Write side used when the examiner refreshes a scope from upstream.
#[async_trait]
pub trait CatalogSync: Send + Sync {
    async fn replace_categories(
        &self,
        country: CountryCode,
        locale: Locale,
        categories: Vec<Category>,
    ) -> Result<(), RepoError>;

    async fn replace_sections(
        &self,
        country: CountryCode,
        locale: Locale,
        sections: Vec<Section>,
    ) -> Result<(), RepoError>;

    async fn replace_articles(
        &self,
        country: CountryCode,
        locale: Locale,
        articles: Vec<Article>,
    ) -> Result<(), RepoError>;

    /// Replace one article in place, or add it when the scope lacks it.
    async fn upsert_article(
        &self,
        country: CountryCode,
        locale: Locale,
        article: Article,
    ) -> Result<(), RepoError>;

    async fn replace_ticket_forms(
        &self,
        forms: Vec<TicketForm>,
        fields: Vec<TicketField>,
    ) -> Result<(), RepoError>;
}

/// Family-namespaced value cache. Reads never fail and writes are best-effort.
#[async_trait]
pub trait ValueCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<String>;

    async fn set(&self, key: CacheKey, payload: String);

    /// Drop every entry of `family` stored under `scope`, returning how many were removed.
    async fn invalidate(&self, family: CacheFamily, scope: &CacheScope) -> usize;
}
