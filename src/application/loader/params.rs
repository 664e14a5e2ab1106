//! Typed inputs for each named loader.
//!
//! Numeric ids travel as strings: they are parsed inside the batch function so
//! an unusable id surfaces as a per-key `RecordNotFound` instead of a request
//! failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::application::pagination::{PageWindow, clamp_per_page};
use crate::application::repos::ListQuery;
use crate::domain::entities::{
    Article, Category, CustomFieldOption, InstantSearchResult, Section, SystemFieldOption,
    TicketField, TicketForm,
};
use crate::domain::types::{CountryCode, Locale, SortBy, SortOrder};

use super::output::{ArticlesPage, CategoriesPage, LoadedValue, SearchResults, SectionsPage};
use super::registry::LoaderName;

/// Binds a params type to its loader and the shape that loader produces.
pub trait LoaderParams: Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: LoaderName;
    type Output: Send + Sync + 'static;

    fn extract(value: LoadedValue) -> Option<Arc<Self::Output>>;
}

/// Paging for list loaders. `page` is the zero-based item offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub per_page: i64,
    pub page: i64,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Paging {
    pub fn new(window: PageWindow, sort_by: SortBy, sort_order: SortOrder) -> Self {
        Self {
            per_page: window.per_page,
            page: window.offset,
            sort_by,
            sort_order,
        }
    }

    pub fn list_query(&self, country: CountryCode, locale: Locale) -> ListQuery {
        ListQuery {
            country,
            locale,
            per_page: clamp_per_page(self.per_page),
            offset: self.page.max(0),
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self::new(PageWindow::normalize(30, 1), SortBy::Position, SortOrder::Asc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesParams {
    pub country: CountryCode,
    pub locale: Locale,
    pub paging: Paging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryParams {
    pub id_or_key_name: String,
    pub country: CountryCode,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionsScope {
    All,
    ByCategory { category_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionsParams {
    pub scope: SectionsScope,
    pub country: CountryCode,
    pub locale: Locale,
    pub paging: Paging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionParams {
    pub section_id: String,
    pub country: CountryCode,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticlesScope {
    All,
    ByCategory {
        category_id: String,
        labels: Vec<String>,
    },
    BySection {
        section_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlesParams {
    pub scope: ArticlesScope,
    pub country: CountryCode,
    pub locale: Locale,
    pub paging: Paging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleParams {
    pub article_id: String,
    pub country: CountryCode,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopArticlesParams {
    pub top_n: i64,
    pub country: CountryCode,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFormParams {
    pub form_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFieldsParams {
    pub form_id: String,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldOptionsParams {
    pub field_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFieldOptionsParams {
    pub field_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSearchParams {
    pub query: String,
    pub country: CountryCode,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySearchParams {
    pub query: String,
    pub country: CountryCode,
    pub locale: Locale,
    pub paging: Paging,
}

macro_rules! bind_loader {
    ($params:ty => $name:ident, $variant:ident, $output:ty) => {
        impl LoaderParams for $params {
            const NAME: LoaderName = LoaderName::$name;
            type Output = $output;

            fn extract(value: LoadedValue) -> Option<Arc<Self::Output>> {
                match value {
                    LoadedValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

bind_loader!(CategoriesParams => Categories, Categories, CategoriesPage);
bind_loader!(CategoryParams => Category, Category, Category);
bind_loader!(SectionsParams => Sections, Sections, SectionsPage);
bind_loader!(SectionParams => Section, Section, Section);
bind_loader!(ArticlesParams => Articles, Articles, ArticlesPage);
bind_loader!(ArticleParams => Article, Article, Article);
bind_loader!(TopArticlesParams => TopArticles, TopArticles, Vec<Article>);
bind_loader!(TicketFormParams => TicketForm, TicketForm, TicketForm);
bind_loader!(TicketFieldsParams => TicketFields, TicketFields, Vec<TicketField>);
bind_loader!(CustomFieldOptionsParams => CustomFieldOptions, CustomFieldOptions, Vec<CustomFieldOption>);
bind_loader!(SystemFieldOptionsParams => SystemFieldOptions, SystemFieldOptions, Vec<SystemFieldOption>);
bind_loader!(TitleSearchParams => SearchTitleArticles, TitleSearch, Vec<InstantSearchResult>);
bind_loader!(BodySearchParams => SearchBodyArticles, BodySearch, SearchResults);

/// Parse a numeric id carried in params. `None` means "nothing can match".
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}
