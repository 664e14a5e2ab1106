//! Shaped loader responses. These are also the payloads written to the value cache.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::pagination::PageMeta;
use crate::domain::entities::{
    Article, Category, CustomFieldOption, InstantSearchResult, SearchArticle, Section,
    SystemFieldOption, TicketField, TicketForm,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriesPage {
    pub categories: Vec<Category>,
    pub page_meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionsPage {
    pub sections: Vec<Section>,
    pub page_meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlesPage {
    pub articles: Vec<Article>,
    pub page_meta: PageMeta,
}

/// Body-search hits; `page_meta` is reported by the upstream, not recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub articles: Vec<SearchArticle>,
    pub page_meta: PageMeta,
}

/// Type-erased result carried through the batched loaders.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedValue {
    Categories(Arc<CategoriesPage>),
    Category(Arc<Category>),
    Sections(Arc<SectionsPage>),
    Section(Arc<Section>),
    Articles(Arc<ArticlesPage>),
    Article(Arc<Article>),
    TopArticles(Arc<Vec<Article>>),
    TicketForm(Arc<TicketForm>),
    TicketFields(Arc<Vec<TicketField>>),
    CustomFieldOptions(Arc<Vec<CustomFieldOption>>),
    SystemFieldOptions(Arc<Vec<SystemFieldOption>>),
    TitleSearch(Arc<Vec<InstantSearchResult>>),
    BodySearch(Arc<SearchResults>),
}

impl LoadedValue {
    pub fn shape(&self) -> &'static str {
        match self {
            LoadedValue::Categories(_) => "categories_page",
            LoadedValue::Category(_) => "category",
            LoadedValue::Sections(_) => "sections_page",
            LoadedValue::Section(_) => "section",
            LoadedValue::Articles(_) => "articles_page",
            LoadedValue::Article(_) => "article",
            LoadedValue::TopArticles(_) => "top_articles",
            LoadedValue::TicketForm(_) => "ticket_form",
            LoadedValue::TicketFields(_) => "ticket_fields",
            LoadedValue::CustomFieldOptions(_) => "custom_field_options",
            LoadedValue::SystemFieldOptions(_) => "system_field_options",
            LoadedValue::TitleSearch(_) => "title_search",
            LoadedValue::BodySearch(_) => "body_search",
        }
    }
}
