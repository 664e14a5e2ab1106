//! Shared fixtures for the integration suites: entity builders, a scripted
//! upstream, a call-counting categories adapter and a recording hook.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use helpgate::application::examiner::{ExaminerFamily, FreshnessHook};
use helpgate::application::loader::{DispatchConfig, LoaderDeps, LoaderRegistry};
use helpgate::application::repos::{
    CatalogSync, CategoriesRepo, ListQuery, Listing, RepoError, ValueCache,
};
use helpgate::application::upstream::{SearchHit, SearchPage, SearchRequest, Upstream, UpstreamError};
use helpgate::cache::{CacheConfig, CacheScope, LruValueCache};
use helpgate::domain::entities::{
    Article, Category, CustomFieldOption, InstantSearchResult, Section, SystemFieldOption,
    TicketField, TicketForm, Vote,
};
use helpgate::domain::types::{CountryCode, Locale, VoteDirection};
use helpgate::infra::catalog::MemoryCatalog;
use time::macros::datetime;

pub fn category(id: i64, position: i64, country: CountryCode) -> Category {
    Category {
        id,
        position,
        created_at: datetime!(2024-01-01 00:00 UTC),
        updated_at: datetime!(2024-01-01 00:00 UTC),
        source_locale: "en-us".to_string(),
        outdated: false,
        country_code: country.as_str().to_string(),
        url: String::new(),
        html_url: String::new(),
        name: format!("category {id}"),
        description: String::new(),
        locale: "en-us".to_string(),
        key_name: String::new(),
    }
}

pub fn section(id: i64, category_id: i64, country: CountryCode) -> Section {
    Section {
        id,
        category_id,
        position: 1,
        created_at: datetime!(2024-01-01 00:00 UTC),
        updated_at: datetime!(2024-01-01 00:00 UTC),
        source_locale: "en-us".to_string(),
        outdated: false,
        country_code: country.as_str().to_string(),
        url: String::new(),
        html_url: String::new(),
        name: format!("section {id}"),
        description: String::new(),
        locale: "en-us".to_string(),
    }
}

pub fn article(id: i64, section_id: i64, country: CountryCode) -> Article {
    Article {
        id,
        section_id,
        author_id: 7,
        comments_disable: false,
        draft: false,
        promoted: false,
        position: 1,
        vote_sum: 0,
        vote_count: 0,
        created_at: datetime!(2024-01-01 00:00 UTC),
        updated_at: datetime!(2024-01-01 00:00 UTC),
        edited_at: None,
        source_locale: "en-us".to_string(),
        outdated: false,
        outdated_locales: Vec::new(),
        label_names: Vec::new(),
        country_code: country.as_str().to_string(),
        url: String::new(),
        html_url: String::new(),
        name: format!("article {id}"),
        title: format!("How to {id}"),
        body: "<p>body</p>".to_string(),
        locale: "en-us".to_string(),
    }
}

pub fn ticket_form(id: i64, field_ids: &[i64]) -> TicketForm {
    TicketForm {
        id,
        name: format!("form {id}"),
        raw_name: format!("form {id}"),
        display_name: format!("form {id}"),
        raw_display_name: format!("form {id}"),
        position: 1,
        active: true,
        end_user_visible: true,
        ticket_field_ids: field_ids.to_vec(),
        created_at: datetime!(2024-01-01 00:00 UTC),
        updated_at: datetime!(2024-01-01 00:00 UTC),
    }
}

pub fn ticket_field(id: i64) -> TicketField {
    TicketField {
        id,
        field_type: "tagger".to_string(),
        title: format!("field {id}"),
        raw_title: format!("field {id}"),
        description: String::new(),
        raw_description: String::new(),
        position: id,
        active: true,
        required: false,
        collapsed_for_agents: false,
        regexp_for_validation: None,
        title_in_portal: format!("field {id}"),
        raw_title_in_portal: format!("field {id}"),
        visible_in_portal: true,
        editable_in_portal: true,
        required_in_portal: false,
        tag: None,
        removable: true,
        custom_field_options: vec![CustomFieldOption {
            id: id * 10,
            name: "Yes".to_string(),
            raw_name: "Yes".to_string(),
            value: "yes".to_string(),
        }],
        system_field_options: vec![SystemFieldOption {
            name: "Low".to_string(),
            value: "low".to_string(),
        }],
        created_at: datetime!(2024-01-01 00:00 UTC),
        updated_at: datetime!(2024-01-01 00:00 UTC),
    }
}

/// Catalog with one category, section and article per listed country under `en-us`.
pub async fn seeded_catalog(scopes: &[(CountryCode, i64, i64, i64)]) -> Arc<MemoryCatalog> {
    let catalog = Arc::new(MemoryCatalog::new());
    for (country, category_id, section_id, article_id) in scopes {
        catalog
            .replace_categories(*country, Locale::EnUs, vec![category(*category_id, 1, *country)])
            .await
            .expect("seed categories");
        catalog
            .replace_sections(
                *country,
                Locale::EnUs,
                vec![section(*section_id, *category_id, *country)],
            )
            .await
            .expect("seed sections");
        catalog
            .replace_articles(
                *country,
                Locale::EnUs,
                vec![article(*article_id, *section_id, *country)],
            )
            .await
            .expect("seed articles");
    }
    catalog
        .replace_ticket_forms(
            vec![ticket_form(360001, &[11, 12])],
            vec![ticket_field(11), ticket_field(12)],
        )
        .await
        .expect("seed tickets");
    catalog
}

/// Delegates to the in-memory catalog while counting calls per operation.
pub struct CountingCategories {
    inner: Arc<MemoryCatalog>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl CountingCategories {
    pub fn new(inner: Arc<MemoryCatalog>) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, operation: &'static str) {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(operation)
            .or_insert(0) += 1;
    }
}

#[async_trait]
impl CategoriesRepo for CountingCategories {
    async fn list_categories(&self, query: &ListQuery) -> Result<Listing<Category>, RepoError> {
        self.record("list_categories");
        self.inner.list_categories(query).await
    }

    async fn find_category(
        &self,
        id_or_key_name: &str,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError> {
        self.record("find_category");
        self.inner.find_category(id_or_key_name, locale, country).await
    }

    async fn category_by_section(
        &self,
        section_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError> {
        self.record("category_by_section");
        self.inner.category_by_section(section_id, locale, country).await
    }

    async fn category_by_article(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError> {
        self.record("category_by_article");
        self.inner.category_by_article(article_id, locale, country).await
    }

    async fn category_ids(&self, country: CountryCode) -> Result<Vec<i64>, RepoError> {
        self.record("category_ids");
        self.inner.category_ids(country).await
    }

    async fn category_id_by_key_name(
        &self,
        key_name: &str,
        country: CountryCode,
    ) -> Result<i64, RepoError> {
        self.record("category_id_by_key_name");
        self.inner.category_id_by_key_name(key_name, country).await
    }
}

/// Upstream double returning scripted search results and recording writes.
#[derive(Default)]
pub struct ScriptedUpstream {
    pub search_page: Mutex<Option<SearchPage>>,
    pub search_requests: Mutex<Vec<SearchRequest>>,
    pub instant_results: Mutex<Vec<InstantSearchResult>>,
    pub instant_calls: AtomicUsize,
    pub votes: Mutex<Vec<(i64, VoteDirection, CountryCode, Locale)>>,
    pub requests: Mutex<Vec<(CountryCode, serde_json::Value)>>,
    pub categories: Mutex<Vec<Category>>,
    /// Served by `show_article`; votes update the stored totals.
    pub articles: Mutex<Vec<Article>>,
    pub article_calls: AtomicUsize,
    pub ticket_forms: Mutex<Vec<TicketForm>>,
    pub ticket_fields: Mutex<Vec<TicketField>>,
    pub listing_calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn with_search(hits: Vec<SearchHit>, page: i64, per_page: i64, page_count: i64, count: i64) -> Self {
        let upstream = Self::default();
        *upstream.search_page.lock().expect("search lock") = Some(SearchPage {
            hits,
            page,
            per_page,
            page_count,
            count,
        });
        upstream
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn instant_search(
        &self,
        _query: &str,
        _country: CountryCode,
        _locale: Locale,
    ) -> Result<Vec<InstantSearchResult>, UpstreamError> {
        self.instant_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.instant_results.lock().expect("instant lock").clone())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, UpstreamError> {
        self.search_requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.search_page
            .lock()
            .expect("search lock")
            .clone()
            .ok_or_else(|| UpstreamError::Status {
                status: 503,
                url: "https://help.example.test/api/v2/help_center/articles/search.json"
                    .to_string(),
            })
    }

    async fn create_vote(
        &self,
        article_id: i64,
        direction: VoteDirection,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vote, UpstreamError> {
        self.votes
            .lock()
            .expect("votes lock")
            .push((article_id, direction, country, locale));
        if let Some(article) = self
            .articles
            .lock()
            .expect("articles lock")
            .iter_mut()
            .find(|article| article.id == article_id)
        {
            article.vote_sum = 3;
            article.vote_count = 5;
        }
        Ok(Vote {
            id: 1,
            vote_sum: 3,
            vote_count: 5,
            upvote_count: 4,
            label: String::new(),
            value: direction.as_str().to_string(),
        })
    }

    async fn show_article(
        &self,
        article_id: i64,
        _country: CountryCode,
        locale: Locale,
    ) -> Result<Article, UpstreamError> {
        self.article_calls.fetch_add(1, Ordering::SeqCst);
        self.articles
            .lock()
            .expect("articles lock")
            .iter()
            .find(|article| article.id == article_id)
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                status: 404,
                url: format!(
                    "https://help.example.test/api/v2/help_center/{}/articles/{article_id}.json",
                    locale.as_str()
                ),
            })
    }

    async fn create_request(
        &self,
        country: CountryCode,
        payload: &serde_json::Value,
    ) -> Result<(), UpstreamError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((country, payload.clone()));
        Ok(())
    }

    async fn list_categories(
        &self,
        _country: CountryCode,
        _locale: Locale,
    ) -> Result<Vec<Category>, UpstreamError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.categories.lock().expect("categories lock").clone())
    }

    async fn list_sections(
        &self,
        _country: CountryCode,
        _locale: Locale,
    ) -> Result<Vec<Section>, UpstreamError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn list_articles(
        &self,
        _country: CountryCode,
        _locale: Locale,
    ) -> Result<Vec<Article>, UpstreamError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn list_ticket_forms(&self) -> Result<Vec<TicketForm>, UpstreamError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ticket_forms.lock().expect("forms lock").clone())
    }

    async fn list_ticket_fields(&self) -> Result<Vec<TicketField>, UpstreamError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ticket_fields.lock().expect("fields lock").clone())
    }
}

/// Records every freshness check instead of scheduling a refresh.
#[derive(Default)]
pub struct RecordingHook {
    checks: Mutex<Vec<(ExaminerFamily, CacheScope)>>,
}

impl RecordingHook {
    pub fn checks(&self) -> Vec<(ExaminerFamily, CacheScope)> {
        self.checks.lock().expect("checks lock").clone()
    }

    pub fn count(&self, family: ExaminerFamily) -> usize {
        self.checks()
            .iter()
            .filter(|(checked, _)| *checked == family)
            .count()
    }
}

impl FreshnessHook for RecordingHook {
    fn check(&self, family: ExaminerFamily, scope: CacheScope) {
        self.checks
            .lock()
            .expect("checks lock")
            .push((family, scope));
    }
}

/// Everything a loader test needs, wired around one catalog.
pub struct Harness {
    pub catalog: Arc<MemoryCatalog>,
    pub categories: Arc<CountingCategories>,
    pub upstream: Arc<ScriptedUpstream>,
    pub cache: Arc<LruValueCache>,
    pub hook: Arc<RecordingHook>,
    pub registry: LoaderRegistry,
}

impl Harness {
    pub fn new(catalog: Arc<MemoryCatalog>, upstream: ScriptedUpstream) -> Self {
        let categories = Arc::new(CountingCategories::new(Arc::clone(&catalog)));
        let upstream = Arc::new(upstream);
        let cache = Arc::new(LruValueCache::new(&CacheConfig::default()));
        let hook = Arc::new(RecordingHook::default());
        let deps = LoaderDeps {
            categories: categories.clone(),
            sections: catalog.clone(),
            articles: catalog.clone(),
            tickets: catalog.clone(),
            cache: cache.clone() as Arc<dyn ValueCache>,
            upstream: upstream.clone(),
            hook: hook.clone(),
        };
        let registry = LoaderRegistry::standard(deps, DispatchConfig::default());
        Self {
            catalog,
            categories,
            upstream,
            cache,
            hook,
            registry,
        }
    }
}
