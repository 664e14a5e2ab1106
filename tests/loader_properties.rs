mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use helpgate::application::error::ErrorKind;
use helpgate::application::examiner::ExaminerFamily;
use helpgate::application::loader::{
    ArticleParams, BatchContext, BatchFn, BodySearchParams, CategoriesParams, DispatchConfig,
    Fingerprint, LoadResult, LoadedValue, LoaderDeps, LoaderName, LoaderRegistry, Paging,
    RequestContext, SectionParams, SystemFieldOptionsParams, TicketFieldsParams,
};
use helpgate::application::pagination::PageWindow;
use helpgate::application::repos::{
    CategoriesRepo, ListQuery, Listing, RepoError, ValueCache,
};
use helpgate::application::upstream::SearchHit;
use helpgate::cache::{CacheConfig, CacheFamily, CacheKey, CacheScope, LruValueCache};
use helpgate::domain::entities::{Category, SystemFieldOption};
use helpgate::domain::types::{CountryCode, Locale, SortBy, SortOrder};

use support::{Harness, RecordingHook, ScriptedUpstream, article, seeded_catalog};

/// Echoes each key's field id back as an option and records every batch.
#[derive(Default)]
struct RecordingOptions {
    batches: Mutex<Vec<Vec<String>>>,
    invocations: AtomicUsize,
    delay: Option<Duration>,
}

#[async_trait]
impl BatchFn for RecordingOptions {
    async fn load_batch(&self, _ctx: &BatchContext, keys: &[Fingerprint]) -> Vec<LoadResult> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut ids = Vec::new();
        let results = keys
            .iter()
            .map(|key| {
                let params: SystemFieldOptionsParams = key.decode(LoaderName::SystemFieldOptions)?;
                ids.push(params.field_id.clone());
                Ok(LoadedValue::SystemFieldOptions(Arc::new(vec![
                    SystemFieldOption {
                        name: params.field_id.clone(),
                        value: params.field_id,
                    },
                ])))
            })
            .collect();
        self.batches.lock().expect("batches lock").push(ids);
        results
    }
}

struct Panicking;

#[async_trait]
impl BatchFn for Panicking {
    async fn load_batch(&self, _ctx: &BatchContext, _keys: &[Fingerprint]) -> Vec<LoadResult> {
        panic!("option store exploded");
    }
}

struct ShortResults;

#[async_trait]
impl BatchFn for ShortResults {
    async fn load_batch(&self, _ctx: &BatchContext, _keys: &[Fingerprint]) -> Vec<LoadResult> {
        Vec::new()
    }
}

struct WrongShape;

#[async_trait]
impl BatchFn for WrongShape {
    async fn load_batch(&self, _ctx: &BatchContext, keys: &[Fingerprint]) -> Vec<LoadResult> {
        keys.iter()
            .map(|_| Ok(LoadedValue::TopArticles(Arc::new(Vec::new()))))
            .collect()
    }
}

fn options(field_id: &str) -> SystemFieldOptionsParams {
    SystemFieldOptionsParams {
        field_id: field_id.to_string(),
    }
}

fn registry_with(name: LoaderName, function: impl BatchFn + 'static) -> LoaderRegistry {
    LoaderRegistry::empty(DispatchConfig::default()).with(name, function)
}

fn tw_categories(per_page: i64) -> CategoriesParams {
    CategoriesParams {
        country: CountryCode::Tw,
        locale: Locale::EnUs,
        paging: Paging {
            per_page,
            page: 0,
            sort_by: SortBy::Position,
            sort_order: SortOrder::Asc,
        },
    }
}

#[tokio::test]
async fn batch_results_align_with_input_keys() {
    let function = Arc::new(RecordingOptions::default());
    let registry = LoaderRegistry::empty(DispatchConfig::default())
        .with(LoaderName::SystemFieldOptions, ArcFn(Arc::clone(&function)));
    let ctx = RequestContext::new(&registry);

    let loads: Vec<_> = ["3", "1", "2"]
        .into_iter()
        .map(|id| ctx.load_system_field_options(&options(id)))
        .collect();
    let results = futures::future::join_all(loads).await;

    let names: Vec<String> = results
        .into_iter()
        .map(|result| result.expect("option")[0].name.clone())
        .collect();
    assert_eq!(names, vec!["3", "1", "2"]);

    let batches = function.batches.lock().expect("batches lock").clone();
    assert_eq!(batches, vec![vec!["3", "1", "2"]]);
}

#[tokio::test]
async fn concurrent_identical_loads_share_one_invocation() {
    let function = Arc::new(RecordingOptions::default());
    let registry = LoaderRegistry::empty(DispatchConfig::default())
        .with(LoaderName::SystemFieldOptions, ArcFn(Arc::clone(&function)));
    let ctx = RequestContext::new(&registry);

    let (first, second) = tokio::join!(
        ctx.load_system_field_options(&options("42")),
        ctx.load_system_field_options(&options("42")),
    );
    assert_eq!(first.expect("first"), second.expect("second"));
    assert_eq!(function.invocations.load(Ordering::SeqCst), 1);
    assert_eq!(
        function.batches.lock().expect("batches lock").clone(),
        vec![vec!["42"]]
    );
}

#[tokio::test]
async fn oversized_batches_split_by_max_batch_size() {
    let function = Arc::new(RecordingOptions::default());
    let dispatch = DispatchConfig {
        max_batch_size: std::num::NonZeroUsize::new(2).expect("non-zero"),
        ..DispatchConfig::default()
    };
    let registry = LoaderRegistry::empty(dispatch)
        .with(LoaderName::SystemFieldOptions, ArcFn(Arc::clone(&function)));
    let ctx = RequestContext::new(&registry);

    let loads: Vec<_> = ["1", "2", "3", "4", "5"]
        .into_iter()
        .map(|id| ctx.load_system_field_options(&options(id)))
        .collect();
    for result in futures::future::join_all(loads).await {
        result.expect("option");
    }

    let batches = function.batches.lock().expect("batches lock").clone();
    assert!(batches.iter().all(|batch| batch.len() <= 2));
    assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 5);
}

#[tokio::test]
async fn cached_payload_round_trips_across_contexts() {
    let catalog = seeded_catalog(&[(CountryCode::Tw, 201, 301, 401)]).await;
    let harness = Harness::new(catalog, ScriptedUpstream::default());
    let params = TicketFieldsParams {
        form_id: "360001".to_string(),
        locale: Locale::EnUs,
    };

    let cold = RequestContext::new(&harness.registry)
        .load_ticket_fields(&params)
        .await
        .expect("cold");
    assert_eq!(harness.cache.len(CacheFamily::TicketField), 1);

    let hot = RequestContext::new(&harness.registry)
        .load_ticket_fields(&params)
        .await
        .expect("hot");
    assert_eq!(*hot, *cold);
    assert_eq!(
        hot.iter().map(|field| field.id).collect::<Vec<_>>(),
        vec![11, 12]
    );
}

#[tokio::test]
async fn per_page_is_clamped_before_the_service_sees_it() {
    let catalog = seeded_catalog(&[(CountryCode::Tw, 201, 301, 401)]).await;
    let harness = Harness::new(catalog, ScriptedUpstream::default());
    let ctx = RequestContext::new(&harness.registry);

    let low = ctx.load_categories(&tw_categories(0)).await.expect("low");
    assert_eq!(low.page_meta.per_page, 1);
    let negative = ctx.load_categories(&tw_categories(-5)).await.expect("negative");
    assert_eq!(negative.page_meta.per_page, 1);
    let high = ctx.load_categories(&tw_categories(500)).await.expect("high");
    assert_eq!(high.page_meta.per_page, 100);

    assert_eq!(PageWindow::normalize(0, 1).per_page, 1);
    assert_eq!(PageWindow::normalize(101, 1).per_page, 100);
}

#[tokio::test]
async fn every_successful_load_fires_its_hook_once() {
    let catalog = seeded_catalog(&[(CountryCode::Tw, 201, 301, 401)]).await;
    let harness = Harness::new(catalog, ScriptedUpstream::default());
    let scope = CacheScope::localized(CountryCode::Tw, Locale::EnUs);

    for _ in 0..2 {
        let ctx = RequestContext::new(&harness.registry);
        ctx.load_categories(&tw_categories(10)).await.expect("categories");
        ctx.load_section(&SectionParams {
            section_id: "301".to_string(),
            country: CountryCode::Tw,
            locale: Locale::EnUs,
        })
        .await
        .expect("section");
        ctx.load_article(&ArticleParams {
            article_id: "401".to_string(),
            country: CountryCode::Tw,
            locale: Locale::EnUs,
        })
        .await
        .expect("article");
    }

    assert_eq!(harness.hook.count(ExaminerFamily::Categories), 2);
    assert_eq!(harness.hook.count(ExaminerFamily::Sections), 2);
    assert_eq!(harness.hook.count(ExaminerFamily::Articles), 2);
    assert!(harness.hook.checks().iter().all(|(_, checked)| *checked == scope));
}

#[tokio::test]
async fn validation_failures_do_not_fire_the_hook() {
    let catalog = seeded_catalog(&[(CountryCode::Tw, 201, 301, 401)]).await;
    let harness = Harness::new(catalog, ScriptedUpstream::default());
    let ctx = RequestContext::new(&harness.registry);

    let err = ctx
        .load_article(&ArticleParams {
            article_id: "abc".to_string(),
            country: CountryCode::Tw,
            locale: Locale::EnUs,
        })
        .await
        .expect_err("non-numeric id");
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    assert!(harness.hook.checks().is_empty());
}

#[tokio::test]
async fn failed_lookups_still_fire_the_hook_once() {
    let catalog = seeded_catalog(&[(CountryCode::Tw, 201, 301, 401)]).await;
    let harness = Harness::new(catalog, ScriptedUpstream::default());
    let ctx = RequestContext::new(&harness.registry);

    let err = ctx
        .load_article(&ArticleParams {
            article_id: "999".to_string(),
            country: CountryCode::Tw,
            locale: Locale::EnUs,
        })
        .await
        .expect_err("no such article");
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    assert_eq!(harness.hook.count(ExaminerFamily::Articles), 1);
    assert_eq!(
        harness.hook.checks(),
        vec![(
            ExaminerFamily::Articles,
            CacheScope::localized(CountryCode::Tw, Locale::EnUs)
        )]
    );
}

#[tokio::test]
async fn service_errors_still_fire_the_hook_once() {
    let catalog = seeded_catalog(&[]).await;
    let hook = Arc::new(RecordingHook::default());
    let deps = LoaderDeps {
        categories: Arc::new(BrokenLookup),
        sections: catalog.clone(),
        articles: catalog.clone(),
        tickets: catalog.clone(),
        cache: Arc::new(LruValueCache::new(&CacheConfig::default())),
        upstream: Arc::new(ScriptedUpstream::default()),
        hook: hook.clone(),
    };
    let registry = LoaderRegistry::standard(deps, DispatchConfig::default());

    let err = RequestContext::new(&registry)
        .load_categories(&tw_categories(10))
        .await
        .expect_err("listing timeout");
    assert_eq!(err.kind(), ErrorKind::ServerInternal);
    assert_eq!(hook.count(ExaminerFamily::Categories), 1);
    assert_eq!(hook.checks().len(), 1);
}

#[tokio::test]
async fn article_loads_count_clicks_even_from_cache() {
    let catalog = seeded_catalog(&[(CountryCode::Tw, 201, 301, 401)]).await;
    let harness = Harness::new(Arc::clone(&catalog), ScriptedUpstream::default());
    let params = ArticleParams {
        article_id: "401".to_string(),
        country: CountryCode::Tw,
        locale: Locale::EnUs,
    };

    for _ in 0..3 {
        RequestContext::new(&harness.registry)
            .load_article(&params)
            .await
            .expect("article");
    }

    // Click recording is fire-and-forget; give the spawned tasks a moment.
    for _ in 0..50 {
        if catalog.click_count(CountryCode::Tw, 401) == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(catalog.click_count(CountryCode::Tw, 401), 3);
}

/// Categories adapter whose article lookup fails with a non-sentinel error.
struct BrokenLookup;

#[async_trait]
impl CategoriesRepo for BrokenLookup {
    async fn list_categories(&self, _query: &ListQuery) -> Result<Listing<Category>, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn find_category(
        &self,
        _id_or_key_name: &str,
        _locale: Locale,
        _country: CountryCode,
    ) -> Result<Category, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn category_by_section(
        &self,
        _section_id: i64,
        _locale: Locale,
        _country: CountryCode,
    ) -> Result<Category, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn category_by_article(
        &self,
        _article_id: i64,
        _locale: Locale,
        _country: CountryCode,
    ) -> Result<Category, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn category_ids(&self, _country: CountryCode) -> Result<Vec<i64>, RepoError> {
        Ok(vec![1])
    }

    async fn category_id_by_key_name(
        &self,
        _key_name: &str,
        _country: CountryCode,
    ) -> Result<i64, RepoError> {
        Err(RepoError::Timeout)
    }
}

#[tokio::test]
async fn body_search_fails_on_non_sentinel_lookup_errors() {
    let catalog = seeded_catalog(&[]).await;
    let upstream = Arc::new(ScriptedUpstream::with_search(
        vec![SearchHit {
            article: article(601, 501, CountryCode::Sg),
            snippet: String::new(),
        }],
        1,
        10,
        1,
        1,
    ));
    let deps = LoaderDeps {
        categories: Arc::new(BrokenLookup),
        sections: catalog.clone(),
        articles: catalog.clone(),
        tickets: catalog.clone(),
        cache: Arc::new(LruValueCache::new(&CacheConfig::default())),
        upstream,
        hook: Arc::new(RecordingHook::default()),
    };
    let registry = LoaderRegistry::standard(deps, DispatchConfig::default());
    let ctx = RequestContext::new(&registry);

    let err = ctx
        .search_body_articles(&BodySearchParams {
            query: "order".to_string(),
            country: CountryCode::Sg,
            locale: Locale::EnUs,
            paging: Paging::default(),
        })
        .await
        .expect_err("lookup timeout");
    assert_eq!(err.kind(), ErrorKind::ServerInternal);
}

#[tokio::test]
async fn empty_search_query_is_invalid_attribute() {
    let catalog = seeded_catalog(&[]).await;
    let harness = Harness::new(catalog, ScriptedUpstream::default());
    let ctx = RequestContext::new(&harness.registry);

    let err = ctx
        .search_body_articles(&BodySearchParams {
            query: "   ".to_string(),
            country: CountryCode::Sg,
            locale: Locale::EnUs,
            paging: Paging::default(),
        })
        .await
        .expect_err("blank query");
    assert_eq!(err.kind(), ErrorKind::InvalidAttribute);
    assert!(
        harness
            .upstream
            .search_requests
            .lock()
            .expect("requests lock")
            .is_empty()
    );
}

#[tokio::test]
async fn cancelled_context_resolves_pending_loads_as_cancelled() {
    let function = Arc::new(RecordingOptions::default());
    let registry = LoaderRegistry::empty(DispatchConfig::default())
        .with(LoaderName::SystemFieldOptions, ArcFn(Arc::clone(&function)));
    let ctx = RequestContext::new(&registry);

    let pending = ctx.load_system_field_options(&options("7"));
    ctx.cancel();
    let err = pending.await.expect_err("cancelled");
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.status_code().as_u16(), 499);
}

#[tokio::test]
async fn deadline_cancels_slow_batches() {
    let function = Arc::new(RecordingOptions {
        delay: Some(Duration::from_millis(500)),
        ..RecordingOptions::default()
    });
    let registry = LoaderRegistry::empty(DispatchConfig::default())
        .with(LoaderName::SystemFieldOptions, ArcFn(Arc::clone(&function)));
    let ctx = RequestContext::new(&registry).with_deadline(Duration::from_millis(20));

    let err = ctx
        .load_system_field_options(&options("7"))
        .await
        .expect_err("deadline");
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(ctx.is_cancelled());
}

#[tokio::test]
async fn panicking_batch_fails_every_key() {
    let registry = registry_with(LoaderName::SystemFieldOptions, Panicking);
    let ctx = RequestContext::new(&registry);

    let (first, second) = tokio::join!(
        ctx.load_system_field_options(&options("1")),
        ctx.load_system_field_options(&options("2")),
    );
    for result in [first, second] {
        let err = result.expect_err("panic fans out");
        assert_eq!(err.kind(), ErrorKind::ServerInternal);
        assert!(err.message().contains("panicked"));
    }
}

#[tokio::test]
async fn short_result_vector_fails_every_key() {
    let registry = registry_with(LoaderName::SystemFieldOptions, ShortResults);
    let ctx = RequestContext::new(&registry);

    let err = ctx
        .load_system_field_options(&options("1"))
        .await
        .expect_err("length mismatch");
    assert_eq!(err.kind(), ErrorKind::ServerInternal);
}

#[tokio::test]
async fn unwired_loader_is_internal_config() {
    let registry = LoaderRegistry::empty(DispatchConfig::default());
    assert!(!registry.is_complete());
    let ctx = RequestContext::new(&registry);

    let err = ctx
        .load_article(&ArticleParams {
            article_id: "1".to_string(),
            country: CountryCode::Tw,
            locale: Locale::EnUs,
        })
        .await
        .expect_err("no loader");
    assert_eq!(err.kind(), ErrorKind::InternalConfig);
    assert_eq!(err.boundary_kind(), ErrorKind::ServerInternal);
}

#[tokio::test]
async fn mismatched_output_shape_is_internal_config() {
    let registry = registry_with(LoaderName::Article, WrongShape);
    let ctx = RequestContext::new(&registry);

    let err = ctx
        .load_article(&ArticleParams {
            article_id: "1".to_string(),
            country: CountryCode::Tw,
            locale: Locale::EnUs,
        })
        .await
        .expect_err("wrong shape");
    assert_eq!(err.kind(), ErrorKind::InternalConfig);
}

#[tokio::test]
async fn corrupt_cache_entry_is_internal_serialization() {
    let catalog = seeded_catalog(&[(CountryCode::Tw, 201, 301, 401)]).await;
    let harness = Harness::new(catalog, ScriptedUpstream::default());
    let params = tw_categories(10);
    let fingerprint = Fingerprint::of(LoaderName::Categories, &params).expect("fingerprint");
    harness
        .cache
        .set(
            CacheKey::localized(
                CacheFamily::Categories,
                CountryCode::Tw,
                Locale::EnUs,
                fingerprint.as_str(),
            ),
            "{not json".to_string(),
        )
        .await;

    let err = RequestContext::new(&harness.registry)
        .load_categories(&params)
        .await
        .expect_err("corrupt payload");
    assert_eq!(err.kind(), ErrorKind::InternalSerialization);
    assert!(err.is_internal());
    assert_eq!(harness.categories.calls("list_categories"), 0);
}

/// Lets a test keep a handle on a batch function it registers.
struct ArcFn<F>(Arc<F>);

#[async_trait]
impl<F: BatchFn> BatchFn for ArcFn<F> {
    async fn load_batch(&self, ctx: &BatchContext, keys: &[Fingerprint]) -> Vec<LoadResult> {
        self.0.load_batch(ctx, keys).await
    }
}
