use std::sync::Arc;

use tracing::warn;

use crate::application::error::LoadError;
use crate::application::examiner::ExaminerFamily;
use crate::application::loader::batch::LoadResult;
use crate::application::loader::fingerprint::Fingerprint;
use crate::application::loader::output::{ArticlesPage, LoadedValue};
use crate::application::loader::params::{
    ArticleParams, ArticlesParams, ArticlesScope, TopArticlesParams, parse_id,
};
use crate::application::pagination::PageMeta;
use crate::cache::{CacheFamily, CacheKey, CacheScope};
use crate::domain::types::{CountryCode, Locale};

use super::{FreshnessGuard, LoaderDeps, cached_or_fetch, keyed_loader};

keyed_loader!(ArticlesLoader, ArticlesParams, load_articles);
keyed_loader!(ArticleLoader, ArticleParams, load_article);
keyed_loader!(TopArticlesLoader, TopArticlesParams, load_top_articles);

enum ResolvedScope {
    All,
    ByCategory { category_id: i64, labels: Vec<String> },
    BySection { section_id: i64 },
}

fn resolve_scope(scope: ArticlesScope) -> Result<ResolvedScope, LoadError> {
    match scope {
        ArticlesScope::All => Ok(ResolvedScope::All),
        ArticlesScope::ByCategory {
            category_id,
            labels,
        } => parse_id(&category_id)
            .map(|category_id| ResolvedScope::ByCategory {
                category_id,
                labels,
            })
            .ok_or_else(|| LoadError::not_found(format!("category id `{category_id}` is not numeric"))),
        ArticlesScope::BySection { section_id } => parse_id(&section_id)
            .map(|section_id| ResolvedScope::BySection { section_id })
            .ok_or_else(|| LoadError::not_found(format!("section id `{section_id}` is not numeric"))),
    }
}

async fn load_articles(deps: LoaderDeps, key: Fingerprint, params: ArticlesParams) -> LoadResult {
    let ArticlesParams {
        scope,
        country,
        locale,
        paging,
    } = params;
    let listing_scope = resolve_scope(scope)?;
    let _guard = FreshnessGuard::arm(
        &deps.hook,
        ExaminerFamily::Articles,
        CacheScope::localized(country, locale),
    );

    let query = paging.list_query(country, locale);
    let cache_key = CacheKey::localized(CacheFamily::Articles, country, locale, key.as_str());
    let page = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        let listing = match &listing_scope {
            ResolvedScope::All => deps.articles.list_articles(&query).await,
            ResolvedScope::ByCategory {
                category_id,
                labels,
            } => {
                deps.articles
                    .list_articles_by_category(*category_id, labels, &query)
                    .await
            }
            ResolvedScope::BySection { section_id } => {
                deps.articles
                    .list_articles_by_section(*section_id, &query)
                    .await
            }
        }
        .map_err(|err| LoadError::from_repo_list("list_articles", &err))?;
        Ok(ArticlesPage {
            page_meta: PageMeta::compute(query.per_page, query.offset, listing.total),
            articles: listing.items,
        })
    })
    .await?;

    Ok(LoadedValue::Articles(Arc::new(page)))
}

async fn load_article(deps: LoaderDeps, key: Fingerprint, params: ArticleParams) -> LoadResult {
    let ArticleParams {
        article_id,
        country,
        locale,
    } = params;
    let article_id = parse_id(&article_id)
        .ok_or_else(|| LoadError::not_found(format!("article id `{article_id}` is not numeric")))?;
    let _guard = FreshnessGuard::arm(
        &deps.hook,
        ExaminerFamily::Articles,
        CacheScope::localized(country, locale),
    );

    let cache_key = CacheKey::localized(CacheFamily::Articles, country, locale, key.as_str());
    let article = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.articles
            .find_article(article_id, locale, country)
            .await
            .map_err(|err| LoadError::from_repo("find_article", &err))
    })
    .await?;

    record_click(&deps, article_id, locale, country);
    Ok(LoadedValue::Article(Arc::new(article)))
}

fn record_click(deps: &LoaderDeps, article_id: i64, locale: Locale, country: CountryCode) {
    let articles = Arc::clone(&deps.articles);
    tokio::spawn(async move {
        if let Err(err) = articles
            .increment_click_counter(article_id, locale, country)
            .await
        {
            warn!(
                article_id,
                %country,
                %locale,
                error = %err,
                "Failed to increment article click counter"
            );
        }
    });
}

async fn load_top_articles(
    deps: LoaderDeps,
    key: Fingerprint,
    params: TopArticlesParams,
) -> LoadResult {
    let TopArticlesParams {
        top_n,
        country,
        locale,
    } = params;
    if top_n <= 0 {
        return Err(LoadError::invalid_attribute(format!(
            "top_n must be positive, got {top_n}"
        )));
    }

    let cache_key = CacheKey::localized(CacheFamily::Articles, country, locale, key.as_str());
    let articles = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.articles
            .top_articles(top_n, locale, country)
            .await
            .map_err(|err| LoadError::from_repo_list("top_articles", &err))
    })
    .await?;

    Ok(LoadedValue::TopArticles(Arc::new(articles)))
}
