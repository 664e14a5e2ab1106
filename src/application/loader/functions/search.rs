//! Search loaders go straight to the upstream and are never cached.

use std::sync::Arc;

use tracing::debug;

use crate::application::error::LoadError;
use crate::application::loader::batch::LoadResult;
use crate::application::loader::fingerprint::Fingerprint;
use crate::application::loader::output::{LoadedValue, SearchResults};
use crate::application::loader::params::{BodySearchParams, TitleSearchParams};
use crate::application::pagination::{PageMeta, PageWindow, clamp_per_page};
use crate::application::repos::RepoError;
use crate::application::upstream::SearchRequest;
use crate::domain::entities::SearchArticle;

use super::{LoaderDeps, keyed_loader};

keyed_loader!(TitleSearchLoader, TitleSearchParams, search_titles);
keyed_loader!(BodySearchLoader, BodySearchParams, search_bodies);

fn require_query(query: &str) -> Result<&str, LoadError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(LoadError::invalid_attribute("search query must not be empty"));
    }
    Ok(query)
}

async fn search_titles(deps: LoaderDeps, _key: Fingerprint, params: TitleSearchParams) -> LoadResult {
    let query = require_query(&params.query)?;

    let results = deps
        .upstream
        .instant_search(query, params.country, params.locale)
        .await
        .map_err(|err| LoadError::from_upstream("instant_search", &err))?;

    Ok(LoadedValue::TitleSearch(Arc::new(results)))
}

async fn search_bodies(deps: LoaderDeps, _key: Fingerprint, params: BodySearchParams) -> LoadResult {
    let BodySearchParams {
        query,
        country,
        locale,
        paging,
    } = params;
    let query = require_query(&query)?;

    let category_ids = deps
        .categories
        .category_ids(country)
        .await
        .map_err(|err| LoadError::from_repo_list("category_ids", &err))?;

    let per_page = clamp_per_page(paging.per_page);
    let request = SearchRequest {
        category_ids,
        query: query.to_string(),
        country,
        locale,
        per_page,
        page: PageWindow::upstream_page(per_page, paging.page),
        sort_order: paging.sort_order,
    };
    let page = deps
        .upstream
        .search(&request)
        .await
        .map_err(|err| LoadError::from_upstream("search", &err))?;

    let mut articles = Vec::with_capacity(page.hits.len());
    for hit in page.hits {
        let category = match deps
            .categories
            .category_by_article(hit.article.id, locale, country)
            .await
        {
            Ok(category) => category,
            Err(RepoError::NotFound) => {
                debug!(
                    article_id = hit.article.id,
                    %country,
                    %locale,
                    "Dropping search hit without a local category"
                );
                continue;
            }
            Err(err) => return Err(LoadError::from_repo("category_by_article", &err)),
        };

        let mut article = hit.article;
        article.country_code = country.as_str().to_string();
        articles.push(SearchArticle {
            article,
            category_id: category.id,
            category_name: category.name,
            snippet: hit.snippet,
        });
    }

    Ok(LoadedValue::BodySearch(Arc::new(SearchResults {
        articles,
        page_meta: PageMeta::from_upstream(page.page, page.per_page, page.page_count, page.count),
    })))
}
