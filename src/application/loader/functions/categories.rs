use std::sync::Arc;

use crate::application::error::LoadError;
use crate::application::examiner::ExaminerFamily;
use crate::application::loader::batch::LoadResult;
use crate::application::loader::fingerprint::Fingerprint;
use crate::application::loader::output::{CategoriesPage, LoadedValue};
use crate::application::loader::params::{CategoriesParams, CategoryParams};
use crate::application::pagination::PageMeta;
use crate::cache::{CacheFamily, CacheKey, CacheScope};

use super::{FreshnessGuard, LoaderDeps, cached_or_fetch, keyed_loader};

keyed_loader!(CategoriesLoader, CategoriesParams, load_categories);
keyed_loader!(CategoryLoader, CategoryParams, load_category);

async fn load_categories(deps: LoaderDeps, key: Fingerprint, params: CategoriesParams) -> LoadResult {
    let CategoriesParams {
        country,
        locale,
        paging,
    } = params;
    let _guard = FreshnessGuard::arm(
        &deps.hook,
        ExaminerFamily::Categories,
        CacheScope::localized(country, locale),
    );

    let query = paging.list_query(country, locale);
    let cache_key = CacheKey::localized(CacheFamily::Categories, country, locale, key.as_str());
    let page = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        let listing = deps
            .categories
            .list_categories(&query)
            .await
            .map_err(|err| LoadError::from_repo_list("list_categories", &err))?;
        Ok(CategoriesPage {
            page_meta: PageMeta::compute(query.per_page, query.offset, listing.total),
            categories: listing.items,
        })
    })
    .await?;

    Ok(LoadedValue::Categories(Arc::new(page)))
}

async fn load_category(deps: LoaderDeps, key: Fingerprint, params: CategoryParams) -> LoadResult {
    let CategoryParams {
        id_or_key_name,
        country,
        locale,
    } = params;
    let id_or_key_name = id_or_key_name.trim();
    if id_or_key_name.is_empty() {
        return Err(LoadError::invalid_attribute(
            "category id or key name must not be empty",
        ));
    }
    let _guard = FreshnessGuard::arm(
        &deps.hook,
        ExaminerFamily::Categories,
        CacheScope::localized(country, locale),
    );

    let cache_key = CacheKey::localized(CacheFamily::Categories, country, locale, key.as_str());
    let category = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.categories
            .find_category(id_or_key_name, locale, country)
            .await
            .map_err(|err| LoadError::from_repo("find_category", &err))
    })
    .await?;

    Ok(LoadedValue::Category(Arc::new(category)))
}
