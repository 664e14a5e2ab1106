use std::sync::Arc;

use crate::application::error::LoadError;
use crate::application::examiner::ExaminerFamily;
use crate::application::loader::batch::LoadResult;
use crate::application::loader::fingerprint::Fingerprint;
use crate::application::loader::output::{LoadedValue, SectionsPage};
use crate::application::loader::params::{SectionParams, SectionsParams, SectionsScope, parse_id};
use crate::application::pagination::PageMeta;
use crate::cache::{CacheFamily, CacheKey, CacheScope};

use super::{FreshnessGuard, LoaderDeps, cached_or_fetch, keyed_loader};

keyed_loader!(SectionsLoader, SectionsParams, load_sections);
keyed_loader!(SectionLoader, SectionParams, load_section);

async fn load_sections(deps: LoaderDeps, key: Fingerprint, params: SectionsParams) -> LoadResult {
    let SectionsParams {
        scope,
        country,
        locale,
        paging,
    } = params;
    let category_id = match &scope {
        SectionsScope::All => None,
        SectionsScope::ByCategory { category_id } => Some(parse_id(category_id).ok_or_else(
            || LoadError::not_found(format!("category id `{category_id}` is not numeric")),
        )?),
    };
    let _guard = FreshnessGuard::arm(
        &deps.hook,
        ExaminerFamily::Sections,
        CacheScope::localized(country, locale),
    );

    let query = paging.list_query(country, locale);
    let cache_key = CacheKey::localized(CacheFamily::Sections, country, locale, key.as_str());
    let page = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        let listing = match category_id {
            None => deps.sections.list_sections(&query).await,
            Some(category_id) => {
                deps.sections
                    .list_sections_by_category(category_id, &query)
                    .await
            }
        }
        .map_err(|err| LoadError::from_repo_list("list_sections", &err))?;
        Ok(SectionsPage {
            page_meta: PageMeta::compute(query.per_page, query.offset, listing.total),
            sections: listing.items,
        })
    })
    .await?;

    Ok(LoadedValue::Sections(Arc::new(page)))
}

async fn load_section(deps: LoaderDeps, key: Fingerprint, params: SectionParams) -> LoadResult {
    let SectionParams {
        section_id,
        country,
        locale,
    } = params;
    let section_id = parse_id(&section_id)
        .ok_or_else(|| LoadError::not_found(format!("section id `{section_id}` is not numeric")))?;
    let _guard = FreshnessGuard::arm(
        &deps.hook,
        ExaminerFamily::Sections,
        CacheScope::localized(country, locale),
    );

    let cache_key = CacheKey::localized(CacheFamily::Sections, country, locale, key.as_str());
    let section = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.sections
            .find_section(section_id, locale, country)
            .await
            .map_err(|err| LoadError::from_repo("find_section", &err))
    })
    .await?;

    Ok(LoadedValue::Section(Arc::new(section)))
}
