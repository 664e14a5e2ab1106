use std::sync::Arc;

use tracing::info;

use crate::application::repos::{CatalogSync, ValueCache};
use crate::application::upstream::Upstream;
use crate::cache::{CacheFamily, CacheScope};
use crate::domain::types::{CountryCode, Locale};

use super::{ExaminerError, ExaminerFamily};

/// Outcome of one refresh of a `(family, scope)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub family: ExaminerFamily,
    pub scope: CacheScope,
    pub records: usize,
    pub invalidated: usize,
}

/// Pulls a full listing from upstream, replaces the catalog and drops stale cache entries.
#[derive(Clone)]
pub struct CatalogRefresher {
    upstream: Arc<dyn Upstream>,
    catalog: Arc<dyn CatalogSync>,
    cache: Arc<dyn ValueCache>,
}

impl CatalogRefresher {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        catalog: Arc<dyn CatalogSync>,
        cache: Arc<dyn ValueCache>,
    ) -> Self {
        Self {
            upstream,
            catalog,
            cache,
        }
    }

    pub async fn refresh(
        &self,
        family: ExaminerFamily,
        scope: CacheScope,
    ) -> Result<SyncReport, ExaminerError> {
        let records = match (family, scope) {
            (ExaminerFamily::TicketForms, CacheScope::Global) => self.refresh_ticket_forms().await?,
            (ExaminerFamily::TicketForms, _) | (_, CacheScope::Global) => {
                return Err(ExaminerError::ScopeMismatch { family, scope });
            }
            (_, CacheScope::Localized { country, locale }) => {
                self.refresh_localized(family, country, locale).await?
            }
        };

        let mut invalidated = 0;
        for cache_family in family.cache_families() {
            invalidated += self.cache.invalidate(*cache_family, &scope).await;
        }

        info!(
            family = %family,
            scope = %scope,
            records,
            invalidated,
            "Catalog scope refreshed from upstream"
        );
        Ok(SyncReport {
            family,
            scope,
            records,
            invalidated,
        })
    }

    /// Re-pull one article after a vote so its totals reach the catalog.
    pub async fn refresh_article(
        &self,
        article_id: i64,
        country: CountryCode,
        locale: Locale,
    ) -> Result<SyncReport, ExaminerError> {
        let mut article = self
            .upstream
            .show_article(article_id, country, locale)
            .await?;
        article.country_code = country.as_str().to_string();
        self.catalog.upsert_article(country, locale, article).await?;

        let scope = CacheScope::localized(country, locale);
        let invalidated = self.cache.invalidate(CacheFamily::Articles, &scope).await;
        info!(article_id, scope = %scope, invalidated, "Article refreshed from upstream");
        Ok(SyncReport {
            family: ExaminerFamily::Articles,
            scope,
            records: 1,
            invalidated,
        })
    }

    async fn refresh_localized(
        &self,
        family: ExaminerFamily,
        country: CountryCode,
        locale: Locale,
    ) -> Result<usize, ExaminerError> {
        match family {
            ExaminerFamily::Categories => {
                let mut categories = self.upstream.list_categories(country, locale).await?;
                ensure_non_empty(family, categories.len())?;
                for category in &mut categories {
                    category.country_code = country.as_str().to_string();
                }
                let records = categories.len();
                self.catalog
                    .replace_categories(country, locale, categories)
                    .await?;
                Ok(records)
            }
            ExaminerFamily::Sections => {
                let mut sections = self.upstream.list_sections(country, locale).await?;
                ensure_non_empty(family, sections.len())?;
                for section in &mut sections {
                    section.country_code = country.as_str().to_string();
                }
                let records = sections.len();
                self.catalog
                    .replace_sections(country, locale, sections)
                    .await?;
                Ok(records)
            }
            ExaminerFamily::Articles => {
                let mut articles = self.upstream.list_articles(country, locale).await?;
                ensure_non_empty(family, articles.len())?;
                for article in &mut articles {
                    article.country_code = country.as_str().to_string();
                }
                let records = articles.len();
                self.catalog
                    .replace_articles(country, locale, articles)
                    .await?;
                Ok(records)
            }
            ExaminerFamily::TicketForms => Err(ExaminerError::ScopeMismatch {
                family,
                scope: CacheScope::localized(country, locale),
            }),
        }
    }

    async fn refresh_ticket_forms(&self) -> Result<usize, ExaminerError> {
        let forms = self.upstream.list_ticket_forms().await?;
        ensure_non_empty(ExaminerFamily::TicketForms, forms.len())?;
        let fields = self.upstream.list_ticket_fields().await?;
        ensure_non_empty(ExaminerFamily::TicketForms, fields.len())?;

        let records = forms.len() + fields.len();
        self.catalog.replace_ticket_forms(forms, fields).await?;
        Ok(records)
    }
}

/// An empty upstream listing is treated as a failure rather than wiping the catalog.
fn ensure_non_empty(family: ExaminerFamily, len: usize) -> Result<(), ExaminerError> {
    if len == 0 {
        return Err(ExaminerError::EmptyListing { family });
    }
    Ok(())
}

impl ExaminerFamily {
    pub fn cache_families(self) -> &'static [CacheFamily] {
        match self {
            ExaminerFamily::Categories => &[CacheFamily::Categories],
            ExaminerFamily::Sections => &[CacheFamily::Sections],
            ExaminerFamily::Articles => &[CacheFamily::Articles],
            ExaminerFamily::TicketForms => &[
                CacheFamily::TicketForm,
                CacheFamily::TicketField,
                CacheFamily::TicketFieldCustom,
                CacheFamily::TicketFieldSystem,
            ],
        }
    }
}
