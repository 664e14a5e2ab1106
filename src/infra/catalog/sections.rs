use async_trait::async_trait;

use crate::application::repos::{ListQuery, Listing, RepoError, SectionsRepo};
use crate::domain::entities::Section;
use crate::domain::types::{CountryCode, Locale};

use super::{MemoryCatalog, find_by_id, paginate};

#[async_trait]
impl SectionsRepo for MemoryCatalog {
    async fn list_sections(&self, query: &ListQuery) -> Result<Listing<Section>, RepoError> {
        Ok(Self::with_scope(
            &self.sections,
            "list_sections",
            query.country,
            query.locale,
            |rows| paginate(rows, query),
        ))
    }

    async fn list_sections_by_category(
        &self,
        category_id: i64,
        query: &ListQuery,
    ) -> Result<Listing<Section>, RepoError> {
        Ok(Self::with_scope(
            &self.sections,
            "list_sections_by_category",
            query.country,
            query.locale,
            |rows| {
                paginate(
                    rows.iter().filter(|section| section.category_id == category_id),
                    query,
                )
            },
        ))
    }

    async fn find_section(
        &self,
        section_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Section, RepoError> {
        Self::with_scope(&self.sections, "find_section", country, locale, |rows| {
            find_by_id(rows, section_id)
        })
    }

    async fn section_by_article(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Section, RepoError> {
        let section_id =
            Self::with_scope(&self.articles, "section_by_article", country, locale, |rows| {
                find_by_id(rows, article_id).map(|article| article.section_id)
            })?;
        self.find_section(section_id, locale, country).await
    }
}
