use async_trait::async_trait;

use crate::application::loader::params::parse_id;
use crate::application::repos::{CategoriesRepo, ListQuery, Listing, RepoError};
use crate::domain::entities::Category;
use crate::domain::types::{CountryCode, Locale};
use crate::util::locks::read;

use super::{MemoryCatalog, SOURCE, find_by_id, paginate};

impl MemoryCatalog {
    fn category_in_scope(
        &self,
        category_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError> {
        Self::with_scope(&self.categories, "category", country, locale, |rows| {
            find_by_id(rows, category_id)
        })
    }

    fn section_category_id(
        &self,
        section_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<i64, RepoError> {
        Self::with_scope(&self.sections, "section_category_id", country, locale, |rows| {
            find_by_id(rows, section_id).map(|section| section.category_id)
        })
    }
}

#[async_trait]
impl CategoriesRepo for MemoryCatalog {
    async fn list_categories(&self, query: &ListQuery) -> Result<Listing<Category>, RepoError> {
        Ok(Self::with_scope(
            &self.categories,
            "list_categories",
            query.country,
            query.locale,
            |rows| paginate(rows, query),
        ))
    }

    async fn find_category(
        &self,
        id_or_key_name: &str,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError> {
        let category_id = match parse_id(id_or_key_name) {
            Some(id) => id,
            None => self.category_id_by_key_name(id_or_key_name, country).await?,
        };
        self.category_in_scope(category_id, locale, country)
    }

    async fn category_by_section(
        &self,
        section_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError> {
        let category_id = self.section_category_id(section_id, locale, country)?;
        self.category_in_scope(category_id, locale, country)
    }

    async fn category_by_article(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Category, RepoError> {
        let section_id =
            Self::with_scope(&self.articles, "category_by_article", country, locale, |rows| {
                find_by_id(rows, article_id).map(|article| article.section_id)
            })?;
        self.category_by_section(section_id, locale, country).await
    }

    async fn category_ids(&self, country: CountryCode) -> Result<Vec<i64>, RepoError> {
        let table = read(&self.categories, SOURCE, "category_ids");
        let mut ids: Vec<i64> = table
            .iter()
            .filter(|((row_country, _), _)| *row_country == country)
            .flat_map(|(_, rows)| rows.iter().map(|row| row.id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn category_id_by_key_name(
        &self,
        key_name: &str,
        country: CountryCode,
    ) -> Result<i64, RepoError> {
        let wanted = key_name.trim();
        let table = read(&self.categories, SOURCE, "category_id_by_key_name");
        table
            .iter()
            .filter(|((row_country, _), _)| *row_country == country)
            .flat_map(|(_, rows)| rows.iter())
            .find(|row| !row.key_name.is_empty() && row.key_name.eq_ignore_ascii_case(wanted))
            .map(|row| row.id)
            .ok_or(RepoError::NotFound)
    }
}
