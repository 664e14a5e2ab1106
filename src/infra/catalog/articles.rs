use std::cmp::Reverse;

use async_trait::async_trait;

use crate::application::repos::{ArticlesRepo, ListQuery, Listing, RepoError};
use crate::domain::entities::Article;
use crate::domain::types::{CountryCode, Locale};

use super::{MemoryCatalog, find_by_id, paginate};

/// An article matches when any requested label is contained in any of its labels.
fn matches_labels(article: &Article, labels: &[String]) -> bool {
    labels.is_empty()
        || labels.iter().any(|wanted| {
            article
                .label_names
                .iter()
                .any(|label| label.contains(wanted.as_str()))
        })
}

#[async_trait]
impl ArticlesRepo for MemoryCatalog {
    async fn list_articles(&self, query: &ListQuery) -> Result<Listing<Article>, RepoError> {
        Ok(Self::with_scope(
            &self.articles,
            "list_articles",
            query.country,
            query.locale,
            |rows| paginate(rows, query),
        ))
    }

    async fn list_articles_by_category(
        &self,
        category_id: i64,
        labels: &[String],
        query: &ListQuery,
    ) -> Result<Listing<Article>, RepoError> {
        let section_ids: Vec<i64> = Self::with_scope(
            &self.sections,
            "list_articles_by_category.sections",
            query.country,
            query.locale,
            |rows| {
                rows.iter()
                    .filter(|section| section.category_id == category_id)
                    .map(|section| section.id)
                    .collect()
            },
        );
        Ok(Self::with_scope(
            &self.articles,
            "list_articles_by_category",
            query.country,
            query.locale,
            |rows| {
                paginate(
                    rows.iter().filter(|article| {
                        section_ids.contains(&article.section_id) && matches_labels(article, labels)
                    }),
                    query,
                )
            },
        ))
    }

    async fn list_articles_by_section(
        &self,
        section_id: i64,
        query: &ListQuery,
    ) -> Result<Listing<Article>, RepoError> {
        Ok(Self::with_scope(
            &self.articles,
            "list_articles_by_section",
            query.country,
            query.locale,
            |rows| {
                paginate(
                    rows.iter().filter(|article| article.section_id == section_id),
                    query,
                )
            },
        ))
    }

    async fn find_article(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Article, RepoError> {
        Self::with_scope(&self.articles, "find_article", country, locale, |rows| {
            find_by_id(rows, article_id)
        })
    }

    async fn top_articles(
        &self,
        top_n: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<Vec<Article>, RepoError> {
        let limit = usize::try_from(top_n.max(0)).unwrap_or(usize::MAX);
        let mut ranked = Self::with_scope(&self.articles, "top_articles", country, locale, |rows| {
            rows.iter()
                .map(|article| (self.click_count(country, article.id), article.clone()))
                .collect::<Vec<_>>()
        });
        ranked.sort_by_key(|(clicks, article)| {
            (Reverse(article.promoted), Reverse(*clicks), article.position, article.id)
        });
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(_, article)| article)
            .collect())
    }

    async fn increment_click_counter(
        &self,
        article_id: i64,
        locale: Locale,
        country: CountryCode,
    ) -> Result<(), RepoError> {
        self.find_article(article_id, locale, country).await?;
        *self.clicks.entry((country, article_id)).or_insert(0) += 1;
        Ok(())
    }
}
