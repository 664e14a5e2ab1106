//! In-memory catalog backing the read repositories.
//!
//! Rows are grouped per `(country, locale)` and replaced wholesale by the
//! examiner through [`CatalogSync`]. Ticket forms and fields are global.

mod articles;
mod categories;
mod sections;
mod tickets;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::repos::{CatalogSync, ListQuery, Listing, RepoError};
use crate::domain::entities::{Article, Category, Section, TicketField, TicketForm};
use crate::domain::types::{CountryCode, Locale, SortBy, SortOrder};
use crate::util::locks::{read, write};

const SOURCE: &str = "infra::catalog";

type ScopeKey = (CountryCode, Locale);

#[derive(Default)]
pub struct MemoryCatalog {
    categories: RwLock<HashMap<ScopeKey, Vec<Category>>>,
    sections: RwLock<HashMap<ScopeKey, Vec<Section>>>,
    articles: RwLock<HashMap<ScopeKey, Vec<Article>>>,
    /// Click counts per `(country, article_id)`; shared by every locale of an article.
    clicks: DashMap<(CountryCode, i64), i64>,
    tickets: RwLock<TicketCatalog>,
}

#[derive(Default)]
struct TicketCatalog {
    forms: BTreeMap<i64, TicketForm>,
    fields: BTreeMap<i64, TicketField>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn click_count(&self, country: CountryCode, article_id: i64) -> i64 {
        self.clicks
            .get(&(country, article_id))
            .map(|count| *count)
            .unwrap_or(0)
    }

    fn with_scope<T, R>(
        table: &RwLock<HashMap<ScopeKey, Vec<T>>>,
        op: &'static str,
        country: CountryCode,
        locale: Locale,
        f: impl FnOnce(&[T]) -> R,
    ) -> R {
        let guard = read(table, SOURCE, op);
        let rows = guard
            .get(&(country, locale))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        f(rows)
    }
}

/// Columns shared by every sortable help-center row.
pub(crate) trait Sortable: Clone {
    fn id(&self) -> i64;
    fn position(&self) -> i64;
    fn created_at(&self) -> OffsetDateTime;
    fn updated_at(&self) -> OffsetDateTime;
}

macro_rules! sortable {
    ($($ty:ty),+) => {
        $(impl Sortable for $ty {
            fn id(&self) -> i64 {
                self.id
            }
            fn position(&self) -> i64 {
                self.position
            }
            fn created_at(&self) -> OffsetDateTime {
                self.created_at
            }
            fn updated_at(&self) -> OffsetDateTime {
                self.updated_at
            }
        })+
    };
}

sortable!(Category, Section, Article);

/// Sort by the requested column, newest first on ties, then take one offset page.
pub(crate) fn paginate<'a, T: Sortable + 'a>(
    rows: impl IntoIterator<Item = &'a T>,
    query: &ListQuery,
) -> Listing<T> {
    let mut rows: Vec<&T> = rows.into_iter().collect();
    rows.sort_by(|a, b| {
        let primary = match query.sort_by {
            SortBy::Position => a.position().cmp(&b.position()),
            SortBy::CreatedAt => a.created_at().cmp(&b.created_at()),
            SortBy::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
        };
        let primary = match query.sort_order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    });

    let total = i64::try_from(rows.len()).unwrap_or(i64::MAX);
    let offset = usize::try_from(query.offset.max(0)).unwrap_or(usize::MAX);
    let per_page = usize::try_from(query.per_page.max(0)).unwrap_or(0);
    let items = rows
        .into_iter()
        .skip(offset)
        .take(per_page)
        .cloned()
        .collect();
    Listing { items, total }
}

pub(crate) fn find_by_id<T: Sortable>(rows: &[T], id: i64) -> Result<T, RepoError> {
    rows.iter()
        .find(|row| row.id() == id)
        .cloned()
        .ok_or(RepoError::NotFound)
}

fn order_by_position<T: Sortable>(a: &T, b: &T) -> Ordering {
    a.position().cmp(&b.position()).then(a.id().cmp(&b.id()))
}

#[async_trait]
impl CatalogSync for MemoryCatalog {
    async fn replace_categories(
        &self,
        country: CountryCode,
        locale: Locale,
        mut categories: Vec<Category>,
    ) -> Result<(), RepoError> {
        let mut table = write(&self.categories, SOURCE, "replace_categories");
        // Key names are assigned locally and never come from the upstream.
        let known: HashMap<i64, String> = table
            .iter()
            .filter(|((row_country, _), _)| *row_country == country)
            .flat_map(|(_, rows)| rows.iter())
            .filter(|row| !row.key_name.is_empty())
            .map(|row| (row.id, row.key_name.clone()))
            .collect();
        for category in &mut categories {
            if category.key_name.is_empty()
                && let Some(key_name) = known.get(&category.id)
            {
                category.key_name = key_name.clone();
            }
        }
        categories.sort_by(order_by_position);
        debug!(%country, %locale, records = categories.len(), "Replacing categories");
        table.insert((country, locale), categories);
        Ok(())
    }

    async fn replace_sections(
        &self,
        country: CountryCode,
        locale: Locale,
        mut sections: Vec<Section>,
    ) -> Result<(), RepoError> {
        sections.sort_by(order_by_position);
        debug!(%country, %locale, records = sections.len(), "Replacing sections");
        write(&self.sections, SOURCE, "replace_sections").insert((country, locale), sections);
        Ok(())
    }

    async fn replace_articles(
        &self,
        country: CountryCode,
        locale: Locale,
        mut articles: Vec<Article>,
    ) -> Result<(), RepoError> {
        articles.sort_by(order_by_position);
        debug!(%country, %locale, records = articles.len(), "Replacing articles");
        write(&self.articles, SOURCE, "replace_articles").insert((country, locale), articles);
        Ok(())
    }

    async fn upsert_article(
        &self,
        country: CountryCode,
        locale: Locale,
        article: Article,
    ) -> Result<(), RepoError> {
        let mut table = write(&self.articles, SOURCE, "upsert_article");
        let rows = table.entry((country, locale)).or_default();
        debug!(%country, %locale, article_id = article.id, "Upserting article");
        match rows.iter_mut().find(|row| row.id == article.id) {
            Some(row) => *row = article,
            None => {
                rows.push(article);
                rows.sort_by(order_by_position);
            }
        }
        Ok(())
    }

    async fn replace_ticket_forms(
        &self,
        forms: Vec<TicketForm>,
        fields: Vec<TicketField>,
    ) -> Result<(), RepoError> {
        let mut tickets = write(&self.tickets, SOURCE, "replace_ticket_forms");
        tickets.forms = forms.into_iter().map(|form| (form.id, form)).collect();
        tickets.fields = fields.into_iter().map(|field| (field.id, field)).collect();
        debug!(
            forms = tickets.forms.len(),
            fields = tickets.fields.len(),
            "Replacing ticket forms"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::fixtures::*;
    use super::*;

    #[test]
    fn paginate_sorts_and_slices() {
        let rows = vec![category(3, 3, ""), category(1, 1, ""), category(2, 2, "")];

        let listing = paginate(&rows, &query(2, 1));
        assert_eq!(listing.total, 3);
        let ids: Vec<_> = listing.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn paginate_breaks_ties_by_newest_first() {
        let mut older = category(1, 1, "");
        older.created_at = datetime!(2023-01-01 00:00 UTC);
        let newer = category(2, 1, "");

        let listing = paginate(&[older, newer], &query(10, 0));
        let ids: Vec<_> = listing.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn paginate_descending_by_updated_at() {
        let mut first = category(1, 1, "");
        first.updated_at = datetime!(2024-03-01 00:00 UTC);
        let mut second = category(2, 2, "");
        second.updated_at = datetime!(2024-05-01 00:00 UTC);

        let mut q = query(10, 0);
        q.sort_by = SortBy::UpdatedAt;
        q.sort_order = SortOrder::Desc;
        let listing = paginate(&[first, second], &q);
        assert_eq!(listing.items[0].id, 2);
    }

    #[tokio::test]
    async fn replacing_categories_keeps_local_key_names() {
        let catalog = MemoryCatalog::new();
        catalog
            .replace_categories(CountryCode::Tw, Locale::EnUs, vec![category(7, 1, "faq")])
            .await
            .expect("seed");
        catalog
            .replace_categories(CountryCode::Tw, Locale::ZhTw, vec![category(7, 1, "")])
            .await
            .expect("replace");

        let zh = MemoryCatalog::with_scope(
            &catalog.categories,
            "test",
            CountryCode::Tw,
            Locale::ZhTw,
            |rows| rows.to_vec(),
        );
        assert_eq!(zh[0].key_name, "faq");
    }
}
