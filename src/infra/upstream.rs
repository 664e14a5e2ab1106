//! HTTP client for the help-center backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode, header};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::upstream::{SearchHit, SearchPage, SearchRequest, Upstream, UpstreamError};
use crate::config::UpstreamSettings;
use crate::domain::entities::{
    Article, Category, InstantSearchResult, Section, TicketField, TicketForm, Vote,
};
use crate::domain::types::{CountryCode, Locale, VoteDirection};

use super::error::InfraError;

const LIST_PER_PAGE: &str = "100";
/// Ticket endpoints answer identically for every country; this one is asked.
const TICKETS_COUNTRY: CountryCode = CountryCode::Tw;

pub struct HelpCenterClient {
    client: Client,
    auth_token: Option<String>,
    base_urls: BTreeMap<CountryCode, Url>,
}

impl HelpCenterClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("helpgate/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            auth_token: settings.auth_token.clone(),
            base_urls: settings.base_urls.clone(),
        })
    }

    fn endpoint(&self, country: CountryCode, path: &str) -> Result<Url, UpstreamError> {
        let base = self
            .base_urls
            .get(&country)
            .ok_or(UpstreamError::UnknownCountry(country))?;
        base.join(path)
            .map_err(|err| UpstreamError::Transport(format!("invalid endpoint `{path}`: {err}")))
    }

    /// The token is stored pre-encoded and sent as basic credentials.
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, UpstreamError> {
        let Some(token) = self.auth_token.as_deref() else {
            return Ok(request);
        };
        let value = HeaderValue::from_str(&format!("Basic {token}"))
            .map_err(|err| UpstreamError::Transport(format!("invalid auth token: {err}")))?;
        Ok(request.header(header::AUTHORIZATION, value))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        expect: StatusCode,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = request
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if status.as_u16() != expect.as_u16() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        expect: StatusCode,
    ) -> Result<T, UpstreamError> {
        self.send(request, expect)
            .await?
            .json::<T>()
            .await
            .map_err(map_reqwest_error)
    }

    /// Follow `next_page` links until exhausted, forcing the page size on every hop.
    async fn list_all<P: Paged>(
        &self,
        first: Url,
        authenticated: bool,
    ) -> Result<Vec<P::Item>, UpstreamError> {
        let mut items = Vec::new();
        let mut next = Some(with_page_size(first));
        while let Some(url) = next.take() {
            let mut request = self.client.get(url);
            if authenticated {
                request = self.authorized(request)?;
            }
            let page: P = self.fetch(request, StatusCode::OK).await?;
            let (mut batch, next_page) = page.into_parts();
            items.append(&mut batch);
            next = match next_page.filter(|link| !link.is_empty()) {
                Some(link) => Some(with_page_size(Url::parse(&link).map_err(|err| {
                    UpstreamError::Decode(format!("invalid next_page `{link}`: {err}"))
                })?)),
                None => None,
            };
        }
        debug!(records = items.len(), "Fetched paged upstream listing");
        Ok(items)
    }
}

fn with_page_size(mut url: Url) -> Url {
    if !url.query_pairs().any(|(key, _)| key == "per_page") {
        url.query_pairs_mut().append_pair("per_page", LIST_PER_PAGE);
    }
    url
}

fn map_reqwest_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(err.to_string())
    } else if err.is_decode() {
        UpstreamError::Decode(err.to_string())
    } else {
        UpstreamError::Transport(err.to_string())
    }
}

trait Paged: DeserializeOwned {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

macro_rules! paged {
    ($name:ident, $field:ident, $item:ty) => {
        #[derive(Debug, Deserialize)]
        struct $name {
            #[serde(default)]
            $field: Vec<$item>,
            #[serde(default)]
            next_page: Option<String>,
        }

        impl Paged for $name {
            type Item = $item;

            fn into_parts(self) -> (Vec<$item>, Option<String>) {
                (self.$field, self.next_page)
            }
        }
    };
}

paged!(CategoriesPayload, categories, Category);
paged!(SectionsPayload, sections, Section);
paged!(ArticlesPayload, articles, Article);
paged!(TicketFormsPayload, ticket_forms, TicketForm);
paged!(TicketFieldsPayload, ticket_fields, TicketField);

#[derive(Debug, Deserialize)]
struct ShowArticlePayload {
    article: Article,
}

#[derive(Debug, Deserialize)]
struct InstantSearchPayload {
    #[serde(default)]
    results: Vec<InstantSearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResultPayload {
    #[serde(flatten)]
    article: Article,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    results: Vec<SearchResultPayload>,
    #[serde(default)]
    page: i64,
    #[serde(default)]
    per_page: i64,
    #[serde(default)]
    page_count: i64,
    #[serde(default)]
    count: i64,
}

impl From<SearchPayload> for SearchPage {
    fn from(payload: SearchPayload) -> Self {
        Self {
            hits: payload
                .results
                .into_iter()
                .map(|result| SearchHit {
                    article: result.article,
                    snippet: result.snippet,
                })
                .collect(),
            page: payload.page,
            per_page: payload.per_page,
            page_count: payload.page_count,
            count: payload.count,
        }
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl Upstream for HelpCenterClient {
    async fn instant_search(
        &self,
        query: &str,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<InstantSearchResult>, UpstreamError> {
        let url = self.endpoint(country, "/hc/api/internal/instant_search.json")?;
        let request = self
            .client
            .get(url)
            .query(&[("locale", locale.as_str()), ("query", query)]);
        let payload: InstantSearchPayload = self.fetch(request, StatusCode::OK).await?;
        Ok(payload.results)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, UpstreamError> {
        let url = self.endpoint(request.country, "/api/v2/help_center/articles/search.json")?;
        let mut params = vec![
            ("per_page", request.per_page.to_string()),
            ("page", request.page.to_string()),
            ("sort_order", request.sort_order.as_str().to_string()),
            ("locale", request.locale.as_str().to_string()),
            ("query", request.query.clone()),
        ];
        if !request.category_ids.is_empty() {
            params.push(("category", join_ids(&request.category_ids)));
        }
        let payload: SearchPayload = self
            .fetch(self.client.get(url).query(&params), StatusCode::OK)
            .await?;
        Ok(payload.into())
    }

    async fn create_vote(
        &self,
        article_id: i64,
        direction: VoteDirection,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vote, UpstreamError> {
        let path = format!("/hc/{}/articles/{article_id}/vote", locale.as_str());
        let url = self.endpoint(country, &path)?;
        let request = self
            .client
            .post(url)
            .form(&[("value", direction.as_str())]);
        self.fetch(request, StatusCode::OK).await
    }

    async fn show_article(
        &self,
        article_id: i64,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Article, UpstreamError> {
        let path = format!(
            "/api/v2/help_center/{}/articles/{article_id}.json",
            locale.as_str()
        );
        let url = self.endpoint(country, &path)?;
        let payload: ShowArticlePayload = self.fetch(self.client.get(url), StatusCode::OK).await?;
        Ok(payload.article)
    }

    async fn create_request(
        &self,
        country: CountryCode,
        payload: &serde_json::Value,
    ) -> Result<(), UpstreamError> {
        let url = self.endpoint(country, "/api/v2/requests.json")?;
        let request = self.authorized(self.client.post(url).json(payload))?;
        self.send(request, StatusCode::CREATED).await?;
        Ok(())
    }

    async fn list_categories(
        &self,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<Category>, UpstreamError> {
        let path = format!("/api/v2/help_center/{}/categories.json?page=1", locale.as_str());
        self.list_all::<CategoriesPayload>(self.endpoint(country, &path)?, false)
            .await
    }

    async fn list_sections(
        &self,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<Section>, UpstreamError> {
        let path = format!("/api/v2/help_center/{}/sections.json?page=1", locale.as_str());
        self.list_all::<SectionsPayload>(self.endpoint(country, &path)?, false)
            .await
    }

    async fn list_articles(
        &self,
        country: CountryCode,
        locale: Locale,
    ) -> Result<Vec<Article>, UpstreamError> {
        let path = format!("/api/v2/help_center/{}/articles.json?page=1", locale.as_str());
        self.list_all::<ArticlesPayload>(self.endpoint(country, &path)?, false)
            .await
    }

    async fn list_ticket_forms(&self) -> Result<Vec<TicketForm>, UpstreamError> {
        let url = self.endpoint(TICKETS_COUNTRY, "/api/v2/ticket_forms.json")?;
        self.list_all::<TicketFormsPayload>(url, true).await
    }

    async fn list_ticket_fields(&self) -> Result<Vec<TicketField>, UpstreamError> {
        let url = self.endpoint(TICKETS_COUNTRY, "/api/v2/ticket_fields.json")?;
        self.list_all::<TicketFieldsPayload>(url, true).await
    }
}
