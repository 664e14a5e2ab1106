use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::{join_all, try_join};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::application::error::LoadError;
use crate::application::loader::{
    ArticleParams, ArticlesParams, ArticlesScope, BodySearchParams, CategoriesParams,
    CustomFieldOptionsParams, Paging, RequestContext, SectionParams, SectionsParams,
    SectionsScope, SystemFieldOptionsParams, TicketFieldsParams, TicketFormParams,
    TitleSearchParams, TopArticlesParams,
};
use crate::application::pagination::{PageMeta, PageWindow};
use crate::domain::entities::{
    Article, Category, InstantSearchResult, SearchArticle, Section, TicketField, TicketForm,
};
use crate::domain::error::DomainError;
use crate::domain::types::{CountryCode, Locale, SortBy, SortOrder, VoteDirection};

use super::HttpState;
use super::auth::verify_basic_auth;
use super::error::ApiError;

const DEFAULT_PER_PAGE: i64 = 30;
const DEFAULT_PAGE: i64 = 1;
const DEFAULT_COUNTRY: CountryCode = CountryCode::Sg;
const DEFAULT_LOCALE: Locale = Locale::EnUs;
const FORCE_SYNC_ACCEPTED: &str = "success trigger force sync job";

type Ctx = Extension<Arc<RequestContext>>;

/// Query parameters shared by every read endpoint. Blank values take defaults.
#[derive(Debug, Default, Deserialize)]
pub struct BaseQuery {
    pub country_code: Option<String>,
    pub locale: Option<String>,
    pub per_page: Option<String>,
    pub page: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub label_names: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct BaseParams {
    country: CountryCode,
    locale: Locale,
    paging: Paging,
}

impl BaseQuery {
    fn resolve(&self) -> Result<BaseParams, LoadError> {
        let country = parse_or(self.country_code.as_deref(), DEFAULT_COUNTRY)?;
        let locale = parse_or(self.locale.as_deref(), DEFAULT_LOCALE)?;
        let sort_by = parse_or(self.sort_by.as_deref(), SortBy::Position)?;
        let sort_order = parse_or(self.sort_order.as_deref(), SortOrder::Asc)?;
        let window = PageWindow::normalize(
            number_or(self.per_page.as_deref(), DEFAULT_PER_PAGE),
            number_or(self.page.as_deref(), DEFAULT_PAGE),
        );
        Ok(BaseParams {
            country,
            locale,
            paging: Paging::new(window, sort_by, sort_order),
        })
    }

    fn labels(&self) -> Vec<String> {
        self.label_names
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn search_query(&self) -> String {
        self.query.clone().unwrap_or_default()
    }
}

fn parse_or<T>(raw: Option<&str>, default: T) -> Result<T, LoadError>
where
    T: FromStr<Err = DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => Ok(value.parse()?),
    }
}

/// Unparseable numbers fall back to the default; range clamping happens in `PageWindow`.
fn number_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Serialize)]
struct CategoriesBody<'a> {
    categories: &'a [Category],
    #[serde(flatten)]
    page_meta: PageMeta,
}

#[derive(Serialize)]
struct SectionsBody<'a> {
    sections: &'a [Section],
    #[serde(flatten)]
    page_meta: PageMeta,
}

#[derive(Serialize)]
struct ArticlesBody<'a> {
    articles: &'a [Article],
    #[serde(flatten)]
    page_meta: PageMeta,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    results: &'a [SearchArticle],
    #[serde(flatten)]
    page_meta: PageMeta,
}

#[derive(Serialize)]
struct TicketFormBody {
    ticket_form: TicketFormView,
}

#[derive(Serialize)]
struct TicketFormView {
    #[serde(flatten)]
    form: TicketForm,
    ticket_fields: Vec<TicketField>,
}

pub async fn list_categories(
    Extension(ctx): Ctx,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let page = ctx
        .load_categories(&CategoriesParams {
            country: base.country,
            locale: base.locale,
            paging: base.paging,
        })
        .await?;
    Ok(Json(CategoriesBody {
        categories: &page.categories,
        page_meta: page.page_meta,
    })
    .into_response())
}

pub async fn list_category_sections(
    Extension(ctx): Ctx,
    Path(category_id): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let page = ctx
        .load_sections(&SectionsParams {
            scope: SectionsScope::ByCategory { category_id },
            country: base.country,
            locale: base.locale,
            paging: base.paging,
        })
        .await?;
    Ok(Json(SectionsBody {
        sections: &page.sections,
        page_meta: page.page_meta,
    })
    .into_response())
}

pub async fn list_category_articles(
    Extension(ctx): Ctx,
    Path(category_id): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let scope = ArticlesScope::ByCategory {
        category_id,
        labels: query.labels(),
    };
    articles_response(&ctx, scope, base).await
}

pub async fn list_section_articles(
    Extension(ctx): Ctx,
    Path(section_id): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    articles_response(&ctx, ArticlesScope::BySection { section_id }, base).await
}

async fn articles_response(
    ctx: &RequestContext,
    scope: ArticlesScope,
    base: BaseParams,
) -> Result<Response, ApiError> {
    let page = ctx
        .load_articles(&ArticlesParams {
            scope,
            country: base.country,
            locale: base.locale,
            paging: base.paging,
        })
        .await?;
    Ok(Json(ArticlesBody {
        articles: &page.articles,
        page_meta: page.page_meta,
    })
    .into_response())
}

pub async fn category_id_by_key_name(
    State(state): State<HttpState>,
    Path(key_name): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let category_id = state
        .categories
        .category_id_by_key_name(&key_name, base.country)
        .await
        .map_err(|err| LoadError::from_repo("category_id_by_key_name", &err))?;
    Ok(Json(serde_json::json!({ "category_id": category_id })).into_response())
}

pub async fn get_section(
    Extension(ctx): Ctx,
    Path(section_id): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let section = ctx
        .load_section(&SectionParams {
            section_id,
            country: base.country,
            locale: base.locale,
        })
        .await?;
    Ok(Json(serde_json::json!({ "section": section.as_ref() })).into_response())
}

pub async fn get_article(
    Extension(ctx): Ctx,
    Path(article_id): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let article = ctx
        .load_article(&ArticleParams {
            article_id,
            country: base.country,
            locale: base.locale,
        })
        .await?;
    Ok(Json(serde_json::json!({ "article": article.as_ref() })).into_response())
}

pub async fn top_articles(
    Extension(ctx): Ctx,
    Path(top_n): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let top_n = top_n
        .trim()
        .parse::<i64>()
        .map_err(|_| LoadError::invalid_attribute(format!("top_n `{top_n}` is not a number")))?;
    let articles = ctx
        .load_top_articles(&TopArticlesParams {
            top_n,
            country: base.country,
            locale: base.locale,
        })
        .await?;
    Ok(Json(serde_json::json!({ "articles": articles.as_ref() })).into_response())
}

pub async fn get_ticket_form(
    Extension(ctx): Ctx,
    Path(form_id): Path<String>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let form_params = TicketFormParams {
        form_id: form_id.clone(),
    };
    let fields_params = TicketFieldsParams {
        form_id,
        locale: base.locale,
    };
    let (form, fields) = try_join(
        ctx.load_ticket_form(&form_params),
        ctx.load_ticket_fields(&fields_params),
    )
    .await?;

    let ticket_fields = join_all(fields.iter().map(|field| with_options(&ctx, field)))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(TicketFormBody {
        ticket_form: TicketFormView {
            form: form.as_ref().clone(),
            ticket_fields,
        },
    })
    .into_response())
}

/// Re-attach a field's options through the option loaders so every field batches together.
async fn with_options(ctx: &RequestContext, field: &TicketField) -> Result<TicketField, LoadError> {
    let field_id = field.id.to_string();
    let (custom, system) = try_join(
        ctx.load_custom_field_options(&CustomFieldOptionsParams {
            field_id: field_id.clone(),
        }),
        ctx.load_system_field_options(&SystemFieldOptionsParams { field_id }),
    )
    .await?;
    let mut field = field.clone();
    field.custom_field_options = custom.as_ref().clone();
    field.system_field_options = system.as_ref().clone();
    Ok(field)
}

pub async fn instant_search(
    Extension(ctx): Ctx,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let results = ctx
        .search_title_articles(&TitleSearchParams {
            query: query.search_query(),
            country: base.country,
            locale: base.locale,
        })
        .await?;
    let results: &[InstantSearchResult] = &results;
    Ok(Json(serde_json::json!({ "results": results })).into_response())
}

pub async fn search(
    Extension(ctx): Ctx,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let results = ctx
        .search_body_articles(&BodySearchParams {
            query: query.search_query(),
            country: base.country,
            locale: base.locale,
            paging: base.paging,
        })
        .await?;
    Ok(Json(SearchBody {
        results: &results.articles,
        page_meta: results.page_meta,
    })
    .into_response())
}

pub async fn status() -> Response {
    let server_time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(serde_json::json!({
        "app-version": env!("CARGO_PKG_VERSION"),
        "server-time": server_time,
    }))
    .into_response()
}

pub async fn create_vote(
    State(state): State<HttpState>,
    Path((article_id, value)): Path<(String, String)>,
    Query(query): Query<BaseQuery>,
) -> Result<Response, ApiError> {
    let base = query.resolve()?;
    let article_id = article_id
        .trim()
        .parse::<i64>()
        .map_err(|_| LoadError::not_found(format!("article id `{article_id}` is not a number")))?;
    let direction = VoteDirection::from_str(&value).map_err(LoadError::from)?;

    let vote = state
        .upstream
        .create_vote(article_id, direction, base.country, base.locale)
        .await
        .map_err(|err| LoadError::from_upstream("create_vote", &err))?;
    state
        .examiner
        .sync_article(article_id, base.country, base.locale);
    Ok(Json(serde_json::json!({
        "vote_sum": vote.vote_sum,
        "vote_count": vote.vote_count,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct CreateRequestBody {
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    data: serde_json::Value,
}

pub async fn create_request(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: CreateRequestBody = serde_json::from_slice(&body)
        .map_err(|err| LoadError::invalid_attribute(format!("request body: {err}")))?;
    if body.country_code.trim().is_empty() {
        return Err(LoadError::invalid_attribute("country_code is empty").into());
    }
    let country = CountryCode::from_str(&body.country_code).map_err(LoadError::from)?;

    state
        .upstream
        .create_request(country, &body.data)
        .await
        .map_err(|err| LoadError::invalid_attribute(format!("create_request: {err}")))?;
    Ok(StatusCode::CREATED.into_response())
}

/// Authenticate, then run a full sync in the background and answer immediately.
pub async fn force_sync(
    State(state): State<HttpState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    verify_basic_auth(&headers, state.admin.as_ref())?;

    let examiner = Arc::clone(&state.examiner);
    tokio::spawn(async move {
        let outcomes = examiner.force_sync_all().await;
        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
        info!(scopes = outcomes.len(), failed, "Force sync finished");
    });

    Ok(Json(serde_json::json!({ "status": FORCE_SYNC_ACCEPTED })).into_response())
}
