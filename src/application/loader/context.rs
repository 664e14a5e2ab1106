use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::application::error::LoadError;
use crate::domain::entities::{
    Article, Category, CustomFieldOption, InstantSearchResult, Section, SystemFieldOption,
    TicketField, TicketForm,
};

use super::batch::{BatchContext, BatchedLoader, LoadResult};
use super::cancel::CancelToken;
use super::fingerprint::Fingerprint;
use super::output::{ArticlesPage, CategoriesPage, SearchResults, SectionsPage};
use super::params::{
    ArticleParams, ArticlesParams, BodySearchParams, CategoriesParams, CategoryParams,
    CustomFieldOptionsParams, LoaderParams, SectionParams, SectionsParams,
    SystemFieldOptionsParams, TicketFieldsParams, TicketFormParams, TitleSearchParams,
    TopArticlesParams,
};
use super::registry::{LoaderName, LoaderRegistry};

/// Per-request loader state. Dropping the context cancels every pending load.
pub struct RequestContext {
    request_id: Uuid,
    loaders: HashMap<LoaderName, BatchedLoader>,
    cancel: CancelToken,
    deadline: Option<JoinHandle<()>>,
}

impl RequestContext {
    pub fn new(registry: &LoaderRegistry) -> Self {
        let cancel = CancelToken::new();
        let batch_context = BatchContext::new(cancel.clone());
        let dispatch = registry.dispatch();
        let loaders = LoaderName::ALL
            .iter()
            .filter_map(|name| {
                registry.function(*name).map(|function| {
                    (
                        *name,
                        BatchedLoader::new(*name, function, dispatch, batch_context.clone()),
                    )
                })
            })
            .collect();

        Self {
            request_id: Uuid::new_v4(),
            loaders,
            cancel,
            deadline: None,
        }
    }

    /// Cancel the context once `timeout` elapses. Requires a Tokio runtime.
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        let cancel = self.cancel.clone();
        let request_id = self.request_id;
        if let Some(previous) = self.deadline.take() {
            previous.abort();
        }
        self.deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!(%request_id, ?timeout, "Request context deadline reached");
            cancel.cancel();
        }));
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fingerprint `params` and enqueue it on the loader bound to `P`.
    ///
    /// Enqueueing happens before this returns, so several calls made before
    /// the first await land in the same batch.
    pub fn load<P>(
        &self,
        params: &P,
    ) -> impl Future<Output = Result<Arc<P::Output>, LoadError>> + Send + use<P>
    where
        P: LoaderParams,
    {
        let enqueued = self.enqueue(P::NAME, params);
        async move {
            let value = enqueued?.await?;
            let shape = value.shape();
            P::extract(value).ok_or_else(|| {
                LoadError::config(format!(
                    "loader `{}` produced a `{shape}` value",
                    P::NAME
                ))
            })
        }
    }

    fn enqueue<P>(
        &self,
        name: LoaderName,
        params: &P,
    ) -> Result<impl Future<Output = LoadResult> + Send + use<P>, LoadError>
    where
        P: LoaderParams,
    {
        let loader = self
            .loaders
            .get(&name)
            .ok_or_else(|| LoadError::config(format!("no loader registered for `{name}`")))?;
        let key = Fingerprint::of(name, params)?;
        Ok(loader.load(key))
    }

    pub fn load_categories(
        &self,
        params: &CategoriesParams,
    ) -> impl Future<Output = Result<Arc<CategoriesPage>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_category(
        &self,
        params: &CategoryParams,
    ) -> impl Future<Output = Result<Arc<Category>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_sections(
        &self,
        params: &SectionsParams,
    ) -> impl Future<Output = Result<Arc<SectionsPage>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_section(
        &self,
        params: &SectionParams,
    ) -> impl Future<Output = Result<Arc<Section>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_articles(
        &self,
        params: &ArticlesParams,
    ) -> impl Future<Output = Result<Arc<ArticlesPage>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_article(
        &self,
        params: &ArticleParams,
    ) -> impl Future<Output = Result<Arc<Article>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_top_articles(
        &self,
        params: &TopArticlesParams,
    ) -> impl Future<Output = Result<Arc<Vec<Article>>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_ticket_form(
        &self,
        params: &TicketFormParams,
    ) -> impl Future<Output = Result<Arc<TicketForm>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_ticket_fields(
        &self,
        params: &TicketFieldsParams,
    ) -> impl Future<Output = Result<Arc<Vec<TicketField>>, LoadError>> + Send + use<> {
        self.load(params)
    }

    pub fn load_custom_field_options(
        &self,
        params: &CustomFieldOptionsParams,
    ) -> impl Future<Output = Result<Arc<Vec<CustomFieldOption>>, LoadError>> + Send + use<>
    {
        self.load(params)
    }

    pub fn load_system_field_options(
        &self,
        params: &SystemFieldOptionsParams,
    ) -> impl Future<Output = Result<Arc<Vec<SystemFieldOption>>, LoadError>> + Send + use<>
    {
        self.load(params)
    }

    pub fn search_title_articles(
        &self,
        params: &TitleSearchParams,
    ) -> impl Future<Output = Result<Arc<Vec<InstantSearchResult>>, LoadError>> + Send + use<>
    {
        self.load(params)
    }

    pub fn search_body_articles(
        &self,
        params: &BodySearchParams,
    ) -> impl Future<Output = Result<Arc<SearchResults>, LoadError>> + Send + use<> {
        self.load(params)
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(deadline) = self.deadline.take() {
            deadline.abort();
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("loaders", &self.loaders.len())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
