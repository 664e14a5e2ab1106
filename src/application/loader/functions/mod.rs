//! Batch functions, one per loader name.
//!
//! Every function follows the same skeleton per key: decode the fingerprint,
//! validate, arm the freshness hook, probe the value cache, call the service
//! on a miss, shape the output and write it back. Keys run in their own tasks.

mod articles;
mod categories;
mod search;
mod sections;
mod tickets;

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::application::error::LoadError;
use crate::application::examiner::{ExaminerFamily, FreshnessHook};
use crate::application::repos::{
    ArticlesRepo, CategoriesRepo, SectionsRepo, TicketsRepo, ValueCache,
};
use crate::application::upstream::Upstream;
use crate::cache::{CacheKey, CacheScope};

use super::batch::{BatchContext, LoadResult};
use super::fingerprint::Fingerprint;
use super::params::LoaderParams;

pub use articles::{ArticleLoader, ArticlesLoader, TopArticlesLoader};
pub use categories::{CategoriesLoader, CategoryLoader};
pub use search::{BodySearchLoader, TitleSearchLoader};
pub use sections::{SectionLoader, SectionsLoader};
pub use tickets::{
    CustomFieldOptionsLoader, SystemFieldOptionsLoader, TicketFieldsLoader, TicketFormLoader,
};

const METRIC_CACHE_HIT: &str = "helpgate_loader_cache_hit_total";
const METRIC_CACHE_MISS: &str = "helpgate_loader_cache_miss_total";

/// Service adapters shared by every batch function.
#[derive(Clone)]
pub struct LoaderDeps {
    pub categories: Arc<dyn CategoriesRepo>,
    pub sections: Arc<dyn SectionsRepo>,
    pub articles: Arc<dyn ArticlesRepo>,
    pub tickets: Arc<dyn TicketsRepo>,
    pub cache: Arc<dyn ValueCache>,
    pub upstream: Arc<dyn Upstream>,
    pub hook: Arc<dyn FreshnessHook>,
}

/// Declares a batch function whose keys are resolved independently by `$per_key`.
macro_rules! keyed_loader {
    ($loader:ident, $params:ty, $per_key:path) => {
        #[derive(Clone)]
        pub struct $loader {
            deps: $crate::application::loader::functions::LoaderDeps,
        }

        impl $loader {
            pub fn new(deps: $crate::application::loader::functions::LoaderDeps) -> Self {
                Self { deps }
            }
        }

        #[::async_trait::async_trait]
        impl $crate::application::loader::batch::BatchFn for $loader {
            async fn load_batch(
                &self,
                ctx: &$crate::application::loader::batch::BatchContext,
                keys: &[$crate::application::loader::fingerprint::Fingerprint],
            ) -> Vec<$crate::application::loader::batch::LoadResult> {
                $crate::application::loader::functions::fan_out::<$params, _, _>(
                    ctx,
                    keys,
                    |key, params| $per_key(self.deps.clone(), key, params),
                )
                .await
            }
        }
    };
}

pub(crate) use keyed_loader;

enum Slot {
    Running(JoinHandle<LoadResult>),
    Rejected(LoadError),
}

/// Resolve each key in its own task and collect the results in input order.
pub(crate) async fn fan_out<P, F, Fut>(
    ctx: &BatchContext,
    keys: &[Fingerprint],
    per_key: F,
) -> Vec<LoadResult>
where
    P: LoaderParams,
    F: Fn(Fingerprint, P) -> Fut,
    Fut: Future<Output = LoadResult> + Send + 'static,
{
    let slots: Vec<Slot> = keys
        .iter()
        .map(|key| match key.decode::<P>(P::NAME) {
            Ok(params) => Slot::Running(tokio::spawn(per_key(key.clone(), params))),
            Err(err) => Slot::Rejected(err),
        })
        .collect();

    let mut results = Vec::with_capacity(slots.len());
    for slot in slots {
        let result = match slot {
            Slot::Rejected(err) => Err(err),
            Slot::Running(handle) => match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    error!(loader = %P::NAME, error = %join_error, "Loader key task failed");
                    Err(LoadError::internal(format!(
                        "loader `{}` key task failed: {join_error}",
                        P::NAME
                    )))
                }
            },
        };
        results.push(ctx.settle(result));
    }
    results
}

/// Return the cached payload for `key`, or fetch, store and return it.
pub(crate) async fn cached_or_fetch<T, F, Fut>(
    cache: &dyn ValueCache,
    key: CacheKey,
    fetch: F,
) -> Result<T, LoadError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, LoadError>>,
{
    let family = key.family.as_str();
    if let Some(payload) = cache.get(&key).await {
        counter!(METRIC_CACHE_HIT, "family" => family).increment(1);
        return serde_json::from_str(&payload).map_err(|err| {
            LoadError::serialization(format!("cached `{family}` payload: {err}"))
        });
    }
    counter!(METRIC_CACHE_MISS, "family" => family).increment(1);

    let value = fetch().await?;
    match serde_json::to_string(&value) {
        Ok(payload) => cache.set(key, payload).await,
        Err(err) => warn!(family, error = %err, "Skipping cache write for unserializable value"),
    }
    Ok(value)
}

/// Fires the freshness hook when dropped, on every exit path.
pub(crate) struct FreshnessGuard {
    hook: Arc<dyn FreshnessHook>,
    family: ExaminerFamily,
    scope: CacheScope,
}

impl FreshnessGuard {
    pub(crate) fn arm(hook: &Arc<dyn FreshnessHook>, family: ExaminerFamily, scope: CacheScope) -> Self {
        Self {
            hook: Arc::clone(hook),
            family,
            scope,
        }
    }
}

impl Drop for FreshnessGuard {
    fn drop(&mut self) {
        self.hook.check(self.family, self.scope);
    }
}
