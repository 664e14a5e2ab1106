//! Background freshness checks for cached catalog scopes.
//!
//! Loaders report every served scope through [`FreshnessHook::check`]. The
//! examiner counts reports per `(family, scope)` on a bounded worker pool and,
//! once a family's refresh limit is reached, re-pulls the scope from upstream.
//! Votes queue a refresh of the single voted article on the same pool.

mod policy;
mod sync;

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::application::repos::RepoError;
use crate::application::upstream::UpstreamError;
use crate::cache::CacheScope;
use crate::domain::error::DomainError;
use crate::domain::types::{CountryCode, Locale};

pub use policy::{RefreshLimits, should_refresh};
pub use sync::{CatalogRefresher, SyncReport};

use policy::{Counters, ScopeLocks};

const METRIC_EXAMINER_DROPPED: &str = "helpgate_examiner_dropped_total";
const METRIC_EXAMINER_SYNC: &str = "helpgate_examiner_sync_total";

/// Called by loaders on scope exit. Must not block.
pub trait FreshnessHook: Send + Sync {
    fn check(&self, family: ExaminerFamily, scope: CacheScope);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExaminerFamily {
    Categories,
    Sections,
    Articles,
    TicketForms,
}

impl ExaminerFamily {
    pub const ALL: [ExaminerFamily; 4] = [
        ExaminerFamily::Categories,
        ExaminerFamily::Sections,
        ExaminerFamily::Articles,
        ExaminerFamily::TicketForms,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExaminerFamily::Categories => "categories",
            ExaminerFamily::Sections => "sections",
            ExaminerFamily::Articles => "articles",
            ExaminerFamily::TicketForms => "ticket_forms",
        }
    }

    pub fn is_global(self) -> bool {
        matches!(self, ExaminerFamily::TicketForms)
    }
}

impl fmt::Display for ExaminerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExaminerFamily {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ExaminerFamily::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| DomainError::unknown("family", value))
    }
}

#[derive(Debug, Error)]
pub enum ExaminerError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Catalog(#[from] RepoError),
    #[error("upstream returned no {family} records")]
    EmptyListing { family: ExaminerFamily },
    #[error("{family} cannot be synced for scope {scope}")]
    ScopeMismatch {
        family: ExaminerFamily,
        scope: CacheScope,
    },
    #[error("{family} sync for {scope} is already running")]
    SyncInProgress {
        family: ExaminerFamily,
        scope: CacheScope,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExaminerConfig {
    pub max_worker_size: NonZeroUsize,
    pub max_pool_size: NonZeroUsize,
    pub limits: RefreshLimits,
}

impl From<&crate::config::ExaminerSettings> for ExaminerConfig {
    fn from(settings: &crate::config::ExaminerSettings) -> Self {
        Self {
            max_worker_size: settings.max_worker_size,
            max_pool_size: settings.max_pool_size,
            limits: RefreshLimits {
                categories: settings.categories_refresh_limit,
                sections: settings.sections_refresh_limit,
                articles: settings.articles_refresh_limit,
                ticket_forms: settings.ticket_forms_refresh_limit,
            },
        }
    }
}

/// What a single examination did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Examination {
    /// Counter bumped, limit not reached.
    Counted(i64),
    /// Another worker is already refreshing this scope.
    Busy,
    Refreshed(SyncReport),
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Check {
        family: ExaminerFamily,
        scope: CacheScope,
    },
    Article {
        article_id: i64,
        country: CountryCode,
        locale: Locale,
    },
}

impl Task {
    fn family(&self) -> ExaminerFamily {
        match self {
            Task::Check { family, .. } => *family,
            Task::Article { .. } => ExaminerFamily::Articles,
        }
    }
}

struct Shared {
    refresher: CatalogRefresher,
    limits: RefreshLimits,
    counters: Counters,
    locks: ScopeLocks,
}

pub struct Examiner {
    tasks: mpsc::Sender<Task>,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Examiner {
    /// Start the worker pool. Requires a Tokio runtime.
    pub fn spawn(config: ExaminerConfig, refresher: CatalogRefresher) -> Self {
        let (tasks, receiver) = mpsc::channel(config.max_pool_size.get());
        let receiver = Arc::new(Mutex::new(receiver));
        let shared = Arc::new(Shared {
            refresher,
            limits: config.limits,
            counters: Counters::default(),
            locks: ScopeLocks::default(),
        });

        let workers = (0..config.max_worker_size.get())
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&shared),
                    Arc::clone(&receiver),
                ))
            })
            .collect();

        Self {
            tasks,
            shared,
            workers,
        }
    }

    /// Count one load of `(family, scope)` and refresh it if the limit is reached.
    pub async fn examine(
        &self,
        family: ExaminerFamily,
        scope: CacheScope,
    ) -> Result<Examination, ExaminerError> {
        self.shared.examine(family, scope).await
    }

    /// Refresh immediately, bypassing the counters.
    pub async fn force_sync(
        &self,
        family: ExaminerFamily,
        scope: CacheScope,
    ) -> Result<SyncReport, ExaminerError> {
        self.shared.sync(family, scope).await
    }

    /// Refresh every family for every supported country and locale.
    ///
    /// Failures are logged per scope and do not stop the remaining scopes.
    pub async fn force_sync_all(&self) -> Vec<Result<SyncReport, ExaminerError>> {
        let mut outcomes = Vec::new();
        for country in CountryCode::ALL {
            for locale in country.supported_locales() {
                let scope = CacheScope::localized(country, *locale);
                for family in ExaminerFamily::ALL.into_iter().filter(|f| !f.is_global()) {
                    outcomes.push(self.force_sync_logged(family, scope).await);
                }
            }
        }
        outcomes.push(
            self.force_sync_logged(ExaminerFamily::TicketForms, CacheScope::Global)
                .await,
        );
        outcomes
    }

    async fn force_sync_logged(
        &self,
        family: ExaminerFamily,
        scope: CacheScope,
    ) -> Result<SyncReport, ExaminerError> {
        let outcome = self.force_sync(family, scope).await;
        if let Err(err) = &outcome {
            error!(family = %family, scope = %scope, error = %err, "Force sync failed");
        }
        outcome
    }

    /// Queue a refresh of a single article. Never blocks; drops the task when the queue is full.
    pub fn sync_article(&self, article_id: i64, country: CountryCode, locale: Locale) {
        self.enqueue(Task::Article {
            article_id,
            country,
            locale,
        });
    }

    /// Refresh a single article immediately.
    pub async fn force_sync_article(
        &self,
        article_id: i64,
        country: CountryCode,
        locale: Locale,
    ) -> Result<SyncReport, ExaminerError> {
        self.shared
            .sync_article(article_id, CacheScope::localized(country, locale))
            .await
    }

    fn enqueue(&self, task: Task) {
        match self.tasks.try_send(task) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(task)) => {
                counter!(METRIC_EXAMINER_DROPPED, "family" => task.family().as_str()).increment(1);
                debug!(?task, "Examiner queue full, dropping task");
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                warn!(?task, "Examiner is shut down, dropping task");
            }
        }
    }

    pub fn pending_count(&self, family: ExaminerFamily, scope: CacheScope) -> i64 {
        self.shared.counters.get(family, scope)
    }

    /// Stop accepting checks and wait for queued ones to finish.
    pub async fn shutdown(self) {
        let Self { tasks, workers, .. } = self;
        drop(tasks);
        for worker in workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "Examiner worker ended abnormally");
            }
        }
    }
}

impl FreshnessHook for Examiner {
    fn check(&self, family: ExaminerFamily, scope: CacheScope) {
        self.enqueue(Task::Check { family, scope });
    }
}

impl Shared {
    async fn examine(
        &self,
        family: ExaminerFamily,
        scope: CacheScope,
    ) -> Result<Examination, ExaminerError> {
        let count = self.counters.increment(family, scope);
        if !should_refresh(self.limits.limit(family), count) {
            return Ok(Examination::Counted(count));
        }

        match self.sync(family, scope).await {
            Ok(report) => Ok(Examination::Refreshed(report)),
            Err(ExaminerError::SyncInProgress { .. }) => Ok(Examination::Busy),
            Err(err) => Err(err),
        }
    }

    async fn sync(
        &self,
        family: ExaminerFamily,
        scope: CacheScope,
    ) -> Result<SyncReport, ExaminerError> {
        let Some(_lock) = self.locks.try_acquire(family, scope) else {
            counter!(METRIC_EXAMINER_SYNC, "family" => family.as_str(), "result" => "busy")
                .increment(1);
            return Err(ExaminerError::SyncInProgress { family, scope });
        };

        let outcome = self.refresher.refresh(family, scope).await;
        let result = if outcome.is_ok() { "ok" } else { "error" };
        counter!(METRIC_EXAMINER_SYNC, "family" => family.as_str(), "result" => result)
            .increment(1);
        if outcome.is_ok() {
            self.counters.reset(family, scope);
        }
        outcome
    }

    /// Holds the same scope lock as an articles listing sync.
    async fn sync_article(
        &self,
        article_id: i64,
        scope: CacheScope,
    ) -> Result<SyncReport, ExaminerError> {
        let family = ExaminerFamily::Articles;
        let CacheScope::Localized { country, locale } = scope else {
            return Err(ExaminerError::ScopeMismatch { family, scope });
        };
        let Some(_lock) = self.locks.try_acquire(family, scope) else {
            counter!(METRIC_EXAMINER_SYNC, "family" => "article", "result" => "busy")
                .increment(1);
            return Err(ExaminerError::SyncInProgress { family, scope });
        };

        let outcome = self
            .refresher
            .refresh_article(article_id, country, locale)
            .await;
        let result = if outcome.is_ok() { "ok" } else { "error" };
        counter!(METRIC_EXAMINER_SYNC, "family" => "article", "result" => result).increment(1);
        outcome
    }

    async fn run(&self, worker_id: usize, task: Task) {
        match task {
            Task::Check { family, scope } => match self.examine(family, scope).await {
                Ok(Examination::Refreshed(report)) => {
                    debug!(worker_id, family = %family, scope = %scope, records = report.records, "Examiner refreshed scope");
                }
                Ok(_) => {}
                Err(err) => {
                    error!(worker_id, family = %family, scope = %scope, error = %err, "Examiner refresh failed");
                }
            },
            Task::Article {
                article_id,
                country,
                locale,
            } => {
                let scope = CacheScope::localized(country, locale);
                match self.sync_article(article_id, scope).await {
                    Ok(_) => {
                        debug!(worker_id, article_id, scope = %scope, "Examiner refreshed article");
                    }
                    Err(ExaminerError::SyncInProgress { .. }) => {
                        debug!(worker_id, article_id, scope = %scope, "Articles sync already running, skipping article");
                    }
                    Err(err) => {
                        error!(worker_id, article_id, scope = %scope, error = %err, "Examiner article refresh failed");
                    }
                }
            }
        }
    }
}

async fn run_worker(
    worker_id: usize,
    shared: Arc<Shared>,
    receiver: Arc<Mutex<mpsc::Receiver<Task>>>,
) {
    loop {
        let task = receiver.lock().await.recv().await;
        let Some(task) = task else {
            break;
        };
        shared.run(worker_id, task).await;
    }
    debug!(worker_id, "Examiner worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_parse_back() {
        for family in ExaminerFamily::ALL {
            assert_eq!(family.as_str().parse::<ExaminerFamily>().expect("parse"), family);
        }
        assert!("votes".parse::<ExaminerFamily>().is_err());
    }

    #[test]
    fn ticket_forms_invalidate_every_ticket_family() {
        assert_eq!(ExaminerFamily::TicketForms.cache_families().len(), 4);
        assert_eq!(ExaminerFamily::Articles.cache_families().len(), 1);
    }
}
