//! Refresh counters and per-scope sync locks.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::cache::CacheScope;

use super::ExaminerFamily;

type ScopeKey = (ExaminerFamily, CacheScope);

/// Loads a scope may serve before it is refreshed from upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshLimits {
    pub categories: i64,
    pub sections: i64,
    pub articles: i64,
    pub ticket_forms: i64,
}

impl RefreshLimits {
    pub fn limit(&self, family: ExaminerFamily) -> i64 {
        match family {
            ExaminerFamily::Categories => self.categories,
            ExaminerFamily::Sections => self.sections,
            ExaminerFamily::Articles => self.articles,
            ExaminerFamily::TicketForms => self.ticket_forms,
        }
    }
}

/// `limit <= 0` never refreshes, `1` always does, larger limits wait for `count`.
pub fn should_refresh(limit: i64, count: i64) -> bool {
    limit > 0 && count >= limit
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    counts: DashMap<ScopeKey, i64>,
}

impl Counters {
    pub(crate) fn increment(&self, family: ExaminerFamily, scope: CacheScope) -> i64 {
        let mut entry = self.counts.entry((family, scope)).or_insert(0);
        *entry += 1;
        *entry
    }

    pub(crate) fn reset(&self, family: ExaminerFamily, scope: CacheScope) {
        self.counts.remove(&(family, scope));
    }

    pub(crate) fn get(&self, family: ExaminerFamily, scope: CacheScope) -> i64 {
        self.counts
            .get(&(family, scope))
            .map(|count| *count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ScopeLocks {
    held: Arc<DashSet<ScopeKey>>,
}

impl ScopeLocks {
    /// `None` when another sync already holds the scope.
    pub(crate) fn try_acquire(
        &self,
        family: ExaminerFamily,
        scope: CacheScope,
    ) -> Option<ScopeLockGuard> {
        self.held.insert((family, scope)).then(|| ScopeLockGuard {
            held: Arc::clone(&self.held),
            key: (family, scope),
        })
    }
}

pub(crate) struct ScopeLockGuard {
    held: Arc<DashSet<ScopeKey>>,
    key: ScopeKey,
}

impl Drop for ScopeLockGuard {
    fn drop(&mut self) {
        self.held.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CountryCode, Locale};

    #[test]
    fn refresh_policy_follows_limit_rules() {
        assert!(!should_refresh(0, 10));
        assert!(!should_refresh(-3, 10));
        assert!(should_refresh(1, 1));
        assert!(!should_refresh(5, 4));
        assert!(should_refresh(5, 5));
        assert!(should_refresh(5, 9));
    }

    #[test]
    fn counters_are_scoped_by_family_and_scope() {
        let counters = Counters::default();
        let tw = CacheScope::localized(CountryCode::Tw, Locale::EnUs);
        let sg = CacheScope::localized(CountryCode::Sg, Locale::EnUs);

        assert_eq!(counters.increment(ExaminerFamily::Articles, tw), 1);
        assert_eq!(counters.increment(ExaminerFamily::Articles, tw), 2);
        assert_eq!(counters.increment(ExaminerFamily::Articles, sg), 1);
        assert_eq!(counters.increment(ExaminerFamily::Sections, tw), 1);

        counters.reset(ExaminerFamily::Articles, tw);
        assert_eq!(counters.get(ExaminerFamily::Articles, tw), 0);
        assert_eq!(counters.get(ExaminerFamily::Articles, sg), 1);
    }

    #[test]
    fn scope_lock_is_exclusive_until_dropped() {
        let locks = ScopeLocks::default();
        let guard = locks
            .try_acquire(ExaminerFamily::TicketForms, CacheScope::Global)
            .expect("first acquire");
        assert!(
            locks
                .try_acquire(ExaminerFamily::TicketForms, CacheScope::Global)
                .is_none()
        );
        drop(guard);
        assert!(
            locks
                .try_acquire(ExaminerFamily::TicketForms, CacheScope::Global)
                .is_some()
        );
    }
}
