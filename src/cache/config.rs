//! Cache configuration.
//!
//! Per-family LRU capacities for the value cache, read from the `[cache]`
//! section of `helpgate.toml`.

use std::num::NonZeroUsize;

use super::keys::CacheFamily;

const DEFAULT_CATEGORIES_LIMIT: usize = 1024;
const DEFAULT_SECTIONS_LIMIT: usize = 1024;
const DEFAULT_ARTICLES_LIMIT: usize = 1024;
const DEFAULT_TICKET_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub categories_limit: usize,
    pub sections_limit: usize,
    pub articles_limit: usize,
    /// Shared by every ticket family.
    pub ticket_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            categories_limit: DEFAULT_CATEGORIES_LIMIT,
            sections_limit: DEFAULT_SECTIONS_LIMIT,
            articles_limit: DEFAULT_ARTICLES_LIMIT,
            ticket_limit: DEFAULT_TICKET_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            categories_limit: settings.categories_limit,
            sections_limit: settings.sections_limit,
            articles_limit: settings.articles_limit,
            ticket_limit: settings.ticket_limit,
        }
    }
}

impl CacheConfig {
    /// Capacity for `family`, clamped to 1 if configured as zero.
    pub fn limit_for(&self, family: CacheFamily) -> NonZeroUsize {
        let limit = match family {
            CacheFamily::Categories => self.categories_limit,
            CacheFamily::Sections => self.sections_limit,
            CacheFamily::Articles => self.articles_limit,
            CacheFamily::TicketForm
            | CacheFamily::TicketField
            | CacheFamily::TicketFieldCustom
            | CacheFamily::TicketFieldSystem => self.ticket_limit,
        };
        NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.limit_for(CacheFamily::Categories).get(), 1024);
        assert_eq!(config.limit_for(CacheFamily::Articles).get(), 1024);
        assert_eq!(config.limit_for(CacheFamily::TicketFieldSystem).get(), 256);
    }

    #[test]
    fn zero_limit_clamps_to_min() {
        let config = CacheConfig {
            sections_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.limit_for(CacheFamily::Sections).get(), 1);
    }
}
