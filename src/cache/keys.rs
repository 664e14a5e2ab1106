//! Cache key definitions.
//!
//! Every cached value lives in one [`CacheFamily`] and is scoped by a
//! [`CacheScope`]. Help-center families are scoped by country and locale;
//! ticket families are global.

use std::fmt;

use crate::domain::types::{CountryCode, Locale};

/// Namespace on the value cache grouping related resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheFamily {
    Categories,
    Sections,
    /// Shared by the `articles`, `article` and `top_articles` loaders.
    Articles,
    TicketForm,
    TicketField,
    TicketFieldCustom,
    TicketFieldSystem,
}

impl CacheFamily {
    pub const ALL: [CacheFamily; 7] = [
        CacheFamily::Categories,
        CacheFamily::Sections,
        CacheFamily::Articles,
        CacheFamily::TicketForm,
        CacheFamily::TicketField,
        CacheFamily::TicketFieldCustom,
        CacheFamily::TicketFieldSystem,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheFamily::Categories => "categories",
            CacheFamily::Sections => "sections",
            CacheFamily::Articles => "articles",
            CacheFamily::TicketForm => "ticket_form",
            CacheFamily::TicketField => "ticket_field",
            CacheFamily::TicketFieldCustom => "ticket_field_custom",
            CacheFamily::TicketFieldSystem => "ticket_field_system",
        }
    }

    pub fn is_global(self) -> bool {
        matches!(
            self,
            CacheFamily::TicketForm
                | CacheFamily::TicketField
                | CacheFamily::TicketFieldCustom
                | CacheFamily::TicketFieldSystem
        )
    }
}

impl fmt::Display for CacheFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheScope {
    Localized { country: CountryCode, locale: Locale },
    Global,
}

impl CacheScope {
    pub fn localized(country: CountryCode, locale: Locale) -> Self {
        Self::Localized { country, locale }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheScope::Localized { country, locale } => write!(f, "{country}/{locale}"),
            CacheScope::Global => f.write_str("global"),
        }
    }
}

/// Full address of one cached payload: `(family, country, locale, fingerprint)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub family: CacheFamily,
    pub scope: CacheScope,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn localized(
        family: CacheFamily,
        country: CountryCode,
        locale: Locale,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            family,
            scope: CacheScope::localized(country, locale),
            fingerprint: fingerprint.into(),
        }
    }

    pub fn global(family: CacheFamily, fingerprint: impl Into<String>) -> Self {
        Self {
            family,
            scope: CacheScope::Global,
            fingerprint: fingerprint.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_families_are_global() {
        let global: Vec<_> = CacheFamily::ALL
            .into_iter()
            .filter(|family| family.is_global())
            .collect();
        assert_eq!(
            global,
            vec![
                CacheFamily::TicketForm,
                CacheFamily::TicketField,
                CacheFamily::TicketFieldCustom,
                CacheFamily::TicketFieldSystem,
            ]
        );
    }

    #[test]
    fn keys_differ_by_scope() {
        let tw = CacheKey::localized(CacheFamily::Categories, CountryCode::Tw, Locale::EnUs, "fp");
        let sg = CacheKey::localized(CacheFamily::Categories, CountryCode::Sg, Locale::EnUs, "fp");
        assert_ne!(tw, sg);
        assert_eq!(tw.scope.to_string(), "tw/en-us");
    }
}
