//! Closed vocabularies accepted by the gateway: countries, locales, sort keys, vote values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountryCode {
    Sg,
    Hk,
    Tw,
    Jp,
    Th,
    My,
    Id,
    Ph,
}

impl CountryCode {
    pub const ALL: [CountryCode; 8] = [
        CountryCode::Sg,
        CountryCode::Hk,
        CountryCode::Tw,
        CountryCode::Jp,
        CountryCode::Th,
        CountryCode::My,
        CountryCode::Id,
        CountryCode::Ph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CountryCode::Sg => "sg",
            CountryCode::Hk => "hk",
            CountryCode::Tw => "tw",
            CountryCode::Jp => "jp",
            CountryCode::Th => "th",
            CountryCode::My => "my",
            CountryCode::Id => "id",
            CountryCode::Ph => "ph",
        }
    }

    /// Locales the help center publishes for this country.
    pub fn supported_locales(self) -> &'static [Locale] {
        match self {
            CountryCode::Sg | CountryCode::My => &[Locale::EnUs, Locale::ZhCn],
            CountryCode::Hk | CountryCode::Tw => &[Locale::EnUs, Locale::ZhTw],
            CountryCode::Jp => &[Locale::EnUs, Locale::Ja],
            CountryCode::Th => &[Locale::EnUs, Locale::Th],
            CountryCode::Id => &[Locale::EnUs, Locale::Id],
            CountryCode::Ph => &[Locale::EnUs],
        }
    }
}

impl FromStr for CountryCode {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CountryCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| DomainError::unknown("country_code", value))
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en-us")]
    EnUs,
    #[serde(rename = "zh-tw")]
    ZhTw,
    #[serde(rename = "zh-cn")]
    ZhCn,
    #[serde(rename = "ja")]
    Ja,
    #[serde(rename = "th")]
    Th,
    #[serde(rename = "id")]
    Id,
}

impl Locale {
    pub const ALL: [Locale; 6] = [
        Locale::EnUs,
        Locale::ZhTw,
        Locale::ZhCn,
        Locale::Ja,
        Locale::Th,
        Locale::Id,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::EnUs => "en-us",
            Locale::ZhTw => "zh-tw",
            Locale::ZhCn => "zh-cn",
            Locale::Ja => "ja",
            Locale::Th => "th",
            Locale::Id => "id",
        }
    }
}

impl FromStr for Locale {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().replace('_', "-");
        Locale::ALL
            .into_iter()
            .find(|locale| locale.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| DomainError::unknown("locale", value))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Position,
    CreatedAt,
    UpdatedAt,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Position => "position",
            SortBy::CreatedAt => "created_at",
            SortBy::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for SortBy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "position" => Ok(SortBy::Position),
            "created_at" => Ok(SortBy::CreatedAt),
            "updated_at" => Ok(SortBy::UpdatedAt),
            _ => Err(DomainError::unknown("sort_by", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(DomainError::unknown("sort_order", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

impl FromStr for VoteDirection {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            _ => Err(DomainError::unknown("vote", value)),
        }
    }
}
