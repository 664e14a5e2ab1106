use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use super::batch::BatchFn;
use super::functions::{
    ArticleLoader, ArticlesLoader, BodySearchLoader, CategoriesLoader, CategoryLoader,
    CustomFieldOptionsLoader, LoaderDeps, SectionLoader, SectionsLoader, SystemFieldOptionsLoader,
    TicketFieldsLoader, TicketFormLoader, TitleSearchLoader, TopArticlesLoader,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoaderName {
    Categories,
    Category,
    Sections,
    Section,
    Articles,
    Article,
    TopArticles,
    TicketForm,
    TicketFields,
    CustomFieldOptions,
    SystemFieldOptions,
    SearchTitleArticles,
    SearchBodyArticles,
}

impl LoaderName {
    pub const ALL: [LoaderName; 13] = [
        LoaderName::Categories,
        LoaderName::Category,
        LoaderName::Sections,
        LoaderName::Section,
        LoaderName::Articles,
        LoaderName::Article,
        LoaderName::TopArticles,
        LoaderName::TicketForm,
        LoaderName::TicketFields,
        LoaderName::CustomFieldOptions,
        LoaderName::SystemFieldOptions,
        LoaderName::SearchTitleArticles,
        LoaderName::SearchBodyArticles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoaderName::Categories => "categories",
            LoaderName::Category => "category",
            LoaderName::Sections => "sections",
            LoaderName::Section => "section",
            LoaderName::Articles => "articles",
            LoaderName::Article => "article",
            LoaderName::TopArticles => "top_articles",
            LoaderName::TicketForm => "ticket_form",
            LoaderName::TicketFields => "ticket_fields",
            LoaderName::CustomFieldOptions => "custom_field_options",
            LoaderName::SystemFieldOptions => "system_field_options",
            LoaderName::SearchTitleArticles => "search_title_articles",
            LoaderName::SearchBodyArticles => "search_body_articles",
        }
    }
}

impl fmt::Display for LoaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_BATCH_WAIT: Duration = Duration::from_millis(1);
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Dispatch tuning shared by every loader a registry instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Idle tick after which an open window dispatches even if nobody awaited.
    pub batch_wait: Duration,
    pub max_batch_size: NonZeroUsize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_wait: DEFAULT_BATCH_WAIT,
            max_batch_size: NonZeroUsize::new(DEFAULT_MAX_BATCH_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl From<&crate::config::LoaderSettings> for DispatchConfig {
    fn from(settings: &crate::config::LoaderSettings) -> Self {
        Self {
            batch_wait: settings.batch_wait,
            max_batch_size: settings.max_batch_size,
        }
    }
}

/// Long-lived map from loader name to batch function. Request contexts are cut from it.
#[derive(Clone)]
pub struct LoaderRegistry {
    functions: HashMap<LoaderName, Arc<dyn BatchFn>>,
    dispatch: DispatchConfig,
}

impl LoaderRegistry {
    pub fn empty(dispatch: DispatchConfig) -> Self {
        Self {
            functions: HashMap::new(),
            dispatch,
        }
    }

    /// Wire every named loader against the given service adapters.
    pub fn standard(deps: LoaderDeps, dispatch: DispatchConfig) -> Self {
        Self::empty(dispatch)
            .with(LoaderName::Categories, CategoriesLoader::new(deps.clone()))
            .with(LoaderName::Category, CategoryLoader::new(deps.clone()))
            .with(LoaderName::Sections, SectionsLoader::new(deps.clone()))
            .with(LoaderName::Section, SectionLoader::new(deps.clone()))
            .with(LoaderName::Articles, ArticlesLoader::new(deps.clone()))
            .with(LoaderName::Article, ArticleLoader::new(deps.clone()))
            .with(LoaderName::TopArticles, TopArticlesLoader::new(deps.clone()))
            .with(LoaderName::TicketForm, TicketFormLoader::new(deps.clone()))
            .with(LoaderName::TicketFields, TicketFieldsLoader::new(deps.clone()))
            .with(
                LoaderName::CustomFieldOptions,
                CustomFieldOptionsLoader::new(deps.clone()),
            )
            .with(
                LoaderName::SystemFieldOptions,
                SystemFieldOptionsLoader::new(deps.clone()),
            )
            .with(
                LoaderName::SearchTitleArticles,
                TitleSearchLoader::new(deps.clone()),
            )
            .with(LoaderName::SearchBodyArticles, BodySearchLoader::new(deps))
    }

    pub fn with(mut self, name: LoaderName, function: impl BatchFn + 'static) -> Self {
        self.functions.insert(name, Arc::new(function));
        self
    }

    pub fn function(&self, name: LoaderName) -> Option<Arc<dyn BatchFn>> {
        self.functions.get(&name).cloned()
    }

    pub fn dispatch(&self) -> DispatchConfig {
        self.dispatch
    }

    pub fn is_complete(&self) -> bool {
        LoaderName::ALL
            .iter()
            .all(|name| self.functions.contains_key(name))
    }
}
