//! Per-request batched data loading.
//!
//! A [`RequestContext`] owns one [`BatchedLoader`] per [`LoaderName`]. Loads
//! are fingerprinted, deduplicated and coalesced into batches that the
//! registered [`BatchFn`] resolves, usually through the value cache.

pub mod batch;
pub mod cancel;
pub mod context;
pub mod fingerprint;
pub mod functions;
pub mod output;
pub mod params;
pub mod registry;

pub use batch::{BatchContext, BatchFn, BatchedLoader, LoadResult};
pub use cancel::CancelToken;
pub use context::RequestContext;
pub use fingerprint::Fingerprint;
pub use functions::LoaderDeps;
pub use output::{ArticlesPage, CategoriesPage, LoadedValue, SearchResults, SectionsPage};
pub use params::{
    ArticleParams, ArticlesParams, ArticlesScope, BodySearchParams, CategoriesParams,
    CategoryParams, CustomFieldOptionsParams, LoaderParams, Paging, SectionParams, SectionsParams,
    SectionsScope, SystemFieldOptionsParams, TicketFieldsParams, TicketFormParams,
    TitleSearchParams, TopArticlesParams,
};
pub use registry::{DispatchConfig, LoaderName, LoaderRegistry};
