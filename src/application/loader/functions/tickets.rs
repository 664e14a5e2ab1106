//! Ticket families are not localized by country; their cache entries are global.

use std::sync::Arc;

use crate::application::error::LoadError;
use crate::application::examiner::ExaminerFamily;
use crate::application::loader::batch::LoadResult;
use crate::application::loader::fingerprint::Fingerprint;
use crate::application::loader::output::LoadedValue;
use crate::application::loader::params::{
    CustomFieldOptionsParams, SystemFieldOptionsParams, TicketFieldsParams, TicketFormParams,
    parse_id,
};
use crate::cache::{CacheFamily, CacheKey, CacheScope};

use super::{FreshnessGuard, LoaderDeps, cached_or_fetch, keyed_loader};

keyed_loader!(TicketFormLoader, TicketFormParams, load_ticket_form);
keyed_loader!(TicketFieldsLoader, TicketFieldsParams, load_ticket_fields);
keyed_loader!(
    CustomFieldOptionsLoader,
    CustomFieldOptionsParams,
    load_custom_field_options
);
keyed_loader!(
    SystemFieldOptionsLoader,
    SystemFieldOptionsParams,
    load_system_field_options
);

fn parse_ticket_id(kind: &str, raw: &str) -> Result<i64, LoadError> {
    parse_id(raw).ok_or_else(|| LoadError::not_found(format!("{kind} id `{raw}` is not numeric")))
}

async fn load_ticket_form(deps: LoaderDeps, key: Fingerprint, params: TicketFormParams) -> LoadResult {
    let form_id = parse_ticket_id("ticket form", &params.form_id)?;
    let _guard = FreshnessGuard::arm(&deps.hook, ExaminerFamily::TicketForms, CacheScope::Global);

    let cache_key = CacheKey::global(CacheFamily::TicketForm, key.as_str());
    let form = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.tickets
            .find_ticket_form(form_id)
            .await
            .map_err(|err| LoadError::from_repo("find_ticket_form", &err))
    })
    .await?;

    Ok(LoadedValue::TicketForm(Arc::new(form)))
}

async fn load_ticket_fields(
    deps: LoaderDeps,
    key: Fingerprint,
    params: TicketFieldsParams,
) -> LoadResult {
    let form_id = parse_ticket_id("ticket form", &params.form_id)?;
    let locale = params.locale;

    let cache_key = CacheKey::global(CacheFamily::TicketField, key.as_str());
    let fields = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.tickets
            .ticket_fields_by_form(form_id, locale)
            .await
            .map_err(|err| LoadError::from_repo("ticket_fields_by_form", &err))
    })
    .await?;

    Ok(LoadedValue::TicketFields(Arc::new(fields)))
}

async fn load_custom_field_options(
    deps: LoaderDeps,
    key: Fingerprint,
    params: CustomFieldOptionsParams,
) -> LoadResult {
    let field_id = parse_ticket_id("ticket field", &params.field_id)?;

    let cache_key = CacheKey::global(CacheFamily::TicketFieldCustom, key.as_str());
    let options = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.tickets
            .custom_field_options(field_id)
            .await
            .map_err(|err| LoadError::from_repo("custom_field_options", &err))
    })
    .await?;

    Ok(LoadedValue::CustomFieldOptions(Arc::new(options)))
}

async fn load_system_field_options(
    deps: LoaderDeps,
    key: Fingerprint,
    params: SystemFieldOptionsParams,
) -> LoadResult {
    let field_id = parse_ticket_id("ticket field", &params.field_id)?;

    let cache_key = CacheKey::global(CacheFamily::TicketFieldSystem, key.as_str());
    let options = cached_or_fetch(deps.cache.as_ref(), cache_key, || async {
        deps.tickets
            .system_field_options(field_id)
            .await
            .map_err(|err| LoadError::from_repo("system_field_options", &err))
    })
    .await?;

    Ok(LoadedValue::SystemFieldOptions(Arc::new(options)))
}
