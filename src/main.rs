use std::{process, sync::Arc};

use helpgate::{
    application::{
        error::AppError,
        examiner::{
            CatalogRefresher, Examiner, ExaminerConfig, ExaminerError, ExaminerFamily, SyncReport,
        },
        loader::{DispatchConfig, LoaderDeps, LoaderRegistry},
        repos::ValueCache,
        upstream::Upstream,
    },
    cache::{CacheConfig, CacheScope, LruValueCache},
    config,
    domain::types::CountryCode,
    infra::{
        catalog::MemoryCatalog,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        upstream::HelpCenterClient,
    },
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let mut chain = Vec::new();
    let mut current = std::error::Error::source(error);
    while let Some(inner) = current {
        chain.push(inner.to_string());
        current = inner.source();
    }

    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Sync(args) => run_sync(settings, args).await,
    }
}

struct ApplicationContext {
    http_state: HttpState,
    examiner: Arc<Examiner>,
}

fn build_application_context(settings: &config::Settings) -> Result<ApplicationContext, AppError> {
    let catalog = Arc::new(MemoryCatalog::new());
    let upstream: Arc<dyn Upstream> = Arc::new(HelpCenterClient::new(&settings.upstream)?);
    let cache: Arc<dyn ValueCache> =
        Arc::new(LruValueCache::new(&CacheConfig::from(&settings.cache)));

    let refresher = CatalogRefresher::new(
        Arc::clone(&upstream),
        catalog.clone(),
        Arc::clone(&cache),
    );
    let examiner = Arc::new(Examiner::spawn(
        ExaminerConfig::from(&settings.examiner),
        refresher,
    ));

    let deps = LoaderDeps {
        categories: catalog.clone(),
        sections: catalog.clone(),
        articles: catalog.clone(),
        tickets: catalog.clone(),
        cache,
        upstream: Arc::clone(&upstream),
        hook: examiner.clone(),
    };
    let registry = Arc::new(LoaderRegistry::standard(
        deps,
        DispatchConfig::from(&settings.loader),
    ));

    let http_state = HttpState {
        registry,
        categories: catalog,
        upstream,
        examiner: Arc::clone(&examiner),
        admin: settings.admin.credentials.clone(),
        request_timeout: settings.server.request_timeout,
    };

    Ok(ApplicationContext {
        http_state,
        examiner,
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;

    // The catalog starts empty; fill it without delaying the listener.
    let warmup = {
        let examiner = Arc::clone(&app.examiner);
        tokio::spawn(async move {
            let outcomes = examiner.force_sync_all().await;
            let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
            info!(scopes = outcomes.len(), failed, "Startup catalog sync finished");
        })
    };

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "HTTP gateway listening");

    let router = http::build_router(app.http_state);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    warmup.abort();
    let _ = warmup.await;
    shutdown_examiner(app.examiner, &settings).await;
    Ok(())
}

async fn shutdown_examiner(examiner: Arc<Examiner>, settings: &config::Settings) {
    let Ok(examiner) = Arc::try_unwrap(examiner) else {
        warn!("Examiner still referenced at shutdown, skipping drain");
        return;
    };
    if tokio::time::timeout(settings.server.graceful_shutdown, examiner.shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout = ?settings.server.graceful_shutdown,
            "Examiner did not drain before the shutdown deadline"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

async fn run_sync(settings: config::Settings, args: config::SyncArgs) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;

    let outcomes = if args.all
        || (args.country.is_none() && args.locale.is_none() && args.families.is_empty())
    {
        app.examiner.force_sync_all().await
    } else {
        sync_selected(&app.examiner, &args).await
    };

    let mut failed = 0usize;
    for outcome in &outcomes {
        match outcome {
            Ok(report) => info!(
                family = %report.family,
                scope = %report.scope,
                records = report.records,
                "Synced"
            ),
            Err(err) => {
                failed += 1;
                error!(error = %err, "Sync failed");
            }
        }
    }
    drop(app.http_state);
    shutdown_examiner(app.examiner, &settings).await;

    if failed > 0 {
        return Err(AppError::unexpected(format!(
            "{failed} of {} scopes failed to sync",
            outcomes.len()
        )));
    }
    Ok(())
}

async fn sync_selected(
    examiner: &Examiner,
    args: &config::SyncArgs,
) -> Vec<Result<SyncReport, ExaminerError>> {
    let families = if args.families.is_empty() {
        ExaminerFamily::ALL.to_vec()
    } else {
        args.families.clone()
    };
    let countries = match args.country {
        Some(country) => vec![country],
        None => CountryCode::ALL.to_vec(),
    };

    let mut outcomes = Vec::new();
    for family in families {
        if family.is_global() {
            outcomes.push(examiner.force_sync(family, CacheScope::Global).await);
            continue;
        }
        for country in &countries {
            let locales = match args.locale {
                Some(locale) => vec![locale],
                None => country.supported_locales().to_vec(),
            };
            for locale in locales {
                outcomes.push(
                    examiner
                        .force_sync(family, CacheScope::localized(*country, locale))
                        .await,
                );
            }
        }
    }
    outcomes
}
