use std::{future::IntoFuture, process, sync::Arc};

use folio::{
    application::{
        content::ContentService, error::AppError, repos::CollectionStore,
    },
    cache::{CacheConfig, CollectionCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
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
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
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
        config::Command::Dump(args) => run_dump(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let content = build_content_service(repositories, &cache_config);
    let cache = content.cache().clone();

    let router = http::build_router(HttpState::new(content));
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(settings.server.addr, err)))?;

    info!(
        target: "folio::serve",
        addr = %settings.server.addr,
        freshness_window_seconds = cache_config.freshness_window_seconds,
        "HTTP listener bound"
    );

    if cache_config.preload_on_startup {
        tokio::spawn(async move {
            let report = cache.preload().await;
            if !report.is_complete() {
                warn!(
                    target: "folio::serve",
                    failed = ?report.failed,
                    "Some collections were not preloaded; they will load on first read"
                );
            }
        });
    }

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    let drain_deadline = async {
        shutdown_signal().await;
        tokio::time::sleep(settings.server.graceful_shutdown).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline => {
            warn!(
                target: "folio::serve",
                timeout_seconds = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target: "folio::serve", "Server stopped");
    Ok(())
}

async fn run_dump(settings: config::Settings, args: config::DumpArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let content = build_content_service(repositories, &CacheConfig::from(&settings.cache));

    let payload = content.cache().get(args.resource).await?;
    info!(
        target: "folio::dump",
        resource = %args.resource,
        items = payload.len(),
        "Fetched collection"
    );

    let rendered = serde_json::to_string_pretty(payload.as_ref())
        .map_err(|err| AppError::unexpected(format!("failed to render payload: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::from(err)))?;

    let repositories = PostgresRepositories::new(pool);
    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(repositories))
}

fn build_content_service(
    repositories: Arc<PostgresRepositories>,
    cache_config: &CacheConfig,
) -> ContentService {
    let store: Arc<dyn CollectionStore> = repositories;
    let cache = Arc::new(CollectionCache::new(store.clone(), cache_config));
    ContentService::new(cache, store)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: "folio::serve", error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: "folio::serve", "Shutdown signal received");
}
