use std::{future::IntoFuture, process, sync::Arc};

use foglio::{
    application::error::AppError,
    application::feed::FeedService,
    application::store::PostStore,
    config,
    infra::db::PostgresStore,
    infra::error::InfraError,
    infra::http::{self, AppState},
    infra::json_store::JsonFileStore,
    infra::media::MediaStorage,
    infra::telemetry,
};
use tokio::sync::oneshot;
use tokio::task::JoinError;
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
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let media = MediaStorage::new(
        settings.media.directory.clone(),
        settings.media.public_base_url.clone(),
    )
    .map_err(|err| AppError::from(InfraError::from(err)))?;
    let media = Arc::new(media);

    let (store, db): (Arc<dyn PostStore>, Option<PostgresStore>) = match &settings.store {
        config::StoreSettings::File { posts_file } => {
            info!(path = %posts_file.display(), "using file-backed post store");
            (Arc::new(JsonFileStore::new(posts_file.clone())), None)
        }
        config::StoreSettings::Postgres {
            url,
            max_connections,
        } => {
            let pool = PostgresStore::connect(url, max_connections.get())
                .await
                .map_err(|err| {
                    AppError::from(InfraError::database(format!(
                        "failed to connect to database: {err}"
                    )))
                })?;
            PostgresStore::run_migrations(&pool).await.map_err(|err| {
                AppError::from(InfraError::database(format!("migrations failed: {err}")))
            })?;
            info!("using database-backed post store");
            let store = PostgresStore::new(pool);
            (Arc::new(store.clone()), Some(store))
        }
    };

    let feed = Arc::new(FeedService::new(store));
    let state = AppState { feed, media, db };
    let router = http::router(state, settings.media.max_request_bytes.get() as usize);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let grace = settings.server.graceful_shutdown;
    let (signal_tx, signal_rx) = oneshot::channel();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = signal_tx.send(());
        },
    );

    // The drain is bounded: once the signal fires, connections get the
    // configured grace period and the server task is aborted after it.
    let mut serving = tokio::spawn(server.into_future());
    tokio::select! {
        result = &mut serving => flatten_serve_result(result),
        _ = signal_rx => {
            info!(
                grace_seconds = grace.as_secs(),
                "shutdown signal received; draining connections"
            );
            match tokio::time::timeout(grace, &mut serving).await {
                Ok(result) => flatten_serve_result(result),
                Err(_) => {
                    warn!(
                        grace_seconds = grace.as_secs(),
                        "grace period elapsed with connections still open; aborting"
                    );
                    serving.abort();
                    Ok(())
                }
            }
        }
    }
}

fn flatten_serve_result(result: Result<std::io::Result<()>, JoinError>) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        // Without a signal handler there is nothing to wait for; park so the
        // server keeps running rather than draining immediately.
        std::future::pending::<()>().await;
    }
}
