use std::{
    env,
    fs::OpenOptions,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use expense_tracker::{
    AppState, AuthConfig, SystemClock, build_router, graceful_shutdown, listing::PaginationConfig,
    logging_middleware,
};

/// The REST API server for expense_tracker.
///
/// The secret for signing bearer tokens is read from the `SECRET` environment variable.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The IP address to listen on.
    #[arg(short, long, default_value = "127.0.0.1")]
    address: IpAddr,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// How many hours a bearer token stays valid.
    #[arg(long, default_value_t = 24)]
    token_duration_hours: i64,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Log every request and response body.
    #[arg(long)]
    log_bodies: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(args.log_path.as_ref());

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let connection = Connection::open(&args.db_path).expect("Could not open database");
    let state = AppState::new(
        connection,
        Arc::new(SystemClock),
        AuthConfig::new(&secret, Duration::hours(args.token_duration_hours)),
        PaginationConfig::default(),
    )
    .expect("Could not initialize the database");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let mut router = build_router(state);
    if args.log_bodies {
        router = router.layer(middleware::from_fn(logging_middleware));
    }
    let router = add_tracing_layer(router);

    let addr = SocketAddr::new(args.address, args.port);
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Server stopped unexpectedly");
}

fn setup_logging(log_path: Option<&PathBuf>) {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let file_log = log_path.map(|path| {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("Could not create log file");

        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(log_file))
            .with_filter(filter::LevelFilter::DEBUG)
    });

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(file_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
