use std::{env, fs::OpenOptions, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use giving_ledger::{
    AppState, ConsoleConfig, build_router, credentials_from, graceful_shutdown, logging_middleware,
};

/// The web server for the church giving ledger console.
///
/// Credentials for the finance API are read from the `GIVING_API_TOKEN`
/// (bearer token) or `GIVING_API_SESSION` (session cookie) environment variables.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The base URL of the finance API, e.g. "https://api.example.org/v1".
    #[arg(long)]
    api_base_url: String,

    /// The port to serve the console from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The number of giving records per ledger page.
    #[arg(long, default_value_t = 20)]
    page_size: u64,

    /// The maximum number of records fetched for a report.
    #[arg(long, default_value_t = 1000)]
    report_limit: u64,

    /// The local timezone as a canonical timezone name.
    #[arg(long, default_value = "Africa/Lagos")]
    timezone: String,

    /// How many seconds alerts and banners stay on screen.
    #[arg(long, default_value_t = 5)]
    banner_ttl_secs: u64,

    /// How many seconds to wait for the finance API before giving up.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(error) = setup_logging() {
        eprintln!("Could not set up logging: {error}");
        return ExitCode::FAILURE;
    }

    let args = Args::parse();

    let config = ConsoleConfig {
        api_base_url: args.api_base_url,
        credentials: credentials_from(
            env::var("GIVING_API_TOKEN").ok(),
            env::var("GIVING_API_SESSION").ok(),
        ),
        page_size: args.page_size,
        report_limit: args.report_limit,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        banner_ttl: Duration::from_secs(args.banner_ttl_secs),
        local_timezone: args.timezone,
    };

    let state = match AppState::new(&config) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Invalid configuration: {error}");
            return ExitCode::FAILURE;
        }
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server stopped with an error: {error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn setup_logging() -> std::io::Result<()> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
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
        // Failed finance API calls are already logged by the ledger.
        .on_failure(());

    router.layer(tracing_layer)
}
