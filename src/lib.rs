//! Giving Ledger is an admin console for a church finance team.
//!
//! It lists the giving records held by the church's finance API, lets an
//! operator verify payments and approve records, and builds categorised
//! reports that can be downloaded as PDF or CSV.
//!
//! This library serves the console's HTML pages and htmx fragments.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod config;
mod endpoints;
mod error;
mod giving;
mod html;
mod logging;
mod navigation;
mod not_found;
mod pagination;
mod routing;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use config::{ConfigError, ConsoleConfig, credentials_from};
pub use error::Error;
pub use giving::{
    ApiCredentials, ApiError, Approval, Banner, BannerKind, CategoryTotals, ExportError,
    GivingApi, GivingCategory, GivingRecord, GivingType, LedgerError, LedgerScreen,
    LedgerSnapshot, LoadState, Page, RangeError, Rejection, RemoteGivingApi, ReportData,
    ReportQuery, ReportRange, RowAction, ScreenSettings, Verification, categorize_totals,
};
pub use logging::logging_middleware;
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use timezone::get_local_offset;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
