//! Application router configuration.

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    AppState, endpoints,
    error::get_internal_server_error_page,
    giving::{
        GivingApi, approve_endpoint, download_report_csv, download_report_pdf,
        generate_report_endpoint, get_ledger_page, get_report_page, verify_endpoint,
    },
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router<A: GivingApi + 'static>(state: AppState<A>) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::LEDGER_VIEW, get(get_ledger_page::<A>))
        .route(endpoints::REPORT_VIEW, get(get_report_page::<A>))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        )
        .route(endpoints::VERIFY_GIVING, post(verify_endpoint::<A>))
        .route(endpoints::APPROVE_GIVING, post(approve_endpoint::<A>))
        .route(
            endpoints::GENERATE_REPORT,
            post(generate_report_endpoint::<A>),
        )
        .route(endpoints::REPORT_PDF, get(download_report_pdf::<A>))
        .route(endpoints::REPORT_CSV, get(download_report_csv::<A>))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the ledger.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::LEDGER_VIEW)
}


#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        AppState, endpoints,
        endpoints::format_endpoint,
        giving::{ScreenSettings, Verification},
        pagination::PaginationConfig,
        test_utils::{ApiCall, FakeGivingApi, page_of, record},
    };

    use super::build_router;

    fn server_with(api: FakeGivingApi) -> TestServer {
        let state = AppState::with_api(
            api,
            ScreenSettings::default(),
            "Etc/UTC",
            PaginationConfig::default(),
        );

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn serves_ledger_page() {
        let api = FakeGivingApi::default()
            .with_page(Ok(page_of(vec![record("GV-1", "TITHE", "100.00", true)])));
        let server = server_with(api);

        let response = server.get(endpoints::LEDGER_VIEW).await;

        response.assert_status_ok();
        assert!(response.text().contains("GV-1"));
    }

    #[tokio::test]
    async fn htmx_navigation_gets_fragment() {
        let server = server_with(FakeGivingApi::default());

        let response = server
            .get(endpoints::LEDGER_VIEW)
            .add_header("HX-Request", "true")
            .await;

        response.assert_status_ok();
        assert!(!response.text().contains("<html"));
    }

    #[tokio::test]
    async fn verify_route_decodes_reference() {
        let api = FakeGivingApi::default()
            .with_verification("GV 7/A", Ok(Verification { confirmed: false }));
        let server = server_with(api.clone());

        let response = server
            .post(&format_endpoint(endpoints::VERIFY_GIVING, "GV 7/A"))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("has not been confirmed yet."));
        assert_eq!(api.calls(), vec![ApiCall::Verify("GV 7/A".to_owned())]);
    }

    #[tokio::test]
    async fn report_form_posts_to_generate_route() {
        let server = server_with(FakeGivingApi::default());

        let response = server
            .post(endpoints::GENERATE_REPORT)
            .form(&[("from", ""), ("to", "2024-03-31")])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(
            response
                .text()
                .contains("Please select both a start date and an end date.")
        );
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = server_with(FakeGivingApi::default());

        server
            .get("/definitely-not-a-page")
            .await
            .assert_status_not_found();
    }
}
