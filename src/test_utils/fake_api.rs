use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use reqwest::StatusCode;
use time::macros::datetime;
use tokio::sync::Semaphore;

use crate::giving::{
    ApiError, Approval, GivingApi, GivingRecord, GivingType, Page, Rejection, ReportQuery,
    Verification,
};

/// A request the ledger made to [FakeGivingApi].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    ListPage(Option<String>),
    ListRange(ReportQuery),
    Verify(String),
    Approve(String),
}

#[derive(Debug, Default)]
struct FakeState {
    pages: VecDeque<Result<Page, ApiError>>,
    report: Option<Result<Page, ApiError>>,
    verifications: HashMap<String, Result<Verification, ApiError>>,
    approvals: HashMap<String, Result<Approval, ApiError>>,
    calls: Vec<ApiCall>,
    held: bool,
    gates: Vec<Option<Arc<Semaphore>>>,
}

/// An in-memory [GivingApi] with canned responses.
///
/// When built with [FakeGivingApi::held], every request blocks until the test
/// releases it, which lets tests observe the screen while requests are in flight.
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeGivingApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGivingApi {
    /// Queue the response for the next page fetch.
    pub(crate) fn with_page(self, page: Result<Page, ApiError>) -> Self {
        self.lock().pages.push_back(page);
        self
    }

    pub(crate) fn with_report(self, report: Result<Page, ApiError>) -> Self {
        self.lock().report = Some(report);
        self
    }

    pub(crate) fn with_verification(
        self,
        reference: &str,
        verification: Result<Verification, ApiError>,
    ) -> Self {
        self.lock()
            .verifications
            .insert(reference.to_owned(), verification);
        self
    }

    pub(crate) fn with_approval(self, reference: &str, approval: Result<Approval, ApiError>) -> Self {
        self.lock().approvals.insert(reference.to_owned(), approval);
        self
    }

    /// Hold every request until it is released.
    pub(crate) fn held(self) -> Self {
        self.lock().held = true;
        self
    }

    /// Every request made so far, in order.
    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Let the request at `index` in [FakeGivingApi::calls] finish.
    pub(crate) fn release_call(&self, index: usize) {
        if let Some(Some(gate)) = self.lock().gates.get(index) {
            gate.add_permits(1);
        }
    }

    /// Let every waiting request finish and stop holding new ones.
    pub(crate) fn release_all(&self) {
        let mut state = self.lock();
        state.held = false;

        for gate in state.gates.iter().flatten() {
            gate.add_permits(1);
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake API lock poisoned")
    }

    async fn enter(&self, call: ApiCall) {
        let gate = {
            let mut state = self.lock();
            state.calls.push(call);
            let gate = state.held.then(|| Arc::new(Semaphore::new(0)));
            state.gates.push(gate.clone());
            gate
        };

        if let Some(gate) = gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }
    }
}

fn not_found() -> ApiError {
    ApiError::Rejected {
        status: StatusCode::NOT_FOUND,
        rejection: Rejection::NonField("Not found.".to_owned()),
    }
}

impl GivingApi for FakeGivingApi {
    async fn list_page(&self, cursor: Option<&str>) -> Result<Page, ApiError> {
        let page = self.lock().pages.pop_front().unwrap_or(Ok(Page::default()));
        self.enter(ApiCall::ListPage(cursor.map(str::to_owned)))
            .await;
        page
    }

    async fn list_range(&self, query: &ReportQuery) -> Result<Page, ApiError> {
        let report = self.lock().report.clone().unwrap_or(Ok(Page::default()));
        self.enter(ApiCall::ListRange(query.clone())).await;
        report
    }

    async fn verify(&self, reference: &str) -> Result<Verification, ApiError> {
        let verification = self
            .lock()
            .verifications
            .get(reference)
            .cloned()
            .unwrap_or_else(|| Err(not_found()));
        self.enter(ApiCall::Verify(reference.to_owned())).await;
        verification
    }

    async fn approve(&self, reference: &str) -> Result<Approval, ApiError> {
        let approval = self
            .lock()
            .approvals
            .get(reference)
            .cloned()
            .unwrap_or_else(|| Err(not_found()));
        self.enter(ApiCall::Approve(reference.to_owned())).await;
        approval
    }
}

/// A giving record initiated on 2024-03-10 by "Ada".
pub(crate) fn record(reference: &str, giving_type: &str, amount: &str, confirmed: bool) -> GivingRecord {
    GivingRecord {
        reference: reference.to_owned(),
        giving_type: GivingType::from(giving_type.to_owned()),
        amount: amount.to_owned(),
        detail: None,
        giver: "Ada".to_owned(),
        confirmed,
        auditor: None,
        initiated_at: datetime!(2024-03-10 09:30 UTC),
        confirmation_date: confirmed.then_some(datetime!(2024-03-10 09:35 UTC)),
        files: Vec::new(),
    }
}

/// A single page holding `records`.
pub(crate) fn page_of(records: Vec<GivingRecord>) -> Page {
    Page {
        count: records.len() as u64,
        results: records,
        next: None,
        previous: None,
    }
}
