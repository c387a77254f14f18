//! The client for the remote finance API that owns giving records.

use std::{collections::HashMap, future::Future, time::Duration};

use reqwest::{
    Client, RequestBuilder, Response, StatusCode, Url,
    header::{AUTHORIZATION, COOKIE},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};


use super::models::{Approval, Page, Verification};

/// The date format the finance API expects in range filters.
const API_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[month]/[day]/[year]");

/// The message shown when a failed response carries nothing more specific.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// How requests to the finance API are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum ApiCredentials {
    /// Sent as `Authorization: Bearer <token>`.
    Bearer(String),
    /// Sent as the `Cookie` header verbatim.
    SessionCookie(String),
    None,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiCredentials::Bearer(_) => write!(f, "Bearer(********)"),
            ApiCredentials::SessionCookie(_) => write!(f, "SessionCookie(********)"),
            ApiCredentials::None => write!(f, "None"),
        }
    }
}

/// Why the server refused a request, decoded from its error body.
///
/// The finance API returns either field errors (`{"church": ["..."]}`), a
/// non-field error (`{"detail": "..."}`), or something else entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Field { field: String, message: String },
    NonField(String),
    Unstructured,
}

impl Rejection {
    /// Decode an error body, preferring field errors over non-field errors.
    pub fn from_body(body: &str) -> Self {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ErrorValue {
            Message(String),
            Messages(Vec<String>),
            Other(serde_json::Value),
        }

        let Ok(fields) = serde_json::from_str::<HashMap<String, ErrorValue>>(body) else {
            return Rejection::Unstructured;
        };

        let mut field_errors: Vec<(&String, &String)> = fields
            .iter()
            .filter(|(field, _)| !is_non_field_key(field))
            .filter_map(|(field, value)| match value {
                ErrorValue::Messages(messages) => messages.first().map(|message| (field, message)),
                _ => None,
            })
            .collect();
        // Pick a stable field when the server reports several.
        field_errors.sort();

        if let Some((field, message)) = field_errors.first() {
            return Rejection::Field {
                field: (*field).clone(),
                message: (*message).clone(),
            };
        }

        let non_field_message = ["detail", "non_field_errors", "message", "error"]
            .iter()
            .find_map(|key| match fields.get(*key) {
                Some(ErrorValue::Message(message)) => Some(message.clone()),
                Some(ErrorValue::Messages(messages)) => messages.first().cloned(),
                _ => None,
            });

        match non_field_message {
            Some(message) if !message.trim().is_empty() => Rejection::NonField(message),
            _ => Rejection::Unstructured,
        }
    }

    /// The message to show an operator.
    pub fn display_message(&self) -> String {
        match self {
            Rejection::Field { message, .. } => message.clone(),
            Rejection::NonField(message) => message.clone(),
            Rejection::Unstructured => GENERIC_FAILURE_MESSAGE.to_owned(),
        }
    }
}

fn is_non_field_key(key: &str) -> bool {
    matches!(key, "detail" | "non_field_errors" | "message" | "error")
}

/// The errors that can occur while talking to the finance API.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ApiError {
    /// No response was received, e.g. the connection was refused or timed out.
    #[error("could not reach the finance API: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("the finance API rejected the request with status {status}: {rejection:?}")]
    Rejected {
        status: StatusCode,
        rejection: Rejection,
    },

    /// The server answered with a body this client could not read.
    #[error("could not decode the finance API response: {0}")]
    Decode(String),

    /// A pagination cursor pointed somewhere other than the finance API.
    #[error("refusing to follow cursor \"{0}\" outside the finance API")]
    ForeignCursor(String),

    /// The API base URL or a path built from it was not a valid URL.
    #[error("invalid finance API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// The message to show an operator.
    pub fn display_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_owned()
            }
            ApiError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                rejection: Rejection::Unstructured,
            } => "Your session has expired. Please log in again.".to_owned(),
            ApiError::Rejected { rejection, .. } => rejection.display_message(),
            ApiError::Decode(_) => GENERIC_FAILURE_MESSAGE.to_owned(),
            ApiError::ForeignCursor(_) | ApiError::InvalidUrl(_) => {
                "That page link is not valid.".to_owned()
            }
        }
    }
}

/// The filter for a report request, with dates already in the API's format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportQuery {
    pub limit: u64,
    pub initiated_after: String,
    pub initiated_before: String,
}

impl ReportQuery {
    pub fn new(limit: u64, from: Date, to: Date) -> Self {
        Self {
            limit,
            initiated_after: format_api_date(from),
            initiated_before: format_api_date(to),
        }
    }
}

/// Format a date as `MM/dd/yyyy`, e.g. "03/07/2024".
pub fn format_api_date(date: Date) -> String {
    // The format description only contains components a `Date` has.
    date.format(API_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// The operations the ledger needs from the finance API.
pub trait GivingApi: Send + Sync {
    /// Fetch a page of giving records.
    ///
    /// `cursor` is a `next`/`previous` URL from an earlier page. `None` fetches
    /// the first page.
    fn list_page(&self, cursor: Option<&str>)
    -> impl Future<Output = Result<Page, ApiError>> + Send;

    /// Fetch the giving records initiated within a date range.
    fn list_range(&self, query: &ReportQuery)
    -> impl Future<Output = Result<Page, ApiError>> + Send;

    /// Ask the payment gateway whether a giving transaction has settled.
    fn verify(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<Verification, ApiError>> + Send;

    /// Approve a giving record as the current operator.
    fn approve(&self, reference: &str)
    -> impl Future<Output = Result<Approval, ApiError>> + Send;
}

/// A [GivingApi] backed by HTTP requests to the finance API.
#[derive(Debug, Clone)]
pub struct RemoteGivingApi {
    client: Client,
    base_url: Url,
    credentials: ApiCredentials,
    page_size: u64,
}

impl RemoteGivingApi {
    /// Create a client for the finance API at `base_url`.
    ///
    /// # Errors
    /// Returns [ApiError::InvalidUrl] if `base_url` is not an absolute HTTP(S)
    /// URL, or [ApiError::Transport] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        credentials: ApiCredentials,
        page_size: u64,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut base_url =
            Url::parse(base_url).map_err(|error| ApiError::InvalidUrl(error.to_string()))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "unsupported scheme \"{}\"",
                base_url.scheme()
            )));
        }

        // Make relative joins append to the base path instead of replacing it.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url,
            credentials,
            page_size,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|error| ApiError::InvalidUrl(error.to_string()))
    }

    /// The URL of `segments` under the base URL, each escaped as a single path
    /// segment, with a trailing slash.
    fn record_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn first_page_url(&self) -> Result<Url, ApiError> {
        let mut url = self.endpoint("giving/admin/list/")?;
        url.query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string());
        Ok(url)
    }

    /// Check that `cursor` points at the finance API before sending credentials to it.
    fn cursor_url(&self, cursor: &str) -> Result<Url, ApiError> {
        let url = Url::parse(cursor).map_err(|_| ApiError::ForeignCursor(cursor.to_owned()))?;

        if url.origin() != self.base_url.origin() || !url.path().starts_with(self.base_url.path())
        {
            return Err(ApiError::ForeignCursor(cursor.to_owned()));
        }

        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            ApiCredentials::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            ApiCredentials::SessionCookie(cookie) => request.header(COOKIE, cookie),
            ApiCredentials::None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| ApiError::Transport(error.to_string()))?;

    if !status.is_success() {
        tracing::warn!("finance API responded with {status}: {body}");
        return Err(ApiError::Rejected {
            status,
            rejection: Rejection::from_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|error| {
        tracing::error!("could not decode finance API response: {error}");
        ApiError::Decode(error.to_string())
    })
}

impl GivingApi for RemoteGivingApi {
    async fn list_page(&self, cursor: Option<&str>) -> Result<Page, ApiError> {
        let url = match cursor {
            Some(cursor) => self.cursor_url(cursor)?,
            None => self.first_page_url()?,
        };

        tracing::debug!("fetching giving page {url}");
        self.send(self.client.get(url)).await
    }

    async fn list_range(&self, query: &ReportQuery) -> Result<Page, ApiError> {
        let url = self.endpoint("giving/admin/list/")?;

        tracing::debug!("fetching giving report {url} with {query:?}");
        self.send(self.client.get(url).query(query)).await
    }

    async fn verify(&self, reference: &str) -> Result<Verification, ApiError> {
        let url = self.record_url(&["giving", reference, "verify"])?;

        self.send(self.client.get(url)).await
    }

    async fn approve(&self, reference: &str) -> Result<Approval, ApiError> {
        let url = self.record_url(&["giving", "admin", reference])?;

        self.send(self.client.post(url)).await
    }
}


#[cfg(test)]
mod format_tests {
    use time::macros::date;

    use super::{ReportQuery, format_api_date};

    #[test]
    fn formats_dates_for_api() {
        assert_eq!(format_api_date(date!(2024 - 03 - 07)), "03/07/2024");
        assert_eq!(format_api_date(date!(2023 - 12 - 31)), "12/31/2023");
    }

    #[test]
    fn report_query_serializes_as_query_string() {
        let query = ReportQuery::new(500, date!(2024 - 01 - 01), date!(2024 - 01 - 31));

        let encoded = serde_urlencoded::to_string(&query).expect("Could not encode query");

        assert_eq!(
            encoded,
            "limit=500&initiated_after=01%2F01%2F2024&initiated_before=01%2F31%2F2024"
        );
    }
}
