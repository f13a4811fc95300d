//! API client for the StaffPortal mobile REST API.
//!
//! Every call goes through [`ApiClient::request`], which attaches the stored
//! bearer token and classifies the response. A 401 evicts the token from the
//! credential store; nothing is retried.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{CredentialError, CredentialStore};
use crate::models::{
    Activity, Dashboard, DashboardStats, Element, ElementUpdate, Job, JobElement, LoginRequest,
    LoginResponse, VerifyResponse,
};

use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_PATH: &str = "/api/auth/mobile-login";
const VERIFY_PATH: &str = "/api/auth/verify";
const JOBS_PATH: &str = "/api/mobile/jobs";
const ELEMENTS_PATH: &str = "/api/mobile/elements";
const ELEMENT_LOOKUP_PATH: &str = "/api/mobile/elements/lookup";
const DASHBOARD_STATS_PATH: &str = "/api/mobile/dashboard/stats";
const DASHBOARD_ACTIVITIES_PATH: &str = "/api/mobile/dashboard/activities";

/// Per-call overrides for [`ApiClient::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Applied after the default headers; these win on conflict
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_vec(body).map_err(ApiError::Encode)?);
        Ok(self)
    }
}

/// Authenticated gateway to the StaffPortal API.
/// Clone is cheap - the HTTP client and credential store are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl ApiClient {
    /// Create a client for `base_url` that reads its token from `store`
    pub fn new(base_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url, store))
    }

    /// Create a client reusing an existing connection pool
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credential store this client reads tokens from
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Default headers, bearer token, then caller overrides
    fn build_headers(token: Option<&str>, overrides: &HeaderMap) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                CredentialError::Corrupt("token is not a valid header value".to_string())
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        for name in overrides.keys() {
            headers.remove(name);
        }
        for (name, value) in overrides {
            headers.append(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Send a request to `endpoint` (a path below the base URL) and decode
    /// the JSON response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let headers = {
            let token = self.store.get()?;
            Self::build_headers(token.as_deref(), &options.headers)?
        };

        let url = format!("{}{}", self.base_url, endpoint);
        let method = options.method;
        debug!(%method, endpoint, "Sending request");

        let mut builder = self.client.request(method.clone(), &url).headers(headers);
        if let Some(body) = options.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            debug!(%status, endpoint, bytes = bytes.len(), "Request succeeded");
            return serde_json::from_slice(&bytes).map_err(|e| {
                ApiError::InvalidResponse(format!("{} {}: {}", method, endpoint, e))
            });
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!(endpoint, "Token rejected, clearing stored credentials");
            if let Err(e) = self.store.delete() {
                warn!(error = %e, "Failed to delete rejected token");
            }
            return Err(ApiError::AuthenticationRequired);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(%status, endpoint, body = %ApiError::truncate_body(&body), "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::default()).await
    }

    // ===== Authentication =====

    /// Exchange credentials for a token. Does not store the token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let options = RequestOptions::new(Method::POST).json(&LoginRequest { email, password })?;
        self.request(LOGIN_PATH, options).await
    }

    /// Check the stored token and fetch the user it belongs to
    pub async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        self.get(VERIFY_PATH).await
    }

    // ===== Jobs =====

    pub async fn jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.get(JOBS_PATH).await
    }

    pub async fn job(&self, id: i64) -> Result<Job, ApiError> {
        self.get(&format!("{}/{}", JOBS_PATH, id)).await
    }

    pub async fn job_elements(&self, job_id: i64) -> Result<Vec<JobElement>, ApiError> {
        self.get(&format!("{}/{}/elements", JOBS_PATH, job_id)).await
    }

    // ===== Elements =====

    pub async fn element(&self, id: i64) -> Result<Element, ApiError> {
        self.get(&format!("{}/{}", ELEMENTS_PATH, id)).await
    }

    /// Find an element by its external code. `None` when the server
    /// answers with an empty (`null`) body.
    pub async fn lookup_element(&self, element_code: &str) -> Result<Option<Element>, ApiError> {
        let endpoint = format!("{}/{}", ELEMENT_LOOKUP_PATH, urlencoding::encode(element_code));
        self.get(&endpoint).await
    }

    pub async fn update_element(&self, id: i64, update: &ElementUpdate) -> Result<Element, ApiError> {
        let options = RequestOptions::new(Method::PUT).json(update)?;
        self.request(&format!("{}/{}", ELEMENTS_PATH, id), options).await
    }

    // ===== Dashboard =====

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get(DASHBOARD_STATS_PATH).await
    }

    pub async fn dashboard_activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.get(DASHBOARD_ACTIVITIES_PATH).await
    }

    /// Fetch stats and activities concurrently
    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        let (stats, activities) =
            futures::future::try_join(self.dashboard_stats(), self.dashboard_activities()).await?;
        Ok(Dashboard { stats, activities })
    }
}
