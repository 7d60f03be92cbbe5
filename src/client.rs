//! Authenticated API client.
//!
//! Wraps a [`reqwest::Client`] with the three behaviors every call to the
//! backend shares:
//!
//! - **Bearer attachment**: the current access credential, when one is
//!   cached, rides along on every request.
//! - **Single refresh on 401**: a request rejected as unauthorized
//!   triggers exactly one exchange of the refresh credential for a new
//!   token pair, then exactly one retry of the original request. A second
//!   401 on the retried request fails outright; there is no retry loop.
//!   Concurrent callers that hit 401 at the same time serialize behind one
//!   in-flight refresh: whoever arrives at the gate after a peer already
//!   rotated the tokens reuses the fresh access credential instead of
//!   spending the (now consumed) refresh credential again.
//! - **Cancellation**: every request races the client's
//!   [`CancellationToken`]; triggering it aborts in-flight calls with
//!   [`ApiError::Cancelled`]. The CLI wires the token to Ctrl-C.
//!
//! A failed refresh clears all cached credentials and surfaces
//! [`ApiError::Unauthorized`], the caller's cue to log in again.
//!
//! # Endpoint map
//!
//! | Method | Path (under `/api/v1`) | Wrapper |
//! |--------|------------------------|---------|
//! | `POST` | `/auth/register` | [`ApiClient::register`] |
//! | `POST` | `/auth/login` | [`ApiClient::login`] |
//! | `POST` | `/auth/refresh` | internal |
//! | `POST` | `/auth/logout` | [`ApiClient::logout`] |
//! | `GET`  | `/auth/me` | [`ApiClient::current_user`] |
//! | `POST` | `/auth/api-key/rotate` | [`ApiClient::rotate_api_key`] |
//! | `POST` | `/projects/` | [`ApiClient::create_project`] |
//! | `GET`  | `/projects/` | [`ApiClient::list_projects`] |
//! | `GET`  | `/projects/{id}` | [`ApiClient::get_project`] |
//! | `PUT`  | `/projects/{id}` | [`ApiClient::update_project`] |
//! | `DELETE` | `/projects/{id}` | [`ApiClient::delete_project`] |
//! | `POST` | `/projects/{id}/contributors` | [`ApiClient::add_contributor`] |
//! | `DELETE` | `/projects/{id}/contributors/{user_id}` | [`ApiClient::remove_contributor`] |
//! | `POST` | `/context/save` | [`ApiClient::save_context`] |
//! | `POST` | `/context/search` | [`ApiClient::search_context`] |
//! | `GET`  | `/context/{id}` | [`ApiClient::get_context`] |
//! | `POST` | `/context/retrieve` | [`ApiClient::retrieve_vectors`] |
//! | `GET`  | `/graphs/overview` | [`ApiClient::graph_overview`] |
//! | `GET`  | `/context/health` | [`ApiClient::health`] |

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::{extract_detail, ApiError};
use crate::models::{
    ContextChunk, ContributorAdded, ContributorRemoved, DeleteReceipt, GraphReport, HealthStatus,
    Project, SaveReceipt, TokenPair, User,
};

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Arc<CredentialStore>,
    /// Serializes token refreshes across concurrent 401s.
    refresh_gate: Mutex<()>,
    cancel: CancellationToken,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        credentials: Arc<CredentialStore>,
        cancel: CancellationToken,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            http: builder.build()?,
            credentials,
            refresh_gate: Mutex::new(()),
            cancel,
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Send one request, racing the cancellation token. No auth handling.
    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
        bearer: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ApiError::Cancelled),
            result = request.send() => Ok(result?),
        }
    }

    /// Issue an API request with the full auth contract: attach the cached
    /// access credential, and on 401 refresh once and retry once.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let sent_with = self.credentials.access_token();
        let response = self
            .send_once(&method, path, body.as_ref(), sent_with.as_deref())
            .await?;

        // Anything but a 401 on an authenticated request resolves here.
        // A 401 without a cached credential is a plain rejection (e.g. a
        // bad login); there is nothing to refresh.
        let stale = match sent_with {
            Some(token) if response.status() == StatusCode::UNAUTHORIZED => token,
            _ => return into_result(response).await,
        };

        let fresh = self.refresh_credentials(&stale).await?;
        let retried = self
            .send_once(&method, path, body.as_ref(), Some(&fresh))
            .await?;

        // A second 401 falls out of into_result as Unauthorized; the
        // request has already been retried once and will not be again.
        into_result(retried).await
    }

    /// Exchange the refresh credential for a new token pair.
    ///
    /// `stale` is the access token the failed request was sent with.
    /// Callers serialize on the gate; a caller that finds the cached token
    /// already rotated past `stale` skips the wire call entirely, so at
    /// most one refresh reaches the backend per token generation.
    async fn refresh_credentials(&self, stale: &str) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.credentials.access_token() {
            if current != stale {
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.credentials.refresh_token() else {
            self.credentials.clear();
            return Err(ApiError::Unauthorized {
                message: "no refresh credential cached".to_string(),
            });
        };

        let body = json!({ "refresh_token": refresh_token });
        let response = self
            .send_once(&Method::POST, "/auth/refresh", Some(&body), None)
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let pair: TokenPair = resp.json().await?;
                let access = pair.access_token.clone();
                self.credentials.store(pair);
                Ok(access)
            }
            Ok(resp) => {
                // Refresh rejected: the session is irrecoverable.
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                self.credentials.clear();
                Err(ApiError::Unauthorized {
                    message: extract_detail(status, &text),
                })
            }
            Err(err) => {
                self.credentials.clear();
                Err(err)
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.execute(Method::GET, path, None).await?;
        Ok(resp.json().await?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let resp = self.execute(Method::POST, path, Some(body)).await?;
        Ok(resp.json().await?)
    }

    async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let resp = self.execute(Method::PUT, path, Some(body)).await?;
        Ok(resp.json().await?)
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.execute(Method::DELETE, path, None).await?;
        Ok(resp.json().await?)
    }

    // ============ Auth ============

    /// Register a new account. The response carries the one-time API key;
    /// the backend never re-issues it.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        self.post_json(
            "/auth/register",
            json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    /// Exchange credentials for a token pair. Does not cache the pair;
    /// the session store owns that decision.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        self.post_json("/auth/login", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute(Method::POST, "/auth/logout", None).await?;
        Ok(())
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json("/auth/me").await
    }

    /// Rotate the account's API key. The new key appears exactly once in
    /// the response.
    pub async fn rotate_api_key(&self) -> Result<User, ApiError> {
        self.post_json("/auth/api-key/rotate", json!({})).await
    }

    // ============ Projects ============

    pub async fn create_project(&self, name: &str, description: &str) -> Result<Project, ApiError> {
        self.post_json(
            "/projects/",
            json!({ "name": name, "description": description }),
        )
        .await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get_json("/projects/").await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, ApiError> {
        self.get_json(&format!("/projects/{}", id)).await
    }

    /// Partial update; only the provided fields are sent.
    pub async fn update_project(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Project, ApiError> {
        let mut body = serde_json::Map::new();
        if let Some(name) = name {
            body.insert("name".to_string(), json!(name));
        }
        if let Some(description) = description {
            body.insert("description".to_string(), json!(description));
        }
        self.put_json(&format!("/projects/{}", id), serde_json::Value::Object(body))
            .await
    }

    pub async fn delete_project(&self, id: &str) -> Result<DeleteReceipt, ApiError> {
        self.delete_json(&format!("/projects/{}", id)).await
    }

    pub async fn add_contributor(
        &self,
        project_id: &str,
        email: &str,
    ) -> Result<ContributorAdded, ApiError> {
        self.post_json(
            &format!("/projects/{}/contributors", project_id),
            json!({ "email": email }),
        )
        .await
    }

    pub async fn remove_contributor(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<ContributorRemoved, ApiError> {
        self.delete_json(&format!("/projects/{}/contributors/{}", project_id, user_id))
            .await
    }

    // ============ Context ============

    pub async fn save_context(
        &self,
        content: &str,
        project_id: Option<&str>,
        tags: &[String],
        source: &str,
    ) -> Result<SaveReceipt, ApiError> {
        self.post_json(
            "/context/save",
            json!({
                "content": content,
                "project_id": project_id,
                "tags": tags,
                "source": source,
            }),
        )
        .await
    }

    /// Semantic search across the caller's accessible projects.
    pub async fn search_context(
        &self,
        query: &str,
        project_id: Option<&str>,
        limit: i64,
        similarity_threshold: f64,
    ) -> Result<Vec<ContextChunk>, ApiError> {
        self.post_json(
            "/context/search",
            json!({
                "query": query,
                "project_id": project_id,
                "limit": limit,
                "similarity_threshold": similarity_threshold,
            }),
        )
        .await
    }

    /// Fetch a single chunk's raw content by id.
    pub async fn get_context(&self, id: &str) -> Result<String, ApiError> {
        self.get_json(&format!("/context/{}", id)).await
    }

    /// Project-scoped vector retrieval. Unlike [`Self::search_context`],
    /// this searches only within the named project.
    pub async fn retrieve_vectors(
        &self,
        query: &str,
        project_id: &str,
        limit: i64,
        similarity_threshold: f64,
    ) -> Result<Vec<ContextChunk>, ApiError> {
        self.post_json(
            "/context/retrieve",
            json!({
                "query": query,
                "project_id": project_id,
                "limit": limit,
                "similarity_threshold": similarity_threshold,
            }),
        )
        .await
    }

    // ============ Analytics ============

    pub async fn graph_overview(
        &self,
        project_id: Option<&str>,
    ) -> Result<Vec<GraphReport>, ApiError> {
        let path = match project_id {
            Some(id) => format!("/graphs/overview?project_id={}", id),
            None => "/graphs/overview".to_string(),
        };
        self.get_json(&path).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get_json("/context/health").await
    }
}

/// Map a response to either itself (success) or the error taxonomy:
/// 401 → `Unauthorized`, other non-2xx → `Backend` with the message
/// extracted from the body.
async fn into_result(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = extract_detail(code, &text);

    if status == StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthorized { message })
    } else {
        Err(ApiError::Backend {
            status: code,
            message,
        })
    }
}
