//! Membership API client
//!
//! Talks to the backend's roster endpoints over HTTP. Every request carries
//! the bearer token of the signed-in user.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use roster_core::member::{Identity, ImportOutcome, MembershipRequest};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::AuthContext;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::target::ImportTarget;

const FETCH_FALLBACK: &str = "Failed to load the roster. Please try again.";
const ADD_FALLBACK: &str = "Failed to add the member. Please try again.";
const REMOVE_FALLBACK: &str = "Failed to remove the member. Please try again.";

/// Operations the roster controller needs from the backend
#[async_trait]
pub trait MembershipApi: Send + Sync {
    /// Get every member of the target
    async fn fetch_roster(&self, target: &ImportTarget) -> Result<Vec<Identity>>;

    /// Add one member
    async fn add_member(&self, target: &ImportTarget, request: &MembershipRequest)
        -> Result<Identity>;

    /// Remove one member by id
    async fn remove_member(&self, target: &ImportTarget, member_id: &str) -> Result<()>;

    /// Submit a whole batch in a single call
    async fn bulk_import(
        &self,
        target: &ImportTarget,
        requests: &[MembershipRequest],
    ) -> Result<ImportOutcome>;
}

/// Identity as the backend spells it; id and name fields vary by endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIdentity {
    id: Option<WireId>,
    student_id: Option<WireId>,
    user_id: Option<WireId>,
    uid: Option<WireId>,
    #[serde(default)]
    email: String,
    display_name: Option<String>,
    name: Option<String>,
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            Self::Text(id) => id,
            Self::Number(id) => id.to_string(),
        }
    }
}

impl WireIdentity {
    fn into_identity(self) -> Identity {
        let email = self.email.trim().to_string();
        let id = self
            .id
            .or(self.student_id)
            .or(self.user_id)
            .or(self.uid)
            .map(WireId::into_string)
            .unwrap_or_else(|| email.clone());
        let display_name = self
            .display_name
            .or(self.name)
            .or(self.full_name)
            .filter(|name| !name.trim().is_empty());

        match display_name {
            Some(name) => Identity::new(id, email).with_display_name(name),
            None => Identity::new(id, email),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RosterResponse {
    List(Vec<WireIdentity>),
    Students { students: Vec<WireIdentity> },
    Users { users: Vec<WireIdentity> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddMemberResponse {
    Student { student: WireIdentity },
    User { user: WireIdentity },
    Bare(WireIdentity),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkImportResponse {
    #[serde(default)]
    added_students: Vec<WireIdentity>,
    #[serde(default)]
    added_users: Vec<WireIdentity>,
    #[serde(default)]
    skipped_emails: Vec<String>,
}

/// Pull the `error` or `message` field out of a failure body
fn server_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|detail| !detail.is_empty())
        .map(str::to_string)
}

/// reqwest-backed [`MembershipApi`]
pub struct HttpMembershipClient {
    client: Client,
    base_url: String,
    auth: AuthContext,
}

impl HttpMembershipClient {
    pub fn new(config: &ClientConfig, auth: AuthContext) -> Result<Self> {
        let mut builder = Client::builder();
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.auth.bearer_token().ok_or(ClientError::Unauthenticated)?;
        Ok(request.bearer_auth(token))
    }

    /// Send a request, turning transport errors and non-2xx statuses into
    /// `SubmissionFailed` with the server's detail when it gave one
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response> {
        let response = self.authorized(request)?.send().await.map_err(|e| {
            warn!("Membership request failed to send: {}", e);
            ClientError::submission_failed(fallback, None)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = server_detail(&body).unwrap_or_else(|| fallback.to_string());
            warn!(status = status.as_u16(), %message, "Membership request rejected");
            return Err(ClientError::submission_failed(message, Some(status.as_u16())));
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T> {
        let status = response.status().as_u16();
        response.json::<T>().await.map_err(|e| {
            warn!("Unexpected membership response body: {}", e);
            ClientError::submission_failed(fallback, Some(status))
        })
    }
}

#[async_trait]
impl MembershipApi for HttpMembershipClient {
    async fn fetch_roster(&self, target: &ImportTarget) -> Result<Vec<Identity>> {
        let url = self.url(&target.list_path());
        debug!("Fetching roster: {}", url);

        let response = self.send(self.client.get(url), FETCH_FALLBACK).await?;
        let members = match Self::decode::<RosterResponse>(response, FETCH_FALLBACK).await? {
            RosterResponse::List(members)
            | RosterResponse::Students { students: members }
            | RosterResponse::Users { users: members } => members,
        };

        Ok(members.into_iter().map(WireIdentity::into_identity).collect())
    }

    async fn add_member(
        &self,
        target: &ImportTarget,
        request: &MembershipRequest,
    ) -> Result<Identity> {
        let url = self.url(&target.add_path());
        info!("Adding member to roster: {}", url);

        let response = self
            .send(self.client.post(url).json(&target.add_body(request)), ADD_FALLBACK)
            .await?;
        let wire = match Self::decode::<AddMemberResponse>(response, ADD_FALLBACK).await? {
            AddMemberResponse::Student { student } => student,
            AddMemberResponse::User { user } => user,
            AddMemberResponse::Bare(identity) => identity,
        };

        let mut identity = wire.into_identity();
        if identity.email.is_empty() {
            identity = Identity::new(identity.id, request.email.clone());
        }
        Ok(identity)
    }

    async fn remove_member(&self, target: &ImportTarget, member_id: &str) -> Result<()> {
        let url = self.url(&target.member_path(member_id));
        info!("Removing member from roster: {}", url);

        self.send(self.client.delete(url), REMOVE_FALLBACK).await?;
        Ok(())
    }

    async fn bulk_import(
        &self,
        target: &ImportTarget,
        requests: &[MembershipRequest],
    ) -> Result<ImportOutcome> {
        let url = self.url(&target.bulk_path());
        let fallback = target.kind().failure_fallback();
        info!(count = requests.len(), "Sending bulk import request: {}", url);

        let response = self
            .send(self.client.post(url).json(&target.bulk_body(requests)), fallback)
            .await?;
        let body = Self::decode::<BulkImportResponse>(response, fallback).await?;

        let added = body
            .added_students
            .into_iter()
            .chain(body.added_users)
            .map(WireIdentity::into_identity)
            .collect();
        Ok(ImportOutcome::new(added, body.skipped_emails))
    }
}
