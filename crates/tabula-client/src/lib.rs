// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tabula_app::{QueryError, QueryRequest, QueryResponse, QueryTransport};
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_STEP_UP_PATH: &str = "/auth/step-up";
pub const STEP_UP_REQUIRED: &str = "STEP_UP_REQUIRED";

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Applied(Value),
    NoContent,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
    token: Option<String>,
    step_up_path: String,
    return_base: Url,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("server.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                base_url.scheme()
            );
        }

        let mut return_base = base_url.clone();
        return_base.set_path("/");
        return_base.set_query(None);

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
            token: None,
            step_up_path: DEFAULT_STEP_UP_PATH.to_owned(),
            return_base,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn with_step_up_path(mut self, path: &str) -> Self {
        if !path.trim().is_empty() {
            self.step_up_path = path.trim().to_owned();
        }
        self
    }

    /// Sets where the admin screens live. Step-up redirects send the user
    /// back to `<base>/<resource>` instead of the API route that failed.
    pub fn with_return_to(mut self, base: &str) -> Result<Self> {
        let trimmed = base.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(self);
        }
        self.return_base = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("server.return_to {trimmed:?} is not a valid URL"))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, QueryError> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|error| QueryError::Transport(format!("bad endpoint {endpoint:?}: {error}")))
    }

    /// The screen a request to `endpoint` was made from: the first path
    /// segment of the endpoint under the return base.
    pub fn return_address(&self, endpoint: &str) -> String {
        let screen = endpoint
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        match self.return_base.join(screen) {
            Ok(url) => url.into(),
            Err(_) => self.return_base.to_string(),
        }
    }

    /// Address of the re-authentication page for `scope`, carrying the
    /// address to come back to once the user has stepped up.
    pub fn step_up_redirect(&self, scope: &str, return_to: &str) -> String {
        let mut redirect = match self.base_url.join(&self.step_up_path) {
            Ok(url) => url,
            Err(_) => self.base_url.clone(),
        };
        redirect
            .query_pairs_mut()
            .append_pair("scope", scope)
            .append_pair("return_to", return_to);
        redirect.into()
    }

    pub fn run_query(
        &self,
        endpoint: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError> {
        let reply = self.post(endpoint, request)?;
        if !reply.status.is_success() {
            return Err(self.classify(endpoint, &reply));
        }
        serde_json::from_str(&reply.body).map_err(|error| {
            warn!(url = %reply.url, %error, "undecodable query response");
            QueryError::Decode(format!("{endpoint}: {error}"))
        })
    }

    pub fn mutate(&self, endpoint: &str, body: &Value) -> Result<MutationOutcome, QueryError> {
        let reply = self.post(endpoint, body)?;
        if reply.status == StatusCode::NO_CONTENT {
            return Ok(MutationOutcome::NoContent);
        }
        if !reply.status.is_success() {
            return Err(self.classify(endpoint, &reply));
        }
        if reply.body.trim().is_empty() {
            return Ok(MutationOutcome::NoContent);
        }
        serde_json::from_str(&reply.body)
            .map(MutationOutcome::Applied)
            .map_err(|error| QueryError::Decode(format!("{endpoint}: {error}")))
    }

    fn post(&self, endpoint: &str, body: &impl Serialize) -> Result<Reply, QueryError> {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .authorize(self.http.post(url.clone()))
            .json(body)
            .send()
            .map_err(|error| {
                warn!(%url, %error, "request failed");
                QueryError::Transport(format!("cannot reach {}: {error}", self.base_url()))
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|error| QueryError::Transport(format!("read response body: {error}")))?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "response received");
        Ok(Reply { url, status, body })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn classify(&self, endpoint: &str, reply: &Reply) -> QueryError {
        let envelope = serde_json::from_str::<ErrorEnvelope>(&reply.body).unwrap_or_default();
        if reply.status == StatusCode::FORBIDDEN && envelope.code.as_deref() == Some(STEP_UP_REQUIRED)
        {
            let scope = envelope.scope.unwrap_or_default();
            let redirect = self.step_up_redirect(&scope, &self.return_address(endpoint));
            warn!(url = %reply.url, scope = %scope, "step-up required");
            return QueryError::StepUp { scope, redirect };
        }

        let message = envelope
            .message
            .or(envelope.error)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| short_body(&reply.body, reply.status));

        if reply.status == StatusCode::CONFLICT {
            return QueryError::Conflict(message);
        }
        QueryError::Http {
            status: reply.status.as_u16(),
            message,
        }
    }
}

impl QueryTransport for Client {
    fn query(
        &mut self,
        endpoint: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError> {
        self.run_query(endpoint, request)
    }
}

struct Reply {
    url: Url,
    status: StatusCode,
    body: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    code: Option<String>,
    scope: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

fn short_body(body: &str, status: StatusCode) -> String {
    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return body.to_owned();
    }
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("status {}", status.as_u16()))
}
