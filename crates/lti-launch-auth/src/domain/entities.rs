//! # Domain Entities
//!
//! Core data structures for launch authentication.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::errors::Rejection;

/// Request parameter names.
pub mod param {
    pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
    pub const OAUTH_NONCE: &str = "oauth_nonce";
    pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
    pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
    pub const OAUTH_SIGNATURE: &str = "oauth_signature";
    pub const OAUTH_VERSION: &str = "oauth_version";

    pub const LTI_MESSAGE_TYPE: &str = "lti_message_type";
    pub const LTI_VERSION: &str = "lti_version";
    pub const RESOURCE_LINK_ID: &str = "resource_link_id";

    /// OAuth fields that must be present and non-empty.
    pub const REQUIRED_OAUTH: [&str; 4] = [
        OAUTH_CONSUMER_KEY,
        OAUTH_NONCE,
        OAUTH_TIMESTAMP,
        OAUTH_SIGNATURE,
    ];

    /// Protocol fields that may appear at most once.
    pub const SINGLE_VALUED_OAUTH: [&str; 6] = [
        OAUTH_CONSUMER_KEY,
        OAUTH_NONCE,
        OAUTH_TIMESTAMP,
        OAUTH_SIGNATURE_METHOD,
        OAUTH_SIGNATURE,
        OAUTH_VERSION,
    ];

    /// Fields whose presence marks a request as an LTI launch.
    pub const REQUIRED_LTI: [&str; 3] = [LTI_MESSAGE_TYPE, LTI_VERSION, RESOURCE_LINK_ID];
}

// =============================================================================
// Launch Request
// =============================================================================

/// An inbound launch: method, URL and every request parameter.
///
/// The URL never carries a query string; query pairs are folded into
/// `params` on construction so that they are signed like body parameters.
/// They stay at the front of `params` and are left out of the form body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchRequest {
    method: String,
    url: String,
    params: Vec<(String, String)>,
    /// Leading entries of `params` that came from the URL query
    query_len: usize,
}

impl LaunchRequest {
    /// Create a request from already-decoded parameters.
    pub fn new(method: impl Into<String>, url: &str, params: Vec<(String, String)>) -> Self {
        let (url, query) = split_query(url);
        let mut all: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        let query_len = all.len();
        all.extend(params);

        Self {
            method: method.into(),
            url: url.to_string(),
            params: all,
            query_len,
        }
    }

    /// Create a request from an `application/x-www-form-urlencoded` body.
    pub fn from_form(method: impl Into<String>, url: &str, body: &[u8]) -> Self {
        let params = form_urlencoded::parse(body).into_owned().collect();
        Self::new(method, url, params)
    }

    /// Append a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Replace every occurrence of `name` with a single body value.
    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        self.remove_param(name);
        self.params.push((name.to_string(), value.into()));
    }

    /// Remove every occurrence of `name`.
    pub fn remove_param(&mut self, name: &str) {
        let removed_from_query = self.params[..self.query_len]
            .iter()
            .filter(|(n, _)| n == name)
            .count();
        self.query_len -= removed_from_query;
        self.params.retain(|(n, _)| n != name);
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request URL without query or fragment.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// First value of `name`, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of times `name` occurs.
    pub fn param_count(&self, name: &str) -> usize {
        self.params.iter().filter(|(n, _)| n == name).count()
    }

    pub fn consumer_key(&self) -> Option<&str> {
        self.param(param::OAUTH_CONSUMER_KEY)
    }

    pub fn nonce(&self) -> Option<&str> {
        self.param(param::OAUTH_NONCE)
    }

    pub fn signature(&self) -> Option<&str> {
        self.param(param::OAUTH_SIGNATURE)
    }

    pub fn signature_method(&self) -> Option<&str> {
        self.param(param::OAUTH_SIGNATURE_METHOD)
    }

    /// Parameters carried in the body, excluding those from the URL query.
    pub fn body_params(&self) -> &[(String, String)] {
        &self.params[self.query_len..]
    }

    /// Serialize the body parameters as a form body.
    ///
    /// Query parameters are omitted; they travel in the URL the body is
    /// posted to.
    pub fn to_form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.body_params().iter())
            .finish()
    }

    /// The URL with the query parameters re-attached.
    pub fn url_with_query(&self) -> String {
        if self.query_len == 0 {
            return self.url.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params[..self.query_len].iter())
            .finish();
        format!("{}?{}", self.url, query)
    }
}

fn split_query(url: &str) -> (&str, &str) {
    let url = match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    };
    match url.split_once('?') {
        Some((base, query)) => (base, query),
        None => (url, ""),
    }
}

// =============================================================================
// Consumers
// =============================================================================

/// Who signed a launch. Safe to hand downstream and to log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerIdentity {
    /// Store-assigned identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// The consumer key the launch was signed with
    pub key: String,
}

/// An active consumer's identity together with its shared secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerCredential {
    pub identity: ConsumerIdentity,
    pub secret: String,
}

impl fmt::Debug for ConsumerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerCredential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Result of resolving a consumer key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumerLookup {
    /// Consumer exists and may launch
    Active(ConsumerCredential),
    /// Consumer exists but has been revoked
    Revoked(ConsumerIdentity),
    /// No consumer holds this key
    NotFound,
}

// =============================================================================
// Outcome
// =============================================================================

/// Stage reached by the launch authenticator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStage {
    Start,
    ParametersChecked,
    ConsumerResolved,
    NonceChecked,
    SignatureVerified,
}

/// A launch that passed every check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthenticatedLaunch {
    pub consumer: ConsumerIdentity,
    pub message_type: String,
    pub lti_version: String,
    pub resource_link_id: String,
    /// Non-OAuth launch parameters, first occurrence of each name
    pub parameters: BTreeMap<String, String>,
}

impl AuthenticatedLaunch {
    pub(crate) fn from_request(consumer: ConsumerIdentity, request: &LaunchRequest) -> Self {
        let mut parameters = BTreeMap::new();
        for (name, value) in request.params() {
            if !name.starts_with("oauth_") {
                parameters
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        Self {
            consumer,
            message_type: request
                .param(param::LTI_MESSAGE_TYPE)
                .unwrap_or_default()
                .to_string(),
            lti_version: request
                .param(param::LTI_VERSION)
                .unwrap_or_default()
                .to_string(),
            resource_link_id: request
                .param(param::RESOURCE_LINK_ID)
                .unwrap_or_default()
                .to_string(),
            parameters,
        }
    }
}

/// Final result of verifying a launch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LaunchOutcome {
    Accepted(AuthenticatedLaunch),
    Rejected { reason: Rejection },
}

impl LaunchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LaunchOutcome::Accepted(_))
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            LaunchOutcome::Accepted(_) => None,
            LaunchOutcome::Rejected { reason } => Some(*reason),
        }
    }

    pub fn accepted(&self) -> Option<&AuthenticatedLaunch> {
        match self {
            LaunchOutcome::Accepted(launch) => Some(launch),
            LaunchOutcome::Rejected { .. } => None,
        }
    }
}
