//! Thin adapter over Instagram's private web API.
//!
//! Only the handful of endpoints the bot needs: credential login,
//! challenge/two-factor steps, the `direct_v2` inbox and text broadcast.
//! Session state (cookies, csrf token, account id) lives behind an
//! `RwLock` and round-trips through [`export_session`]/[`import_session`]
//! as an opaque JSON blob.

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    ChallengeMethod, InboundMessage, InboxThread, LoginOutcome, PlatformClient, PlatformError,
};

const API_BASE: &str = "https://i.instagram.com/api/v1";
const DEVICE_USER_AGENT: &str =
    "Instagram 85.0.0.21.100 Android (24/7.0; 380dpi; 1080x1920; Xiaomi; MI 5s; capricorn; qcom; en_US)";

/// Serializable session state; the opaque blob handed to the session store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionState {
    user_id: Option<i64>,
    csrf_token: Option<String>,
    session_id: Option<String>,
    two_factor_identifier: Option<String>,
    challenge_path: Option<String>,
}

pub struct InstagramClient {
    http: reqwest::Client,
    username: String,
    password: String,
    device_id: String,
    guid: String,
    state: RwLock<SessionState>,
}

impl InstagramClient {
    pub fn new(username: &str, password: &str) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            username: username.to_string(),
            password: password.to_string(),
            device_id: format!("android-{}", random_hex(16)),
            guid: random_hex(32),
            state: RwLock::new(SessionState::default()),
        })
    }

    fn url(path: &str) -> String {
        format!("{API_BASE}/{path}")
    }

    async fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = DEVICE_USER_AGENT.parse() {
            headers.insert(USER_AGENT, value);
        }

        let state = self.state.read().await;
        let mut cookies = Vec::new();
        if let Some(csrf) = &state.csrf_token {
            cookies.push(format!("csrftoken={csrf}"));
        }
        if let Some(session) = &state.session_id {
            cookies.push(format!("sessionid={session}"));
        }
        if !cookies.is_empty() {
            if let Ok(value) = cookies.join("; ").parse() {
                headers.insert(COOKIE, value);
            }
        }
        headers
    }

    /// Captures csrftoken/sessionid cookies from a response.
    async fn absorb_cookies(&self, headers: &HeaderMap) {
        let mut state = self.state.write().await;
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else { continue };
            if let Some(token) = pair.strip_prefix("csrftoken=") {
                state.csrf_token = Some(token.to_string());
            } else if let Some(session) = pair.strip_prefix("sessionid=") {
                state.session_id = Some(session.to_string());
            }
        }
    }

    async fn get_json(&self, path: &str) -> Result<(reqwest::StatusCode, Value), PlatformError> {
        let response = self
            .http
            .get(Self::url(path))
            .headers(self.request_headers().await)
            .send()
            .await?;

        let status = response.status();
        self.absorb_cookies(response.headers()).await;
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<(reqwest::StatusCode, Value), PlatformError> {
        let response = self
            .http
            .post(Self::url(path))
            .headers(self.request_headers().await)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        self.absorb_cookies(response.headers()).await;
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// Interprets a login-shaped response body shared by the credential,
    /// challenge-code and two-factor endpoints.
    async fn interpret_login_response(&self, body: &Value) -> LoginOutcome {
        if let Some(user_id) = body
            .pointer("/logged_in_user/pk")
            .and_then(Value::as_i64)
        {
            let mut state = self.state.write().await;
            state.user_id = Some(user_id);
            state.challenge_path = None;
            state.two_factor_identifier = None;
            return LoginOutcome::Success;
        }

        if body
            .get("two_factor_required")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            let identifier = body
                .pointer("/two_factor_info/two_factor_identifier")
                .and_then(Value::as_str)
                .map(str::to_string);
            self.state.write().await.two_factor_identifier = identifier;
            return LoginOutcome::TwoFactorRequired;
        }

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");

        if message == "challenge_required" {
            let path = body
                .pointer("/challenge/api_path")
                .and_then(Value::as_str)
                .map(|p| p.trim_start_matches('/').to_string());
            self.state.write().await.challenge_path = path;
            return LoginOutcome::ChallengeRequired;
        }

        LoginOutcome::Failed(message.to_string())
    }

    async fn challenge_path(&self) -> Result<String, PlatformError> {
        self.state
            .read()
            .await
            .challenge_path
            .clone()
            .ok_or_else(|| PlatformError::Api("No challenge in progress".to_string()))
    }
}

#[async_trait]
impl PlatformClient for InstagramClient {
    async fn is_authenticated(&self) -> Result<bool, PlatformError> {
        if self.state.read().await.session_id.is_none() {
            return Ok(false);
        }

        let (status, body) = self.get_json("accounts/current_user/").await?;
        if !status.is_success() {
            return Ok(false);
        }
        if let Some(user_id) = body.pointer("/user/pk").and_then(Value::as_i64) {
            self.state.write().await.user_id = Some(user_id);
        }
        Ok(body.get("status").and_then(Value::as_str) == Some("ok"))
    }

    async fn login(&self) -> Result<LoginOutcome, PlatformError> {
        debug!("Attempting credential login for {}", self.username);
        let (_, body) = self
            .post_form(
                "accounts/login/",
                &[
                    ("username", self.username.as_str()),
                    ("password", self.password.as_str()),
                    ("device_id", self.device_id.as_str()),
                    ("guid", self.guid.as_str()),
                    ("login_attempt_count", "0"),
                ],
            )
            .await?;

        Ok(self.interpret_login_response(&body).await)
    }

    async fn challenge_method(&self) -> Result<ChallengeMethod, PlatformError> {
        let path = self.challenge_path().await?;
        let (status, body) = self.get_json(&path).await?;
        if !status.is_success() && body.is_null() {
            return Err(PlatformError::Api(format!(
                "Challenge lookup failed with status {status}"
            )));
        }

        let hint = body
            .pointer("/step_data/phone_number")
            .and_then(Value::as_str)
            .map(str::to_string);

        match hint {
            Some(hint) => Ok(ChallengeMethod::SmsToKnownPhone { hint: Some(hint) }),
            None => Ok(ChallengeMethod::PhoneRequired),
        }
    }

    async fn submit_phone_number(&self, phone: &str) -> Result<(), PlatformError> {
        let path = self.challenge_path().await?;
        let (status, body) = self
            .post_form(&path, &[("phone_number", phone)])
            .await?;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("phone submission rejected");
            return Err(PlatformError::Api(message.to_string()));
        }
        Ok(())
    }

    async fn request_sms_code(&self) -> Result<(), PlatformError> {
        let path = self.challenge_path().await?;
        // choice 0 selects SMS verification
        let (status, body) = self.post_form(&path, &[("choice", "0")]).await?;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("code request rejected");
            return Err(PlatformError::Api(message.to_string()));
        }
        Ok(())
    }

    async fn verify_challenge_code(&self, code: &str) -> Result<LoginOutcome, PlatformError> {
        let path = self.challenge_path().await?;
        let (_, body) = self.post_form(&path, &[("security_code", code)]).await?;
        Ok(self.interpret_login_response(&body).await)
    }

    async fn two_factor_login(&self, code: &str) -> Result<LoginOutcome, PlatformError> {
        let identifier = self
            .state
            .read()
            .await
            .two_factor_identifier
            .clone()
            .unwrap_or_default();

        let (_, body) = self
            .post_form(
                "accounts/two_factor_login/",
                &[
                    ("username", self.username.as_str()),
                    ("verification_code", code),
                    ("two_factor_identifier", identifier.as_str()),
                    ("device_id", self.device_id.as_str()),
                ],
            )
            .await?;

        Ok(self.interpret_login_response(&body).await)
    }

    async fn pending_threads(&self) -> Result<Vec<String>, PlatformError> {
        let (status, body) = self.get_json("direct_v2/pending_inbox/").await?;
        if !status.is_success() {
            return Err(PlatformError::Api(format!(
                "Pending inbox fetch failed with status {status}"
            )));
        }

        let threads = body
            .pointer("/inbox/threads")
            .and_then(Value::as_array)
            .map(|threads| {
                threads
                    .iter()
                    .filter_map(|t| t.get("thread_id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(threads)
    }

    async fn approve_pending_thread(&self, thread_id: &str) -> Result<(), PlatformError> {
        let path = format!("direct_v2/threads/{thread_id}/approve/");
        let (status, _) = self.post_form(&path, &[]).await?;
        if !status.is_success() {
            return Err(PlatformError::Api(format!(
                "Approving thread {thread_id} failed with status {status}"
            )));
        }
        Ok(())
    }

    async fn inbox_threads(&self, page_count: usize) -> Result<Vec<InboxThread>, PlatformError> {
        let limit = page_count.to_string();
        let path = format!("direct_v2/inbox/?limit={limit}&thread_message_limit=20");
        let (status, body) = self.get_json(&path).await?;
        if !status.is_success() {
            return Err(PlatformError::Api(format!(
                "Inbox fetch failed with status {status}"
            )));
        }

        let mut result = Vec::new();
        let threads = body
            .pointer("/inbox/threads")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for thread in threads {
            let Some(thread_id) = thread.get("thread_id").and_then(Value::as_str) else {
                warn!("Inbox thread without thread_id, skipping");
                continue;
            };

            let messages = thread
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter(|item| {
                            item.get("item_type").and_then(Value::as_str) == Some("text")
                        })
                        .filter_map(|item| {
                            Some(InboundMessage {
                                thread_id: thread_id.to_string(),
                                item_id: item.get("item_id")?.as_str()?.to_string(),
                                sender_id: item.get("user_id")?.as_i64()?,
                                text: item.get("text")?.as_str()?.to_string(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            result.push(InboxThread {
                thread_id: thread_id.to_string(),
                messages,
            });
        }

        Ok(result)
    }

    async fn mark_thread_seen(&self, thread_id: &str, item_id: &str) -> Result<(), PlatformError> {
        let path = format!("direct_v2/threads/{thread_id}/items/{item_id}/seen/");
        let (status, _) = self.post_form(&path, &[]).await?;
        if !status.is_success() {
            return Err(PlatformError::Api(format!(
                "Marking item {item_id} seen failed with status {status}"
            )));
        }
        Ok(())
    }

    async fn send_text(&self, thread_id: &str, text: &str) -> Result<(), PlatformError> {
        let thread_ids = format!("[[{thread_id}]]");
        let client_context = random_hex(16);
        let (status, body) = self
            .post_form(
                "direct_v2/threads/broadcast/text/",
                &[
                    ("text", text),
                    ("thread_ids", thread_ids.as_str()),
                    ("client_context", client_context.as_str()),
                    ("action", "send_item"),
                ],
            )
            .await?;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("send failed");
            return Err(PlatformError::Api(message.to_string()));
        }
        Ok(())
    }

    async fn account_id(&self) -> Result<i64, PlatformError> {
        self.state
            .read()
            .await
            .user_id
            .ok_or_else(|| PlatformError::Session("No authenticated account id".to_string()))
    }

    async fn export_session(&self) -> Result<Vec<u8>, PlatformError> {
        let state = self.state.read().await;
        serde_json::to_vec(&*state).map_err(|e| PlatformError::Session(e.to_string()))
    }

    async fn import_session(&self, blob: &[u8]) -> Result<(), PlatformError> {
        let restored: SessionState =
            serde_json::from_slice(blob).map_err(|e| PlatformError::Session(e.to_string()))?;
        *self.state.write().await = restored;
        Ok(())
    }
}

fn random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}
