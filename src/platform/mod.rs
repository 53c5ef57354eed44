//! Messaging-platform capability.
//!
//! The bot core only talks to [`PlatformClient`]; the Instagram adapter in
//! [`instagram`] is one implementation, test doubles are another.

pub mod instagram;

use async_trait::async_trait;
use thiserror::Error;

pub use instagram::InstagramClient;

/// Errors surfaced by the messaging platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Platform API error: {0}")]
    Api(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Outcome of a login or code-verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    /// The platform interposed an identity-verification challenge.
    ChallengeRequired,
    /// A two-factor code is required (or the supplied one was rejected
    /// with a fresh two-factor prompt).
    TwoFactorRequired,
    /// Any other platform-reported failure, with its message.
    Failed(String),
}

/// How the current challenge expects to be verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeMethod {
    /// The platform needs a phone number before it can send a code.
    PhoneRequired,
    /// A phone number is already on file; a code can be requested
    /// immediately. Carries the masked hint when the platform provides one.
    SmsToKnownPhone { hint: Option<String> },
}

/// One direct message pulled from an inbox thread.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub thread_id: String,
    pub item_id: String,
    pub sender_id: i64,
    pub text: String,
}

/// One inbox thread page entry with its unread text items.
#[derive(Debug, Clone)]
pub struct InboxThread {
    pub thread_id: String,
    pub messages: Vec<InboundMessage>,
}

/// Opaque capability over the messaging platform's private API.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Whether the current session is already authenticated.
    async fn is_authenticated(&self) -> Result<bool, PlatformError>;

    /// Attempts a credential login.
    async fn login(&self) -> Result<LoginOutcome, PlatformError>;

    /// Queries how the pending challenge wants to be verified.
    async fn challenge_method(&self) -> Result<ChallengeMethod, PlatformError>;

    /// Submits a phone number for challenge verification.
    async fn submit_phone_number(&self, phone: &str) -> Result<(), PlatformError>;

    /// Asks the platform to send an SMS code to the phone already on file.
    async fn request_sms_code(&self) -> Result<(), PlatformError>;

    /// Verifies a challenge code.
    async fn verify_challenge_code(&self, code: &str) -> Result<LoginOutcome, PlatformError>;

    /// Completes a two-factor login with the given code.
    async fn two_factor_login(&self, code: &str) -> Result<LoginOutcome, PlatformError>;

    /// Thread ids of conversation requests awaiting approval.
    async fn pending_threads(&self) -> Result<Vec<String>, PlatformError>;

    /// Accepts a pending conversation request.
    async fn approve_pending_thread(&self, thread_id: &str) -> Result<(), PlatformError>;

    /// Fetches a bounded page of inbox threads with their unread messages.
    async fn inbox_threads(&self, page_count: usize) -> Result<Vec<InboxThread>, PlatformError>;

    /// Marks a message as seen.
    async fn mark_thread_seen(&self, thread_id: &str, item_id: &str)
        -> Result<(), PlatformError>;

    /// Sends a text reply into a thread.
    async fn send_text(&self, thread_id: &str, text: &str) -> Result<(), PlatformError>;

    /// The bot's own account id, used for the self-message filter.
    async fn account_id(&self) -> Result<i64, PlatformError>;

    /// Serializes the session state into an opaque blob.
    async fn export_session(&self) -> Result<Vec<u8>, PlatformError>;

    /// Restores session state from a previously exported blob.
    async fn import_session(&self, blob: &[u8]) -> Result<(), PlatformError>;
}
