//! Login/challenge/two-factor state machine.
//!
//! Each suspension point (phone entry, code entry) is a distinct state
//! awaiting exactly one external input, so tests can drive every
//! transition without console I/O. [`authenticate`] is the production
//! driver that loops a [`AuthPrompt`] until a terminal state.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::session::SessionStore;
use crate::platform::{ChallengeMethod, LoginOutcome, PlatformClient, PlatformError};
use crate::utils::validation::{normalize_phone_number, validate_challenge_code};

/// Errors produced while driving an authentication attempt.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Locally rejected input; the state is unchanged and the caller may
    /// re-prompt. No network call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The platform refused the authentication attempt.
    #[error("Authentication failed: {0}")]
    Failed(String),

    #[error("A step was driven from an incompatible state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Observable states of the authentication flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Start,
    /// Challenge needs a phone number before a code can be sent.
    AwaitingPhoneNumber,
    /// An SMS code is in flight; waiting for the user to type it.
    AwaitingChallengeCode,
    /// Waiting for a two-factor verification code.
    AwaitingTwoFactorCode,
    Authenticated,
    Failed(String),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed(_))
    }
}

/// Audit hook for externally visible state transitions.
///
/// The state machine never depends on an observer succeeding; the default
/// implementation just logs.
pub trait AuthObserver: Send + Sync {
    fn state_changed(&self, state: &AuthState);
}

/// Default observer that reports transitions through `tracing`.
pub struct TracingObserver;

impl AuthObserver for TracingObserver {
    fn state_changed(&self, state: &AuthState) {
        match state {
            AuthState::Failed(reason) => warn!("Auth state: failed ({reason})"),
            other => info!("Auth state: {other:?}"),
        }
    }
}

/// Source of the externally supplied inputs (phone number, codes).
#[async_trait]
pub trait AuthPrompt: Send + Sync {
    async fn phone_number(&self) -> Result<String, AuthError>;
    async fn challenge_code(&self) -> Result<String, AuthError>;
    async fn two_factor_code(&self) -> Result<String, AuthError>;
}

/// Drives the login/challenge/two-factor flow against the platform.
pub struct AuthSessionManager<P: PlatformClient> {
    platform: Arc<P>,
    store: SessionStore,
    observer: Arc<dyn AuthObserver>,
    state: AuthState,
}

impl<P: PlatformClient> AuthSessionManager<P> {
    pub fn new(platform: Arc<P>, store: SessionStore) -> Self {
        Self {
            platform,
            store,
            observer: Arc::new(TracingObserver),
            state: AuthState::Start,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AuthObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    async fn transition(&mut self, next: AuthState) {
        if next == AuthState::Authenticated {
            self.persist_session().await;
        }
        self.state = next;
        self.observer.state_changed(&self.state);
    }

    /// Saved on every transition into `Authenticated`, idempotent
    /// overwrite. A failed save only costs a re-login next start, so it is
    /// logged rather than failing the authentication.
    async fn persist_session(&self) {
        match self.platform.export_session().await {
            Ok(blob) => {
                if let Err(err) = self.store.save(&blob).await {
                    warn!("Failed to persist session blob: {err}");
                }
            }
            Err(err) => warn!("Failed to export session for persistence: {err}"),
        }
    }

    async fn fail_with(&mut self, err: PlatformError) -> AuthError {
        self.transition(AuthState::Failed(err.to_string())).await;
        AuthError::Platform(err)
    }

    /// Starts an attempt: restores a persisted session when present and
    /// falls back to a credential login.
    pub async fn begin(&mut self) -> Result<AuthState, AuthError> {
        if self.state != AuthState::Start {
            return Err(AuthError::InvalidState(format!(
                "begin() called in {:?}",
                self.state
            )));
        }

        // Restore before any network login attempt
        match self.store.load().await {
            Ok(Some(blob)) => {
                if let Err(err) = self.platform.import_session(&blob).await {
                    warn!("Persisted session could not be imported, logging in fresh: {err}");
                } else {
                    let restored = match self.platform.is_authenticated().await {
                        Ok(ok) => ok,
                        Err(err) => return Err(self.fail_with(err).await),
                    };
                    if restored {
                        info!("Restored persisted session, skipping login");
                        self.transition(AuthState::Authenticated).await;
                        return Ok(self.state.clone());
                    }
                }
            }
            Ok(None) => {}
            Err(err) => warn!("Failed to read persisted session: {err}"),
        }

        let outcome = match self.platform.login().await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail_with(err).await),
        };

        match outcome {
            LoginOutcome::Success => {
                self.transition(AuthState::Authenticated).await;
            }
            LoginOutcome::ChallengeRequired => {
                let method = match self.platform.challenge_method().await {
                    Ok(method) => method,
                    Err(err) => return Err(self.fail_with(err).await),
                };
                match method {
                    ChallengeMethod::PhoneRequired => {
                        self.transition(AuthState::AwaitingPhoneNumber).await;
                    }
                    ChallengeMethod::SmsToKnownPhone { hint } => {
                        if let Some(hint) = hint {
                            info!("Challenge code will be sent to {hint}");
                        }
                        if let Err(err) = self.platform.request_sms_code().await {
                            return Err(self.fail_with(err).await);
                        }
                        self.transition(AuthState::AwaitingChallengeCode).await;
                    }
                }
            }
            LoginOutcome::TwoFactorRequired => {
                self.transition(AuthState::AwaitingTwoFactorCode).await;
            }
            LoginOutcome::Failed(message) => {
                self.transition(AuthState::Failed(message)).await;
            }
        }

        Ok(self.state.clone())
    }

    /// Submits the phone number requested by a challenge.
    pub async fn submit_phone_number(&mut self, raw: &str) -> Result<AuthState, AuthError> {
        if self.state != AuthState::AwaitingPhoneNumber {
            return Err(AuthError::InvalidState(format!(
                "submit_phone_number() called in {:?}",
                self.state
            )));
        }

        let phone =
            normalize_phone_number(raw).map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        if let Err(err) = self.platform.submit_phone_number(&phone).await {
            return Err(self.fail_with(err).await);
        }
        self.transition(AuthState::AwaitingChallengeCode).await;
        Ok(self.state.clone())
    }

    /// Submits the SMS challenge code. Validation happens locally before
    /// any network call.
    pub async fn submit_challenge_code(&mut self, raw: &str) -> Result<AuthState, AuthError> {
        if self.state != AuthState::AwaitingChallengeCode {
            return Err(AuthError::InvalidState(format!(
                "submit_challenge_code() called in {:?}",
                self.state
            )));
        }

        let code =
            validate_challenge_code(raw).map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        let outcome = match self.platform.verify_challenge_code(&code).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail_with(err).await),
        };

        match outcome {
            LoginOutcome::Success => self.transition(AuthState::Authenticated).await,
            LoginOutcome::TwoFactorRequired => {
                self.transition(AuthState::AwaitingTwoFactorCode).await;
            }
            LoginOutcome::ChallengeRequired => {
                self.transition(AuthState::Failed("Challenge was not satisfied".to_string()))
                    .await;
            }
            LoginOutcome::Failed(message) => {
                self.transition(AuthState::Failed(message)).await;
            }
        }

        Ok(self.state.clone())
    }

    /// Submits the two-factor verification code. A renewed two-factor
    /// prompt keeps the state waiting for another code.
    pub async fn submit_two_factor_code(&mut self, raw: &str) -> Result<AuthState, AuthError> {
        if self.state != AuthState::AwaitingTwoFactorCode {
            return Err(AuthError::InvalidState(format!(
                "submit_two_factor_code() called in {:?}",
                self.state
            )));
        }

        let code = raw.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidInput(
                "Two-factor code cannot be empty".to_string(),
            ));
        }

        let outcome = match self.platform.two_factor_login(code).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail_with(err).await),
        };

        match outcome {
            LoginOutcome::Success => self.transition(AuthState::Authenticated).await,
            LoginOutcome::TwoFactorRequired => {
                warn!("Two-factor code rejected, a new code is required");
                self.transition(AuthState::AwaitingTwoFactorCode).await;
            }
            LoginOutcome::ChallengeRequired | LoginOutcome::Failed(_) => {
                let reason = match outcome {
                    LoginOutcome::Failed(message) => message,
                    _ => "Unexpected challenge during two-factor login".to_string(),
                };
                self.transition(AuthState::Failed(reason)).await;
            }
        }

        Ok(self.state.clone())
    }
}

/// Runs the full authentication flow to a terminal state, pulling phone
/// numbers and codes from `prompt` at each suspension point. Locally
/// invalid input re-prompts; platform failures end the attempt.
///
/// Returns the authenticated account id.
pub async fn authenticate<P: PlatformClient>(
    manager: &mut AuthSessionManager<P>,
    prompt: &dyn AuthPrompt,
) -> Result<i64, AuthError> {
    let mut state = manager.begin().await?;

    loop {
        match state {
            AuthState::Authenticated => {
                return Ok(manager.platform.account_id().await?);
            }
            AuthState::Failed(reason) => return Err(AuthError::Failed(reason)),
            AuthState::AwaitingPhoneNumber => {
                let phone = prompt.phone_number().await?;
                state = retry_invalid(manager.submit_phone_number(&phone).await, manager)?;
            }
            AuthState::AwaitingChallengeCode => {
                let code = prompt.challenge_code().await?;
                state = retry_invalid(manager.submit_challenge_code(&code).await, manager)?;
            }
            AuthState::AwaitingTwoFactorCode => {
                let code = prompt.two_factor_code().await?;
                state = retry_invalid(manager.submit_two_factor_code(&code).await, manager)?;
            }
            AuthState::Start => {
                return Err(AuthError::InvalidState(
                    "Authentication never left the start state".to_string(),
                ))
            }
        }
    }
}

/// Locally invalid input keeps the current state so the prompt runs again.
fn retry_invalid<P: PlatformClient>(
    result: Result<AuthState, AuthError>,
    manager: &AuthSessionManager<P>,
) -> Result<AuthState, AuthError> {
    match result {
        Ok(state) => Ok(state),
        Err(AuthError::InvalidInput(message)) => {
            warn!("{message}");
            Ok(manager.state().clone())
        }
        Err(err) => Err(err),
    }
}

/// Interactive prompt reading phone numbers and codes from stdin.
pub struct ConsolePrompt;

impl ConsolePrompt {
    async fn read_line(&self, question: &str) -> Result<String, AuthError> {
        println!("{question}");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        Ok(line.trim().to_string())
    }
}

#[async_trait]
impl AuthPrompt for ConsolePrompt {
    async fn phone_number(&self) -> Result<String, AuthError> {
        self.read_line("Enter the phone number for challenge verification:")
            .await
    }

    async fn challenge_code(&self) -> Result<String, AuthError> {
        self.read_line("Enter the 6-digit code you received:").await
    }

    async fn two_factor_code(&self) -> Result<String, AuthError> {
        self.read_line("Enter your two-factor code:").await
    }
}
