use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use diary_insta_bot::auth::{
    authenticate, AuthError, AuthObserver, AuthPrompt, AuthSessionManager, AuthState,
    SessionStore,
};
use diary_insta_bot::platform::{
    ChallengeMethod, InboxThread, LoginOutcome, PlatformClient, PlatformError,
};
use tempfile::{tempdir, TempDir};

/// Scripted platform double: login/verify outcomes are popped from queues,
/// every network-visible call is counted.
#[derive(Default)]
struct MockPlatform {
    restored_session_valid: bool,
    challenge: Option<ChallengeMethod>,
    login_outcomes: Mutex<VecDeque<LoginOutcome>>,
    verify_outcomes: Mutex<VecDeque<LoginOutcome>>,
    two_factor_outcomes: Mutex<VecDeque<LoginOutcome>>,
    login_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    two_factor_calls: AtomicUsize,
    sms_requests: AtomicUsize,
    phone_submissions: Mutex<Vec<String>>,
    imported_session: Mutex<Option<Vec<u8>>>,
}

impl MockPlatform {
    fn pop(queue: &Mutex<VecDeque<LoginOutcome>>) -> LoginOutcome {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(LoginOutcome::Failed("unscripted call".to_string()))
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn is_authenticated(&self) -> Result<bool, PlatformError> {
        Ok(self.restored_session_valid && self.imported_session.lock().unwrap().is_some())
    }

    async fn login(&self) -> Result<LoginOutcome, PlatformError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::pop(&self.login_outcomes))
    }

    async fn challenge_method(&self) -> Result<ChallengeMethod, PlatformError> {
        self.challenge
            .clone()
            .ok_or_else(|| PlatformError::Api("no challenge scripted".to_string()))
    }

    async fn submit_phone_number(&self, phone: &str) -> Result<(), PlatformError> {
        self.phone_submissions.lock().unwrap().push(phone.to_string());
        Ok(())
    }

    async fn request_sms_code(&self) -> Result<(), PlatformError> {
        self.sms_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn verify_challenge_code(&self, _code: &str) -> Result<LoginOutcome, PlatformError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::pop(&self.verify_outcomes))
    }

    async fn two_factor_login(&self, _code: &str) -> Result<LoginOutcome, PlatformError> {
        self.two_factor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::pop(&self.two_factor_outcomes))
    }

    async fn pending_threads(&self) -> Result<Vec<String>, PlatformError> {
        Ok(Vec::new())
    }

    async fn approve_pending_thread(&self, _thread_id: &str) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn inbox_threads(&self, _page_count: usize) -> Result<Vec<InboxThread>, PlatformError> {
        Ok(Vec::new())
    }

    async fn mark_thread_seen(
        &self,
        _thread_id: &str,
        _item_id: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn send_text(&self, _thread_id: &str, _text: &str) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn account_id(&self) -> Result<i64, PlatformError> {
        Ok(777)
    }

    async fn export_session(&self) -> Result<Vec<u8>, PlatformError> {
        Ok(b"exported-session".to_vec())
    }

    async fn import_session(&self, blob: &[u8]) -> Result<(), PlatformError> {
        *self.imported_session.lock().unwrap() = Some(blob.to_vec());
        Ok(())
    }
}

struct ScriptedPrompt {
    phones: Mutex<VecDeque<String>>,
    codes: Mutex<VecDeque<String>>,
    two_factor_codes: Mutex<VecDeque<String>>,
}

impl ScriptedPrompt {
    fn new(phones: &[&str], codes: &[&str], two_factor_codes: &[&str]) -> Self {
        let queue = |items: &[&str]| {
            Mutex::new(items.iter().map(|s| s.to_string()).collect::<VecDeque<_>>())
        };
        Self {
            phones: queue(phones),
            codes: queue(codes),
            two_factor_codes: queue(two_factor_codes),
        }
    }

    fn next(queue: &Mutex<VecDeque<String>>) -> Result<String, AuthError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AuthError::Failed("prompt script exhausted".to_string()))
    }
}

#[async_trait]
impl AuthPrompt for ScriptedPrompt {
    async fn phone_number(&self) -> Result<String, AuthError> {
        Self::next(&self.phones)
    }

    async fn challenge_code(&self) -> Result<String, AuthError> {
        Self::next(&self.codes)
    }

    async fn two_factor_code(&self) -> Result<String, AuthError> {
        Self::next(&self.two_factor_codes)
    }
}

#[derive(Default)]
struct RecordingObserver {
    states: Mutex<Vec<AuthState>>,
}

impl AuthObserver for RecordingObserver {
    fn state_changed(&self, state: &AuthState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

fn temp_store() -> (SessionStore, TempDir) {
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    (store, dir)
}

#[tokio::test]
async fn test_restored_session_short_circuits_login() {
    let (store, _dir) = temp_store();
    store.save(b"previous-session").await.unwrap();

    let platform = Arc::new(MockPlatform {
        restored_session_valid: true,
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(Arc::clone(&platform), store.clone());

    let state = manager.begin().await.unwrap();
    assert_eq!(state, AuthState::Authenticated);

    // No network login happened
    assert_eq!(platform.login_calls.load(Ordering::SeqCst), 0);

    // The session was re-persisted on entering Authenticated
    assert_eq!(store.load().await.unwrap().unwrap(), b"exported-session");
}

#[tokio::test]
async fn test_fresh_login_success_persists_session() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::Success])),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(Arc::clone(&platform), store.clone());

    let state = manager.begin().await.unwrap();
    assert_eq!(state, AuthState::Authenticated);
    assert_eq!(platform.login_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.load().await.unwrap().unwrap(), b"exported-session");
}

#[tokio::test]
async fn test_stale_persisted_session_falls_back_to_login() {
    let (store, _dir) = temp_store();
    store.save(b"stale").await.unwrap();

    let platform = Arc::new(MockPlatform {
        restored_session_valid: false,
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::Success])),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(Arc::clone(&platform), store);

    let state = manager.begin().await.unwrap();
    assert_eq!(state, AuthState::Authenticated);
    assert_eq!(platform.login_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_login_failure_is_terminal() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::Failed(
            "bad password".to_string(),
        )])),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(platform, store);

    let state = manager.begin().await.unwrap();
    assert_eq!(state, AuthState::Failed("bad password".to_string()));
    assert!(state.is_terminal());
}

#[tokio::test]
async fn test_challenge_phone_flow_validates_locally() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::ChallengeRequired])),
        challenge: Some(ChallengeMethod::PhoneRequired),
        verify_outcomes: Mutex::new(VecDeque::from([LoginOutcome::Success])),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(Arc::clone(&platform), store);

    assert_eq!(manager.begin().await.unwrap(), AuthState::AwaitingPhoneNumber);

    // Blank phone is rejected locally; state unchanged, nothing submitted
    let err = manager.submit_phone_number("   ").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));
    assert_eq!(*manager.state(), AuthState::AwaitingPhoneNumber);
    assert!(platform.phone_submissions.lock().unwrap().is_empty());

    // Valid phone is normalized with a leading +
    let state = manager.submit_phone_number("38 (050) 123-45-67").await.unwrap();
    assert_eq!(state, AuthState::AwaitingChallengeCode);
    assert_eq!(
        platform.phone_submissions.lock().unwrap().as_slice(),
        ["+380501234567"]
    );

    // Bad codes never reach the network
    for bad in ["12a456", "12345", "1234567", ""] {
        let err = manager.submit_challenge_code(bad).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)), "code {bad:?}");
    }
    assert_eq!(platform.verify_calls.load(Ordering::SeqCst), 0);

    // A valid 6-digit code goes through
    let state = manager.submit_challenge_code("123 456").await.unwrap();
    assert_eq!(state, AuthState::Authenticated);
    assert_eq!(platform.verify_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_challenge_with_known_phone_requests_code_directly() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::ChallengeRequired])),
        challenge: Some(ChallengeMethod::SmsToKnownPhone {
            hint: Some("+38*****4567".to_string()),
        }),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(Arc::clone(&platform), store);

    let state = manager.begin().await.unwrap();
    assert_eq!(state, AuthState::AwaitingChallengeCode);
    assert_eq!(platform.sms_requests.load(Ordering::SeqCst), 1);
    assert!(platform.phone_submissions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_renewed_two_factor_prompt_loops() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::TwoFactorRequired])),
        two_factor_outcomes: Mutex::new(VecDeque::from([
            LoginOutcome::TwoFactorRequired,
            LoginOutcome::Success,
        ])),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(Arc::clone(&platform), store);

    assert_eq!(manager.begin().await.unwrap(), AuthState::AwaitingTwoFactorCode);

    // First code is rejected with a renewed prompt
    let state = manager.submit_two_factor_code("111111").await.unwrap();
    assert_eq!(state, AuthState::AwaitingTwoFactorCode);

    let state = manager.submit_two_factor_code("222222").await.unwrap();
    assert_eq!(state, AuthState::Authenticated);
    assert_eq!(platform.two_factor_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_authenticate_driver_full_challenge_flow() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::ChallengeRequired])),
        challenge: Some(ChallengeMethod::PhoneRequired),
        verify_outcomes: Mutex::new(VecDeque::from([LoginOutcome::Success])),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(platform, store);

    // First code is locally invalid; the driver re-prompts for the second
    let prompt = ScriptedPrompt::new(&["380501234567"], &["12a456", "123456"], &[]);
    let account_id = authenticate(&mut manager, &prompt).await.unwrap();

    assert_eq!(account_id, 777);
    assert_eq!(*manager.state(), AuthState::Authenticated);
}

#[tokio::test]
async fn test_authenticate_driver_surfaces_failure_reason() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::Failed(
            "account disabled".to_string(),
        )])),
        ..MockPlatform::default()
    });
    let mut manager = AuthSessionManager::new(platform, store);

    let prompt = ScriptedPrompt::new(&[], &[], &[]);
    let err = authenticate(&mut manager, &prompt).await.unwrap_err();
    assert!(matches!(err, AuthError::Failed(reason) if reason == "account disabled"));
}

#[tokio::test]
async fn test_observer_sees_every_transition() {
    let (store, _dir) = temp_store();

    let platform = Arc::new(MockPlatform {
        login_outcomes: Mutex::new(VecDeque::from([LoginOutcome::ChallengeRequired])),
        challenge: Some(ChallengeMethod::PhoneRequired),
        verify_outcomes: Mutex::new(VecDeque::from([LoginOutcome::Success])),
        ..MockPlatform::default()
    });
    let observer = Arc::new(RecordingObserver::default());
    let mut manager = AuthSessionManager::new(platform, store)
        .with_observer(Arc::clone(&observer) as Arc<dyn AuthObserver>);

    manager.begin().await.unwrap();
    manager.submit_phone_number("380501234567").await.unwrap();
    manager.submit_challenge_code("123456").await.unwrap();

    let states = observer.states.lock().unwrap();
    assert_eq!(
        *states,
        vec![
            AuthState::AwaitingPhoneNumber,
            AuthState::AwaitingChallengeCode,
            AuthState::Authenticated,
        ]
    );
}
