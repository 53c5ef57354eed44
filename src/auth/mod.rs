pub mod manager;
pub mod session;

#[allow(unused_imports)]
pub use manager::{
    authenticate, AuthError, AuthObserver, AuthPrompt, AuthSessionManager, AuthState,
    ConsolePrompt, TracingObserver,
};
pub use session::SessionStore;
