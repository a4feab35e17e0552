// Remote session provider: owns the single shared backend handle and tells the
// query layer whether it may fetch yet.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::backend::TravelBackend;
use crate::models::Principal;

#[derive(Clone, Default)]
pub struct SessionState {
    pub handle: Option<Arc<dyn TravelBackend>>,
    pub establishing: bool,
    pub identity: Option<Principal>,
}

impl SessionState {
    // Queries may run only with a handle present and no establishment underway.
    pub fn is_ready(&self) -> bool {
        self.handle.is_some() && !self.establishing
    }

    pub fn ready_handle(&self) -> Option<Arc<dyn TravelBackend>> {
        if self.establishing {
            return None;
        }
        self.handle.clone()
    }

    // Authenticated callers only; the anonymous principal does not count.
    pub fn authenticated_identity(&self) -> Option<&Principal> {
        self.identity.as_ref().filter(|p| !p.is_anonymous())
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("has_handle", &self.handle.is_some())
            .field("establishing", &self.establishing)
            .field("identity", &self.identity)
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionProvider {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(sender),
        }
    }

    pub fn begin_establishing(&self) {
        info!("establishing remote session");
        self.state.send_modify(|state| state.establishing = true);
    }

    pub fn establish(&self, handle: Arc<dyn TravelBackend>, identity: Option<Principal>) {
        info!(identity = ?identity, "remote session established");
        self.state.send_modify(|state| {
            state.handle = Some(handle);
            state.identity = identity;
            state.establishing = false;
        });
    }

    // Drops the handle. Cache teardown is the caller's job, see `TravelClient::logout`.
    pub fn tear_down(&self) {
        info!("remote session torn down");
        self.state.send_replace(SessionState::default());
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    pub fn is_establishing(&self) -> bool {
        self.state.borrow().establishing
    }

    pub fn handle(&self) -> Option<Arc<dyn TravelBackend>> {
        self.state.borrow().ready_handle()
    }

    pub fn identity(&self) -> Option<Principal> {
        self.state.borrow().authenticated_identity().cloned()
    }

    /// Suspend until the session is ready and return the handle.
    pub async fn wait_until_ready(&self) -> Arc<dyn TravelBackend> {
        let mut receiver = self.state.subscribe();
        loop {
            if let Some(handle) = receiver.borrow_and_update().ready_handle() {
                return handle;
            }
            // The sender is owned by `self`, so the channel stays open while we wait.
            let _ = receiver.changed().await;
        }
    }
}
