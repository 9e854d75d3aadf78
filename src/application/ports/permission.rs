//! Microphone permission port

use async_trait::async_trait;
use tokio::sync::oneshot;

/// Outcome of a microphone access request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied,
}

impl Authorization {
    pub fn is_granted(&self) -> bool {
        *self == Self::Granted
    }
}

impl From<bool> for Authorization {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Port for requesting microphone access.
///
/// Each call yields exactly one [`Authorization`]. Implementations must
/// fail closed: an unreachable platform service is reported as `Denied`.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request_access(&self) -> Authorization;
}

/// Sending half handed to a platform callback. Consuming `self` makes the
/// callback single-shot.
#[derive(Debug)]
pub struct AuthorizationCallback {
    tx: oneshot::Sender<Authorization>,
}

impl AuthorizationCallback {
    pub fn resolve(self, authorization: Authorization) {
        // Receiver gone means the requester stopped waiting
        let _ = self.tx.send(authorization);
    }

    pub fn grant(self) {
        self.resolve(Authorization::Granted);
    }

    pub fn deny(self) {
        self.resolve(Authorization::Denied);
    }
}

/// Receiving half awaited by the requester on its own task
#[derive(Debug)]
pub struct PendingAuthorization {
    rx: oneshot::Receiver<Authorization>,
}

impl PendingAuthorization {
    /// Wait for the callback. A callback dropped without answering counts as `Denied`.
    pub async fn resolve(self) -> Authorization {
        self.rx.await.unwrap_or(Authorization::Denied)
    }
}

/// Create a one-shot channel bridging a platform callback back to the requester.
pub fn authorization_channel() -> (AuthorizationCallback, PendingAuthorization) {
    let (tx, rx) = oneshot::channel();
    (AuthorizationCallback { tx }, PendingAuthorization { rx })
}
