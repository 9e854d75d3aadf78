//! Permission gate for desktop hosts
//!
//! Desktop audio stacks have no consent dialog. Access counts as granted when
//! the default host exposes an input device that reports at least one usable
//! configuration; anything else is a denial.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use crate::application::ports::{authorization_channel, Authorization, PermissionGate};

/// Probes the default cpal input device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalPermissionGate;

impl CpalPermissionGate {
    pub fn new() -> Self {
        Self
    }
}

fn probe() -> Authorization {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        debug!(host = ?host.id(), "no default input device");
        return Authorization::Denied;
    };

    match device.supported_input_configs() {
        Ok(mut configs) => Authorization::from(configs.next().is_some()),
        Err(e) => {
            debug!(error = %e, "input device refused to report configs");
            Authorization::Denied
        }
    }
}

#[async_trait]
impl PermissionGate for CpalPermissionGate {
    async fn request_access(&self) -> Authorization {
        let (callback, pending) = authorization_channel();

        // A failed spawn drops the callback, which resolves to Denied
        let _ = std::thread::Builder::new()
            .name("mic-permission".to_string())
            .spawn(move || callback.resolve(probe()));

        let authorization = pending.resolve().await;
        debug!(?authorization, "microphone access resolved");
        authorization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires audio hardware"]
    async fn grants_with_a_microphone() {
        assert!(CpalPermissionGate::new().request_access().await.is_granted());
    }
}
