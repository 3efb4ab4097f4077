use std::sync::Arc;
use std::time::Duration;

use super::remote::RemoteStore;

/// Decides, on every call, whether the remote store can be reached.
#[derive(Clone)]
pub struct ConnectivityProbe {
    remote: Arc<dyn RemoteStore>,
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(remote: Arc<dyn RemoteStore>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    /// Any error, including running past the timeout, counts as unreachable.
    pub async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.remote.probe()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe failed: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe timed out after {:?}", self.timeout);
                false
            }
        }
    }
}
