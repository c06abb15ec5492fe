//! Platform adapter boundary
//!
//! One adapter answers status queries and runs the consent flow for one
//! permission kind. Real adapters live in platform code; this module defines
//! the trait and provides in-memory adapters for tests and demos.

use async_trait::async_trait;
use consent_api::{NativeAuthorization, PermissionRequestConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

/// Error reported by an adapter's request flow
///
/// A user denying access is not an error; adapters report it as a status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("request cancelled by the platform")]
    Cancelled,
}

/// Platform collaborator for a single permission kind
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use consent_api::{NativeAuthorization, PermissionRequestConfig};
/// use consent_host::adapter::{AdapterError, PermissionAdapter};
///
/// struct AlwaysLimited;
///
/// #[async_trait]
/// impl PermissionAdapter for AlwaysLimited {
///     async fn current_status(&self) -> NativeAuthorization {
///         NativeAuthorization::Limited
///     }
///
///     async fn request_access(
///         &self,
///         _config: Option<&PermissionRequestConfig>,
///     ) -> Result<NativeAuthorization, AdapterError> {
///         Ok(NativeAuthorization::Limited)
///     }
/// }
/// ```
#[async_trait]
pub trait PermissionAdapter: Send + Sync {
    /// Observe the current native status without changing it
    async fn current_status(&self) -> NativeAuthorization;

    /// Run the consent flow; resolves exactly once
    ///
    /// May wait on user interaction for an arbitrary time.
    async fn request_access(
        &self,
        config: Option<&PermissionRequestConfig>,
    ) -> Result<NativeAuthorization, AdapterError>;
}

#[async_trait]
impl<A: PermissionAdapter + ?Sized> PermissionAdapter for Arc<A> {
    async fn current_status(&self) -> NativeAuthorization {
        (**self).current_status().await
    }

    async fn request_access(
        &self,
        config: Option<&PermissionRequestConfig>,
    ) -> Result<NativeAuthorization, AdapterError> {
        (**self).request_access(config).await
    }
}

// ============================================================================
// Auto adapter
// ============================================================================

/// Adapter that resolves every request to a fixed outcome
///
/// The outcome becomes the adapter's current status, as a real platform
/// would remember the user's answer.
#[derive(Debug)]
pub struct AutoAdapter {
    current: RwLock<NativeAuthorization>,
    outcome: NativeAuthorization,
}

impl AutoAdapter {
    /// Undecided adapter that grants on request
    pub fn granting() -> Self {
        Self::with_outcome(NativeAuthorization::Authorized)
    }

    /// Undecided adapter that denies on request
    pub fn denying() -> Self {
        Self::with_outcome(NativeAuthorization::Denied)
    }

    /// Undecided adapter resolving to `outcome`
    pub fn with_outcome(outcome: impl Into<NativeAuthorization>) -> Self {
        Self {
            current: RwLock::new(NativeAuthorization::NotDetermined),
            outcome: outcome.into(),
        }
    }

    /// Start from an already observed status
    pub fn starting_at(self, status: impl Into<NativeAuthorization>) -> Self {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = status.into();
        self
    }
}

#[async_trait]
impl PermissionAdapter for AutoAdapter {
    async fn current_status(&self) -> NativeAuthorization {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_access(
        &self,
        _config: Option<&PermissionRequestConfig>,
    ) -> Result<NativeAuthorization, AdapterError> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = self.outcome;
        Ok(self.outcome)
    }
}

// ============================================================================
// Recording adapter
// ============================================================================

/// A request observed by a [`RecordingAdapter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub config: Option<PermissionRequestConfig>,
}

/// Adapter that plays back scripted outcomes and records every request
///
/// When the script runs dry, requests keep the current status.
#[derive(Debug)]
pub struct RecordingAdapter {
    current: RwLock<NativeAuthorization>,
    script: Mutex<VecDeque<Result<NativeAuthorization, AdapterError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl RecordingAdapter {
    /// Create an adapter reporting `initial` until a request changes it
    pub fn new(initial: impl Into<NativeAuthorization>) -> Self {
        Self {
            current: RwLock::new(initial.into()),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful outcome
    pub fn then_resolve(self, outcome: impl Into<NativeAuthorization>) -> Self {
        self.push(Ok(outcome.into()));
        self
    }

    /// Queue a failure
    pub fn then_fail(self, error: AdapterError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queue an outcome on a shared adapter
    pub fn push(&self, outcome: Result<NativeAuthorization, AdapterError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Change the observed status, as if the user edited system settings
    pub fn set_current(&self, status: impl Into<NativeAuthorization>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = status.into();
    }

    /// All recorded requests
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests that reached this adapter
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl PermissionAdapter for RecordingAdapter {
    async fn current_status(&self) -> NativeAuthorization {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_access(
        &self,
        config: Option<&PermissionRequestConfig>,
    ) -> Result<NativeAuthorization, AdapterError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                config: config.cloned(),
            });

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(Ok(status)) => {
                self.set_current(status);
                Ok(status)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.current_status().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_api::PermissionStatus;

    #[tokio::test]
    async fn test_auto_adapter_remembers_outcome() {
        let adapter = AutoAdapter::denying();
        assert_eq!(
            adapter.current_status().await,
            NativeAuthorization::NotDetermined
        );

        let outcome = adapter.request_access(None).await.unwrap();
        assert_eq!(outcome, NativeAuthorization::Denied);
        assert_eq!(adapter.current_status().await, NativeAuthorization::Denied);
    }

    #[tokio::test]
    async fn test_auto_adapter_starting_status() {
        let adapter = AutoAdapter::granting().starting_at(PermissionStatus::Restricted);
        assert_eq!(
            adapter.current_status().await,
            NativeAuthorization::Restricted
        );
    }

    #[tokio::test]
    async fn test_recording_adapter_plays_script() {
        let adapter = RecordingAdapter::new(PermissionStatus::NotDetermined)
            .then_fail(AdapterError::Platform("busy".into()))
            .then_resolve(NativeAuthorization::Limited);

        let config = PermissionRequestConfig::new().title("Photos");
        assert_eq!(
            adapter.request_access(Some(&config)).await,
            Err(AdapterError::Platform("busy".into()))
        );
        assert_eq!(
            adapter.request_access(None).await,
            Ok(NativeAuthorization::Limited)
        );
        assert_eq!(adapter.current_status().await, NativeAuthorization::Limited);

        let requests = adapter.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].config.as_ref(), Some(&config));
        assert!(requests[1].config.is_none());
    }

    #[tokio::test]
    async fn test_recording_adapter_without_script_keeps_status() {
        let adapter = RecordingAdapter::new(PermissionStatus::NotDetermined);
        assert_eq!(
            adapter.request_access(None).await,
            Ok(NativeAuthorization::NotDetermined)
        );
        assert_eq!(adapter.request_count(), 1);
    }
}
