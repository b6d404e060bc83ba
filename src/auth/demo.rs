use super::{CredentialVerifier, VerifyFuture};
use crate::models::{AppSettings, SubscriptionTier, User};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Duration;
use uuid::Uuid;

const DEMO_USER_ID: &str = "1";
const DEMO_USER_NAME: &str = "Demo User";

/// Accepts any credentials after a fixed delay and signs the caller in on
/// the free tier. Clones share the delay, so a settings update reaches
/// every handle.
#[derive(Debug, Clone)]
pub struct DemoVerifier {
    latency_ms: Arc<AtomicU64>,
}

impl Default for DemoVerifier {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl DemoVerifier {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            latency_ms: Arc::new(AtomicU64::new(latency_ms)),
        }
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms.load(Ordering::SeqCst))
    }
}

impl CredentialVerifier for DemoVerifier {
    fn verify<'a>(&'a self, email: &'a str, _password: &'a str) -> VerifyFuture<'a> {
        Box::pin(async move {
            tokio::time::sleep(self.latency()).await;
            Ok(User {
                id: DEMO_USER_ID.to_string(),
                email: email.to_string(),
                name: DEMO_USER_NAME.to_string(),
                subscription: SubscriptionTier::Free,
            })
        })
    }

    fn register<'a>(&'a self, name: &'a str, email: &'a str, _password: &'a str) -> VerifyFuture<'a> {
        Box::pin(async move {
            tokio::time::sleep(self.latency()).await;
            Ok(User {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                name: name.to_string(),
                subscription: SubscriptionTier::Free,
            })
        })
    }

    fn apply_settings(&self, settings: &AppSettings) {
        self.latency_ms.store(settings.login_latency_ms, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::DemoVerifier;
    use crate::auth::CredentialVerifier;
    use crate::models::AppSettings;
    use tokio::time::{Duration, Instant};

    #[tokio::test(start_paused = true)]
    async fn waits_out_latency_before_resolving() {
        let verifier = DemoVerifier::new(1_000);
        let started = Instant::now();
        let user = verifier.verify("demo@example.com", "password").await.expect("user");
        assert!(started.elapsed() >= Duration::from_millis(1_000));
        assert_eq!(user.name, "Demo User");
    }

    #[tokio::test(start_paused = true)]
    async fn latency_follows_applied_settings() {
        let verifier = DemoVerifier::new(1_000);
        let shared = verifier.clone();
        verifier.apply_settings(&AppSettings {
            login_latency_ms: 50,
            ..AppSettings::default()
        });
        assert_eq!(shared.latency(), Duration::from_millis(50));

        let started = Instant::now();
        shared.verify("demo@example.com", "password").await.expect("user");
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }
}
