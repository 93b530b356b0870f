use super::{ProvisionOutputs, Provisioner};
use crate::az::REGISTERED;
use crate::retry::RetryOutcome;

/// Resource providers every run depends on.
pub const PROVIDER_NAMESPACES: [&str; 6] = [
    "Microsoft.EventHub",
    "Microsoft.Storage",
    "Microsoft.Web",
    "Microsoft.CognitiveServices",
    "Microsoft.DocumentDB",
    "Microsoft.Logic",
];

impl Provisioner<'_> {
    /// Request registration for unregistered providers and wait for them.
    ///
    /// Never fatal: a provider that does not settle in time is recorded as a
    /// warning and the create step that needs it reports the real failure.
    pub(super) fn register_providers(&self, outputs: &mut ProvisionOutputs) {
        let mut pending = Vec::new();
        for namespace in PROVIDER_NAMESPACES {
            match self.az.provider_state(namespace) {
                Ok(state) if state == REGISTERED => {
                    tracing::debug!(namespace, "provider registered");
                    continue;
                }
                Ok(state) => tracing::info!(namespace, state = %state, "provider not registered"),
                Err(err) => tracing::warn!(namespace, "query provider state: {err:#}"),
            }
            if let Err(err) = self.az.register_provider(namespace) {
                outputs.warn(format!("request registration of {namespace}: {err:#}"));
            }
            pending.push(namespace);
        }

        let policy = self.config.registration_retry.policy();
        for namespace in pending {
            let outcome = policy.poll(
                |attempt| match self.az.provider_state(namespace) {
                    Ok(state) if state == REGISTERED => Some(()),
                    Ok(state) => {
                        tracing::debug!(namespace, attempt, state = %state, "waiting for provider");
                        None
                    }
                    Err(err) => {
                        tracing::debug!(namespace, attempt, "query provider state: {err:#}");
                        None
                    }
                },
                self.sleep,
            );
            match outcome {
                RetryOutcome::Ready { value: (), attempts } => {
                    tracing::info!(namespace, attempts, "provider registered");
                }
                RetryOutcome::TimedOut { attempts, elapsed } => outputs.warn(format!(
                    "provider {namespace} not registered after {attempts} checks ({}s); continuing",
                    elapsed.as_secs()
                )),
            }
        }
    }
}
