use super::Provisioner;
use crate::az::Resource;
use serde::Serialize;

/// Result of a best-effort teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub deleted: Vec<String>,
    /// `"<kind> <name>: <reason>"` for each delete that failed.
    pub failed: Vec<String>,
}

impl Provisioner<'_> {
    /// Top-level resources; children go with their parent.
    fn top_level_resources(&self) -> [Resource<'_>; 6] {
        let names = self.names;
        [
            Resource::FunctionApp {
                name: &names.function_app,
            },
            Resource::StorageAccount {
                name: &names.storage_account,
            },
            Resource::EventHubNamespace {
                name: &names.eventhub_namespace,
            },
            Resource::CognitiveAccount {
                name: &names.cognitive_account,
            },
            Resource::CosmosAccount {
                name: &names.cosmos_account,
            },
            Resource::LogicApp {
                name: &names.logic_app,
            },
        ]
    }

    /// Delete every top-level resource, ignoring failures.
    pub fn teardown(&self) -> TeardownReport {
        let mut report = TeardownReport::default();
        for resource in self.top_level_resources() {
            let label = format!("{} {}", resource.label(), resource.name());
            match self.az.delete(&resource) {
                Ok(()) => {
                    tracing::info!(resource = %label, "deleted");
                    report.deleted.push(label);
                }
                Err(err) => {
                    tracing::warn!(resource = %label, "delete skipped: {err:#}");
                    report.failed.push(format!("{label}: {err:#}"));
                }
            }
        }
        report
    }
}
