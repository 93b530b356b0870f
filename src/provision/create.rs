use super::{ProvisionOutputs, Provisioner};
use crate::az::Resource;
use anyhow::{bail, Result};

const NO_EXTRA_ARGS: [&str; 0] = [];

impl Provisioner<'_> {
    /// Creation sequence, in dependency order.
    pub(super) fn create_resources(&self, outputs: &mut ProvisionOutputs) -> Result<()> {
        self.create_event_hub(outputs)?;
        self.create_function_app()?;
        self.create_text_analytics(outputs)?;
        self.create_cosmos(outputs)?;
        self.create_logic_app()
    }

    /// Create `resource` unless `show` already finds it.
    fn ensure<F>(&self, resource: Resource<'_>, create: F) -> Result<()>
    where
        F: FnOnce(&Resource<'_>) -> Result<()>,
    {
        if self.az.exists(&resource)? {
            tracing::info!(kind = resource.label(), name = resource.name(), "exists; reusing");
            return Ok(());
        }
        tracing::info!(kind = resource.label(), name = resource.name(), "creating");
        create(&resource)
    }

    fn create_event_hub(&self, outputs: &mut ProvisionOutputs) -> Result<()> {
        let names = self.names;
        let config = self.config;
        self.ensure(
            Resource::EventHubNamespace {
                name: &names.eventhub_namespace,
            },
            |namespace| {
                self.az.create(
                    namespace,
                    [
                        "--location",
                        config.location.as_str(),
                        "--sku",
                        config.eventhub_sku.as_str(),
                    ],
                )
            },
        )?;
        self.ensure(
            Resource::EventHub {
                namespace: &names.eventhub_namespace,
                name: &names.eventhub,
            },
            |hub| self.az.create(hub, NO_EXTRA_ARGS),
        )?;

        let rule = Resource::SendRule {
            namespace: &names.eventhub_namespace,
            eventhub: &names.eventhub,
            name: &names.send_rule,
        };
        self.ensure(rule, |rule| self.az.create(rule, ["--rights", "Send"]))?;

        let connection_string = self.az.send_rule_connection_string(&rule)?;
        if connection_string.is_empty() {
            bail!(
                "authorization rule {} on event hub {} returned an empty connection string",
                names.send_rule,
                names.eventhub
            );
        }
        outputs.eventhub_connection_string = connection_string;
        Ok(())
    }

    fn create_function_app(&self) -> Result<()> {
        let names = self.names;
        let config = self.config;
        self.ensure(
            Resource::StorageAccount {
                name: &names.storage_account,
            },
            |account| {
                self.az.create(
                    account,
                    [
                        "--location",
                        config.location.as_str(),
                        "--sku",
                        config.storage_sku.as_str(),
                        "--kind",
                        "StorageV2",
                    ],
                )
            },
        )?;
        self.ensure(
            Resource::FunctionApp {
                name: &names.function_app,
            },
            |app| {
                self.az.create(
                    app,
                    [
                        "--storage-account",
                        names.storage_account.as_str(),
                        "--consumption-plan-location",
                        config.location.as_str(),
                        "--runtime",
                        config.runtime.as_str(),
                        "--runtime-version",
                        config.runtime_version.as_str(),
                        "--functions-version",
                        config.functions_version.as_str(),
                    ],
                )
            },
        )
    }

    /// Best-effort: tries each configured tier, then reads key and endpoint.
    /// Only a failure to run `az` at all is fatal here.
    fn create_text_analytics(&self, outputs: &mut ProvisionOutputs) -> Result<()> {
        let names = self.names;
        let account = Resource::CognitiveAccount {
            name: &names.cognitive_account,
        };

        let available = if self.az.exists(&account)? {
            tracing::info!(name = account.name(), "text analytics account exists; reusing");
            true
        } else {
            self.create_text_analytics_tier(&account, outputs)
        };
        if !available {
            outputs.warn(format!(
                "no text analytics tier could be created for {}; continuing without sentiment credentials",
                names.cognitive_account
            ));
            return Ok(());
        }

        let resource_group = self.az.resource_group();
        outputs.cognitive_key = self.best_effort_query(
            outputs,
            "read text analytics key",
            &[
                "cognitiveservices",
                "account",
                "keys",
                "list",
                "--resource-group",
                resource_group,
                "--name",
                account.name(),
                "--query",
                "key1",
            ],
        );
        outputs.cognitive_endpoint = self.best_effort_query(
            outputs,
            "read text analytics endpoint",
            &[
                "cognitiveservices",
                "account",
                "show",
                "--resource-group",
                resource_group,
                "--name",
                account.name(),
                "--query",
                "properties.endpoint",
            ],
        );
        Ok(())
    }

    fn create_text_analytics_tier(
        &self,
        account: &Resource<'_>,
        outputs: &mut ProvisionOutputs,
    ) -> bool {
        for sku in &self.config.cognitive_skus {
            tracing::info!(name = account.name(), sku = %sku, "creating text analytics account");
            let created = self.az.create(
                account,
                [
                    "--kind",
                    "TextAnalytics",
                    "--sku",
                    sku.as_str(),
                    "--location",
                    self.config.location.as_str(),
                    "--yes",
                ],
            );
            match created {
                Ok(()) => {
                    outputs.cognitive_sku = Some(sku.clone());
                    return true;
                }
                Err(err) => outputs.warn(format!("text analytics tier {sku} unavailable: {err:#}")),
            }
        }
        false
    }

    fn best_effort_query(&self, outputs: &mut ProvisionOutputs, what: &str, args: &[&str]) -> String {
        match self.az.query(what, args) {
            Ok(value) if value.is_empty() => {
                outputs.warn(format!("{what}: empty value"));
                value
            }
            Ok(value) => value,
            Err(err) => {
                outputs.warn(format!("{err:#}"));
                String::new()
            }
        }
    }

    fn create_cosmos(&self, outputs: &mut ProvisionOutputs) -> Result<()> {
        let names = self.names;
        let config = self.config;
        self.ensure(
            Resource::CosmosAccount {
                name: &names.cosmos_account,
            },
            |account| {
                let region = format!("regionName={}", config.location);
                self.az.create(
                    account,
                    [
                        "--locations",
                        region.as_str(),
                        "--default-consistency-level",
                        "Session",
                    ],
                )
            },
        )?;
        self.ensure(
            Resource::CosmosDatabase {
                account: &names.cosmos_account,
                name: &names.cosmos_database,
            },
            |database| self.az.create(database, NO_EXTRA_ARGS),
        )?;
        self.ensure(
            Resource::CosmosContainer {
                account: &names.cosmos_account,
                database: &names.cosmos_database,
                name: &names.cosmos_container,
            },
            |container| {
                self.az.create(
                    container,
                    ["--partition-key-path", config.partition_key_path.as_str()],
                )
            },
        )?;

        let resource_group = self.az.resource_group();
        let connection_string = self.az.query(
            &format!("read connection string of {}", names.cosmos_account),
            &[
                "cosmosdb",
                "keys",
                "list",
                "--resource-group",
                resource_group,
                "--name",
                names.cosmos_account.as_str(),
                "--type",
                "connection-strings",
                "--query",
                "connectionStrings[0].connectionString",
            ],
        )?;
        let primary_key = self.az.query(
            &format!("read primary key of {}", names.cosmos_account),
            &[
                "cosmosdb",
                "keys",
                "list",
                "--resource-group",
                resource_group,
                "--name",
                names.cosmos_account.as_str(),
                "--type",
                "keys",
                "--query",
                "primaryMasterKey",
            ],
        )?;
        if connection_string.is_empty() || primary_key.is_empty() {
            bail!(
                "cosmos db account {} returned an empty connection string or primary key",
                names.cosmos_account
            );
        }
        outputs.cosmos_connection_string = connection_string;
        outputs.cosmos_primary_key = primary_key;
        Ok(())
    }

    fn create_logic_app(&self) -> Result<()> {
        let names = self.names;
        let config = self.config;
        self.ensure(
            Resource::LogicApp {
                name: &names.logic_app,
            },
            |workflow| {
                self.az.create(
                    workflow,
                    ["--location", config.location.as_str(), "--definition", "{}"],
                )
            },
        )
    }
}
