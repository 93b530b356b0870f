//! Typed wrapper over the Azure CLI.
//!
//! Builds argument vectors for each resource so show/create/delete stay
//! consistent, and converts exit status into `anyhow` errors. Query helpers
//! always ask for `-o tsv` so values come back as bare strings.
use crate::runner::{CommandOutput, CommandRunner, Invocation};
use anyhow::{anyhow, Context, Result};

/// Registration state reported by `az provider show` once usable.
pub const REGISTERED: &str = "Registered";

/// A provider resource, addressed by its name and parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    EventHubNamespace {
        name: &'a str,
    },
    EventHub {
        namespace: &'a str,
        name: &'a str,
    },
    SendRule {
        namespace: &'a str,
        eventhub: &'a str,
        name: &'a str,
    },
    StorageAccount {
        name: &'a str,
    },
    FunctionApp {
        name: &'a str,
    },
    CognitiveAccount {
        name: &'a str,
    },
    CosmosAccount {
        name: &'a str,
    },
    CosmosDatabase {
        account: &'a str,
        name: &'a str,
    },
    CosmosContainer {
        account: &'a str,
        database: &'a str,
        name: &'a str,
    },
    LogicApp {
        name: &'a str,
    },
}

impl<'a> Resource<'a> {
    /// Human label used in logs and error context.
    pub fn label(&self) -> &'static str {
        match self {
            Resource::EventHubNamespace { .. } => "event hubs namespace",
            Resource::EventHub { .. } => "event hub",
            Resource::SendRule { .. } => "authorization rule",
            Resource::StorageAccount { .. } => "storage account",
            Resource::FunctionApp { .. } => "function app",
            Resource::CognitiveAccount { .. } => "cognitive services account",
            Resource::CosmosAccount { .. } => "cosmos db account",
            Resource::CosmosDatabase { .. } => "cosmos db database",
            Resource::CosmosContainer { .. } => "cosmos db container",
            Resource::LogicApp { .. } => "logic app",
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            Resource::EventHubNamespace { name }
            | Resource::EventHub { name, .. }
            | Resource::SendRule { name, .. }
            | Resource::StorageAccount { name }
            | Resource::FunctionApp { name }
            | Resource::CognitiveAccount { name }
            | Resource::CosmosAccount { name }
            | Resource::CosmosDatabase { name, .. }
            | Resource::CosmosContainer { name, .. }
            | Resource::LogicApp { name } => name,
        }
    }

    fn command_group(&self) -> &'static [&'static str] {
        match self {
            Resource::EventHubNamespace { .. } => &["eventhubs", "namespace"],
            Resource::EventHub { .. } => &["eventhubs", "eventhub"],
            Resource::SendRule { .. } => &["eventhubs", "eventhub", "authorization-rule"],
            Resource::StorageAccount { .. } => &["storage", "account"],
            Resource::FunctionApp { .. } => &["functionapp"],
            Resource::CognitiveAccount { .. } => &["cognitiveservices", "account"],
            Resource::CosmosAccount { .. } => &["cosmosdb"],
            Resource::CosmosDatabase { .. } => &["cosmosdb", "sql", "database"],
            Resource::CosmosContainer { .. } => &["cosmosdb", "sql", "container"],
            Resource::LogicApp { .. } => &["logic", "workflow"],
        }
    }

    /// `--resource-group`, parent flags and `--name`.
    fn identity_args(&self, resource_group: &str) -> Vec<String> {
        let mut args = vec!["--resource-group".to_string(), resource_group.to_string()];
        let parents: Vec<(&str, &str)> = match *self {
            Resource::EventHub { namespace, .. } => vec![("--namespace-name", namespace)],
            Resource::SendRule {
                namespace,
                eventhub,
                ..
            } => vec![("--namespace-name", namespace), ("--eventhub-name", eventhub)],
            Resource::CosmosDatabase { account, .. } => vec![("--account-name", account)],
            Resource::CosmosContainer {
                account, database, ..
            } => vec![("--account-name", account), ("--database-name", database)],
            _ => Vec::new(),
        };
        for (flag, value) in parents {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
        args.push("--name".to_string());
        args.push(self.name().to_string());
        args
    }

    /// Deletes that prompt for confirmation need `--yes`.
    fn delete_needs_confirmation(&self) -> bool {
        matches!(
            self,
            Resource::StorageAccount { .. }
                | Resource::CosmosAccount { .. }
                | Resource::CosmosDatabase { .. }
                | Resource::CosmosContainer { .. }
                | Resource::LogicApp { .. }
        )
    }
}

/// Azure CLI bound to one resource group.
pub struct AzureCli<'r> {
    runner: &'r dyn CommandRunner,
    command: Vec<String>,
    resource_group: String,
}

impl<'r> AzureCli<'r> {
    pub fn new(runner: &'r dyn CommandRunner, command: &[String], resource_group: &str) -> Self {
        Self {
            runner,
            command: command.to_vec(),
            resource_group: resource_group.to_string(),
        }
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    fn invocation<I, S>(&self, args: I) -> Result<Invocation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Invocation::from_words(&self.command)?.args(args))
    }

    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.runner
            .run(invocation)
            .with_context(|| format!("run {}", invocation.display()))
    }

    fn checked(&self, what: &str, invocation: &Invocation) -> Result<CommandOutput> {
        let output = self.execute(invocation)?;
        if !output.success {
            return Err(anyhow!("{what} failed: {}", output.failure_detail()));
        }
        Ok(output)
    }

    fn resource_args(&self, resource: &Resource<'_>, verb: &str) -> Vec<String> {
        let mut args: Vec<String> = resource
            .command_group()
            .iter()
            .map(|part| part.to_string())
            .collect();
        args.push(verb.to_string());
        args.extend(resource.identity_args(&self.resource_group));
        args
    }

    /// `az provider show` registration state, e.g. `Registered`.
    pub fn provider_state(&self, namespace: &str) -> Result<String> {
        let invocation = self.invocation([
            "provider",
            "show",
            "--namespace",
            namespace,
            "--query",
            "registrationState",
            "-o",
            "tsv",
        ])?;
        let output = self.checked(&format!("query provider {namespace}"), &invocation)?;
        Ok(output.value().to_string())
    }

    pub fn register_provider(&self, namespace: &str) -> Result<()> {
        let invocation = self.invocation(["provider", "register", "--namespace", namespace])?;
        self.checked(&format!("register provider {namespace}"), &invocation)?;
        Ok(())
    }

    /// Whether `show` succeeds; any failure counts as absent.
    pub fn exists(&self, resource: &Resource<'_>) -> Result<bool> {
        let invocation = self.invocation(self.resource_args(resource, "show"))?;
        Ok(self.execute(&invocation)?.success)
    }

    pub fn delete(&self, resource: &Resource<'_>) -> Result<()> {
        let mut args = self.resource_args(resource, "delete");
        if resource.delete_needs_confirmation() {
            args.push("--yes".to_string());
        }
        let invocation = self.invocation(args)?;
        self.checked(
            &format!("delete {} {}", resource.label(), resource.name()),
            &invocation,
        )?;
        Ok(())
    }

    /// `create` with resource-specific extra arguments.
    pub fn create<I, S>(&self, resource: &Resource<'_>, extra: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = self.resource_args(resource, "create");
        args.extend(extra.into_iter().map(Into::into));
        let invocation = self.invocation(args)?;
        self.checked(
            &format!("create {} {}", resource.label(), resource.name()),
            &invocation,
        )?;
        Ok(())
    }

    /// Run a query that prints one tsv value; an unsuccessful exit is an error,
    /// an empty value is returned as-is.
    pub fn query(&self, what: &str, args: &[&str]) -> Result<String> {
        let mut full: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        full.extend(["-o".to_string(), "tsv".to_string()]);
        let invocation = self.invocation(full)?;
        let output = self.checked(what, &invocation)?;
        Ok(output.value().to_string())
    }

    /// Primary connection string of an event hub authorization rule.
    pub fn send_rule_connection_string(&self, rule: &Resource<'_>) -> Result<String> {
        let mut args = self.resource_args(rule, "keys");
        // `authorization-rule keys list`: the verb slot holds `keys`.
        args.insert(rule.command_group().len() + 1, "list".to_string());
        args.extend(
            ["--query", "primaryConnectionString", "-o", "tsv"]
                .into_iter()
                .map(String::from),
        );
        let invocation = self.invocation(args)?;
        let output = self.checked(
            &format!("read connection string of rule {}", rule.name()),
            &invocation,
        )?;
        Ok(output.value().to_string())
    }

    pub fn set_app_setting(&self, function_app: &str, key: &str, value: &str) -> Result<()> {
        let invocation = self
            .invocation([
                "functionapp",
                "config",
                "appsettings",
                "set",
                "--resource-group",
                self.resource_group.as_str(),
                "--name",
                function_app,
                "--settings",
            ])?
            .args([format!("{key}={value}")])
            .redacted();
        self.checked(&format!("set app setting {key}"), &invocation)?;
        Ok(())
    }
}
