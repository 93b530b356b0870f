use super::providers::PROVIDER_NAMESPACES;
use super::settings::SETTING_KEYS;
use super::Provisioner;
use crate::config::{NamePrefixes, ProvisionConfig};
use crate::names::ResourceNames;
use crate::runner::{CommandOutput, CommandRunner, Invocation, Toolchain};
use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;

const EVENTHUB_CONNECTION: &str =
    "Endpoint=sb://reviews-ns.servicebus.windows.net/;SharedAccessKeyName=send-only;SharedAccessKey=abc=";
const COSMOS_CONNECTION: &str =
    "AccountEndpoint=https://reviewsdb.documents.azure.com:443/;AccountKey=xyz==;";

struct Rule {
    pattern: Vec<String>,
    replies: Vec<CommandOutput>,
    hits: Cell<usize>,
}

/// Fake host: replies are picked by the first rule whose tokens all appear in
/// the invocation. Unmatched `show` calls report "not found", everything else
/// succeeds with empty output.
struct ScriptedRunner {
    rules: Vec<Rule>,
    available: RefCell<Vec<String>>,
    installs: Vec<(String, String)>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    fn healthy() -> Self {
        let runner = Self {
            rules: Vec::new(),
            available: RefCell::new(vec!["az".into(), "func".into(), "npm".into()]),
            installs: Vec::new(),
            calls: RefCell::new(Vec::new()),
        };
        runner
            .reply(&["cosmosdb", "keys", "list", "primaryMasterKey"], CommandOutput::ok("xyz==\n"))
            .reply(
                &["cosmosdb", "keys", "list", "connection-strings"],
                CommandOutput::ok(&format!("{COSMOS_CONNECTION}\n")),
            )
            .reply(
                &["cognitiveservices", "show", "properties.endpoint"],
                CommandOutput::ok("https://reviews-lang.cognitiveservices.azure.com/\n"),
            )
            .reply(&["cognitiveservices", "keys", "list"], CommandOutput::ok("cog-key\n"))
            .reply(
                &["authorization-rule", "keys", "list"],
                CommandOutput::ok(&format!("{EVENTHUB_CONNECTION}\n")),
            )
            .reply(&["provider", "show"], CommandOutput::ok("Registered\n"))
    }

    /// Add a rule that takes precedence over every earlier one.
    fn reply(self, pattern: &[&str], output: CommandOutput) -> Self {
        self.replies(pattern, vec![output])
    }

    /// Successive replies; the last one repeats.
    fn replies(mut self, pattern: &[&str], replies: Vec<CommandOutput>) -> Self {
        self.rules.insert(
            0,
            Rule {
                pattern: pattern.iter().map(|token| token.to_string()).collect(),
                replies,
                hits: Cell::new(0),
            },
        );
        self
    }

    fn without(self, program: &str) -> Self {
        self.available.borrow_mut().retain(|name| name != program);
        self
    }

    /// Make `program` locatable once an invocation containing `token` succeeds.
    fn installs_on_success(mut self, token: &str, program: &str) -> Self {
        self.installs.push((token.to_string(), program.to_string()));
        self
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.words().into_iter().map(String::from).collect())
            .collect()
    }

    fn position(&self, pattern: &[&str]) -> Option<usize> {
        self.calls()
            .iter()
            .position(|words| contains_all(words, pattern))
    }

    fn count(&self, pattern: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|words| contains_all(words, pattern))
            .count()
    }
}

fn contains_all<S: AsRef<str>>(words: &[String], pattern: &[S]) -> bool {
    pattern
        .iter()
        .all(|token| words.iter().any(|word| word == token.as_ref()))
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        let words: Vec<String> = invocation.words().into_iter().map(String::from).collect();
        let output = match self
            .rules
            .iter()
            .find(|rule| contains_all(&words, &rule.pattern))
        {
            Some(rule) => {
                let hit = rule.hits.get();
                rule.hits.set(hit + 1);
                rule.replies[hit.min(rule.replies.len() - 1)].clone()
            }
            None if words.iter().any(|word| word == "show") => {
                CommandOutput::failed(3, "ERROR: (ResourceNotFound) The resource was not found.")
            }
            None => CommandOutput::ok(""),
        };
        if output.success {
            for (token, program) in &self.installs {
                if words.iter().any(|word| word == token) {
                    self.available.borrow_mut().push(program.clone());
                }
            }
        }
        Ok(output)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.available
            .borrow()
            .iter()
            .any(|name| name == program)
            .then(|| PathBuf::from("/usr/local/bin").join(program))
    }
}

struct Fixture {
    _source: tempfile::TempDir,
    config: ProvisionConfig,
    names: ResourceNames,
    tools: Toolchain,
}

impl Fixture {
    fn new() -> Self {
        let source = tempfile::tempdir().expect("source dir");
        let config = ProvisionConfig {
            source_dir: source.path().to_path_buf(),
            ..ProvisionConfig::default()
        };
        let names = ResourceNames::derive(&NamePrefixes::default(), "202610191200");
        let tools = config.tools.toolchain().expect("toolchain");
        Self {
            _source: source,
            config,
            names,
            tools,
        }
    }

    fn provisioner<'a>(&'a self, runner: &'a ScriptedRunner) -> Provisioner<'a> {
        Provisioner::new(runner, &self.config, &self.names, &self.tools).with_sleep(|_| {})
    }
}

#[test]
fn healthy_run_executes_every_step_in_order() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy();
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    assert_eq!(outputs.eventhub_connection_string, EVENTHUB_CONNECTION);
    assert_eq!(outputs.cognitive_key, "cog-key");
    assert_eq!(
        outputs.cognitive_endpoint,
        "https://reviews-lang.cognitiveservices.azure.com/"
    );
    assert_eq!(outputs.cognitive_sku.as_deref(), Some("F0"));
    assert_eq!(outputs.cosmos_connection_string, COSMOS_CONNECTION);
    assert_eq!(outputs.cosmos_primary_key, "xyz==");
    assert!(outputs.warnings.is_empty(), "{:?}", outputs.warnings);

    let steps = [
        &["eventhubs", "namespace", "create"][..],
        &["eventhubs", "eventhub", "create"],
        &["authorization-rule", "create", "Send"],
        &["authorization-rule", "keys", "list"],
        &["storage", "account", "create"],
        &["functionapp", "create", "--storage-account"],
        &["cognitiveservices", "create", "F0"],
        &["cosmosdb", "create", "regionName=francecentral"],
        &["database", "create"],
        &["container", "create", "/airline"],
        &["cosmosdb", "keys", "list"],
        &["logic", "workflow", "create"],
        &["appsettings", "set"],
        &["npm", "install"],
        &["func", "publish"],
    ];
    let positions: Vec<usize> = steps
        .iter()
        .map(|step| {
            runner
                .position(step)
                .unwrap_or_else(|| panic!("missing step {step:?}"))
        })
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "steps ran out of order");

    assert_eq!(runner.count(&["appsettings", "set"]), SETTING_KEYS.len());
    assert_eq!(runner.count(&["delete"]), 0);
}

#[test]
fn present_tools_skip_install_and_start_with_provider_checks() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy();
    fixture.provisioner(&runner).run().expect("run succeeds");

    assert_eq!(runner.count(&["install", "-g"]), 0);
    let calls = runner.calls();
    assert!(contains_all(&calls[0], &["provider", "show"]), "{:?}", calls[0]);
    assert_eq!(
        runner.count(&["provider", "show"]),
        PROVIDER_NAMESPACES.len()
    );
}

#[test]
fn missing_deploy_tool_is_installed_with_npm() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy()
        .without("func")
        .installs_on_success("azure-functions-core-tools@4", "func");
    fixture.provisioner(&runner).run().expect("run succeeds");

    let calls = runner.calls();
    assert!(
        contains_all(&calls[0], &["npm", "install", "-g", "azure-functions-core-tools@4"]),
        "{:?}",
        calls[0]
    );
    assert!(runner.position(&["func", "publish"]).is_some());
}

#[test]
fn missing_deploy_tool_without_npm_is_fatal() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().without("func").without("npm");
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("not available"), "{err:#}");
    assert!(runner.calls().is_empty());
}

#[test]
fn failed_tool_install_is_fatal() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy()
        .without("func")
        .reply(&["install", "-g"], CommandOutput::failed(1, "npm ERR! EACCES"));
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("EACCES"), "{err:#}");
    assert_eq!(runner.count(&["provider"]), 0);
}

#[test]
fn install_that_leaves_tool_missing_is_fatal() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().without("func");
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("still not found"), "{err:#}");
}

#[test]
fn missing_source_dir_is_fatal() {
    let mut fixture = Fixture::new();
    fixture.config.source_dir = fixture.config.source_dir.join("missing");
    let runner = ScriptedRunner::healthy();
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("source directory"), "{err:#}");
    assert_eq!(runner.count(&["provider"]), 0);
}

#[test]
fn only_unregistered_providers_are_registered_and_polled() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().replies(
        &["provider", "show", "Microsoft.Web"],
        vec![
            CommandOutput::ok("NotRegistered\n"),
            CommandOutput::ok("Registering\n"),
            CommandOutput::ok("Registered\n"),
        ],
    );
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    assert_eq!(runner.count(&["provider", "register"]), 1);
    assert_eq!(
        runner.count(&["provider", "register", "Microsoft.Web"]),
        1
    );
    assert_eq!(runner.count(&["provider", "show", "Microsoft.Web"]), 3);
    assert!(outputs.warnings.is_empty(), "{:?}", outputs.warnings);
}

#[test]
fn registration_timeout_and_request_failure_are_tolerated() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy()
        .reply(
            &["provider", "register", "Microsoft.Logic"],
            CommandOutput::failed(1, "AuthorizationFailed"),
        )
        .reply(
            &["provider", "show", "Microsoft.Logic"],
            CommandOutput::ok("NotRegistered\n"),
        );
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    let max_attempts = fixture.config.registration_retry.max_attempts as usize;
    assert_eq!(
        runner.count(&["provider", "show", "Microsoft.Logic"]),
        1 + max_attempts
    );
    assert_eq!(outputs.warnings.len(), 2, "{:?}", outputs.warnings);
    assert!(outputs.warnings[0].contains("AuthorizationFailed"));
    assert!(outputs.warnings[1].contains("Microsoft.Logic not registered"));
    assert!(runner.position(&["logic", "workflow", "create"]).is_some());
}

#[test]
fn empty_send_rule_connection_string_stops_before_storage() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["authorization-rule", "keys", "list"],
        CommandOutput::ok("\n"),
    );
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("empty connection string"), "{err:#}");
    assert_eq!(runner.count(&["storage", "account"]), 0);
}

#[test]
fn free_tier_failure_falls_back_to_standard_credentials() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy()
        .reply(
            &["cognitiveservices", "create", "F0"],
            CommandOutput::failed(1, "ERROR: free tier already used in subscription"),
        )
        .reply(&["cognitiveservices", "keys", "list"], CommandOutput::ok("standard-key\n"));
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    assert_eq!(outputs.cognitive_sku.as_deref(), Some("S"));
    assert_eq!(outputs.cognitive_key, "standard-key");
    assert!(!outputs.cognitive_endpoint.is_empty());
    assert_eq!(outputs.warnings.len(), 1, "{:?}", outputs.warnings);
    assert!(runner.position(&["cognitiveservices", "create", "S"]).is_some());
}

#[test]
fn both_tiers_failing_continues_with_empty_credentials() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["cognitiveservices", "create"],
        CommandOutput::failed(1, "ERROR: quota exceeded"),
    );
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    assert_eq!(outputs.cognitive_sku, None);
    assert!(outputs.cognitive_key.is_empty());
    assert!(outputs.cognitive_endpoint.is_empty());
    assert_eq!(runner.count(&["cognitiveservices", "keys"]), 0);
    assert!(runner.position(&["cosmosdb", "create"]).is_some());
    assert!(outputs
        .warnings
        .iter()
        .any(|warning| warning.contains("no text analytics tier")));
}

#[test]
fn failed_key_query_is_tolerated() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["cognitiveservices", "keys", "list"],
        CommandOutput::failed(1, "ERROR: forbidden"),
    );
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    assert!(outputs.cognitive_key.is_empty());
    assert!(!outputs.cognitive_endpoint.is_empty());
    assert!(outputs.warnings.iter().any(|warning| warning.contains("forbidden")));
}

#[test]
fn empty_cosmos_primary_key_stops_before_logic_app() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["cosmosdb", "keys", "list", "primaryMasterKey"],
        CommandOutput::ok(""),
    );
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("primary key"), "{err:#}");
    assert_eq!(runner.count(&["logic", "workflow"]), 0);
}

#[test]
fn empty_cosmos_connection_string_stops_before_logic_app() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["cosmosdb", "keys", "list", "connection-strings"],
        CommandOutput::ok("\n"),
    );
    fixture.provisioner(&runner).run().expect_err("run fails");

    assert_eq!(runner.count(&["logic", "workflow"]), 0);
    assert_eq!(runner.count(&["appsettings"]), 0);
}

#[test]
fn critical_create_failure_is_fatal() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["functionapp", "create"],
        CommandOutput::failed(1, "ERROR: runtime version not supported"),
    );
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    let message = format!("{err:#}");
    assert!(message.contains("create function app"), "{message}");
    assert!(message.contains("runtime version not supported"), "{message}");
    assert_eq!(runner.count(&["cognitiveservices"]), 0);
}

#[test]
fn recreate_tolerates_delete_failures() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["delete"],
        CommandOutput::failed(3, "ERROR: (ResourceNotFound) not found"),
    );
    fixture
        .provisioner(&runner)
        .recreate(true)
        .run()
        .expect("run succeeds");

    assert_eq!(runner.count(&["delete"]), 6);
    let last_delete = runner
        .calls()
        .iter()
        .rposition(|words| contains_all(words, &["delete"]))
        .expect("delete calls");
    let first_create = runner
        .position(&["eventhubs", "namespace", "create"])
        .expect("namespace create");
    assert!(last_delete < first_create);
}

#[test]
fn teardown_reports_each_resource() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["cosmosdb", "delete"],
        CommandOutput::failed(3, "ERROR: (ResourceNotFound) not found"),
    );
    let report = fixture.provisioner(&runner).teardown();

    assert_eq!(report.deleted.len(), 5);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].contains(&fixture.names.cosmos_account));
    assert_eq!(runner.count(&["storage", "account", "delete", "--yes"]), 1);
}

#[test]
fn existing_resources_are_reused() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy()
        .reply(&["storage", "account", "show"], CommandOutput::ok("{}"))
        .reply(&["cognitiveservices", "account", "show", "--name"], CommandOutput::ok("{}"));
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    assert_eq!(runner.count(&["storage", "account", "create"]), 0);
    assert_eq!(runner.count(&["cognitiveservices", "create"]), 0);
    assert_eq!(outputs.cognitive_sku, None);
    assert_eq!(outputs.cognitive_key, "cog-key");
    assert_eq!(runner.count(&["eventhubs", "namespace", "create"]), 1);
}

#[test]
fn setting_failures_are_tolerated() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["appsettings", "set"],
        CommandOutput::failed(1, "ERROR: conflict"),
    );
    let outputs = fixture.provisioner(&runner).run().expect("run succeeds");

    assert_eq!(outputs.warnings.len(), SETTING_KEYS.len());
    for key in SETTING_KEYS {
        assert!(outputs.warnings.iter().any(|warning| warning.contains(key)));
    }
    assert!(runner.position(&["func", "publish"]).is_some());
}

#[test]
fn dependency_install_runs_in_source_dir_and_failure_is_fatal() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy().reply(
        &["npm", "install"],
        CommandOutput::failed(1, "npm ERR! missing package.json"),
    );
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("dependency install"), "{err:#}");
    let calls = runner.calls.borrow();
    let install = calls
        .iter()
        .find(|call| call.program == "npm")
        .expect("npm install call");
    assert_eq!(install.cwd.as_deref(), Some(fixture.config.source_dir.as_path()));
    assert!(!calls.iter().any(|call| call.program == "func"));
}

#[test]
fn publish_failure_is_fatal() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::healthy()
        .reply(&["func", "publish"], CommandOutput::failed(1, "Can't find app"));
    let err = fixture.provisioner(&runner).run().expect_err("run fails");

    assert!(format!("{err:#}").contains("publish"), "{err:#}");
}
