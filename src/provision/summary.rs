//! End-of-run summary: collected identifiers, secrets and the manual steps
//! that remain after provisioning.
use super::ProvisionOutputs;
use crate::config::ProvisionConfig;
use crate::names::ResourceNames;
use serde::Serialize;

const REDACTED: &str = "<redacted>";

/// Machine-readable summary emitted by `provision --json`.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub resource_group: String,
    pub location: String,
    pub names: ResourceNames,
    pub outputs: ProvisionOutputs,
    pub follow_up: Vec<String>,
}

/// Manual steps the CLI cannot perform.
pub fn follow_up_steps(names: &ResourceNames) -> Vec<String> {
    vec![
        format!(
            "Open logic app '{}' in the portal, add an HTTP request trigger and point the negative-review webhook at its URL.",
            names.logic_app
        ),
        format!(
            "Connect Power BI to cosmos db account '{}' (database '{}', container '{}') to build the review dashboard.",
            names.cosmos_account, names.cosmos_database, names.cosmos_container
        ),
        format!(
            "Feed test traffic into event hub '{}' from `azprov generate-reviews`.",
            names.eventhub
        ),
        format!(
            "Follow function logs with `func azure functionapp logstream {}`.",
            names.function_app
        ),
    ]
}

fn mask(value: &str, redact: bool) -> String {
    if redact && !value.is_empty() {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

impl ProvisionReport {
    pub fn new(
        config: &ProvisionConfig,
        names: &ResourceNames,
        outputs: &ProvisionOutputs,
        redact: bool,
    ) -> Self {
        let outputs = ProvisionOutputs {
            eventhub_connection_string: mask(&outputs.eventhub_connection_string, redact),
            cognitive_endpoint: outputs.cognitive_endpoint.clone(),
            cognitive_key: mask(&outputs.cognitive_key, redact),
            cognitive_sku: outputs.cognitive_sku.clone(),
            cosmos_connection_string: mask(&outputs.cosmos_connection_string, redact),
            cosmos_primary_key: mask(&outputs.cosmos_primary_key, redact),
            warnings: outputs.warnings.clone(),
        };
        Self {
            resource_group: config.resource_group.clone(),
            location: config.location.clone(),
            names: names.clone(),
            outputs,
            follow_up: follow_up_steps(names),
        }
    }

    pub fn render_text(&self) -> String {
        let names = &self.names;
        let outputs = &self.outputs;
        let mut out = String::new();
        push_line(&mut out, "Provisioning complete.");
        push_line(&mut out, "");
        push_field(&mut out, "Resource group", &self.resource_group);
        push_field(&mut out, "Location", &self.location);
        push_field(&mut out, "Event hubs namespace", &names.eventhub_namespace);
        push_field(&mut out, "Event hub", &names.eventhub);
        push_field(&mut out, "Send rule", &names.send_rule);
        push_field(&mut out, "Storage account", &names.storage_account);
        push_field(&mut out, "Function app", &names.function_app);
        push_field(&mut out, "Text analytics", &names.cognitive_account);
        push_field(&mut out, "Cosmos db account", &names.cosmos_account);
        push_field(&mut out, "Cosmos db database", &names.cosmos_database);
        push_field(&mut out, "Cosmos db container", &names.cosmos_container);
        push_field(&mut out, "Logic app", &names.logic_app);
        push_line(&mut out, "");
        push_field(
            &mut out,
            "Event hub connection string",
            &outputs.eventhub_connection_string,
        );
        push_field(&mut out, "Text analytics endpoint", &outputs.cognitive_endpoint);
        push_field(&mut out, "Text analytics key", &outputs.cognitive_key);
        if let Some(sku) = &outputs.cognitive_sku {
            push_field(&mut out, "Text analytics tier", sku);
        }
        push_field(
            &mut out,
            "Cosmos db connection string",
            &outputs.cosmos_connection_string,
        );
        push_field(&mut out, "Cosmos db primary key", &outputs.cosmos_primary_key);

        if !outputs.warnings.is_empty() {
            push_line(&mut out, "");
            push_line(&mut out, "Warnings:");
            for warning in &outputs.warnings {
                push_line(&mut out, &format!("  - {warning}"));
            }
        }

        push_line(&mut out, "");
        push_line(&mut out, "Next steps:");
        for (index, step) in self.follow_up.iter().enumerate() {
            push_line(&mut out, &format!("  {}. {step}", index + 1));
        }
        out
    }
}

fn push_field(out: &mut String, label: &str, value: &str) {
    let value = if value.is_empty() { "(empty)" } else { value };
    push_line(out, &format!("{label}: {value}"));
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
