use super::{ProvisionOutputs, Provisioner};

/// App settings the function code reads, in injection order.
pub const SETTING_KEYS: [&str; 5] = [
    "EVENTHUB_CONNECTION_STRING",
    "COGNITIVE_ENDPOINT",
    "COGNITIVE_KEY",
    "COSMOS_CONNECTION_STRING",
    "COSMOS_KEY",
];

impl ProvisionOutputs {
    fn app_settings(&self) -> [(&'static str, String); 5] {
        [
            (SETTING_KEYS[0], self.eventhub_connection_string.clone()),
            (SETTING_KEYS[1], self.cognitive_endpoint.clone()),
            (SETTING_KEYS[2], self.cognitive_key.clone()),
            (SETTING_KEYS[3], self.cosmos_connection_string.clone()),
            (SETTING_KEYS[4], self.cosmos_primary_key.clone()),
        ]
    }
}

impl Provisioner<'_> {
    /// Write each setting separately so one failure does not block the rest.
    pub(super) fn inject_settings(&self, outputs: &mut ProvisionOutputs) {
        let app = &self.names.function_app;
        for (key, value) in outputs.app_settings() {
            match self.az.set_app_setting(app, key, &value) {
                Ok(()) => tracing::info!(setting = key, function_app = %app, "app setting applied"),
                Err(err) => outputs.warn(format!("set {key} on {app}: {err:#}")),
            }
        }
    }
}
