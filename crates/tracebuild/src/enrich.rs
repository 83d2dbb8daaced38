//! Attribute enrichment.
//!
//! Merge order for the root span, later entries winning on key collision:
//! builtin identity attributes, then environment-derived ones, then the
//! user's custom tags. Task spans only receive builtin task attributes;
//! there is no per-task custom-tag override.

use tracebuild_core::{AttributeValue, Attributes, TelemetryConfig, SDK_NAME, SDK_VERSION};

pub const ATTR_SERVICE_NAME: &str = "service.name";
pub const ATTR_SDK_NAME: &str = "telemetry.sdk.name";
pub const ATTR_SDK_VERSION: &str = "telemetry.sdk.version";
pub const ATTR_IS_CI: &str = "system.is_ci";
pub const ATTR_TASK_NAMES: &str = "build.task.names";
pub const ATTR_TASK_PATH: &str = "task.path";
pub const ATTR_TASK_TYPE: &str = "task.type";
pub const ATTR_ERROR_MESSAGE: &str = "error.message";

/// Whether this process runs under CI, from the conventional `CI` env var.
pub fn detect_ci() -> bool {
    std::env::var("CI")
        .map(|value| !value.is_empty() && value != "false")
        .unwrap_or(false)
}

pub struct AttributeEnricher {
    service_name: String,
    requested_tasks: Vec<String>,
    custom_tags: Vec<(String, String)>,
    is_ci: bool,
}

impl AttributeEnricher {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            requested_tasks: config.requested_tasks.clone(),
            custom_tags: config.exporter.custom_tags.clone(),
            is_ci: detect_ci(),
        }
    }

    /// Override the detected CI flag. Test seam.
    pub fn with_ci(mut self, is_ci: bool) -> Self {
        self.is_ci = is_ci;
        self
    }

    pub fn root_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.set(ATTR_SERVICE_NAME, self.service_name.clone());
        attrs.set(ATTR_SDK_NAME, SDK_NAME);
        attrs.set(ATTR_SDK_VERSION, SDK_VERSION);
        if !self.requested_tasks.is_empty() {
            attrs.set(ATTR_TASK_NAMES, self.requested_tasks.join(" "));
        }
        attrs.set(ATTR_IS_CI, self.is_ci);
        attrs.extend(
            self.custom_tags
                .iter()
                .map(|(key, value)| (key.clone(), AttributeValue::from(value.clone()))),
        );
        attrs
    }

    pub fn task_attributes(&self, task_path: &str, task_type: Option<&str>) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.set(ATTR_TASK_PATH, task_path);
        if let Some(task_type) = task_type {
            attrs.set(ATTR_TASK_TYPE, task_type);
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracebuild_core::{AttributeValue, ExporterConfig, ExporterMode};

    fn config() -> TelemetryConfig {
        let mut exporter = ExporterConfig::new("http://localhost:4318", ExporterMode::Http);
        exporter.custom_tags = vec![
            ("foo1".into(), "bar1".into()),
            ("foo2".into(), "bar2".into()),
        ];
        let mut config = TelemetryConfig::new("my-build", exporter);
        config.requested_tasks = vec!["compile".into(), "test".into()];
        config
    }

    #[test]
    fn test_root_attributes_builtins_and_tags() {
        let enricher = AttributeEnricher::new(&config()).with_ci(true);
        let attrs = enricher.root_attributes();

        assert_eq!(attrs.get(ATTR_SERVICE_NAME), Some(&AttributeValue::Str("my-build".into())));
        assert_eq!(attrs.get(ATTR_SDK_NAME), Some(&AttributeValue::Str(SDK_NAME.into())));
        assert_eq!(attrs.get(ATTR_SDK_VERSION), Some(&AttributeValue::Str(SDK_VERSION.into())));
        assert_eq!(attrs.get(ATTR_TASK_NAMES), Some(&AttributeValue::Str("compile test".into())));
        assert_eq!(attrs.get(ATTR_IS_CI), Some(&AttributeValue::Bool(true)));
        assert_eq!(attrs.get("foo1"), Some(&AttributeValue::Str("bar1".into())));
        assert_eq!(attrs.get("foo2"), Some(&AttributeValue::Str("bar2".into())));
    }

    #[test]
    fn test_custom_tags_override_builtins() {
        let mut cfg = config();
        cfg.exporter.custom_tags = vec![(ATTR_SERVICE_NAME.into(), "overridden".into())];
        let enricher = AttributeEnricher::new(&cfg);
        let attrs = enricher.root_attributes();
        assert_eq!(
            attrs.get(ATTR_SERVICE_NAME),
            Some(&AttributeValue::Str("overridden".into()))
        );
    }

    #[test]
    fn test_task_attributes_builtin_only() {
        let enricher = AttributeEnricher::new(&config());
        let attrs = enricher.task_attributes(":test", Some("Test"));
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get(ATTR_TASK_PATH), Some(&AttributeValue::Str(":test".into())));
        assert_eq!(attrs.get(ATTR_TASK_TYPE), Some(&AttributeValue::Str("Test".into())));
        // No custom tags on task spans.
        assert!(attrs.get("foo1").is_none());
    }
}
