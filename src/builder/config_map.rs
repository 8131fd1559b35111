use super::ResourceBuilder;
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;

const HANDLER_KEY: &str = "handler";

impl ResourceBuilder<'_> {
    /// `<module><suffix>`, the file the runtime loads the handler from
    fn to_source_file_name(&self) -> String {
        format!(
            "{}{}",
            self.function.spec.to_module_name(),
            self.runtime.info.file_name_suffix
        )
    }

    fn to_config_data(&self) -> BTreeMap<String, String> {
        let spec = &self.function.spec;
        let mut data = BTreeMap::from([
            (String::from(HANDLER_KEY), spec.handler.clone()),
            (self.to_source_file_name(), spec.function.clone()),
        ]);

        if !self.runtime.info.dep_name.is_empty() {
            data.insert(self.runtime.info.dep_name.clone(), spec.deps.clone());
        }

        data
    }
}

impl From<&ResourceBuilder<'_>> for ConfigMap {
    fn from(value: &ResourceBuilder<'_>) -> Self {
        ConfigMap {
            metadata: value.to_meta(),
            data: Some(value.to_config_data()),
            ..Default::default()
        }
    }
}
