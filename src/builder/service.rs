use super::ResourceBuilder;
use crate::consts::FUNCTION_PORT_NAME;
use k8s_openapi::{
    api::core::v1::{Service, ServicePort, ServiceSpec},
    apimachinery::pkg::util::intstr::IntOrString,
};

impl From<&ResourceBuilder<'_>> for Service {
    fn from(value: &ResourceBuilder<'_>) -> Self {
        let port = value.function.spec.to_port();

        Service {
            metadata: value.to_meta(),
            spec: Some(ServiceSpec {
                type_: Some(String::from("ClusterIP")),
                selector: Some(value.function.to_selector_labels()),
                ports: Some(vec![ServicePort {
                    name: Some(String::from(FUNCTION_PORT_NAME)),
                    port,
                    target_port: Some(IntOrString::Int(port)),
                    protocol: Some(String::from("TCP")),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
