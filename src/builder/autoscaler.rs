use super::ResourceBuilder;
use k8s_openapi::api::{
    apps::v1::Deployment,
    autoscaling::v2::{CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec},
};
use kube::Resource;

/// An unset `maxReplicas` decodes as 0; fall back to the minimum, at least 1.
fn to_max_replicas(request: &HorizontalPodAutoscalerSpec) -> i32 {
    if request.max_replicas > 0 {
        return request.max_replicas;
    }
    request.min_replicas.unwrap_or(1).max(1)
}

/// `None` unless the function asks for scaling.
impl From<&ResourceBuilder<'_>> for Option<HorizontalPodAutoscaler> {
    fn from(value: &ResourceBuilder<'_>) -> Self {
        let request = value
            .function
            .spec
            .horizontal_pod_autoscaler
            .as_ref()?
            .spec
            .clone()
            .unwrap_or_default();

        Some(HorizontalPodAutoscaler {
            metadata: value.to_meta(),
            spec: Some(HorizontalPodAutoscalerSpec {
                max_replicas: to_max_replicas(&request),
                min_replicas: request.min_replicas,
                metrics: request.metrics,
                behavior: request.behavior,
                scale_target_ref: CrossVersionObjectReference {
                    api_version: Some(Deployment::api_version(&()).into_owned()),
                    kind: Deployment::kind(&()).into_owned(),
                    name: value.name.clone(),
                },
            }),
            ..Default::default()
        })
    }
}
