//! Cluster defaults overlay.
//!
//! Operator-authored patch documents, one per managed object kind. The
//! documents stay raw here and are only parsed when merged.

use std::collections::BTreeMap;

/// The kinds of objects managed for one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ObjectKind {
    Deployment,
    Service,
    ConfigMap,
    HorizontalPodAutoscaler,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Deployment,
        ObjectKind::Service,
        ObjectKind::ConfigMap,
        ObjectKind::HorizontalPodAutoscaler,
    ];

    /// The configuration key holding this kind's overlay
    pub fn overlay_key(&self) -> &'static str {
        match self {
            ObjectKind::Deployment => "deployment",
            ObjectKind::Service => "service",
            ObjectKind::ConfigMap => "configmap",
            ObjectKind::HorizontalPodAutoscaler => "horizontalPodAutoscaler",
        }
    }

    pub fn from_overlay_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.overlay_key() == key)
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Deployment => write!(f, "Deployment"),
            ObjectKind::Service => write!(f, "Service"),
            ObjectKind::ConfigMap => write!(f, "ConfigMap"),
            ObjectKind::HorizontalPodAutoscaler => write!(f, "HorizontalPodAutoscaler"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterDefaults {
    overlays: BTreeMap<ObjectKind, String>,
}

impl ClusterDefaults {
    pub fn new(overlays: BTreeMap<ObjectKind, String>) -> Self {
        Self { overlays }
    }

    /// Picks the overlay entries out of a configuration map.
    /// Keys that do not name a managed kind are not overlays and are skipped.
    pub fn from_config_data(data: &BTreeMap<String, String>) -> Self {
        let overlays = data
            .iter()
            .filter_map(|(key, document)| {
                ObjectKind::from_overlay_key(key).map(|kind| (kind, document.clone()))
            })
            .collect();

        Self::new(overlays)
    }

    pub fn with_overlay(mut self, kind: ObjectKind, document: impl Into<String>) -> Self {
        self.overlays.insert(kind, document.into());
        self
    }

    pub fn overlay(&self, kind: ObjectKind) -> Option<&str> {
        self.overlays.get(&kind).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_only_kind_keys() {
        let data: BTreeMap<String, String> = [
            (String::from("deployment"), String::from(r#"{"spec":{"replicas":2}}"#)),
            (String::from("runtime-images"), String::from("[]")),
            (String::from("horizontalPodAutoscaler"), String::from("{}")),
        ]
        .into();

        let defaults = ClusterDefaults::from_config_data(&data);

        assert_eq!(
            defaults.overlay(ObjectKind::Deployment),
            Some(r#"{"spec":{"replicas":2}}"#)
        );
        assert_eq!(defaults.overlay(ObjectKind::HorizontalPodAutoscaler), Some("{}"));
        assert_eq!(defaults.overlay(ObjectKind::Service), None);
        assert_eq!(defaults.overlay(ObjectKind::ConfigMap), None);
    }
}
