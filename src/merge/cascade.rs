//! Annotation cascade for deployments.
//!
//! Object-level annotations of the cluster overlay also seed the pod template,
//! so an operator can stamp an annotation once and have it land on the
//! deployment and on every pod it creates.

use super::Layers;
use serde_json::{Map, Value};

const OBJECT_ANNOTATIONS: &str = "/metadata/annotations";
const POD_ANNOTATIONS: &str = "/spec/template/metadata/annotations";

/// The annotation maps of every layer, absent when a layer does not set them
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationSources<'a> {
    pub baseline_object: Option<&'a Value>,
    pub baseline_pod: Option<&'a Value>,
    pub overlay_object: Option<&'a Value>,
    pub overlay_pod: Option<&'a Value>,
    pub function_object: Option<&'a Value>,
    pub function_pod: Option<&'a Value>,
}

impl<'a> AnnotationSources<'a> {
    pub fn from_layers(layers: &Layers<'a>) -> Self {
        Self {
            baseline_object: layers.baseline.pointer(OBJECT_ANNOTATIONS),
            baseline_pod: layers.baseline.pointer(POD_ANNOTATIONS),
            overlay_object: layers.overlay.and_then(|overlay| overlay.pointer(OBJECT_ANNOTATIONS)),
            overlay_pod: layers.overlay.and_then(|overlay| overlay.pointer(POD_ANNOTATIONS)),
            function_object: layers
                .fragment
                .and_then(|fragment| fragment.pointer(OBJECT_ANNOTATIONS)),
            function_pod: layers
                .fragment
                .and_then(|fragment| fragment.pointer(POD_ANNOTATIONS)),
        }
    }

    /// baseline, then overlay, then function
    pub fn object_annotations(&self) -> Map<String, Value> {
        union([
            self.baseline_object,
            self.overlay_object,
            self.function_object,
        ])
    }

    /// baseline, then overlay object-level, then overlay pod-level, then function
    pub fn pod_annotations(&self) -> Map<String, Value> {
        union([
            self.baseline_pod,
            self.overlay_object,
            self.overlay_pod,
            self.function_pod,
        ])
    }

    /// Writes both annotation maps into a merged deployment document.
    pub fn apply(&self, merged: &mut Value) {
        if let Some(metadata) = merged.get_mut("metadata") {
            set_annotations(metadata, self.object_annotations());
        }

        let Some(template) = merged.pointer_mut("/spec/template").and_then(Value::as_object_mut)
        else {
            return;
        };

        let metadata = template
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        set_annotations(metadata, self.pod_annotations());
    }
}

/// Unions annotation maps left to right. Later sources win ties and a `null`
/// value removes the key.
pub fn union<'a>(sources: impl IntoIterator<Item = Option<&'a Value>>) -> Map<String, Value> {
    let mut merged = Value::Object(Map::new());

    for source in sources.into_iter().flatten().filter(|source| source.is_object()) {
        json_patch::merge(&mut merged, source);
    }

    match merged {
        Value::Object(annotations) => annotations,
        _ => Map::new(),
    }
}

fn set_annotations(metadata: &mut Value, annotations: Map<String, Value>) {
    let Some(metadata) = metadata.as_object_mut() else {
        return;
    };

    if annotations.is_empty() {
        metadata.remove("annotations");
    } else {
        metadata.insert(String::from("annotations"), Value::Object(annotations));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_sources_win() {
        let first = json!({"k": "first", "a": "1"});
        let second = json!({"k": "second", "b": "2"});

        let merged = union([Some(&first), None, Some(&second)]);

        assert_eq!(Value::Object(merged), json!({"k": "second", "a": "1", "b": "2"}));
    }

    #[test]
    fn null_removes_key() {
        let first = json!({"k": "v", "keep": "me"});
        let second = json!({"k": null});

        assert_eq!(
            Value::Object(union([Some(&first), Some(&second)])),
            json!({"keep": "me"})
        );
    }

    #[test]
    fn overlay_object_annotations_seed_pods() {
        let overlay_object = json!({"foo-from-deploy-cm": "bar-from-deploy-cm", "xyz": "valuefromcm"});
        let overlay_pod = json!({"podannotation-from-func-crd": "value-from-container"});
        let function = json!({"bar": "foo", "xyz": "valuefromfunc"});

        let sources = AnnotationSources {
            overlay_object: Some(&overlay_object),
            overlay_pod: Some(&overlay_pod),
            function_object: Some(&function),
            function_pod: Some(&function),
            ..Default::default()
        };

        assert_eq!(
            Value::Object(sources.object_annotations()),
            json!({
                "bar": "foo",
                "foo-from-deploy-cm": "bar-from-deploy-cm",
                "xyz": "valuefromfunc"
            })
        );
        assert_eq!(
            Value::Object(sources.pod_annotations()),
            json!({
                "bar": "foo",
                "foo-from-deploy-cm": "bar-from-deploy-cm",
                "podannotation-from-func-crd": "value-from-container",
                "xyz": "valuefromfunc"
            })
        );
    }

    #[test]
    fn overlay_pod_annotations_beat_overlay_object_annotations() {
        let overlay_object = json!({"k": "object"});
        let overlay_pod = json!({"k": "pod"});

        let sources = AnnotationSources {
            overlay_object: Some(&overlay_object),
            overlay_pod: Some(&overlay_pod),
            ..Default::default()
        };

        assert_eq!(Value::Object(sources.object_annotations()), json!({"k": "object"}));
        assert_eq!(Value::Object(sources.pod_annotations()), json!({"k": "pod"}));
    }

    #[test]
    fn apply_writes_both_levels() {
        let overlay = json!({"metadata": {"annotations": {"k": "cm"}}});
        let fragment = json!({"metadata": {"annotations": {"k": "fn"}}});
        let baseline = json!({"metadata": {"name": "foo"}, "spec": {"template": {}}});

        let layers = Layers {
            baseline: &baseline,
            overlay: Some(&overlay),
            fragment: Some(&fragment),
        };

        let mut merged = baseline.clone();
        AnnotationSources::from_layers(&layers).apply(&mut merged);

        assert_eq!(
            merged,
            json!({
                "metadata": {"name": "foo", "annotations": {"k": "fn"}},
                "spec": {"template": {"metadata": {"annotations": {"k": "cm"}}}}
            })
        );
    }
}
