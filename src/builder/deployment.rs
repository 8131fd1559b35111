use super::ResourceBuilder;
use crate::consts::{DEPS_MOUNT_PATH, FUNCTION_PORT_NAME, SOURCE_MOUNT_PATH};
use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{
            ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvVar,
            LocalObjectReference, PodSpec, PodTemplateSpec, Volume, VolumeMount,
        },
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::core::ObjectMeta;
use std::collections::BTreeMap;

const INSTALL_CONTAINER_NAME: &str = "install";

fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: String::from(name),
        value: Some(value.into()),
        ..Default::default()
    }
}

impl ResourceBuilder<'_> {
    /// Author env first, then the runtime variables the author did not set.
    fn to_env_vars(&self, mut env: Vec<EnvVar>) -> Vec<EnvVar> {
        let spec = &self.function.spec;
        let runtime_env = [
            env_var("FUNC_HANDLER", spec.to_function_name()),
            env_var("MOD_NAME", spec.to_module_name()),
            env_var("FUNC_TIMEOUT", spec.to_timeout()),
            env_var("FUNC_RUNTIME", spec.runtime.clone()),
            env_var("FUNC_PORT", spec.to_port().to_string()),
        ];

        for var in runtime_env {
            if !env.iter().any(|existing| existing.name == var.name) {
                env.push(var);
            }
        }

        env
    }

    fn to_volume_mounts(&self) -> Vec<VolumeMount> {
        let mut mounts = vec![VolumeMount {
            name: self.to_source_volume_name(),
            mount_path: String::from(SOURCE_MOUNT_PATH),
            ..Default::default()
        }];

        if self.install.is_some() {
            mounts.push(VolumeMount {
                name: self.to_deps_volume_name(),
                mount_path: String::from(DEPS_MOUNT_PATH),
                ..Default::default()
            });
        }

        mounts
    }

    fn to_volumes(&self) -> Vec<Volume> {
        let mut volumes = vec![Volume {
            name: self.to_source_volume_name(),
            config_map: Some(ConfigMapVolumeSource {
                name: Some(self.name.clone()),
                ..Default::default()
            }),
            ..Default::default()
        }];

        if self.install.is_some() {
            volumes.push(Volume {
                name: self.to_deps_volume_name(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            });
        }

        volumes
    }

    fn to_image_pull_secrets(&self) -> Option<Vec<LocalObjectReference>> {
        let secrets = &self.runtime.version.image_pull_secrets;
        if secrets.is_empty() {
            return None;
        }

        Some(
            secrets
                .iter()
                .map(|secret| LocalObjectReference {
                    name: Some(secret.image_secret.clone()),
                })
                .collect(),
        )
    }

    fn to_install_container(&self) -> Option<Container> {
        let install = self.install.as_ref()?;

        let env = install
            .env
            .filter(|env| !env.is_empty())
            .map(|env| env.iter().map(|(name, value)| env_var(name, value.clone())).collect());

        Some(Container {
            name: String::from(INSTALL_CONTAINER_NAME),
            image: Some(install.image.to_string()),
            command: install.command.map(|command| {
                vec![String::from("sh"), String::from("-c"), command.to_string()]
            }),
            env,
            working_dir: Some(String::from(SOURCE_MOUNT_PATH)),
            volume_mounts: Some(self.to_volume_mounts()),
            ..Default::default()
        })
    }

    fn to_pod_labels(&self) -> BTreeMap<String, String> {
        self.function.to_labels()
    }
}

/// The runtime container, seeded from the author's first container.
impl From<&ResourceBuilder<'_>> for Container {
    fn from(value: &ResourceBuilder<'_>) -> Self {
        let mut container = value
            .function
            .spec
            .to_container_seed()
            .cloned()
            .unwrap_or_default();

        container.name = value.name.clone();
        container.image = container
            .image
            .take()
            .filter(|image| !image.is_empty())
            .or_else(|| value.runtime_image.map(str::to_string));
        container.env = Some(value.to_env_vars(container.env.take().unwrap_or_default()));

        if container.ports.is_none() {
            container.ports = Some(vec![ContainerPort {
                name: Some(String::from(FUNCTION_PORT_NAME)),
                container_port: value.function.spec.to_port(),
                protocol: Some(String::from("TCP")),
                ..Default::default()
            }]);
        }

        let mut volume_mounts = container.volume_mounts.take().unwrap_or_default();
        volume_mounts.extend(value.to_volume_mounts());
        container.volume_mounts = Some(volume_mounts);

        if container.liveness_probe.is_none() {
            container.liveness_probe = value.runtime.liveness_probe().cloned();
        }

        container
    }
}

impl From<&ResourceBuilder<'_>> for Deployment {
    fn from(value: &ResourceBuilder<'_>) -> Self {
        Deployment {
            metadata: value.to_meta(),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(value.function.to_selector_labels()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(value.to_pod_labels()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container::from(value)],
                        init_containers: value.to_install_container().map(|install| vec![install]),
                        volumes: Some(value.to_volumes()),
                        image_pull_secrets: value.to_image_pull_secrets(),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{curl_probe, function, registry, ruby_spec};
    use super::*;
    use crate::{
        crds::defs::FunctionSpec,
        registry::{ImagePhase, ImageSecret, RuntimeRegistry, RuntimeVersion},
    };
    use k8s_openapi::api::core::v1::{ExecAction, Probe};

    fn pod_spec(deployment: &Deployment) -> &PodSpec {
        deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.template.spec.as_ref())
            .unwrap()
    }

    fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a str> {
        container
            .env
            .as_ref()?
            .iter()
            .find(|var| var.name == name)?
            .value
            .as_deref()
    }

    #[test]
    fn ruby_container_gets_the_registry_probe() {
        let registry = registry();
        let function = function(ruby_spec());
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let deployment = Deployment::from(&builder);

        let container = &pod_spec(&deployment).containers[0];
        assert_eq!(container.name, "foo");
        assert_eq!(container.image.as_deref(), Some("bitnami/ruby:2.4"));
        assert_eq!(container.liveness_probe, Some(curl_probe()));
        assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(1));
    }

    /// The test registry with its single version changed.
    fn registry_with(change: impl FnOnce(&mut RuntimeVersion)) -> RuntimeRegistry {
        let mut info = registry().lookup("ruby", "2.4").unwrap().info.clone();
        change(&mut info.versions[0]);
        RuntimeRegistry::new(vec![info])
    }

    #[test]
    fn no_probe_template_means_no_probe() {
        let registry = registry_with(|version| version.liveness_probe_info = None);
        let function = function(ruby_spec());
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let deployment = Deployment::from(&builder);

        assert_eq!(pod_spec(&deployment).containers[0].liveness_probe, None);
    }

    fn seeded_with_image(image: &str) -> FunctionSpec {
        let mut spec = ruby_spec();
        spec.deployment = Some(Deployment {
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            image: Some(String::from(image)),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        });
        spec
    }

    #[test]
    fn author_image_wins_over_runtime_image() {
        let registry = registry();
        let function = function(seeded_with_image("myrepo/ruby-custom:1"));
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let container = Container::from(&builder);

        assert_eq!(container.image.as_deref(), Some("myrepo/ruby-custom:1"));
    }

    #[test]
    fn empty_author_image_falls_back_to_runtime_image() {
        let registry = registry();
        let function = function(seeded_with_image(""));
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let container = Container::from(&builder);

        assert_eq!(container.image.as_deref(), Some("bitnami/ruby:2.4"));
    }

    #[test]
    fn version_without_runtime_image_still_builds() {
        let registry = registry_with(|version| {
            version.images.retain(|image| image.phase != ImagePhase::Runtime)
        });
        let function = function(ruby_spec());
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let deployment = Deployment::from(&builder);

        let container = &pod_spec(&deployment).containers[0];
        assert_eq!(container.name, "foo");
        assert_eq!(container.image, None);
        assert_eq!(container.liveness_probe, Some(curl_probe()));
    }

    #[test]
    fn runtime_env_follows_author_env() {
        let registry = registry();
        let mut spec = ruby_spec();
        spec.deployment = Some(Deployment {
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            env: Some(vec![
                                env_var("LOG_LEVEL", "debug"),
                                env_var("FUNC_TIMEOUT", "30"),
                            ]),
                            liveness_probe: Some(Probe {
                                exec: Some(ExecAction {
                                    command: Some(vec![String::from("true")]),
                                }),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        });
        let function = function(spec);
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let container = Container::from(&builder);

        let names: Vec<_> = container
            .env
            .as_ref()
            .unwrap()
            .iter()
            .map(|var| var.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["LOG_LEVEL", "FUNC_TIMEOUT", "FUNC_HANDLER", "MOD_NAME", "FUNC_RUNTIME", "FUNC_PORT"]
        );
        assert_eq!(env_value(&container, "FUNC_TIMEOUT"), Some("30"));
        assert_eq!(env_value(&container, "FUNC_HANDLER"), Some("foo"));
        assert_eq!(env_value(&container, "MOD_NAME"), Some("foo"));
        assert_eq!(env_value(&container, "FUNC_RUNTIME"), Some("ruby2.4"));
        assert_eq!(env_value(&container, "FUNC_PORT"), Some("8080"));
        assert_ne!(container.liveness_probe, Some(curl_probe()));
    }

    #[test]
    fn deps_add_install_container_and_volume() {
        let registry = registry();
        let function = function(FunctionSpec {
            deps: String::from("source 'https://rubygems.org'\ngem 'logging'\n"),
            ..ruby_spec()
        });
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let deployment = Deployment::from(&builder);
        let pod_spec = pod_spec(&deployment);

        let init_containers = pod_spec.init_containers.as_ref().unwrap();
        assert_eq!(init_containers.len(), 1);
        let install = &init_containers[0];
        assert_eq!(install.name, "install");
        assert_eq!(install.image.as_deref(), Some("bitnami/ruby:2.4-installer"));
        assert_eq!(
            install.command,
            Some(vec![
                String::from("sh"),
                String::from("-c"),
                String::from("bundle install --path deps"),
            ])
        );
        assert_eq!(env_value(install, "BUNDLE_SILENCE_ROOT_WARNING"), Some("1"));

        let volume_names: Vec<_> = pod_spec
            .volumes
            .as_ref()
            .unwrap()
            .iter()
            .map(|volume| volume.name.as_str())
            .collect();
        assert_eq!(volume_names, vec!["foo-src", "foo-deps"]);

        let mount_paths: Vec<_> = pod_spec.containers[0]
            .volume_mounts
            .as_ref()
            .unwrap()
            .iter()
            .map(|mount| mount.mount_path.as_str())
            .collect();
        assert_eq!(mount_paths, vec!["/kubeless", "/kubeless/deps"]);
    }

    #[test]
    fn no_deps_no_install_container() {
        let registry = registry();
        let function = function(ruby_spec());
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let deployment = Deployment::from(&builder);
        let pod_spec = pod_spec(&deployment);

        assert!(pod_spec.init_containers.is_none());
        assert_eq!(pod_spec.volumes.as_ref().unwrap().len(), 1);
        assert!(pod_spec.image_pull_secrets.is_none());
    }

    #[test]
    fn pull_secrets_and_selector() {
        let registry = registry_with(|version| {
            version.image_pull_secrets = vec![ImageSecret {
                image_secret: String::from("registry-creds"),
            }]
        });
        let function = function(ruby_spec());
        let builder = ResourceBuilder::new(&function, &registry).unwrap();

        let deployment = Deployment::from(&builder);

        assert_eq!(
            pod_spec(&deployment).image_pull_secrets,
            Some(vec![LocalObjectReference {
                name: Some(String::from("registry-creds")),
            }])
        );
        let spec = deployment.spec.as_ref().unwrap();
        assert_eq!(
            spec.selector.match_labels,
            Some(function.to_selector_labels())
        );
        let pod_labels = spec.template.metadata.as_ref().unwrap().labels.as_ref().unwrap();
        assert_eq!(pod_labels["function"], "foo");
    }
}
