use const_format::concatcp;

pub const CONFIG_NAMESPACE_ENV_VAR: &str = "KUBELESS_CONFIG_NAMESPACE";
pub const CONFIG_DEFAULT_NAMESPACE: &str = "kubeless";

pub const CONFIG_NAME_ENV_VAR: &str = "KUBELESS_CONFIG_NAME";
pub const CONFIG_DEFAULT_NAME: &str = "kubeless-config";

pub const FUNCTIONS_NAMESPACE_ENV_VAR: &str = "KUBELESS_FUNCTIONS_NAMESPACE";

/// ConfigMap key holding the runtime registry document
pub const RUNTIME_IMAGES_KEY: &str = "runtime-images";

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

pub const GROUP: &str = "kubeless.io";
pub const PLURAL: &str = "functions";
pub const CRD_NAME: &str = concatcp!(PLURAL, ".", GROUP);
pub const FINALIZER_NAME: &str = concatcp!(GROUP, "/function-finalizer");

pub const CREATED_BY_LABEL: &str = "created-by";
pub const CREATED_BY_VALUE: &str = "kubeless";
pub const FUNCTION_LABEL: &str = "function";

pub const DEFAULT_FUNCTION_PORT: i32 = 8080;
pub const DEFAULT_FUNCTION_TIMEOUT: &str = "180";
pub const FUNCTION_PORT_NAME: &str = "http-function-port";

pub const SOURCE_MOUNT_PATH: &str = "/kubeless";
pub const DEPS_MOUNT_PATH: &str = concatcp!(SOURCE_MOUNT_PATH, "/deps");
