use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::environment::LaunchEnvironment;
use crate::error::LaunchError;
use crate::error::Result;

pub const DEFAULT_INTERPRETER: &str = "python";

/// Location of the MaskRCNN PyTorch sources in the training image.
pub const DEFAULT_MODEL_ROOT: &str =
    "/shared/DeepLearningExamples/PyTorch/Segmentation/MaskRCNN/pytorch";

/// Path of an optional TOML file with launcher settings.
pub const CONFIG_PATH_ENV_VAR: &str = "ENTRY_POINT_CONFIG";
pub const INTERPRETER_ENV_VAR: &str = "ENTRY_POINT_INTERPRETER";
pub const MODEL_ROOT_ENV_VAR: &str = "ENTRY_POINT_MODEL_ROOT";
pub const FI_PROVIDER_OVERRIDE_ENV_VAR: &str = "ENTRY_POINT_FI_PROVIDER";
pub const DRY_RUN_ENV_VAR: &str = "ENTRY_POINT_DRY_RUN";

/// On-disk shape of the launcher config file. Every key is optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfigToml {
    pub interpreter: Option<String>,
    pub model_root: Option<PathBuf>,
    pub fi_provider: Option<String>,
    pub dry_run: Option<bool>,
}

/// Resolved launcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Program that runs the training script.
    pub interpreter: PathBuf,

    /// Appended to `PYTHONPATH` and used as the base of the training scripts.
    pub model_root: PathBuf,

    /// Value for `FI_PROVIDER`. Left untouched when `None`.
    pub fi_provider: Option<String>,

    /// Print the command line without starting the training process.
    pub dry_run: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            model_root: PathBuf::from(DEFAULT_MODEL_ROOT),
            fi_provider: None,
            dry_run: false,
        }
    }
}

impl LauncherConfig {
    /// Resolves the config from defaults, then the file named by
    /// `ENTRY_POINT_CONFIG`, then `ENTRY_POINT_*` overrides.
    pub fn load(env: &LaunchEnvironment) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env.get_non_empty(CONFIG_PATH_ENV_VAR) {
            let path = Path::new(path);
            debug!(?path, "loading launcher config file");
            config.apply_toml(load_config_toml(path)?);
        }

        config.apply_env_overrides(env)?;
        Ok(config)
    }

    fn apply_toml(&mut self, toml: LauncherConfigToml) {
        let LauncherConfigToml {
            interpreter,
            model_root,
            fi_provider,
            dry_run,
        } = toml;

        // Empty strings mean "unset", as they do for the env overrides.
        if let Some(interpreter) = interpreter.filter(|value| !value.is_empty()) {
            self.interpreter = PathBuf::from(interpreter);
        }
        if let Some(model_root) = model_root.filter(|value| !value.as_os_str().is_empty()) {
            self.model_root = model_root;
        }
        if let Some(provider) = fi_provider.filter(|value| !value.is_empty()) {
            self.fi_provider = Some(provider);
        }
        if let Some(dry_run) = dry_run {
            self.dry_run = dry_run;
        }
    }

    fn apply_env_overrides(&mut self, env: &LaunchEnvironment) -> Result<()> {
        if let Some(interpreter) = env.get_non_empty(INTERPRETER_ENV_VAR) {
            self.interpreter = PathBuf::from(interpreter);
        }
        if let Some(model_root) = env.get_non_empty(MODEL_ROOT_ENV_VAR) {
            self.model_root = PathBuf::from(model_root);
        }
        if let Some(provider) = env.get_non_empty(FI_PROVIDER_OVERRIDE_ENV_VAR) {
            let provider = provider
                .to_str()
                .ok_or(LaunchError::NonUtf8EnvVar(FI_PROVIDER_OVERRIDE_ENV_VAR))?;
            self.fi_provider = Some(provider.to_string());
        }
        if let Some(dry_run) = env.get_non_empty(DRY_RUN_ENV_VAR) {
            self.dry_run = parse_flag(DRY_RUN_ENV_VAR, dry_run)?;
        }
        Ok(())
    }
}

pub fn load_config_toml(path: &Path) -> Result<LauncherConfigToml> {
    let contents = std::fs::read_to_string(path).map_err(|source| LaunchError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| LaunchError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_flag(name: &'static str, value: &OsStr) -> Result<bool> {
    let text = value.to_str().ok_or(LaunchError::NonUtf8EnvVar(name))?;
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LaunchError::InvalidEnvVar {
            name,
            value: text.to_string(),
            reason: "expected one of 1, true, yes, on, 0, false, no, off".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn defaults_without_file_or_overrides() {
        let config = LauncherConfig::load(&LaunchEnvironment::default()).expect("load");
        assert_eq!(config, LauncherConfig::default());
        assert_eq!(config.interpreter, PathBuf::from("python"));
        assert_eq!(config.model_root, PathBuf::from(DEFAULT_MODEL_ROOT));
    }

    #[test]
    fn file_values_replace_defaults() {
        let file = write_config(
            r#"
interpreter = "/opt/conda/bin/python"
model_root = "/workspace/maskrcnn"
fi_provider = "efa"
"#,
        );
        let env = LaunchEnvironment::from_vars([(CONFIG_PATH_ENV_VAR, file.path())]);

        let config = LauncherConfig::load(&env).expect("load");
        assert_eq!(
            config,
            LauncherConfig {
                interpreter: PathBuf::from("/opt/conda/bin/python"),
                model_root: PathBuf::from("/workspace/maskrcnn"),
                fi_provider: Some("efa".to_string()),
                dry_run: false,
            }
        );
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let file = write_config("interpreter = \"python3\"\ndry_run = false\n");
        let env = LaunchEnvironment::from_vars([
            (CONFIG_PATH_ENV_VAR, file.path().as_os_str()),
            (INTERPRETER_ENV_VAR, OsStr::new("python3.9")),
            (DRY_RUN_ENV_VAR, OsStr::new("TRUE")),
        ]);

        let config = LauncherConfig::load(&env).expect("load");
        assert_eq!(config.interpreter, PathBuf::from("python3.9"));
        assert!(config.dry_run);
    }

    #[test]
    fn empty_overrides_are_ignored() {
        let env = LaunchEnvironment::from_vars([
            (INTERPRETER_ENV_VAR, ""),
            (MODEL_ROOT_ENV_VAR, ""),
            (CONFIG_PATH_ENV_VAR, ""),
        ]);
        let config = LauncherConfig::load(&env).expect("load");
        assert_eq!(config, LauncherConfig::default());
    }

    #[test]
    fn empty_file_values_are_ignored() {
        let file = write_config("interpreter = \"\"\nmodel_root = \"\"\nfi_provider = \"\"\n");
        let env = LaunchEnvironment::from_vars([(CONFIG_PATH_ENV_VAR, file.path())]);

        let config = LauncherConfig::load(&env).expect("load");
        assert_eq!(config, LauncherConfig::default());
        assert_eq!(config.model_root, PathBuf::from(DEFAULT_MODEL_ROOT));
        assert_eq!(config.fi_provider, None);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let file = write_config("interpeter = \"python3\"\n");
        let env = LaunchEnvironment::from_vars([(CONFIG_PATH_ENV_VAR, file.path())]);

        let err = LauncherConfig::load(&env).unwrap_err();
        assert!(matches!(err, LaunchError::ParseConfig { .. }), "{err}");
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("launcher.toml");
        let env = LaunchEnvironment::from_vars([(CONFIG_PATH_ENV_VAR, missing.as_path())]);

        let err = LauncherConfig::load(&env).unwrap_err();
        match err {
            LaunchError::ReadConfig { path, .. } => assert_eq!(path, missing),
            other => panic!("expected ReadConfig, got {other:?}"),
        }
    }

    #[test]
    fn malformed_dry_run_flag_is_a_config_error() {
        let env = LaunchEnvironment::from_vars([(DRY_RUN_ENV_VAR, "maybe")]);
        let err = LauncherConfig::load(&env).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::InvalidEnvVar {
                name: DRY_RUN_ENV_VAR,
                ..
            }
        ));
    }
}
