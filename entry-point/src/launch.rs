use std::borrow::Cow;
use std::ffi::OsStr;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;

use tracing::debug;

use crate::config::LauncherConfig;
use crate::environment::EFA_DEVICE_RDMA_ENABLED;
use crate::environment::EFA_DEVICE_RDMA_ENV_VAR;
use crate::environment::FI_PROVIDER_ENV_VAR;
use crate::environment::FRAMEWORK_PARAMS_ENV_VAR;
use crate::environment::LaunchEnvironment;
use crate::environment::PYTHONPATH_ENV_VAR;
use crate::environment::extend_search_path;
use crate::error::LaunchError;
use crate::error::Result;
use crate::training_entry::TrainingEntry;

const UNKNOWN_STATUS_EXIT_CODE: i32 = 1;

#[cfg(unix)]
const SIGNAL_EXIT_CODE_BASE: i32 = 128;

/// Everything needed to start the training process.
///
/// The argv is kept as a list of OS strings and handed to the OS as-is, so
/// forwarded arguments never go through shell word splitting or expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub entry: TrainingEntry,
    pub program: PathBuf,
    /// Training script followed by the forwarded arguments.
    pub args: Vec<OsString>,
    /// Variables set on the child on top of the inherited environment.
    pub env: Vec<(&'static str, OsString)>,
}

impl LaunchPlan {
    pub fn build<I>(config: &LauncherConfig, env: &LaunchEnvironment, forwarded: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let python_path = extend_search_path(env.require(PYTHONPATH_ENV_VAR)?, &config.model_root);
        let entry = TrainingEntry::select(env.require_utf8(FRAMEWORK_PARAMS_ENV_VAR)?);

        let mut child_env = vec![
            (PYTHONPATH_ENV_VAR, python_path),
            (
                EFA_DEVICE_RDMA_ENV_VAR,
                OsString::from(EFA_DEVICE_RDMA_ENABLED),
            ),
        ];
        if let Some(provider) = &config.fi_provider {
            child_env.push((FI_PROVIDER_ENV_VAR, OsString::from(provider)));
        }

        let mut args = vec![entry.script_path(&config.model_root).into_os_string()];
        args.extend(forwarded.into_iter().map(Into::into));

        Ok(Self {
            entry,
            program: config.interpreter.clone(),
            args,
            env: child_env,
        })
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> impl Iterator<Item = &OsStr> {
        std::iter::once(self.program.as_os_str()).chain(self.args.iter().map(OsString::as_os_str))
    }

    pub fn env_value(&self, name: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_os_str())
    }

    /// Shell-quoted rendering of the argv, for logging only.
    pub fn display_command(&self) -> String {
        let words: Vec<Cow<'_, str>> = self.argv().map(OsStr::to_string_lossy).collect();
        shlex::try_join(words.iter().map(|word| &**word)).unwrap_or_else(|_| words.join(" "))
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.env.iter().map(|(key, value)| (*key, value)));
        command
    }
}

/// Starts the training process and blocks until it exits.
pub fn run(plan: &LaunchPlan) -> Result<ExitStatus> {
    let mut child = plan
        .to_command()
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            program: plan.program.display().to_string(),
            source,
        })?;
    debug!(pid = child.id(), entry = %plan.entry, "training process started");

    child.wait().map_err(|source| LaunchError::Wait { source })
}

/// Maps the child's status onto the launcher's exit code. A child killed by a
/// signal reports `128 + signal`, like a POSIX shell.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return SIGNAL_EXIT_CODE_BASE + signal;
        }
    }

    UNKNOWN_STATUS_EXIT_CODE
}
