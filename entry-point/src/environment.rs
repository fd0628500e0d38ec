use std::collections::HashMap;
use std::ffi::OsStr;
use std::ffi::OsString;
use std::path::Path;

use crate::error::LaunchError;
use crate::error::Result;

/// Module search path handed to the training interpreter.
pub const PYTHONPATH_ENV_VAR: &str = "PYTHONPATH";

/// Framework parameters provided by the training harness.
pub const FRAMEWORK_PARAMS_ENV_VAR: &str = "SM_FRAMEWORK_PARAMS";

/// libfabric switch enabling device RDMA on EFA.
pub const EFA_DEVICE_RDMA_ENV_VAR: &str = "FI_EFA_USE_DEVICE_RDMA";
pub const EFA_DEVICE_RDMA_ENABLED: &str = "1";

/// libfabric provider selection. Only set when configured.
pub const FI_PROVIDER_ENV_VAR: &str = "FI_PROVIDER";

#[cfg(unix)]
const SEARCH_PATH_SEPARATOR: &str = ":";

#[cfg(windows)]
const SEARCH_PATH_SEPARATOR: &str = ";";

/// Snapshot of the process environment, captured once at startup.
///
/// Everything downstream reads from the snapshot, so the launcher never has
/// to mutate the process-wide environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchEnvironment {
    vars: HashMap<OsString, OsString>,
}

impl LaunchEnvironment {
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(name)).map(OsString::as_os_str)
    }

    /// Like [`LaunchEnvironment::get`], but treats an empty value as unset.
    pub fn get_non_empty(&self, name: &str) -> Option<&OsStr> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn require(&self, name: &'static str) -> Result<&OsStr> {
        self.get(name).ok_or(LaunchError::MissingEnvVar(name))
    }

    pub fn require_utf8(&self, name: &'static str) -> Result<&str> {
        self.require(name)?
            .to_str()
            .ok_or(LaunchError::NonUtf8EnvVar(name))
    }
}

/// Appends `segment` to a search-path list such as `PYTHONPATH`.
///
/// An empty list yields the segment alone so the result never gains an empty
/// (current directory) entry.
pub fn extend_search_path(existing: &OsStr, segment: &Path) -> OsString {
    if existing.is_empty() {
        return segment.as_os_str().to_os_string();
    }

    let mut extended = existing.to_os_string();
    extended.push(SEARCH_PATH_SEPARATOR);
    extended.push(segment);
    extended
}
