use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LaunchError>;

const GENERIC_FAILURE_EXIT_CODE: i32 = 1;
const NOT_EXECUTABLE_EXIT_CODE: i32 = 126;
const NOT_FOUND_EXIT_CODE: i32 = 127;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("required environment variable {0} is not set")]
    MissingEnvVar(&'static str),

    #[error("environment variable {0} is not valid UTF-8")]
    NonUtf8EnvVar(&'static str),

    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    InvalidEnvVar {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read config file {path:?}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for the training process: {source}")]
    Wait {
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Exit code the launcher reports when it fails before or while starting
    /// the training process. Spawn failures follow the shell conventions.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::Spawn { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => NOT_FOUND_EXIT_CODE,
                std::io::ErrorKind::PermissionDenied => NOT_EXECUTABLE_EXIT_CODE,
                _ => GENERIC_FAILURE_EXIT_CODE,
            },
            _ => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}
