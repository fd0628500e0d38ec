use std::fmt;
use std::path::Path;
use std::path::PathBuf;

/// Marker in the framework parameters that selects the general training
/// script over the SageMaker-specific one.
pub const DATA_PARALLEL_MARKER: &str = "dataparallel";

const GENERAL_SCRIPT: &str = "tools/train_net.py";
const SAGEMAKER_SCRIPT: &str = "tools/train_net_sm.py";

/// Which training script the launcher hands to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingEntry {
    /// `tools/train_net.py`, used with the data-parallel library.
    General,
    /// `tools/train_net_sm.py`.
    SageMaker,
}

impl TrainingEntry {
    /// The match is case-sensitive and may occur anywhere in the parameters.
    pub fn select(framework_params: &str) -> Self {
        if framework_params.contains(DATA_PARALLEL_MARKER) {
            TrainingEntry::General
        } else {
            TrainingEntry::SageMaker
        }
    }

    pub fn script(self) -> &'static str {
        match self {
            TrainingEntry::General => GENERAL_SCRIPT,
            TrainingEntry::SageMaker => SAGEMAKER_SCRIPT,
        }
    }

    pub fn script_path(self, model_root: &Path) -> PathBuf {
        model_root.join(self.script())
    }
}

impl fmt::Display for TrainingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingEntry::General => f.write_str("general"),
            TrainingEntry::SageMaker => f.write_str("sagemaker"),
        }
    }
}
