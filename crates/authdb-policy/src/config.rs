use std::path::PathBuf;

/// Well-known location of the authorization policy on macOS.
pub const DEFAULT_POLICY_PATH: &str = "/etc/authorization";

/// Right that debuggers and UI automation need to attach to simulator processes.
pub const DEFAULT_RIGHT: &str = "system.privilege.taskport";

pub const DEFAULT_FLAG: &str = "allow-root";

/// Configuration for a patch run
#[derive(Debug, Clone)]
pub struct PatcherConfig {
    /// Policy file to read and, on confirmation, overwrite
    pub policy_path: PathBuf,
    /// Directory that receives the backup copy
    pub backup_dir: PathBuf,
    /// Key of the right whose dictionary holds the flag
    pub right: String,
    /// Key of the boolean flag inside the right's dictionary
    pub flag: String,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            policy_path: PathBuf::from(DEFAULT_POLICY_PATH),
            backup_dir: std::env::temp_dir(),
            right: DEFAULT_RIGHT.to_string(),
            flag: DEFAULT_FLAG.to_string(),
        }
    }
}

impl PatcherConfig {
    pub fn with_policy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_path = path.into();
        self
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }
}
