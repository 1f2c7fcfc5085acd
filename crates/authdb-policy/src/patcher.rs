use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::backup::Backup;
use crate::config::PatcherConfig;
use crate::console::{Console, is_affirmative};
use crate::diff::context_diff;
use crate::document::{FlagState, PolicyDocument};
use crate::persist::write_policy;
use crate::{PolicyError, Result};

pub const CONFIRM_PROMPT: &str = "Write changes (y/n)? ";

/// How a patch run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The flag was already enabled; nothing was touched
    AlreadyConfigured,
    /// The operator confirmed and the policy file was replaced
    Written { backup: PathBuf },
    /// The operator declined; only the backup was created
    Declined { backup: PathBuf },
}

impl Outcome {
    pub fn backup(&self) -> Option<&PathBuf> {
        match self {
            Outcome::AlreadyConfigured => None,
            Outcome::Written { backup } | Outcome::Declined { backup } => Some(backup),
        }
    }
}

/// Read-only view of the flag, as reported by `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub path: PathBuf,
    pub right: String,
    pub flag: String,
    pub state: FlagState,
    pub configured: bool,
}

/// Ensures one right's flag in the policy file is enabled.
pub struct Patcher {
    config: PatcherConfig,
}

impl Patcher {
    pub fn new(config: PatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    /// Reports the flag's current state without side effects.
    pub fn check(&self) -> Result<CheckReport> {
        let document = PolicyDocument::load(&self.config.policy_path)?;
        let entry = document.locate(&self.config.right, &self.config.flag)?;

        Ok(CheckReport {
            path: self.config.policy_path.clone(),
            right: self.config.right.clone(),
            flag: self.config.flag.clone(),
            state: entry.state,
            configured: entry.state.is_enabled(),
        })
    }

    /// Enables the flag after a backup, a diff and operator confirmation.
    ///
    /// A missing or ambiguous entry fails before any file is created. Once
    /// the flag is known to need changing, the backup is written whether or
    /// not the operator goes on to confirm.
    pub fn apply<C: Console + ?Sized>(&self, console: &mut C) -> Result<Outcome> {
        let path = &self.config.policy_path;
        let document = PolicyDocument::load(path)?;
        let entry = document.locate(&self.config.right, &self.config.flag)?;

        if entry.state.is_enabled() {
            info!(right = %self.config.right, "flag already enabled");
            say(
                console,
                &format!("{} is already configured in {}", self.config.right, path.display()),
            )?;
            return Ok(Outcome::AlreadyConfigured);
        }

        let original = document.text();
        let patched = entry.enable(original);

        let backup = Backup::create(&self.config.backup_dir, original.as_bytes())?;
        say(
            console,
            &format!("Backed up {} to {}", path.display(), backup.path().display()),
        )?;

        let label = path.display().to_string();
        say(console, context_diff(original, &patched, &label, &label).trim_end())?;

        let answer = console.ask(CONFIRM_PROMPT).map_err(PolicyError::Console)?;
        if !answer.as_deref().is_some_and(is_affirmative) {
            warn!(backup = %backup.path().display(), "operator declined policy change");
            say(console, "No changes were made.")?;
            return Ok(Outcome::Declined {
                backup: backup.into_path(),
            });
        }

        write_policy(path, &patched)?;
        say(console, &format!("Wrote new policy file {}", path.display()))?;
        Ok(Outcome::Written {
            backup: backup.into_path(),
        })
    }
}

fn say<C: Console + ?Sized>(console: &mut C, line: &str) -> Result<()> {
    console.say(line).map_err(PolicyError::Console)
}
