use anyhow::Result;
use authdb_policy::{Outcome, Patcher, TermConsole};
use tracing::debug;

use super::Options;

/// Executes the apply command against stdin/stdout
pub fn execute(args: &[String]) -> Result<()> {
    let options = Options::parse(args, &["--file", "--backup-dir"])?;
    debug!(config = ?options.config, "running apply");

    let patcher = Patcher::new(options.config);
    let mut console = TermConsole::stdio();
    let outcome = patcher.apply(&mut console)?;

    if let Outcome::Written { backup } | Outcome::Declined { backup } = &outcome {
        debug!(backup = %backup.display(), "backup retained");
    }
    Ok(())
}
