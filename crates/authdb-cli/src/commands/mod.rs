pub mod apply;
pub mod check;

use anyhow::{Context, Result, bail};
use authdb_policy::PatcherConfig;

/// Flags shared by the policy commands.
#[derive(Debug, Default)]
pub struct Options {
    pub config: PatcherConfig,
    pub json: bool,
}

impl Options {
    /// Parses `args`, rejecting any flag not listed in `allowed`.
    pub fn parse(args: &[String], allowed: &[&str]) -> Result<Self> {
        let mut options = Options::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            if !allowed.contains(&arg.as_str()) {
                crate::print_usage();
                bail!("Unexpected argument: {}", arg);
            }
            match arg.as_str() {
                "--file" => {
                    let value = iter.next().context("--file requires a path")?;
                    options.config.policy_path = value.into();
                }
                "--backup-dir" => {
                    let value = iter.next().context("--backup-dir requires a directory")?;
                    options.config.backup_dir = value.into();
                }
                "--json" => options.json = true,
                _ => bail!("Unexpected argument: {}", arg),
            }
        }

        Ok(options)
    }
}
