use anyhow::{Result, bail};
use authdb_policy::{CheckReport, Patcher};

use super::Options;

pub const CONFIGURED_MESSAGE: &str = "The Authorization DB is set up properly.";
pub const NOT_CONFIGURED_MESSAGE: &str = "The Authorization DB is NOT set up properly.";

/// Executes the check command, failing when the flag is not enabled
pub fn execute(args: &[String]) -> Result<()> {
    let options = Options::parse(args, &["--file", "--json"])?;
    let report = Patcher::new(options.config).check()?;

    println!("{}", render(&report, options.json)?);
    if !report.configured {
        bail!(
            "'{}' is not enabled for {} in {}",
            report.flag,
            report.right,
            report.path.display()
        );
    }
    Ok(())
}

pub fn render(report: &CheckReport, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    let message = if report.configured {
        CONFIGURED_MESSAGE
    } else {
        NOT_CONFIGURED_MESSAGE
    };
    Ok(message.to_string())
}
