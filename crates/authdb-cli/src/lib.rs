use anyhow::{Result, bail};

pub mod commands;

pub fn run(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return commands::apply::execute(&[]);
    }

    match args[0].as_str() {
        "apply" => commands::apply::execute(&args[1..]),
        "check" => commands::check::execute(&args[1..]),
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        "-v" | "--version" => {
            print_version();
            Ok(())
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", args[0]);
            print_usage();
            bail!("Unknown command: {}", args[0])
        }
    }
}

pub(crate) fn print_usage() {
    println!("authdb - let root attach to simulator processes on macOS");
    println!();
    println!("USAGE:");
    println!("    authdb [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    apply     Enable allow-root for system.privilege.taskport (default)");
    println!("    check     Report whether the authorization policy is set up");
    println!("    help      Print this help message");
    println!();
    println!("OPTIONS:");
    println!("    --file <PATH>        Policy file to use [default: /etc/authorization]");
    println!("    --backup-dir <DIR>   Where apply writes its backup [default: system temp dir]");
    println!("    --json               Print the check result as JSON");
    println!("    -h, --help           Print help information");
    println!("    -v, --version        Print version information");
}

fn print_version() {
    println!("authdb {}", env!("CARGO_PKG_VERSION"));
}
