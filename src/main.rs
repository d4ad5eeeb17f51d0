use anyhow::{Context, Result, bail};
use clap::Parser;
use reqcheck::commands::{CheckAction, ListAction, ShowAction, environment_text};
use reqcheck::diagnostics::Severity;
use reqcheck::marker::{MarkerEnvironment, MarkerVariable};
use reqcheck::runtime::{RealRuntime, Runtime};
use std::path::PathBuf;

/// reqcheck - requirements manifest checker
///
/// Parse, validate and inspect pip-style requirements manifests without
/// installing anything.
///
/// Examples:
///   reqcheck check requirements.txt
///   reqcheck list requirements.txt --applicable --python 3.10
#[derive(Parser, Debug)]
#[command(author, version = env!("REQCHECK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Python version for marker evaluation (also via REQCHECK_PYTHON)
    #[arg(long, env = "REQCHECK_PYTHON", value_name = "X.Y[.Z]", global = true)]
    python: Option<String>,

    /// Override a marker variable, e.g. platform_machine=aarch64 (repeatable)
    #[arg(long = "marker-var", value_name = "KEY=VALUE", global = true)]
    marker_vars: Vec<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate one or more manifests
    Check(CheckArgs),

    /// List the requirements a manifest declares
    List(ListArgs),

    /// Show every entry for one package
    Show(ShowArgs),

    /// Print the marker environment used for evaluation
    Env,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Manifest files to check
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Treat warnings as failures
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Manifest file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Only entries whose marker holds in the evaluated environment
    #[arg(long)]
    pub applicable: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Manifest file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Package name (any equivalent spelling)
    #[arg(value_name = "PACKAGE")]
    pub package: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let env = marker_environment(&cli)?;

    match &cli.command {
        Commands::Check(args) => check(&runtime, &cli, args),
        Commands::List(args) => list(&runtime, &cli, args, &env),
        Commands::Show(args) => show(&runtime, &cli, args, &env),
        Commands::Env => {
            match cli.format {
                OutputFormat::Text => print!("{}", environment_text(&env)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&env)?),
            }
            Ok(())
        }
    }
}

fn marker_environment(cli: &Cli) -> Result<MarkerEnvironment> {
    let mut env = MarkerEnvironment::detect();
    if let Some(python) = &cli.python {
        env = env.with_python(python);
    }
    for assignment in &cli.marker_vars {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("--marker-var '{}' is not KEY=VALUE", assignment))?;
        let variable = MarkerVariable::from_name(key.trim())
            .with_context(|| format!("unknown marker variable '{}'", key.trim()))?;
        env.set(variable, value.trim());
    }
    Ok(env)
}

fn check<R: Runtime>(runtime: &R, cli: &Cli, args: &CheckArgs) -> Result<()> {
    let outcome = CheckAction::new(runtime).run(&args.files)?;

    match cli.format {
        OutputFormat::Text => {
            for diagnostic in &outcome.diagnostics {
                let line = diagnostic.to_string();
                if diagnostic.severity == Severity::Error {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            }
            println!("{}", outcome.summary());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    if !outcome.passed(args.strict) {
        bail!("manifest check failed");
    }
    Ok(())
}

fn list<R: Runtime>(
    runtime: &R,
    cli: &Cli,
    args: &ListArgs,
    env: &MarkerEnvironment,
) -> Result<()> {
    let outcome = ListAction::new(runtime).run(&args.file, env, args.applicable)?;

    for diagnostic in &outcome.diagnostics {
        eprintln!("{}", diagnostic);
    }
    match cli.format {
        OutputFormat::Text => {
            for info in &outcome.requirements {
                let mut line = info.name.clone();
                if !info.extras.is_empty() {
                    line.push_str(&format!("[{}]", info.extras.join(",")));
                }
                if let Some(url) = &info.url {
                    line.push_str(&format!(" @ {}", url));
                } else if !info.specifiers.is_empty() {
                    line.push_str(&format!(" {}", info.specifiers));
                }
                if let Some(marker) = &info.marker {
                    line.push_str(&format!(" ; {}", marker));
                }
                if !info.applicable {
                    line.push_str("  (not applicable)");
                }
                println!("{}", line);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

fn show<R: Runtime>(
    runtime: &R,
    cli: &Cli,
    args: &ShowArgs,
    env: &MarkerEnvironment,
) -> Result<()> {
    let outcome = ShowAction::new(runtime).run(&args.file, &args.package, env)?;

    if !outcome.found() {
        bail!(
            "package '{}' not found in {}",
            args.package,
            args.file.display()
        );
    }
    match cli.format {
        OutputFormat::Text => {
            println!("{}", outcome.name);
            for entry in &outcome.entries {
                println!(
                    "  {}  ({}{})",
                    entry.source,
                    if entry.specifiers.is_empty() && entry.url.is_none() {
                        "any version".to_string()
                    } else if let Some(url) = &entry.url {
                        format!("@ {}", url)
                    } else {
                        entry.specifiers.clone()
                    },
                    match &entry.marker {
                        Some(marker) if entry.applicable => format!("; {} [applies]", marker),
                        Some(marker) => format!("; {} [does not apply]", marker),
                        None => String::new(),
                    }
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_check_parsing() {
        let cli = Cli::try_parse_from(["reqcheck", "check", "requirements.txt"]).unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.files, vec![PathBuf::from("requirements.txt")]);
                assert!(!args.strict);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_check_requires_a_file() {
        assert!(Cli::try_parse_from(["reqcheck", "check"]).is_err());
    }

    #[test]
    fn test_cli_global_format_parsing() {
        let cli =
            Cli::try_parse_from(["reqcheck", "list", "reqs.txt", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_marker_var_parsing() {
        let cli = Cli::try_parse_from([
            "reqcheck",
            "--marker-var",
            "platform_machine=aarch64",
            "env",
        ])
        .unwrap();
        assert_eq!(cli.marker_vars, vec!["platform_machine=aarch64".to_string()]);

        let env = marker_environment(&cli).unwrap();
        assert_eq!(env.platform_machine, "aarch64");
    }

    #[test]
    fn test_cli_bad_marker_var_rejected() {
        let cli = Cli::try_parse_from(["reqcheck", "--marker-var", "nonsense", "env"]).unwrap();
        assert!(marker_environment(&cli).is_err());

        let cli =
            Cli::try_parse_from(["reqcheck", "--marker-var", "machine=x86_64", "env"]).unwrap();
        assert!(marker_environment(&cli).is_err());
    }

    #[test]
    fn test_cli_python_override() {
        let cli = Cli::try_parse_from(["reqcheck", "--python", "3.9", "env"]).unwrap();
        let env = marker_environment(&cli).unwrap();
        assert_eq!(env.python_version, "3.9");
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["reqcheck", "requirements.txt"]).is_err());
    }
}
