use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use compliance::commits::CommitLinter;
use compliance::config::{Config, CONFIG_FILE};
use compliance::error::ComplianceError;
use compliance::licenses::Manifest;
use compliance::output::{self, console, OutputFormat};
use compliance::rules::{self, Policy};
use compliance::{CheckOptions, RunnerKind};

#[derive(Parser)]
#[command(
    name = "compliance-check",
    about = "License and commit-message compliance checks for CI",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run header, commit and license checks
    Check {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Colon-separated roots searched for the tooling package
        #[arg(long, env = "COMPLIANCE_SEARCH_PATH")]
        search_path: Option<OsString>,

        /// Commit range to validate, e.g. origin/main..HEAD
        #[arg(long, env = "COMPLIANCE_COMMIT_RANGE")]
        commit_range: Option<String>,

        /// The project has no version history
        #[arg(
            long,
            env = "COMPLIANCE_UNVERSIONED",
            value_parser = BoolishValueParser::new()
        )]
        unversioned: bool,

        /// First commit whose new files need no license header
        #[arg(long)]
        enterprise_boundary: Option<String>,

        /// License file with non-canonical name (repeatable)
        #[arg(long = "register-license", value_name = "PATH")]
        register_license: Vec<PathBuf>,

        /// Use the tooling package's shell scripts instead of built-in checks
        #[arg(long)]
        scripts: bool,
    },

    /// Verify a checksum manifest against the files it lists
    VerifyManifest {
        /// Manifest file
        #[arg(default_value = "LIC_FILES_CHKSUM.sha256")]
        manifest: PathBuf,
    },

    /// Lint a single commit message (reads stdin when no file is given)
    LintCommit {
        /// File holding the message, e.g. .git/COMMIT_EDITMSG
        file: Option<PathBuf>,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// List all rules
    ListRules {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Generate a starter .compliance.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("COMPLIANCE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            path,
            config,
            format,
            output,
            search_path,
            commit_range,
            unversioned,
            enterprise_boundary,
            register_license,
            scripts,
        } => {
            let format = OutputFormat::from_str_lenient(&format).unwrap_or_else(|| {
                eprintln!("Warning: unknown format '{}', using console", format);
                OutputFormat::Console
            });
            let options = CheckOptions {
                config_path: config,
                search_path,
                enterprise_boundary,
                registered_licenses: register_license,
                commit_range,
                unversioned,
                runner: if scripts {
                    RunnerKind::Script
                } else {
                    RunnerKind::Native
                },
                format,
            };
            cmd_check(&path, &options, output)
        }
        Commands::VerifyManifest { manifest } => cmd_verify_manifest(&manifest),
        Commands::LintCommit { file, config } => cmd_lint_commit(file, config),
        Commands::ListRules { format } => cmd_list_rules(format),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn cmd_check(
    path: &Path,
    options: &CheckOptions,
    output_path: Option<PathBuf>,
) -> Result<i32, ComplianceError> {
    let (rendered, exit_code) = match compliance::run(path, options) {
        Ok(report) => (compliance::render_report(&report, options.format)?, 0),
        Err(e @ ComplianceError::StageFailed { .. }) => {
            (output::render_failure(&e, options.format)?, e.exit_code())
        }
        Err(e) => return Err(e),
    };

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    Ok(exit_code)
}

fn cmd_verify_manifest(manifest: &Path) -> Result<i32, ComplianceError> {
    let parsed = Manifest::load(manifest)?;
    let root = manifest.parent().unwrap_or(Path::new("."));
    let violations = parsed.verify(root)?;

    if violations.is_empty() {
        println!(
            "{}: {} entries verified",
            manifest.display(),
            parsed.entries.len()
        );
        return Ok(0);
    }

    print!("{}", console::render_violations(&violations));
    Ok(1)
}

fn cmd_lint_commit(file: Option<PathBuf>, config: Option<PathBuf>) -> Result<i32, ComplianceError> {
    let message = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let config_path = config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = Config::load(&config_path)?;
    let policy: &Policy = &config.policy;

    let raw = CommitLinter::new(&config.commits).lint(&message);
    let verdict = policy.evaluate(&raw);
    if verdict.total_violations > 0 {
        eprint!("{}", console::render_violations(&policy.apply(&raw)));
        eprintln!(
            "{} error(s), {} warning(s), {} ignored",
            verdict.errors,
            verdict.warnings,
            verdict.total_violations - verdict.errors - verdict.warnings
        );
    }

    Ok(if verdict.pass { 0 } else { 1 })
}

fn cmd_list_rules(format_str: String) -> Result<i32, ComplianceError> {
    let rules = rules::list_rules();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rules)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<10} {:<28} {:<10} {:<16} DESCRIPTION",
                "ID", "NAME", "SEVERITY", "STAGE"
            );
            println!("{}", "-".repeat(100));
            for rule in &rules {
                println!(
                    "{:<10} {:<28} {:<10} {:<16} {}",
                    rule.id,
                    rule.name,
                    rule.default_severity.to_string(),
                    rule.stage.to_string(),
                    rule.description,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, ComplianceError> {
    let path = PathBuf::from(CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", CONFIG_FILE);
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {}", CONFIG_FILE);

    Ok(0)
}
