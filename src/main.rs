use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vvm::install::releases::{GithubReleases, ReleaseIndex};
use vvm::{Version, compiler, config, install};

#[derive(Parser)]
#[command(name = "vvm")]
#[command(version, about = "Vyper compiler version manager")]
struct Cli {
    /// Override the binary install directory (default: ~/.vvm)
    #[arg(long, global = true, value_name = "DIR")]
    binary_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List installed vyper versions
    List {
        /// List versions installable from the release index instead
        #[arg(long)]
        installable: bool,
    },
    /// Download and install a vyper binary
    Install {
        /// Version to install (default: newest installable)
        version: Option<String>,
    },
    /// Resolve the vyper version a source file's pragma selects
    Detect {
        file: PathBuf,
        /// Force prerelease versions to be eligible (or not)
        #[arg(long)]
        prereleases: Option<bool>,
    },
    /// Compile source files with the matching vyper version
    Compile {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Compile with this version instead of detecting it from the pragma
        #[arg(long, value_name = "VERSION")]
        vyper: Option<String>,
        /// Target EVM version
        #[arg(long)]
        evm_version: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let install_dir = config::install_dir(cli.binary_path.as_deref());
    let index = GithubReleases::default();

    match cli.command {
        Command::List { installable } => {
            let versions = if installable {
                index.installable_versions().await?
            } else {
                install::installed_versions(&install_dir)?
            };
            for version in versions {
                println!("{version}");
            }
        }
        Command::Install { version } => {
            let version = version.map(|s| parse_version_arg(&s)).transpose()?;
            let installed = install::install(&index, &install_dir, version.as_ref()).await?;
            println!("vyper {installed} installed");
        }
        Command::Detect { file, prereleases } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let catalog = install::snapshot(&index, &install_dir).await?;
            let version = vvm::detect_version_from_source(&source, &catalog, prereleases)?;
            println!("{version}");
        }
        Command::Compile {
            files,
            vyper,
            evm_version,
        } => {
            let version = match vyper {
                Some(s) => parse_version_arg(&s)?,
                None => {
                    let Some(first) = files.first() else {
                        anyhow::bail!("no source files given");
                    };
                    let source = std::fs::read_to_string(first)
                        .with_context(|| format!("failed to read {}", first.display()))?;
                    let catalog = install::snapshot(&index, &install_dir).await?;
                    vvm::detect_version_from_source(&source, &catalog, None)?
                }
            };
            let binary = install::executable(&install_dir, &version)?;
            let settings = compiler::CompileSettings {
                evm_version,
                ..Default::default()
            };
            let output = compiler::compile_files(&binary, &files, &settings)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn parse_version_arg(text: &str) -> anyhow::Result<Version> {
    Version::from_str(text.trim()).map_err(|e| anyhow::anyhow!("invalid version `{text}`: {e}"))
}
