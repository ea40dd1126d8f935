//! Build automation tasks for the testdb workspace.
//!
//! Run with `cargo xtask <command>`.
//!
//! - `ci`: format check, clippy, unit tests and docs
//! - `fmt`, `clippy`, `doc`: one step of `ci`
//! - `test`: unit tests, or the live suites with `--integration`

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

/// Package holding the live integration suites.
const INTEGRATION_PACKAGE: &str = "testdb-testing";

/// Base URL variable read by the integration suites.
const URL_ENV: &str = "TESTDB_URL";

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for testdb")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every offline check
    Ci,
    /// Check formatting
    Fmt,
    /// Run clippy on all targets, warnings denied
    Clippy,
    /// Run tests
    Test {
        /// Test a specific package
        #[arg(short, long)]
        package: Option<String>,
        /// Run the ignored integration tests against a live server
        #[arg(long)]
        integration: bool,
        /// Base URL of an existing server; a container is started otherwise
        #[arg(long, requires = "integration")]
        url: Option<String>,
    },
    /// Build the workspace docs, warnings denied
    Doc,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Command::Ci => {
            fmt(&sh)?;
            clippy(&sh)?;
            test(&sh, None)?;
            doc(&sh)?;
            println!("\n✅ All CI checks passed!");
        }
        Command::Fmt => fmt(&sh)?,
        Command::Clippy => clippy(&sh)?,
        Command::Test {
            package,
            integration: true,
            url,
        } => {
            if package.is_some() {
                bail!("--integration always runs {INTEGRATION_PACKAGE}");
            }
            integration_test(&sh, url.as_deref())?;
        }
        Command::Test { package, .. } => test(&sh, package.as_deref())?,
        Command::Doc => doc(&sh)?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let manifest = String::from_utf8(output.stdout).context("invalid UTF-8 in cargo output")?;
    Ok(PathBuf::from(manifest.trim())
        .parent()
        .context("failed to get workspace root")?
        .to_path_buf())
}

fn fmt(sh: &Shell) -> Result<()> {
    println!("Checking formatting...");
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    println!("Running clippy...");
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>) -> Result<()> {
    println!("Running unit tests...");
    match package {
        Some(pkg) => cmd!(sh, "cargo test -p {pkg}").run()?,
        None => cmd!(sh, "cargo test --workspace").run()?,
    }
    Ok(())
}

fn integration_test(sh: &Shell, url: Option<&str>) -> Result<()> {
    let _env = match url {
        Some(url) => Some(sh.push_env(URL_ENV, url)),
        None => {
            let docker = cmd!(sh, "docker info").quiet().ignore_stdout().run();
            if sh.var(URL_ENV).is_err() && docker.is_err() {
                bail!("integration tests need {URL_ENV} or a running Docker daemon");
            }
            None
        }
    };

    // One test at a time keeps container startup from piling up.
    println!("Running integration tests...");
    let package = INTEGRATION_PACKAGE;
    cmd!(sh, "cargo test -p {package} -- --ignored --test-threads=1").run()?;
    Ok(())
}

fn doc(sh: &Shell) -> Result<()> {
    println!("Building docs...");
    let _flags = sh.push_env("RUSTDOCFLAGS", "-D warnings");
    cmd!(sh, "cargo doc --workspace --no-deps").run()?;
    Ok(())
}
