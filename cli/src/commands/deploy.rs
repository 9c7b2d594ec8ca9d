//! Implementation of the `flotilla deploy` command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;

use crate::commands::{announcer_for, close_bus, CommandContext};
use crate::progress::ConsoleProgress;
use crate::registry::deployer::Deployer;
use crate::utils::short_cid;

/// Arguments for the deploy command.
pub struct DeployArgs {
    /// Packaged artifact to upload
    pub artifact: PathBuf,

    /// App name; defaults to the artifact's file stem
    pub name: Option<String>,

    /// Version tag to record
    pub version: String,

    /// Domain the app should be served under
    pub domain: Option<String>,
}

pub async fn run(ctx: CommandContext, args: DeployArgs) -> anyhow::Result<()> {
    let app_name = match args.name {
        Some(name) => name,
        None => app_name_from(&args.artifact)?,
    };

    let artifact = tokio::fs::read(&args.artifact)
        .await
        .with_context(|| format!("cannot read artifact {}", args.artifact.display()))?;

    let bus = ctx.connect_bus().await;
    let deployer = Deployer::new(ctx.log.clone(), ctx.node.clone(), announcer_for(&bus));
    let outcome = deployer
        .deploy(
            &app_name,
            &artifact,
            &args.version,
            args.domain,
            &ConsoleProgress,
        )
        .await;
    close_bus(bus).await;
    let outcome = outcome?;

    println!(
        "{} '{}' version {} ({})",
        "Deployed".green().bold(),
        outcome.app_name,
        outcome.version,
        short_cid(&outcome.cid)
    );
    Ok(())
}

fn app_name_from(artifact: &Path) -> anyhow::Result<String> {
    artifact
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "cannot derive an app name from {}; pass --name",
                artifact.display()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_comes_from_the_file_stem() {
        assert_eq!(
            app_name_from(Path::new("/builds/blog.tar.gz")).unwrap(),
            "blog.tar"
        );
        assert_eq!(app_name_from(Path::new("site.zip")).unwrap(), "site");
        assert!(app_name_from(Path::new("/")).is_err());
    }
}
