//! Deploy Web App - Syncs the static web app into the bucket created by the skill's stack.
//!
//! The bucket name is taken from the `WebAppBucketName` stack output, read
//! from the ASK CLI deploy state or, with `--stack-name`, from CloudFormation.

mod bucket;
mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "deploy_webapp", about = "Sync the web app assets to S3")]
struct Args {
    /// AWS profile used for the upload
    #[arg(short = 'p', long, default_value = "default")]
    profile: String,

    /// ASK CLI profile in .ask/ask-states.json
    #[arg(long, default_value = "default")]
    ask_profile: String,

    /// Read the bucket from this CloudFormation stack instead of the ASK deploy state
    #[arg(long)]
    stack_name: Option<String>,

    /// Skill project root containing .ask/
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Local directory with the web app assets
    #[arg(long, default_value = "web")]
    source: PathBuf,

    /// Report what would be uploaded without uploading
    #[arg(long)]
    dryrun: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let aws = aws_config::defaults(BehaviorVersion::latest())
        .profile_name(&args.profile)
        .load()
        .await;

    let bucket = match &args.stack_name {
        Some(stack_name) => {
            let client = aws_sdk_cloudformation::Client::new(&aws);
            bucket::from_stack(&client, stack_name).await?
        }
        None => bucket::from_ask_states(&args.project_dir, &args.ask_profile)?,
    };

    let source = args.project_dir.join(&args.source);

    info!("==================== Deploy S3 Web App ====================");
    info!(
        bucket = %bucket,
        profile = %args.profile,
        dryrun = args.dryrun,
        "Found bucket from CloudFormation, starting deployment"
    );

    let publisher = sync::Publisher::new(aws_sdk_s3::Client::new(&aws), bucket);
    let report = publisher.sync(&source, args.dryrun).await.context(
        "s3 deployment failed. If credentials could not be located, do you have a valid default \
         profile? If not, did you mean to run with -p to specify a non default one?",
    )?;

    info!(
        uploaded = report.uploaded,
        unchanged = report.unchanged,
        "s3 deployment complete"
    );
    Ok(())
}
