//! Locating the web app bucket from the deployed stack's outputs.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use aws_sdk_cloudformation::Client as CloudFormationClient;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Stack output that names the web app bucket.
pub const BUCKET_OUTPUT_KEY: &str = "WebAppBucketName";

const CFN_DEPLOYER: &str = "@ask-cli/cfn-deployer";

/// A CloudFormation stack output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackOutput {
    pub output_key: String,
    pub output_value: String,
}

/// Pick the bucket name out of a stack's outputs.
pub fn find_bucket(outputs: &[StackOutput]) -> Result<String> {
    outputs
        .iter()
        .find(|o| o.output_key == BUCKET_OUTPUT_KEY)
        .map(|o| o.output_value.clone())
        .ok_or_else(|| {
            anyhow!(
                "Did not find the output {}. Did you modify the CloudFormation file?",
                BUCKET_OUTPUT_KEY
            )
        })
}

/// Read the bucket name from the ASK CLI deploy state in `project_dir`.
pub fn from_ask_states(project_dir: &Path, ask_profile: &str) -> Result<String> {
    let path = project_dir.join(".ask").join("ask-states.json");
    let contents = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "failed to load {}. Have you successfully executed ask deploy yet?",
            path.display()
        )
    })?;
    bucket_from_ask_states(&contents, ask_profile)
}

/// Parse ASK CLI deploy state and return the bucket name.
pub fn bucket_from_ask_states(contents: &str, ask_profile: &str) -> Result<String> {
    let states: Value =
        serde_json::from_str(contents).context("ask-states.json is not valid JSON")?;

    let profile = states
        .pointer(&format!("/profiles/{}", ask_profile))
        .ok_or_else(|| {
            anyhow!(
                "failed to obtain profile object '{}'. Did you specify the right one?",
                ask_profile
            )
        })?;

    let infrastructure = profile.get("skillInfrastructure").ok_or_else(|| {
        anyhow!("failed to obtain skillInfrastructure object. Have you successfully executed ask deploy yet?")
    })?;

    let cfn = infrastructure.get(CFN_DEPLOYER).ok_or_else(|| {
        anyhow!(
            "failed to obtain the {} object. Is this skill configured to use CloudFormation?",
            CFN_DEPLOYER
        )
    })?;

    let outputs = cfn
        .pointer("/deployState/default/outputs")
        .filter(|v| !v.is_null())
        .ok_or_else(|| {
            anyhow!("No CloudFormation outputs found, check the developer console for potential CloudFormation errors.")
        })?;

    let outputs: Vec<StackOutput> = serde_json::from_value(outputs.clone())
        .context("CloudFormation outputs in ask-states.json are malformed")?;
    debug!(count = outputs.len(), "Loaded stack outputs from ask-states.json");

    find_bucket(&outputs)
}

/// Query the stack outputs directly from CloudFormation.
pub async fn from_stack(client: &CloudFormationClient, stack_name: &str) -> Result<String> {
    let response = client
        .describe_stacks()
        .stack_name(stack_name)
        .send()
        .await
        .with_context(|| format!("Failed to describe stack {}", stack_name))?;

    let stack = response
        .stacks()
        .first()
        .ok_or_else(|| anyhow!("Stack {} not found", stack_name))?;

    let outputs: Vec<StackOutput> = stack
        .outputs()
        .iter()
        .filter_map(|o| {
            Some(StackOutput {
                output_key: o.output_key()?.to_string(),
                output_value: o.output_value()?.to_string(),
            })
        })
        .collect();

    if outputs.is_empty() {
        bail!(
            "No CloudFormation outputs found on stack {}, check the console for potential CloudFormation errors.",
            stack_name
        );
    }

    find_bucket(&outputs)
}
