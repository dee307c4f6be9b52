//! Stack records and the request bodies that create or update them.

use serde::{Deserialize, Serialize};

use crate::status::StackStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    #[serde(default)]
    pub chain_name: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub l1_rpc_url: String,
    #[serde(default)]
    pub l1_beacon_url: String,
    #[serde(default)]
    pub aws_region: String,
    #[serde(default)]
    pub l2_block_time: u64,
    #[serde(default)]
    pub challenge_period: u64,
    #[serde(default)]
    pub output_root_frequency: u64,
    #[serde(default)]
    pub batch_submission_frequency: u64,
    #[serde(default)]
    pub admin_account: String,
    #[serde(default)]
    pub proposer_account: String,
    #[serde(default)]
    pub batcher_account: String,
    #[serde(default)]
    pub sequencer_account: String,
    #[serde(default)]
    pub deployment_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackMetadata {
    #[serde(default)]
    pub l2_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_explorer_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub config: StackConfig,
    #[serde(default)]
    pub deployment_path: String,
    pub status: StackStatus,
    #[serde(default)]
    pub metadata: Option<StackMetadata>,
}

impl Stack {
    /// Name shown in lists: the chain name, falling back to the record name or id.
    pub fn display_name(&self) -> &str {
        [self.config.chain_name.as_str(), self.name.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }

    pub fn l2_url(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .map(|m| m.l2_url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Body of `POST /stacks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStackRequest {
    pub network: String,
    pub chain_name: String,
    pub l1_rpc_url: String,
    pub l1_beacon_url: String,
    #[serde(default = "default_l2_block_time")]
    pub l2_block_time: u64,
    #[serde(default = "default_batch_submission_frequency")]
    pub batch_submission_frequency: u64,
    #[serde(default = "default_output_root_frequency")]
    pub output_root_frequency: u64,
    #[serde(default = "default_challenge_period")]
    pub challenge_period: u64,
    pub admin_account: String,
    pub sequencer_account: String,
    pub batcher_account: String,
    pub proposer_account: String,
    pub aws_access_key: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_path: Option<String>,
}

fn default_l2_block_time() -> u64 {
    2
}

fn default_batch_submission_frequency() -> u64 {
    1440
}

fn default_output_root_frequency() -> u64 {
    240
}

fn default_challenge_period() -> u64 {
    12
}

/// Body of `PUT /stacks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStackRequest {
    pub l1_rpc_url: String,
    pub l1_beacon_url: String,
}
