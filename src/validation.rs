use reqwest::Url;

use crate::error::{AppError, Result};
use crate::plugin::{CandidateRegistryConfig, ExplorerConfig, MonitoringConfig};
use crate::stack::{CreateStackRequest, UpdateStackRequest};

const NETWORKS: [&str; 2] = ["Mainnet", "Testnet"];

/// Stack ids are interpolated into URL paths.
pub fn validate_stack_id(stack_id: &str) -> Result<()> {
    let is_safe = !stack_id.is_empty()
        && stack_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !is_safe {
        return Err(AppError::validation("stack_id", "Invalid stack id"));
    }
    Ok(())
}

pub fn validate_create_request(request: &CreateStackRequest) -> Result<()> {
    if !NETWORKS.contains(&request.network.as_str()) {
        return Err(AppError::validation(
            "network",
            "Network must be Mainnet or Testnet",
        ));
    }
    validate_chain_name(&request.chain_name)?;
    validate_url("l1RpcUrl", &request.l1_rpc_url)?;
    validate_url("l1BeaconUrl", &request.l1_beacon_url)?;

    validate_positive("l2BlockTime", request.l2_block_time)?;
    validate_positive("batchSubmissionFrequency", request.batch_submission_frequency)?;
    validate_multiple_of("batchSubmissionFrequency", request.batch_submission_frequency, 12)?;
    validate_positive("outputRootFrequency", request.output_root_frequency)?;
    validate_multiple_of("outputRootFrequency", request.output_root_frequency, 2)?;
    validate_positive("challengePeriod", request.challenge_period)?;

    validate_address("adminAccount", &request.admin_account)?;
    validate_address("sequencerAccount", &request.sequencer_account)?;
    validate_address("batcherAccount", &request.batcher_account)?;
    validate_address("proposerAccount", &request.proposer_account)?;

    validate_required("awsAccessKey", &request.aws_access_key)?;
    validate_required("awsSecretAccessKey", &request.aws_secret_access_key)?;
    validate_required("awsRegion", &request.aws_region)?;
    Ok(())
}

pub fn validate_update_request(request: &UpdateStackRequest) -> Result<()> {
    validate_url("l1RpcUrl", &request.l1_rpc_url)?;
    validate_url("l1BeaconUrl", &request.l1_beacon_url)
}

pub fn validate_api_base_url(url: &str) -> Result<()> {
    validate_url("api_base_url", url)
}

pub fn validate_explorer_config(config: &ExplorerConfig) -> Result<()> {
    validate_required("databaseUsername", &config.database_username)?;
    validate_required("databasePassword", &config.database_password)?;
    validate_required("coinMarketCapKey", &config.coin_market_cap_key)?;
    validate_required("walletConnectId", &config.wallet_connect_id)
}

pub fn validate_monitoring_config(config: &MonitoringConfig) -> Result<()> {
    validate_required("grafanaPassword", &config.grafana_password)
}

/// Build a candidate registration payload from raw form input.
pub fn parse_candidate_registry(
    amount: &str,
    memo: &str,
    name_info: &str,
) -> Result<CandidateRegistryConfig> {
    validate_required("amount", amount)?;
    validate_required("memo", memo)?;
    validate_required("nameInfo", name_info)?;

    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| AppError::validation("amount", "Must be a number"))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::validation("amount", "Must be greater than 0"));
    }

    Ok(CandidateRegistryConfig {
        amount,
        memo: memo.trim().to_string(),
        name_info: name_info.trim().to_string(),
    })
}

fn validate_chain_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        return Err(AppError::validation(
            "chainName",
            "Chain name must start with a letter and can only contain letters, numbers and spaces",
        ));
    }
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    match Url::parse(value.trim()) {
        Ok(url) if url.has_host() => Ok(()),
        _ => Err(AppError::validation(field, "Must be a valid URL")),
    }
}

fn validate_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(AppError::validation(field, "Must be greater than 0"));
    }
    Ok(())
}

fn validate_multiple_of(field: &str, value: u64, factor: u64) -> Result<()> {
    if value % factor != 0 {
        return Err(AppError::validation(
            field,
            format!("Must be a multiple of {}", factor),
        ));
    }
    Ok(())
}

fn validate_address(field: &str, value: &str) -> Result<()> {
    let is_address = value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !is_address {
        return Err(AppError::validation(field, "Must be a valid Ethereum address"));
    }
    Ok(())
}

fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, "Required"));
    }
    Ok(())
}
