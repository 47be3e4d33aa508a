//! Genesis ledger writer.
//!
//! Genesis files can be large, so the writer streams: object open, the
//! validators array entry by entry, the pre-composed accounts array
//! spliced raw, then the params block. The optional two-space re-indent is
//! a separate post-pass gated by the profile's `jsonBeautify` flag.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use arbor_common::error::Result;
use arbor_planner::identity::NodeIdentity;

/// Fixed genesis timestamp shared by every emitted chain.
pub const GENESIS_TIME: &str = "2024-12-14 20:10:52";

/// Which committees a validator entry advertises in a given chain's
/// genesis.
///
/// - Native (first committee equals the emitting chain): all committees.
/// - Committee-only (placed here by genesis while belonging to the target
///   chain): its committees unchanged, always the single target.
/// - Anything else (repeated-identity expansions, cross-chain entries):
///   only the emitting chain.
pub fn committees_for_genesis(identity: &NodeIdentity, chain_id: u64) -> Vec<u64> {
    let is_native = identity.committees.first().copied() == Some(chain_id);
    if is_native {
        identity.committees.clone()
    } else if identity.genesis_chain_id == chain_id && identity.is_committee_only() {
        identity.committees.clone()
    } else {
        vec![chain_id]
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenesisValidator<'a> {
    address: &'a str,
    public_key: &'a str,
    committees: Vec<u64>,
    /// Delegators are not physical servers and carry no dial address.
    #[serde(skip_serializing_if = "Option::is_none")]
    net_address: Option<&'a str>,
    staked_amount: u64,
    output: &'a str,
    delegate: bool,
}

fn genesis_validator(identity: &NodeIdentity, chain_id: u64) -> GenesisValidator<'_> {
    GenesisValidator {
        address: &identity.address,
        public_key: &identity.public_key,
        committees: committees_for_genesis(identity, chain_id),
        net_address: if identity.is_delegate {
            None
        } else {
            Some(&identity.net_address)
        },
        staked_amount: identity.staked_amount,
        output: &identity.address,
        delegate: identity.is_delegate,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusParams {
    pub block_size: u64,
    pub protocol_version: String,
    pub root_chain_id: u64,
    pub retired: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorParams {
    pub unstaking_blocks: u64,
    pub max_pause_blocks: u64,
    pub double_sign_slash_percentage: u64,
    pub non_sign_slash_percentage: u64,
    pub max_non_sign: u64,
    pub non_sign_window: u64,
    pub max_committees: u64,
    pub max_committee_size: u64,
    pub early_withdrawal_penalty: u64,
    pub delegate_unstaking_blocks: u64,
    pub minimum_order_size: u64,
    pub stake_percent_for_subsidized_committee: u64,
    pub max_slash_per_committee: u64,
    pub delegate_reward_percentage: u64,
    pub buy_deadline_blocks: u64,
    pub lock_order_fee_multiplier: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeParams {
    pub send_fee: u64,
    pub stake_fee: u64,
    pub edit_stake_fee: u64,
    pub unstake_fee: u64,
    pub pause_fee: u64,
    pub unpause_fee: u64,
    pub change_parameter_fee: u64,
    pub dao_transfer_fee: u64,
    pub subsidy_fee: u64,
    pub create_order_fee: u64,
    pub edit_order_fee: u64,
    pub delete_order_fee: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceParams {
    pub dao_reward_percentage: u64,
}

/// Consensus, validator, fee, and governance parameter blocks with the
/// harness defaults; only `maxCommitteeSize` is profile-overridable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub consensus: ConsensusParams,
    pub validator: ValidatorParams,
    pub fee: FeeParams,
    pub governance: GovernanceParams,
}

impl Params {
    pub fn new(root_chain_id: u64, max_committee_size: u64) -> Self {
        Params {
            consensus: ConsensusParams {
                block_size: 1_000_000,
                protocol_version: "1/0".into(),
                root_chain_id,
                retired: 0,
            },
            validator: ValidatorParams {
                unstaking_blocks: 2,
                max_pause_blocks: 4380,
                double_sign_slash_percentage: 10,
                non_sign_slash_percentage: 1,
                max_non_sign: 4,
                non_sign_window: 10,
                max_committees: 15,
                max_committee_size,
                early_withdrawal_penalty: 20,
                delegate_unstaking_blocks: 2,
                minimum_order_size: 1000,
                stake_percent_for_subsidized_committee: 33,
                max_slash_per_committee: 15,
                delegate_reward_percentage: 10,
                buy_deadline_blocks: 15,
                lock_order_fee_multiplier: 2,
            },
            fee: FeeParams {
                send_fee: 10_000,
                stake_fee: 10_000,
                edit_stake_fee: 10_000,
                unstake_fee: 10_000,
                pause_fee: 10_000,
                unpause_fee: 10_000,
                change_parameter_fee: 10_000,
                dao_transfer_fee: 10_000,
                subsidy_fee: 10_000,
                create_order_fee: 10_000,
                edit_order_fee: 10_000,
                delete_order_fee: 10_000,
            },
            governance: GovernanceParams { dao_reward_percentage: 10 },
        }
    }
}

/// Stream a chain's `genesis.json`.
///
/// `accounts_json` must already be a serialized JSON array; it is spliced
/// into the document untouched.
pub fn write_genesis(
    path: &Path,
    chain_id: u64,
    root_chain_id: u64,
    validators: &[NodeIdentity],
    accounts_json: &[u8],
    max_committee_size: u64,
) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    out.write_all(b"{\"time\":")?;
    serde_json::to_writer(&mut out, GENESIS_TIME)?;

    out.write_all(b",\"validators\":[")?;
    for (i, identity) in validators.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        serde_json::to_writer(&mut out, &genesis_validator(identity, chain_id))?;
    }
    out.write_all(b"]")?;

    out.write_all(b",\"accounts\":")?;
    out.write_all(accounts_json)?;

    out.write_all(b",\"params\":")?;
    serde_json::to_writer(&mut out, &Params::new(root_chain_id, max_committee_size))?;

    out.write_all(b"}")?;
    out.flush()?;
    Ok(())
}
