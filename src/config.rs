//! DAO Configuration
//!
//! Every tunable rule of the marketplace lives here:
//! - Membership tier breakpoints and reputation deltas
//! - Task creation requirements
//! - Review consensus and reviewer authorization
//! - Reward funding (escrow, minting)
//! - Governance thresholds and voting windows
//! - Faucet limits
//!
//! The whole struct is handed to `DataDao::new`; components read their
//! section from the shared context instead of looking each other up.

use crate::core::{Address, Amount, MemberTier};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default directory for the server database: `<user data dir>/datadao`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("datadao")
}

/// Complete DAO configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    /// Membership tiers and reputation
    pub membership: MembershipConfig,
    /// Task creation rules
    pub tasks: TaskConfig,
    /// Review and consensus rules
    pub review: ReviewConfig,
    /// Reward funding
    pub rewards: RewardConfig,
    /// Governance rules
    pub governance: GovernanceConfig,
    /// Test-network faucet
    pub faucet: FaucetConfig,
    /// Addresses allowed to verify actors and moderate records
    pub admins: Vec<Address>,
    /// Account paying out treasury proposals
    pub treasury_address: Address,
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            membership: MembershipConfig::default(),
            tasks: TaskConfig::default(),
            review: ReviewConfig::default(),
            rewards: RewardConfig::default(),
            governance: GovernanceConfig::default(),
            faucet: FaucetConfig::default(),
            admins: Vec::new(),
            treasury_address: Address::system("treasury"),
        }
    }
}

impl DaoConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: DaoConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.membership.validate()?;
        if self.governance.voting_period_secs <= 0 {
            bail!("governance.voting_period_secs must be positive");
        }
        if self.governance.voting_delay_secs < 0 {
            bail!("governance.voting_delay_secs must not be negative");
        }
        if self.faucet.enabled && self.faucet.amount_per_request == 0 {
            bail!("faucet.amount_per_request must be positive when the faucet is enabled");
        }
        if self.faucet.window_secs <= 0 {
            bail!("faucet.window_secs must be positive");
        }
        Ok(())
    }

    pub fn is_admin(&self, address: &Address) -> bool {
        self.admins.iter().any(|a| a == address)
    }
}

/// Stake breakpoint for one tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierThreshold {
    pub tier: MemberTier,
    pub min_stake: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// Ascending breakpoints; the highest one reached wins
    pub tiers: Vec<TierThreshold>,
    pub reputation: ReputationConfig,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierThreshold {
                    tier: MemberTier::Basic,
                    min_stake: 100,
                },
                TierThreshold {
                    tier: MemberTier::Advanced,
                    min_stake: 1_000,
                },
                TierThreshold {
                    tier: MemberTier::Expert,
                    min_stake: 10_000,
                },
            ],
            reputation: ReputationConfig::default(),
        }
    }
}

impl MembershipConfig {
    pub fn tier_for(&self, stake: Amount) -> MemberTier {
        self.tiers
            .iter()
            .filter(|t| stake >= t.min_stake)
            .map(|t| t.tier)
            .max()
            .unwrap_or(MemberTier::None)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for pair in self.tiers.windows(2) {
            if pair[1].min_stake <= pair[0].min_stake || pair[1].tier <= pair[0].tier {
                bail!(
                    "membership.tiers must ascend: {} at {} then {} at {}",
                    pair[0].tier,
                    pair[0].min_stake,
                    pair[1].tier,
                    pair[1].min_stake
                );
            }
        }
        if self.tiers.iter().any(|t| t.tier == MemberTier::None) {
            bail!("membership.tiers cannot assign the none tier");
        }
        Ok(())
    }
}

/// Reputation deltas applied to existing actors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    pub approved_submission: i64,
    pub rejected_submission: i64,
    pub review_cast: i64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            approved_submission: 10,
            rejected_submission: -5,
            review_cast: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Lowest tier allowed to create tasks
    pub min_creator_tier: MemberTier,
    pub max_title_len: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            min_creator_tier: MemberTier::Basic,
            max_title_len: 200,
        }
    }
}

/// How reviews decide a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusPolicy {
    /// The first review's verdict is final
    #[default]
    FirstReview,
    /// After `required_validations` reviews, approvals must outnumber rejections
    Majority,
    /// After `required_validations` reviews, every review must approve
    Unanimous,
}

/// Who may review a task's submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerPolicy {
    /// Task creator or an address the creator nominated
    #[default]
    CreatorOrNominated,
    /// Any actor with stake
    AnyMember,
    /// Any address
    Anyone,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReviewConfig {
    pub consensus: ConsensusPolicy,
    pub reviewer_policy: ReviewerPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Lock the full reward budget from the creator at task creation
    pub escrow_on_create: bool,
    /// Mint rewards instead of paying from the pool (test networks)
    pub mint_enabled: bool,
    /// Upper bound on tokens minted for rewards, unlimited when absent
    pub mint_cap: Option<Amount>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            escrow_on_create: true,
            mint_enabled: false,
            mint_cap: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Stake required to create a proposal
    pub min_proposal_stake: Amount,
    /// Seconds between creation and the start of voting
    pub voting_delay_secs: i64,
    /// Length of the voting window in seconds
    pub voting_period_secs: i64,
    /// Minimum participating weight for a proposal to pass, off when absent
    pub quorum: Option<Amount>,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            min_proposal_stake: 100,
            voting_delay_secs: 0,
            voting_period_secs: 3 * 24 * 3600,
            quorum: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    pub enabled: bool,
    pub amount_per_request: Amount,
    pub max_requests_per_day: u32,
    /// Length of the rolling rate-limit window
    pub window_secs: i64,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            amount_per_request: 1_000,
            max_requests_per_day: 1,
            window_secs: 24 * 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DaoConfig::default();
        config.validate().unwrap();
        assert_eq!(config.review.consensus, ConsensusPolicy::FirstReview);
        assert_eq!(config.governance.quorum, None);
    }

    #[test]
    fn test_tier_breakpoints() {
        let membership = MembershipConfig::default();
        assert_eq!(membership.tier_for(0), MemberTier::None);
        assert_eq!(membership.tier_for(99), MemberTier::None);
        assert_eq!(membership.tier_for(100), MemberTier::Basic);
        assert_eq!(membership.tier_for(999), MemberTier::Basic);
        assert_eq!(membership.tier_for(1_000), MemberTier::Advanced);
        assert_eq!(membership.tier_for(50_000), MemberTier::Expert);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DaoConfig::from_toml_str(
            r#"
            admins = ["0x00000000000000000000000000000000000000AA"]

            [faucet]
            max_requests_per_day = 3

            [review]
            consensus = "majority"
            "#,
        )
        .unwrap();

        assert_eq!(config.faucet.max_requests_per_day, 3);
        assert_eq!(config.faucet.amount_per_request, 1_000);
        assert_eq!(config.review.consensus, ConsensusPolicy::Majority);
        assert_eq!(config.review.reviewer_policy, ReviewerPolicy::CreatorOrNominated);
        assert!(config.is_admin(&Address::parse("0x00000000000000000000000000000000000000aa").unwrap()));
    }

    #[test]
    fn test_rejects_descending_tiers() {
        let err = DaoConfig::from_toml_str(
            r#"
            [[membership.tiers]]
            tier = "advanced"
            min_stake = 1000

            [[membership.tiers]]
            tier = "basic"
            min_stake = 100
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must ascend"));
    }

    #[test]
    fn test_rejects_zero_voting_period() {
        let mut config = DaoConfig::default();
        config.governance.voting_period_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial_test::serial]
    #[cfg(target_os = "linux")]
    fn test_default_data_dir_follows_xdg() {
        let previous = std::env::var_os("XDG_DATA_HOME");
        std::env::set_var("XDG_DATA_HOME", "/tmp/datadao-xdg");
        assert_eq!(default_data_dir(), PathBuf::from("/tmp/datadao-xdg/datadao"));
        match previous {
            Some(value) => std::env::set_var("XDG_DATA_HOME", value),
            None => std::env::remove_var("XDG_DATA_HOME"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datadao.toml");
        std::fs::write(&path, "[governance]\nmin_proposal_stake = 5\n").unwrap();
        let config = DaoConfig::load(&path).unwrap();
        assert_eq!(config.governance.min_proposal_stake, 5);
        assert!(DaoConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
