//! Ledger configuration
//!
//! Reward amounts and prices that an admin tunes without touching code.
//! Loaded from TOML; every key is optional and falls back to [`LedgerConfig::default`].
//!
//! ```toml
//! signup_bonus = 10
//!
//! [referral_rewards]
//! first_task = 50
//! signup = 0
//!
//! [generation_costs]
//! image = 5
//! video = 20
//!
//! [min_redemption]
//! data_mb = 50
//! airtime_ngn = 50
//! ```

use crate::error::ConfigError;
use crate::types::GenerationKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Credits granted to every new user
    pub signup_bonus: i64,
    /// Bonuses paid to referrers
    pub referral_rewards: ReferralRewards,
    /// Credit price of each generation kind
    pub generation_costs: GenerationCosts,
    /// Smallest redemption accepted per kind
    pub min_redemption: MinRedemption,
}

impl LedgerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With first-task referral bonus
    #[inline]
    #[must_use]
    pub fn with_first_task_bonus(mut self, credits: i64) -> Self {
        self.referral_rewards.first_task = credits;
        self
    }

    /// With signup referral bonus
    #[inline]
    #[must_use]
    pub fn with_signup_referral_bonus(mut self, credits: i64) -> Self {
        self.referral_rewards.signup = credits;
        self
    }

    /// With signup bonus for new users
    #[inline]
    #[must_use]
    pub fn with_signup_bonus(mut self, credits: i64) -> Self {
        self.signup_bonus = credits;
        self
    }

    /// With minimum redemptions
    #[inline]
    #[must_use]
    pub fn with_min_redemption(mut self, min: MinRedemption) -> Self {
        self.min_redemption = min;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML
    /// - `ConfigError::InvalidValue` if any amount is negative
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`LedgerConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject negative amounts
    ///
    /// # Errors
    /// `ConfigError::InvalidValue` naming the first offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        let amounts = [
            ("signup_bonus", self.signup_bonus),
            ("referral_rewards.first_task", self.referral_rewards.first_task),
            ("referral_rewards.signup", self.referral_rewards.signup),
            ("generation_costs.image", self.generation_costs.image),
            ("generation_costs.video", self.generation_costs.video),
            ("generation_costs.ad_copy", self.generation_costs.ad_copy),
            ("generation_costs.social_post", self.generation_costs.social_post),
            ("min_redemption.data_mb", self.min_redemption.data_mb),
        ];
        if let Some((key, _)) = amounts.iter().find(|(_, v)| *v < 0) {
            return Err(negative(key));
        }
        if self.min_redemption.airtime_ngn.is_sign_negative() {
            return Err(negative("min_redemption.airtime_ngn"));
        }
        Ok(())
    }
}

fn negative(key: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: "must not be negative".to_string(),
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            signup_bonus: 0,
            referral_rewards: ReferralRewards::default(),
            generation_costs: GenerationCosts::default(),
            min_redemption: MinRedemption::default(),
        }
    }
}

/// Referral bonus amounts, in credits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralRewards {
    /// Paid once, when the referee completes their first task
    pub first_task: i64,
    /// Paid when the referee signs up with the referrer's code
    pub signup: i64,
}

impl Default for ReferralRewards {
    fn default() -> Self {
        Self {
            first_task: 50,
            signup: 0,
        }
    }
}

/// Credit prices of generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationCosts {
    pub image: i64,
    pub video: i64,
    pub ad_copy: i64,
    pub social_post: i64,
}

impl GenerationCosts {
    /// Price of one generation
    #[inline]
    #[must_use]
    pub fn cost_of(&self, kind: GenerationKind) -> i64 {
        match kind {
            GenerationKind::Image => self.image,
            GenerationKind::Video => self.video,
            GenerationKind::AdCopy => self.ad_copy,
            GenerationKind::SocialPost => self.social_post,
        }
    }
}

impl Default for GenerationCosts {
    fn default() -> Self {
        Self {
            image: 5,
            video: 20,
            ad_copy: 2,
            social_post: 1,
        }
    }
}

/// Minimum redemption sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinRedemption {
    pub data_mb: i64,
    pub airtime_ngn: Decimal,
}

impl Default for MinRedemption {
    fn default() -> Self {
        Self {
            data_mb: 50,
            airtime_ngn: Decimal::from(50),
        }
    }
}
