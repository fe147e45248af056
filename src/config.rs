//! Tuning knobs for reconstruction runs.

use crate::model::ShardPattern;

/// Preset profiles bundling common tuning choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningProfile {
    /// Never merge across gaps; every reported discontinuity is kept.
    Strict,
    /// Bridge gaps of up to a month (the production default).
    Monthly,
    /// Bridge gaps of up to a quarter.
    Quarterly,
}

/// Configuration shared by a reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionTuning {
    /// Prefix of the shard identifier embedded in record origins.
    pub shard_prefix: String,
    /// Maximum gap, in days, bridged when covering holes between periods.
    /// Negative disables hole-covering.
    pub merge_gap_days: i64,
}

impl Default for ReconstructionTuning {
    fn default() -> Self {
        Self {
            shard_prefix: "Reg".to_string(),
            merge_gap_days: 31,
        }
    }
}

impl ReconstructionTuning {
    pub fn from_profile(profile: TuningProfile) -> Self {
        match profile {
            TuningProfile::Strict => Self::strict(),
            TuningProfile::Monthly => Self::monthly(),
            TuningProfile::Quarterly => Self::quarterly(),
        }
    }

    pub fn strict() -> Self {
        Self {
            merge_gap_days: -1,
            ..Self::default()
        }
    }

    pub fn monthly() -> Self {
        Self::default()
    }

    pub fn quarterly() -> Self {
        Self {
            merge_gap_days: 92,
            ..Self::default()
        }
    }

    /// The shard extraction rule implied by this tuning.
    pub fn shard_pattern(&self) -> ShardPattern {
        ShardPattern::new(self.shard_prefix.clone())
    }
}
