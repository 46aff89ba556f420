use crate::shares::ValidatorShare;
use serde::Serialize;
use snapshot_lib::{Moniker, Zone};
use std::fmt;
use std::str::FromStr;

/// Validators holding less than this share (in percent) are not counted as
/// members of a collusion quorum.
pub const NEGLIGIBLE_SHARE: f64 = 0.01;

pub const LIVENESS_THRESHOLD: f64 = 33.33;
pub const SAFETY_THRESHOLD: f64 = 66.66;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid threshold {0:?}, expected `liveness`, `safety` or a percentage in (0, 100]")]
    InvalidThreshold(String),
}

/// Share of the bonded stake a colluding set of validators must control.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    /// More than a third of the stake can halt the chain.
    Liveness,
    /// More than two thirds of the stake can finalize conflicting blocks.
    Safety,
    Custom(f64),
}

impl Threshold {
    pub fn percent(&self) -> f64 {
        match self {
            Threshold::Liveness => LIVENESS_THRESHOLD,
            Threshold::Safety => SAFETY_THRESHOLD,
            Threshold::Custom(percent) => *percent,
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Liveness
    }
}

impl FromStr for Threshold {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "liveness" => Ok(Threshold::Liveness),
            "safety" => Ok(Threshold::Safety),
            other => other
                .trim_end_matches('%')
                .parse::<f64>()
                .ok()
                .filter(|percent| *percent > 0.0 && *percent <= 100.0)
                .map(Threshold::Custom)
                .ok_or_else(|| Error::InvalidThreshold(s.to_string())),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Liveness => write!(f, "liveness ({}%)", LIVENESS_THRESHOLD),
            Threshold::Safety => write!(f, "safety ({}%)", SAFETY_THRESHOLD),
            Threshold::Custom(percent) => write!(f, "{}%", percent),
        }
    }
}

/// How validators are ordered before walking them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidatorOrdering {
    /// Sort by descending stake, ties keep the reported order.
    ByStake,
    /// Walk validators exactly as reported by the remote service.
    AsReported,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct QuorumMember {
    pub staker: Moniker,
    pub share: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct QuorumResult {
    pub zone: Zone,
    /// Number of validator positions walked before the threshold was reached,
    /// including validators with a negligible share.
    pub threshold_count: usize,
    pub members: Vec<QuorumMember>,
}

impl QuorumResult {
    /// Number of validators actually part of the quorum.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Combined share of the quorum members, in percent.
    pub fn cumulative_share(&self) -> f64 {
        self.members.iter().map(|m| m.share).sum()
    }
}

pub fn sort_by_stake(shares: &mut [ValidatorShare]) {
    shares.sort_by(|a, b| b.tokens.cmp(&a.tokens));
}

/// Greedily accumulates validators, in the given order, until their combined
/// share reaches `threshold_percent`.
///
/// `shares` is expected to be sorted by descending stake, which is not checked.
/// If the threshold is never reached every validator is walked and
/// `threshold_count` equals the number of validators.
pub fn compute_quorum(
    zone: Zone,
    shares: &[ValidatorShare],
    threshold_percent: f64,
) -> QuorumResult {
    let mut cumulative_share = 0.0;
    let mut position = 0;
    let mut members = Vec::new();

    while cumulative_share < threshold_percent && position < shares.len() {
        let share = &shares[position];
        position += 1;

        if share.percentage_share < NEGLIGIBLE_SHARE {
            continue;
        }

        cumulative_share += share.percentage_share;
        members.push(QuorumMember {
            staker: share.moniker.clone(),
            share: share.percentage_share,
        });
    }

    QuorumResult {
        zone,
        threshold_count: position,
        members,
    }
}
