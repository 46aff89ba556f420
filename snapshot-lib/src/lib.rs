pub mod cache;
pub mod collector;
pub mod tokens;

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

pub use cache::SnapshotCache;
pub use collector::{DataCollector, HttpZoneApi, ZoneApi};
pub use tokens::TokenAmount;

pub type ZoneId = String;
pub type Moniker = String;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed zone list: {0}")]
    MalformedZoneList(#[from] serde_json::Error),
}

/// A blockchain network whose validator set is being assessed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ValidatorStake {
    pub moniker: Moniker,
    pub tokens: TokenAmount,
}

/// Raw stake data for a single zone, as collected from the remote service
/// or loaded back from the snapshot cache.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ZoneSnapshot {
    pub zone: Zone,
    pub total_validator_num: u64,
    pub bonded_tokens: TokenAmount,
    pub not_bonded_tokens: TokenAmount,
    /// `None` when the validator set could not be fetched for this zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validators: Option<Vec<ValidatorStake>>,
}

impl ZoneSnapshot {
    /// Validators of the zone, empty if the validator set was never retrieved.
    pub fn validators(&self) -> &[ValidatorStake] {
        self.validators.as_deref().unwrap_or_default()
    }

    pub fn has_validator_set(&self) -> bool {
        self.validators.is_some()
    }
}

/// Load the ordered list of zones to assess from a json encoded file
/// (`[{"id": "cosmos", "name": "Cosmos"}, ...]`).
pub fn load_zones(path: &Path) -> Result<Vec<Zone>, Error> {
    let file = std::fs::File::open(path)?;
    read_zones(std::io::BufReader::new(file))
}

pub fn read_zones<R: Read>(reader: R) -> Result<Vec<Zone>, Error> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(any(test, feature = "proptest"))]
mod arbitrary {
    use super::*;
    use proptest::prelude::*;

    impl Arbitrary for Zone {
        type Parameters = ();
        type Strategy = BoxedStrategy<Zone>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            ("[a-z]{2,12}", "[A-Za-z ]{1,20}")
                .prop_map(|(id, name)| Zone { id, name })
                .boxed()
        }
    }

    impl Arbitrary for ValidatorStake {
        type Parameters = ();
        type Strategy = BoxedStrategy<ValidatorStake>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            ("[A-Za-z0-9 ,.]{0,24}", any::<TokenAmount>())
                .prop_map(|(moniker, tokens)| ValidatorStake { moniker, tokens })
                .boxed()
        }
    }

    impl Arbitrary for ZoneSnapshot {
        type Parameters = ();
        type Strategy = BoxedStrategy<ZoneSnapshot>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            (
                any::<Zone>(),
                any::<Option<Vec<ValidatorStake>>>(),
                any::<TokenAmount>(),
            )
                .prop_map(|(zone, validators, not_bonded_tokens)| {
                    // bonded stake always covers the whole validator set
                    let bonded_tokens = validators
                        .iter()
                        .flatten()
                        .map(|v| v.tokens.clone())
                        .sum::<TokenAmount>();
                    ZoneSnapshot {
                        zone,
                        total_validator_num: validators.as_ref().map_or(0, |v| v.len() as u64),
                        bonded_tokens,
                        not_bonded_tokens,
                        validators,
                    }
                })
                .boxed()
        }
    }
}
