use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::Serialize;
use snapshot_lib::{Moniker, TokenAmount, Zone, ZoneSnapshot};
use thiserror::Error;
use tracing::debug;

/// Number of decimal digits of the share kept by the exact integer division
/// before converting to a float.
const SHARE_PRECISION_DIGITS: u32 = 18;

#[derive(Debug, Error)]
pub enum Error {
    #[error("zone {} has no bonded tokens, validator shares are undefined", .zone.name)]
    ZeroBondedTokens { zone: Zone },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ValidatorShare {
    pub moniker: Moniker,
    pub tokens: TokenAmount,
    /// Share of the zone bonded tokens, in percent.
    pub percentage_share: f64,
}

/// `tokens / total * 100`, exact up to [`SHARE_PRECISION_DIGITS`] decimals
/// before the final float conversion.
///
/// `total` must not be zero.
pub fn percentage(tokens: &TokenAmount, total: &TokenAmount) -> f64 {
    let scale = BigUint::from(10u32).pow(SHARE_PRECISION_DIGITS);
    let scaled: BigUint = tokens.as_biguint() * &scale * 100u32 / total.as_biguint();
    let integer = &scaled / &scale;
    let fraction = &scaled % &scale;
    // split to avoid dividing two huge floats
    integer.to_f64().unwrap_or(f64::INFINITY)
        + fraction.to_f64().unwrap_or_default() / 10f64.powi(SHARE_PRECISION_DIGITS as i32)
}

/// Share of every validator of the zone, in the same order as the snapshot.
/// A zone whose validator set is unknown has no shares.
pub fn compute_shares(snapshot: &ZoneSnapshot) -> Result<Vec<ValidatorShare>, Error> {
    if snapshot.bonded_tokens.is_zero() {
        return Err(Error::ZeroBondedTokens {
            zone: snapshot.zone.clone(),
        });
    }

    let shares = snapshot
        .validators()
        .iter()
        .map(|v| ValidatorShare {
            moniker: v.moniker.clone(),
            tokens: v.tokens.clone(),
            percentage_share: percentage(&v.tokens, &snapshot.bonded_tokens),
        })
        .collect::<Vec<_>>();

    // the total should be 100, anything else means stake outside of the
    // validator set or precision loss
    debug!(
        zone = %snapshot.zone.name,
        total = shares.iter().map(|s| s.percentage_share).sum::<f64>(),
        "computed validator shares"
    );

    Ok(shares)
}
