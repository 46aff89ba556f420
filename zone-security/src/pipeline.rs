use crate::quorum::{compute_quorum, sort_by_stake, QuorumResult, Threshold, ValidatorOrdering};
use crate::shares::compute_shares;
use snapshot_lib::{DataCollector, SnapshotCache, Zone, ZoneApi, ZoneSnapshot};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ZoneList(#[from] snapshot_lib::Error),

    #[error(transparent)]
    Cache(#[from] snapshot_lib::cache::Error),
}

/// Where the snapshots of a run came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Cache,
    Remote,
}

/// Loads the cached snapshots if any, otherwise collects them from the remote
/// service and caches them for the next run.
///
/// The zone list is only loaded when a collection is needed. Failing to write
/// the cache is not fatal, the freshly collected snapshots are returned anyway.
pub fn load_or_collect<A, F>(
    cache: &SnapshotCache,
    collector: &DataCollector<A>,
    zones: F,
    refresh: bool,
) -> Result<(Vec<ZoneSnapshot>, SnapshotOrigin), Error>
where
    A: ZoneApi,
    F: FnOnce() -> Result<Vec<Zone>, snapshot_lib::Error>,
{
    if cache.exists() && !refresh {
        info!(path = %cache.path().display(), "previously collected data found, skipping collection");
        return Ok((cache.load()?, SnapshotOrigin::Cache));
    }

    let mut zones = zones()?;
    info!(zones = zones.len(), "collecting zones data");
    let snapshots = collector.collect(&mut zones);

    match cache.save(&snapshots) {
        Ok(()) => info!(path = %cache.path().display(), "zones data saved locally"),
        Err(e) => error!(error = %e, "could not save zones data"),
    }

    Ok((snapshots, SnapshotOrigin::Remote))
}

/// Computes the collusion quorum of every zone.
///
/// Zones whose shares cannot be computed are reported and left out.
pub fn analyze(
    snapshots: &[ZoneSnapshot],
    threshold: Threshold,
    ordering: ValidatorOrdering,
) -> Vec<QuorumResult> {
    snapshots
        .iter()
        .filter_map(|snapshot| {
            if !snapshot.has_validator_set() {
                warn!(zone = %snapshot.zone.name, "validator set unavailable, zone has no quorum");
            }

            let mut shares = match compute_shares(snapshot) {
                Ok(shares) => shares,
                Err(e) => {
                    warn!(error = %e, "skipping zone");
                    return None;
                }
            };
            if ordering == ValidatorOrdering::ByStake {
                sort_by_stake(&mut shares);
            }

            Some(compute_quorum(
                snapshot.zone.clone(),
                &shares,
                threshold.percent(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_lib::collector::mock::MockZoneApi;
    use snapshot_lib::collector::ZoneStatus;
    use snapshot_lib::{TokenAmount, ValidatorStake};
    use std::time::Duration;

    fn zone(id: &str) -> Zone {
        Zone {
            id: id.to_string(),
            name: id.to_uppercase(),
        }
    }

    fn validators(stakes: &[(&str, u64)]) -> Vec<ValidatorStake> {
        stakes
            .iter()
            .map(|(moniker, tokens)| ValidatorStake {
                moniker: moniker.to_string(),
                tokens: (*tokens).into(),
            })
            .collect()
    }

    fn snapshot(id: &str, bonded: u64, stakes: Option<&[(&str, u64)]>) -> ZoneSnapshot {
        ZoneSnapshot {
            zone: zone(id),
            total_validator_num: stakes.map_or(0, |s| s.len() as u64),
            bonded_tokens: bonded.into(),
            not_bonded_tokens: TokenAmount::zero(),
            validators: stakes.map(validators),
        }
    }

    fn api() -> MockZoneApi {
        MockZoneApi::default()
            .with_status(
                "cosmos",
                ZoneStatus {
                    total_validator_num: 3,
                    bonded_tokens: 1_000u64.into(),
                    not_bonded_tokens: 0u64.into(),
                },
            )
            .with_validators("cosmos", validators(&[("A", 500), ("B", 300), ("C", 200)]))
    }

    #[test]
    fn cached_snapshots_skip_collection() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("zonesdata.json"));
        let cached = vec![snapshot("juno", 10, Some(&[("X", 10)]))];
        cache.save(&cached).unwrap();

        let api = api();
        let collector = DataCollector::new(&api).with_cooldown(Duration::ZERO);
        let (snapshots, origin) =
            load_or_collect(&cache, &collector, || Ok(vec![zone("cosmos")]), false).unwrap();

        assert_eq!(origin, SnapshotOrigin::Cache);
        assert_eq!(snapshots, cached);
        assert!(api.requests().is_empty());
    }

    #[test]
    fn zone_list_is_not_needed_with_a_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("zonesdata.json"));
        cache.save(&[]).unwrap();

        let api = api();
        let collector = DataCollector::new(&api);
        let result = load_or_collect(
            &cache,
            &collector,
            || Err(std::io::Error::from(std::io::ErrorKind::NotFound).into()),
            false,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn collect_then_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("zonesdata.json"));

        let api = api();
        let collector = DataCollector::new(&api).with_cooldown(Duration::ZERO);
        let (snapshots, origin) = load_or_collect(
            &cache,
            &collector,
            || Ok(vec![zone("cosmos"), zone("offline")]),
            false,
        )
        .unwrap();

        assert_eq!(origin, SnapshotOrigin::Remote);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(cache.load().unwrap(), snapshots);
    }

    #[test]
    fn refresh_ignores_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("zonesdata.json"));
        cache.save(&[snapshot("stale", 1, None)]).unwrap();

        let api = api();
        let collector = DataCollector::new(&api).with_cooldown(Duration::ZERO);
        let (snapshots, origin) =
            load_or_collect(&cache, &collector, || Ok(vec![zone("cosmos")]), true).unwrap();

        assert_eq!(origin, SnapshotOrigin::Remote);
        assert_eq!(snapshots[0].zone.id, "cosmos");
        assert_eq!(cache.load().unwrap()[0].zone.id, "cosmos");
    }

    #[test]
    fn cache_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("missing").join("zonesdata.json"));

        let api = api();
        let collector = DataCollector::new(&api).with_cooldown(Duration::ZERO);
        let (snapshots, _) =
            load_or_collect(&cache, &collector, || Ok(vec![zone("cosmos")]), false).unwrap();

        assert_eq!(snapshots.len(), 1);
        assert!(!cache.exists());
    }

    #[test]
    fn malformed_cache_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonesdata.json");
        std::fs::write(&path, "not json").unwrap();
        let cache = SnapshotCache::new(path);

        let api = api();
        let collector = DataCollector::new(&api);
        let result = load_or_collect(&cache, &collector, || Ok(vec![zone("cosmos")]), false);

        assert!(matches!(result, Err(Error::Cache(_))));
        assert!(api.requests().is_empty());
    }

    #[test]
    fn analyze_zones() {
        let snapshots = vec![
            snapshot("sorted", 1_000, Some(&[("A", 500), ("B", 300), ("C", 200)])),
            snapshot("unsorted", 1_000, Some(&[("C", 200), ("B", 300), ("A", 500)])),
            snapshot("partial", 1_000, None),
            snapshot("empty", 0, Some(&[])),
        ];

        let results = analyze(&snapshots, Threshold::Safety, ValidatorOrdering::ByStake);

        // zones without bonded tokens are left out
        assert_eq!(results.len(), 3);
        for result in &results[..2] {
            assert_eq!(result.threshold_count, 2);
            assert_eq!(
                result.members.iter().map(|m| m.staker.as_str()).collect::<Vec<_>>(),
                vec!["A", "B"]
            );
        }
        assert_eq!(results[2].zone.id, "partial");
        assert_eq!(results[2].threshold_count, 0);
        assert!(results[2].members.is_empty());
    }

    #[test]
    fn analyze_as_reported() {
        let snapshots = vec![snapshot(
            "unsorted",
            1_000,
            Some(&[("C", 200), ("B", 300), ("A", 500)]),
        )];

        let results = analyze(&snapshots, Threshold::Safety, ValidatorOrdering::AsReported);

        assert_eq!(results[0].threshold_count, 3);
    }
}
