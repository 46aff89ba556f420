use crate::{TokenAmount, ValidatorStake, Zone, ZoneSnapshot};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "https://api-{id}.cosmostation.io/v1/";
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const STATUS_PATH: &str = "status";
const VALIDATORS_PATH: &str = "staking/validators";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
}

/// Summary of a zone's staking state, as returned by the `status` endpoint.
/// Fields not needed for the analysis are ignored.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ZoneStatus {
    pub total_validator_num: u64,
    pub bonded_tokens: TokenAmount,
    pub not_bonded_tokens: TokenAmount,
}

/// Remote service exposing per-zone staking information.
pub trait ZoneApi {
    fn status(&self, zone: &Zone) -> Result<ZoneStatus, Error>;

    fn validators(&self, zone: &Zone) -> Result<Vec<ValidatorStake>, Error>;
}

impl<T: ZoneApi + ?Sized> ZoneApi for &T {
    fn status(&self, zone: &Zone) -> Result<ZoneStatus, Error> {
        (**self).status(zone)
    }

    fn validators(&self, zone: &Zone) -> Result<Vec<ValidatorStake>, Error> {
        (**self).validators(zone)
    }
}

/// [`ZoneApi`] backed by a json over http service, one base url per zone.
pub struct HttpZoneApi {
    client: Client,
    url_template: String,
}

impl HttpZoneApi {
    /// `url_template` is the base url of the service, where every occurrence of
    /// `{id}` is replaced by the id of the zone being queried.
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    pub fn endpoint(&self, zone: &Zone, path: &str) -> String {
        let mut base = self.url_template.replace("{id}", &zone.id);
        if !base.ends_with('/') {
            base.push('/');
        }
        base.push_str(path);
        base
    }

    fn get<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T, Error> {
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { url, status });
        }
        Ok(response.json()?)
    }
}

impl ZoneApi for HttpZoneApi {
    fn status(&self, zone: &Zone) -> Result<ZoneStatus, Error> {
        self.get(self.endpoint(zone, STATUS_PATH))
    }

    fn validators(&self, zone: &Zone) -> Result<Vec<ValidatorStake>, Error> {
        self.get(self.endpoint(zone, VALIDATORS_PATH))
    }
}

/// Collects a [`ZoneSnapshot`] per zone, one zone at a time.
///
/// Requests are never retried nor issued concurrently: after every zone fully
/// retrieved the collector waits for `cooldown` to stay within the rate limits
/// of the remote service.
pub struct DataCollector<A> {
    api: A,
    cooldown: Duration,
}

impl<A: ZoneApi> DataCollector<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Drains `zones`, returning snapshots in processing order.
    ///
    /// Zones are taken from the back of the queue. A zone whose status cannot
    /// be retrieved is dropped, while a zone whose validator set cannot be
    /// retrieved is kept without validators.
    pub fn collect(&self, zones: &mut Vec<Zone>) -> Vec<ZoneSnapshot> {
        let mut snapshots = Vec::with_capacity(zones.len());

        while let Some(zone) = zones.pop() {
            info!(zone = %zone.name, "retrieving zone data");

            let status = match self.api.status(&zone) {
                Ok(status) => status,
                Err(e) => {
                    warn!(zone = %zone.name, error = %e, "could not retrieve zone status, skipping zone");
                    continue;
                }
            };

            let mut snapshot = ZoneSnapshot {
                zone,
                total_validator_num: status.total_validator_num,
                bonded_tokens: status.bonded_tokens,
                not_bonded_tokens: status.not_bonded_tokens,
                validators: None,
            };

            match self.api.validators(&snapshot.zone) {
                Ok(validators) => snapshot.validators = Some(validators),
                Err(e) => {
                    warn!(zone = %snapshot.zone.name, error = %e, "could not retrieve validator set");
                    snapshots.push(snapshot);
                    continue;
                }
            }

            snapshots.push(snapshot);

            if !self.cooldown.is_zero() {
                std::thread::sleep(self.cooldown);
            }
        }

        snapshots
    }
}

#[cfg(any(test, feature = "test-api"))]
pub mod mock {
    use super::*;
    use crate::ZoneId;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory [`ZoneApi`] recording every request it receives.
    /// Zones without a registered response answer with `503 Service Unavailable`.
    #[derive(Default)]
    pub struct MockZoneApi {
        statuses: HashMap<ZoneId, ZoneStatus>,
        validators: HashMap<ZoneId, Vec<ValidatorStake>>,
        requests: RefCell<Vec<String>>,
    }

    impl MockZoneApi {
        pub fn with_status(mut self, zone_id: &str, status: ZoneStatus) -> Self {
            self.statuses.insert(zone_id.to_string(), status);
            self
        }

        pub fn with_validators(mut self, zone_id: &str, validators: Vec<ValidatorStake>) -> Self {
            self.validators.insert(zone_id.to_string(), validators);
            self
        }

        /// Requests received so far, as `<zone id>/<path>`.
        pub fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }

        fn record(&self, zone: &Zone, path: &str) -> String {
            let request = format!("{}/{}", zone.id, path);
            self.requests.borrow_mut().push(request.clone());
            request
        }

        fn unavailable(url: String) -> Error {
            Error::Status {
                url,
                status: StatusCode::SERVICE_UNAVAILABLE,
            }
        }
    }

    impl ZoneApi for MockZoneApi {
        fn status(&self, zone: &Zone) -> Result<ZoneStatus, Error> {
            let url = self.record(zone, STATUS_PATH);
            self.statuses
                .get(&zone.id)
                .cloned()
                .ok_or_else(|| Self::unavailable(url))
        }

        fn validators(&self, zone: &Zone) -> Result<Vec<ValidatorStake>, Error> {
            let url = self.record(zone, VALIDATORS_PATH);
            self.validators
                .get(&zone.id)
                .cloned()
                .ok_or_else(|| Self::unavailable(url))
        }
    }
}
