use snapshot_lib::Zone;

pub mod pipeline;
pub mod quorum;
pub mod report;
pub mod shares;
pub mod utils;

/// Zone list shipped with the tool, used when no zone list file is given.
pub const BUNDLED_ZONES: &str = include_str!("../resources/zones.json");

pub fn bundled_zones() -> Result<Vec<Zone>, snapshot_lib::Error> {
    snapshot_lib::read_zones(BUNDLED_ZONES.as_bytes())
}
