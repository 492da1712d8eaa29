pub mod humidity;
pub mod snapshot;

pub use humidity::{HumidityDefaults, HumidityReading, HumidityStore, RegionAmount, StoreRecord};
pub use snapshot::{
    latest_snapshot, list_snapshots, load_snapshot, load_store, prune_snapshots, save_snapshot,
    world_snapshots, SnapshotError, SnapshotFile, StoreSnapshot,
};
