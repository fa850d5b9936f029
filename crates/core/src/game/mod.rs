//! Game-state store and its immutable snapshot

mod snapshot;
mod store;

pub use snapshot::GameSnapshot;
pub use store::GameStore;
