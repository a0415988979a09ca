//! Entity-to-table mapping layer

mod snapshot;
mod table_group;

pub use snapshot::SaveData;
pub use table_group::DatabaseTableGroup;
