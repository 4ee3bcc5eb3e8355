pub mod hashing;
pub mod model;
pub mod store;

pub use model::{
    DownloadedManagedMod, InstalledManagedMod, ManagedMod, Storage, StorageGame,
    STORAGE_SCHEMA_VERSION,
};
pub use store::ModStorage;
