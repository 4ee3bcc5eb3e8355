pub mod extract;
pub mod pipeline;
pub mod resolver;
pub mod task;

pub use pipeline::ModInstaller;
pub use resolver::{PlatformKeywords, SelectionPolicy, PALLET_FILE};
pub use task::{InstallFailReason, InstallationOutcome, InstallationResult, InstallationTask};
