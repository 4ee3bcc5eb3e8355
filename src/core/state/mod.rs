pub mod app_state;

pub use app_state::{default_data_dir, logs_dir_in, resolve_data_dir, AppContext};
