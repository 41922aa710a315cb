//! CLI command handlers.

mod download;
mod info;
mod range;
mod search;
mod select;
mod session;
mod sources;

pub use download::run_download_command;
pub use info::run_info_command;
pub use range::run_range_command;
pub use search::{run_latest_command, run_search_command, run_trending_command};
pub use select::run_select_command;
pub use session::{run_session_command, run_theme_command};
pub use sources::{run_sources_command, run_toggle_command};
