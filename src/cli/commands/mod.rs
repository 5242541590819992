//! CLI command implementations.

mod ask;
mod config;
mod serve;
mod show;
mod summarize;
mod upload;

pub use ask::run_ask;
pub use config::run_config;
pub use serve::run_serve;
pub use show::run_show;
pub use summarize::run_summarize;
pub use upload::run_upload;
