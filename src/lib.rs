pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod results;

mod app;

// Re-export App and Config from modules
pub use app::App;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
