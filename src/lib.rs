#[macro_use]
extern crate tracing;

mod app;
mod logging;

pub use app::App;
pub use lambdastat_config::Args;
pub use logging::init_logging;

pub fn init_errors() -> color_eyre::Result<()> {
    color_eyre::install()
}
