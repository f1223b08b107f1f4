//! keysynth - play the computer keyboard like a monophonic synthesizer
//!
//! Run with: cargo run --release
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default `keysynth=warn`),
//! e.g. `RUST_LOG=keysynth=debug cargo run 2>keysynth.log`.

mod app;
mod ui;

use tracing_subscriber::EnvFilter;

use app::App;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keysynth=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut app = App::new()?;
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    app.shutdown();
    result
}
