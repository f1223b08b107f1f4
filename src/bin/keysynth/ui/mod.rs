//! TUI for keysynth
//!
//! Draws the parameter panel and three live charts: the output oscilloscope,
//! the envelope with its preview, and the filter's magnitude response.

mod panel;
mod plots;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use keysynth::synth::{Key, SynthParameters};

pub use panel::Control;
pub use plots::Plots;

use panel::{render_parameters, render_status};
use plots::{render_envelope, render_response, render_waveform};

const HELP: &str = concat!(
    " [z..m] Play  [o/p] Octave  [q/Esc] Quit  [Space] Play/Stop  [↑↓←→] Edit (Shift ×10)",
    "  [w] Wave  [Tab] Filter type  [f] Filter  [l] LFO  [e] Delay",
);

/// Everything one frame needs.
pub struct View<'a> {
    pub params: SynthParameters,
    pub sample_rate: u32,
    pub selected: Control,
    pub running: bool,
    pub release_events: bool,
    pub held: Vec<Key>,
    pub status: Option<&'a str>,
    pub plots: &'a Plots,
}

pub fn render(frame: &mut Frame, view: &View) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(10),   // Panel and charts
            Constraint::Length(8), // Oscilloscope
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    render_status(frame, rows[0], view);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(20)])
        .split(rows[1]);
    render_parameters(frame, columns[0], view);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);
    render_envelope(frame, charts[0], view.plots);
    let title = format!(
        "{} response (order {})",
        view.params.filter.kind.name(),
        view.params.filter.order
    );
    render_response(frame, charts[1], view.plots, &title);

    render_waveform(frame, rows[2], view.plots);

    let help = Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[3]);
}
