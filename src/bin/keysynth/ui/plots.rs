//! Oscilloscope, envelope and filter response charts

use std::collections::VecDeque;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use keysynth::{
    synth::ParamSnapshot,
    visual::{Plot, Visualization},
};

/// Lowest level drawn on the response chart.
const RESPONSE_FLOOR_DB: f64 = -100.0;

/// Latest data for every chart, in chart coordinates.
#[derive(Debug, Default)]
pub struct Plots {
    /// The most recent output samples, at most `scope_len`.
    scope: VecDeque<f64>,
    scope_len: usize,
    waveform: Vec<(f64, f64)>,
    envelope: Vec<(f64, f64)>,
    preview: Vec<(f64, f64)>,
    /// x is log10(Hz)
    response: Vec<(f64, f64)>,
}

impl Plots {
    /// Charts for `snapshot`, with an oscilloscope window of `scope_len` samples.
    pub fn new(snapshot: &ParamSnapshot, scope_len: usize) -> Self {
        let mut plots = Self {
            scope_len: scope_len.max(1),
            ..Self::default()
        };
        plots.envelope = snapshot.envelope_plot.points();
        plots.preview = snapshot.preview_plot.points();
        plots.set_response(&snapshot.response_plot);
        plots
    }

    pub fn apply(&mut self, visual: Visualization) {
        match visual {
            Visualization::Envelope(plot) => self.envelope = plot.points(),
            Visualization::EnvelopePreview(plot) => self.preview = plot.points(),
            Visualization::FilterResponse(plot) => self.set_response(&plot),
        }
    }

    /// Append output samples, keeping the latest window.
    pub fn push_scope(&mut self, samples: impl IntoIterator<Item = f32>) {
        self.scope.extend(samples.into_iter().map(f64::from));
        let excess = self.scope.len().saturating_sub(self.scope_len);
        if excess == 0 && self.waveform.len() == self.scope.len() {
            return;
        }
        self.scope.drain(..excess);
        self.waveform = self
            .scope
            .iter()
            .enumerate()
            .map(|(i, &y)| (i as f64, y))
            .collect();
    }

    fn set_response(&mut self, plot: &Plot) {
        self.response = plot
            .points()
            .into_iter()
            .filter(|&(hz, _)| hz > 0.0)
            .map(|(hz, db)| (hz.log10(), db.max(RESPONSE_FLOOR_DB)))
            .collect();
    }
}

pub fn render_waveform(frame: &mut Frame, area: Rect, plots: &Plots) {
    let block = Block::default().title(" Output ").borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&plots.waveform);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, plots.scope_len.max(1) as f64])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-1.0, 1.0])
                .labels(vec!["-1", "0", "1"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

/// Envelope curve over one second, with the current waveform shaped by it.
pub fn render_envelope(frame: &mut Frame, area: Rect, plots: &Plots) {
    let block = Block::default().title(" Envelope ").borders(Borders::ALL);

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&plots.preview),
        Dataset::default()
            .name("gain")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&plots.envelope),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .labels(vec!["0s", "0.5s", "1s"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-1.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

pub fn render_response(frame: &mut Frame, area: Rect, plots: &Plots, title: &str) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&plots.response);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([1.0, 5.0])
                .labels(vec!["10", "100", "1k", "10k", "100k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([RESPONSE_FLOOR_DB, 10.0])
                .labels(vec!["-100", "-45", "10"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn response_is_mapped_to_log_frequency() {
        let mut plots = Plots::default();
        let plot = Plot::from_pairs(vec![10.0, 1_000.0, 100_000.0], vec![0.0, -3.0, -400.0]);
        plots.apply(Visualization::FilterResponse(Arc::new(plot)));

        assert_eq!(plots.response.len(), 3);
        assert!((plots.response[1].0 - 3.0).abs() < 1e-12);
        assert_eq!(plots.response[2].1, RESPONSE_FLOOR_DB);
    }

    #[test]
    fn scope_keeps_the_latest_window() {
        let mut plots = Plots {
            scope_len: 3,
            ..Plots::default()
        };
        plots.push_scope([0.0, 0.5]);
        assert_eq!(plots.waveform, vec![(0.0, 0.0), (1.0, 0.5)]);

        plots.push_scope([1.0, 0.25, 0.75]);
        assert_eq!(plots.waveform, vec![(0.0, 1.0), (1.0, 0.25), (2.0, 0.75)]);
    }
}
