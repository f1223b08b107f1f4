//! Parameter list and status bar

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use keysynth::{
    dsp::envelope::SUSTAIN_KNOB_MAX,
    io::keys::{char_for_key, note_name},
    synth::{Key, ParameterStore, SynthParameters},
    Result,
};

use super::View;

/// Ten milliseconds at the default sample rate.
const TIME_STEP: i64 = 441;

/// A parameter adjustable with the arrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Attack,
    Decay,
    Sustain,
    Release,
    Cutoff,
    Bandwidth,
    Order,
    LfoRate,
    LfoDepth,
    LfoOffset,
    Delay,
}

impl Control {
    pub const ALL: [Control; 11] = [
        Control::Attack,
        Control::Decay,
        Control::Sustain,
        Control::Release,
        Control::Cutoff,
        Control::Bandwidth,
        Control::Order,
        Control::LfoRate,
        Control::LfoDepth,
        Control::LfoOffset,
        Control::Delay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Control::Attack => "Attack",
            Control::Decay => "Decay",
            Control::Sustain => "Sustain",
            Control::Release => "Release",
            Control::Cutoff => "Cutoff",
            Control::Bandwidth => "Bandwidth",
            Control::Order => "Order",
            Control::LfoRate => "LFO rate",
            Control::LfoDepth => "LFO depth",
            Control::LfoOffset => "LFO offset",
            Control::Delay => "Delay",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|&c| c == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Move the parameter `steps` increments through the store.
    ///
    /// Out-of-range results are clamped by the store; an envelope that no
    /// longer fits is rejected and reported back.
    pub fn adjust(
        self,
        store: &ParameterStore,
        params: &SynthParameters,
        steps: i32,
    ) -> Result<u64> {
        let steps = steps as i64;
        let env = &params.envelope;
        match self {
            Control::Attack => store.set_attack(offset(env.attack, steps * TIME_STEP)),
            Control::Decay => store.set_decay(offset(env.decay, steps * TIME_STEP)),
            Control::Sustain => {
                let knob = (env.sustain as i64 + steps * 250).clamp(0, SUSTAIN_KNOB_MAX as i64);
                store.set_sustain(knob as u32)
            }
            Control::Release => store.set_release(offset(env.release, steps * TIME_STEP)),
            Control::Cutoff => {
                store.set_filter_cutoff(params.filter.cutoff_hz + steps as f32 * 50.0)
            }
            Control::Bandwidth => {
                store.set_filter_bandwidth(params.filter.bandwidth_hz + steps as f32 * 10.0)
            }
            Control::Order => store.set_filter_order(offset(params.filter.order, steps.signum())),
            Control::LfoRate => store.set_lfo_rate(params.lfo.rate_hz + steps as f32 * 0.1),
            Control::LfoDepth => store.set_lfo_depth(params.lfo.depth + steps as f32 * 0.05),
            Control::LfoOffset => store.set_lfo_offset(params.lfo.offset + steps as f32 * 0.05),
            Control::Delay => {
                store.set_delay_samples(offset(params.delay.delay_samples, steps * TIME_STEP))
            }
        }
    }

    fn value(self, params: &SynthParameters, sample_rate: f64) -> String {
        let ms = |samples: usize| format!("{:.0} ms", samples as f64 * 1000.0 / sample_rate);
        match self {
            Control::Attack => ms(params.envelope.attack),
            Control::Decay => ms(params.envelope.decay),
            Control::Sustain => format!(
                "{} ({:.2})",
                params.envelope.sustain,
                params.envelope.sustain_level()
            ),
            Control::Release => ms(params.envelope.release),
            Control::Cutoff => format!("{:.0} Hz", params.filter.cutoff_hz),
            Control::Bandwidth => format!("{:.0} Hz", params.filter.bandwidth_hz),
            Control::Order => params.filter.order.to_string(),
            Control::LfoRate => format!("{:.1} Hz", params.lfo.rate_hz),
            Control::LfoDepth => format!("{:.2}", params.lfo.depth),
            Control::LfoOffset => format!("{:.2}", params.lfo.offset),
            Control::Delay => ms(params.delay.delay_samples),
        }
    }
}

fn offset(value: usize, delta: i64) -> usize {
    (value as i64 + delta).max(0) as usize
}

fn on_off(enabled: bool) -> Span<'static> {
    if enabled {
        Span::styled("on ", Style::default().fg(Color::Green))
    } else {
        Span::styled("off", Style::default().fg(Color::DarkGray))
    }
}

pub fn render_parameters(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default().title(" Parameters ").borders(Borders::ALL);
    let params = &view.params;
    let rate = view.sample_rate as f64;

    let mut lines: Vec<Line> = Control::ALL
        .iter()
        .map(|&control| {
            let selected = control == view.selected;
            let style = if selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(
                    format!("{} {:<11}", if selected { ">" } else { " " }, control.label()),
                    style,
                ),
                Span::raw(" "),
                Span::styled(control.value(params, rate), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::raw("  Waveform    "),
        Span::styled(params.waveform.name(), Style::default().fg(Color::Magenta)),
    ]));
    lines.push(Line::from(vec![
        Span::raw("  Filter      "),
        on_off(params.filter.enabled),
        Span::raw(" "),
        Span::raw(params.filter.kind.name()),
    ]));
    lines.push(Line::from(vec![Span::raw("  LFO         "), on_off(params.lfo.enabled)]));
    lines.push(Line::from(vec![Span::raw("  Delay       "), on_off(params.delay.enabled)]));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn render_status(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default().title(" keysynth ").borders(Borders::ALL);

    let (symbol, state, color) = if view.running {
        ("▶", "Playing", Color::Green)
    } else {
        ("⏸", "Stopped", Color::Yellow)
    };

    let held: Vec<String> = view
        .held
        .iter()
        .map(|&key| match key {
            Key::Note(i) => note_name(i).unwrap_or("?").to_string(),
            other => char_for_key(other).map(|c| c.to_string()).unwrap_or_default(),
        })
        .collect();

    let mut spans = vec![
        Span::styled(format!(" {symbol} {state}  "), Style::default().fg(color)),
        Span::styled(
            format!("Keys: {:<12}", held.join(" ")),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
    ];
    if !view.release_events {
        spans.push(Span::styled(
            " (no key-up events, using auto-repeat) ",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(status) = view.status {
        spans.push(Span::styled(format!(" {status}"), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
