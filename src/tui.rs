use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, EmissionsData, PollutionData, ProgressEvent, ProgressSink, SessionCache};
use crate::client::DatasetClient;
use crate::domain::Metric;
use crate::error::ExplorerError;
use crate::view::{
    CountryRow, Dashboard, MAX_DANGER_PERCENTILE, MIN_DANGER_PERCENTILE, Panel, Rgb,
};

const EVENTS_MAX: usize = 4;
const BAR_WIDTH: usize = 40;

#[derive(Debug)]
struct LoadState {
    status: String,
    events: VecDeque<String>,
}

struct TuiProgress {
    state: Arc<Mutex<LoadState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            state.status = message
                .split_once("; ")
                .map(|(_, payload)| payload.to_string())
                .unwrap_or_else(|| message.clone());
            if state.events.len() >= EVENTS_MAX {
                state.events.pop_front();
            }
            state.events.push_back(message);
        }
    }
}

struct Loaded {
    emissions: EmissionsData,
    pollution: Option<PollutionData>,
}

struct Outcome {
    session: SessionCache,
    result: Result<Loaded, ExplorerError>,
}

#[derive(Debug, PartialEq)]
enum Action {
    None,
    Quit,
    Reload { force: bool },
}

pub struct Tui {
    load: Arc<Mutex<LoadState>>,
    metric: Metric,
    query: String,
    percentile: u8,
    selected: usize,
    emissions: Option<EmissionsData>,
    pollution: Option<PollutionData>,
    error: Option<String>,
    loading: bool,
}

impl Tui {
    pub fn new(metric: Metric, query: &str, percentile: u8) -> Self {
        Self {
            load: Arc::new(Mutex::new(LoadState {
                status: "ready".to_string(),
                events: VecDeque::new(),
            })),
            metric,
            query: query.to_string(),
            percentile: percentile.clamp(MIN_DANGER_PERCENTILE, MAX_DANGER_PERCENTILE),
            selected: 0,
            emissions: None,
            pollution: None,
            error: None,
            loading: false,
        }
    }

    pub fn run<C>(&mut self, app: App<C>) -> miette::Result<()>
    where
        C: DatasetClient + Clone + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal, app);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop<C>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: App<C>,
    ) -> miette::Result<()>
    where
        C: DatasetClient + Clone + 'static,
    {
        let mut session = Some(SessionCache::new());
        let mut pending: Option<Receiver<Outcome>> = None;
        let mut request = Some(false);

        loop {
            if pending.is_none() {
                if let Some(force) = request.take() {
                    if let Some(owned) = session.take() {
                        pending = Some(self.spawn_load(app.clone(), owned, force));
                    }
                }
            }

            if let Some(rx) = &pending {
                match rx.try_recv() {
                    Ok(outcome) => {
                        session = Some(outcome.session);
                        self.apply(outcome.result);
                        pending = None;
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        session = Some(SessionCache::new());
                        self.loading = false;
                        self.error = Some("data loader stopped unexpectedly".to_string());
                        pending = None;
                    }
                }
            }

            terminal.draw(|frame| self.draw(frame)).into_diagnostic()?;

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    match self.handle_key(key) {
                        Action::Quit => return Ok(()),
                        Action::Reload { force } => {
                            request = Some(force || request.unwrap_or(false))
                        }
                        Action::None => {}
                    }
                }
            }
        }
    }

    fn spawn_load<C>(&mut self, app: App<C>, mut session: SessionCache, force: bool) -> Receiver<Outcome>
    where
        C: DatasetClient + Clone + 'static,
    {
        self.loading = true;
        self.error = None;
        let metric = self.metric;
        let sink = TuiProgress {
            state: self.load.clone(),
        };
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = app.emissions(&mut session, force, &sink).and_then(|emissions| {
                let pollution = if metric == Metric::Pm25 {
                    Some(app.pollution(&mut session, force, &sink)?)
                } else {
                    None
                };
                Ok(Loaded {
                    emissions,
                    pollution,
                })
            });
            let _ = tx.send(Outcome { session, result });
        });
        rx
    }

    fn apply(&mut self, result: Result<Loaded, ExplorerError>) {
        self.loading = false;
        match result {
            Ok(loaded) => {
                self.emissions = Some(loaded.emissions);
                if loaded.pollution.is_some() {
                    self.pollution = loaded.pollution;
                }
                self.error = None;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        match key.code {
            KeyCode::Esc => return Action::Quit,
            KeyCode::F(5) => {
                if !self.loading {
                    return Action::Reload { force: true };
                }
            }
            KeyCode::Tab | KeyCode::F(2) => {
                self.metric = self.metric.next();
                self.selected = 0;
                if self.metric == Metric::Pm25 && self.pollution.is_none() {
                    return Action::Reload { force: false };
                }
            }
            KeyCode::Left => {
                self.percentile = self.percentile.saturating_sub(1).max(MIN_DANGER_PERCENTILE);
            }
            KeyCode::Right => {
                self.percentile = (self.percentile + 1).min(MAX_DANGER_PERCENTILE);
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = self.selected.saturating_add(1),
            KeyCode::Backspace => {
                self.query.pop();
                self.selected = 0;
            }
            KeyCode::Char(ch) => {
                self.query.push(ch);
                self.selected = 0;
            }
            _ => {}
        }
        Action::None
    }

    fn dashboard(&self) -> Option<Dashboard> {
        let emissions = self.emissions.as_ref()?;
        let pollution = self
            .pollution
            .as_ref()
            .map(|data| data.rows.as_slice())
            .unwrap_or(&[]);
        Some(Dashboard::build(
            self.metric,
            &emissions.rows,
            pollution,
            self.percentile,
        ))
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
            ])
            .split(frame.area());

        frame.render_widget(self.header(), chunks[0]);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(chunks[1]);

        if let Some(error) = &self.error {
            draw_message(frame, chunks[1], "Error", error, Color::Red);
        } else if let Some(dashboard) = self.dashboard() {
            let rows = dashboard.filtered(&self.query);
            if rows.is_empty() {
                draw_message(frame, chunks[1], "Search", "No countries found.", Color::Yellow);
            } else {
                self.selected = self.selected.min(rows.len() - 1);
                draw_country_list(frame, main[0], &rows, self.selected);
                let panel = dashboard.panel(&rows[self.selected]);
                frame.render_widget(draw_panel(&panel), main[1]);
            }
        } else {
            draw_message(frame, chunks[1], "Loading", &self.status(), Color::Cyan);
        }

        frame.render_widget(self.footer(), chunks[2]);
    }

    fn status(&self) -> String {
        self.load
            .lock()
            .map(|state| state.status.clone())
            .unwrap_or_else(|_| "loading".to_string())
    }

    fn header(&self) -> Paragraph<'static> {
        let mut spans = vec![
            Span::styled(
                "Global Emissions Explorer",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  |  "),
            Span::styled(self.metric.label(), Style::default().fg(Color::Cyan)),
            Span::raw(format!("  |  danger ≥ p{}", self.percentile)),
            Span::raw(format!("  |  search: {}_", self.query)),
        ];
        if self.loading {
            spans.push(Span::styled(
                format!("  |  {}", self.status()),
                Style::default().fg(Color::Yellow),
            ));
        }
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
    }

    fn footer(&self) -> Paragraph<'static> {
        let meta = match self.metric {
            Metric::Pm25 => self.pollution.as_ref().map(|data| &data.meta),
            _ => self.emissions.as_ref().map(|data| &data.meta),
        };
        let provenance = match meta {
            Some(meta) => {
                let mut line = format!(
                    "Source: {} (cached: {})",
                    meta.source,
                    meta.cached_at.as_deref().unwrap_or("-")
                );
                if let Some(diagnostic) = &meta.diagnostic {
                    line.push_str(&format!("  ! {diagnostic}"));
                }
                line
            }
            None => "Source: -".to_string(),
        };
        Paragraph::new(vec![
            Line::from(provenance),
            Line::from(Span::styled(
                "type to search  ↑/↓ select  Tab metric  ←/→ percentile  F5 refresh  Esc quit",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL))
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(value) => format!("{value:.2} {unit}"),
        None => "n/a".to_string(),
    }
}

fn draw_message(frame: &mut ratatui::Frame, area: Rect, title: &str, message: &str, color: Color) {
    let text = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(color),
    )))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    frame.render_widget(text, area);
}

fn draw_country_list(frame: &mut ratatui::Frame, area: Rect, rows: &[CountryRow], selected: usize) {
    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let value = row
                .value
                .map(|value| format!("{value:>10.2}"))
                .unwrap_or_else(|| format!("{:>10}", "n/a"));
            ListItem::new(format!("{value}  {}", row.country))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Countries ({})", rows.len())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_panel(panel: &Panel) -> Paragraph<'static> {
    let swatch = Style::default().bg(to_color(panel.color));
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} (Year {})", panel.country, panel.year),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Value: {}", format_value(panel.value, panel.unit))),
        Line::from(Span::styled(" ".repeat(BAR_WIDTH), swatch)),
        Line::from(Span::styled(" ".repeat(BAR_WIDTH), swatch)),
    ];
    match panel.danger_threshold {
        Some(threshold) => {
            let (label, color) = if panel.dangerous {
                ("DANGER", Color::Red)
            } else {
                ("below threshold", Color::Green)
            };
            lines.push(Line::from(vec![
                Span::raw(format!("Threshold: {threshold:.2} {}  ", panel.unit)),
                Span::styled(label, Style::default().fg(color)),
            ]));
        }
        None => lines.push(Line::from("Threshold: n/a")),
    }

    if !panel.states.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "U.S. state demo (placeholder figures, not an official dataset)",
            Style::default().fg(Color::DarkGray),
        )));
        let max = panel
            .states
            .iter()
            .map(|bar| bar.value)
            .fold(0.0_f64, f64::max)
            .max(1.0);
        for bar in &panel.states {
            let width = ((bar.value / max) * BAR_WIDTH as f64).round() as usize;
            lines.push(Line::from(vec![
                Span::raw(format!("{:<12} ", bar.state)),
                Span::styled("█".repeat(width.max(1)), Style::default().fg(to_color(bar.color))),
                Span::raw(format!(" {:.0}", bar.value)),
            ]));
        }
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} · {}", panel.iso_code, panel.metric.label())),
        )
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn switching_to_pm25_during_a_load_requests_pollution() {
        let mut tui = Tui::new(Metric::Co2PerCapita, "", 90);
        tui.loading = true;

        assert_eq!(tui.handle_key(press(KeyCode::Tab)), Action::Reload { force: false });
        assert_eq!(tui.metric, Metric::Pm25);
    }

    #[test]
    fn pm25_already_loaded_needs_no_reload() {
        let mut tui = Tui::new(Metric::Co2PerCapita, "", 90);
        tui.pollution = Some(PollutionData {
            rows: Vec::new(),
            meta: crate::store::CacheMetadata::unknown("https://example.org/pm25"),
            used_cache: true,
        });

        assert_eq!(tui.handle_key(press(KeyCode::Tab)), Action::None);
    }

    #[test]
    fn refresh_is_ignored_while_loading() {
        let mut tui = Tui::new(Metric::TotalCo2, "", 90);
        tui.loading = true;

        assert_eq!(tui.handle_key(press(KeyCode::F(5))), Action::None);
        tui.loading = false;
        assert_eq!(tui.handle_key(press(KeyCode::F(5))), Action::Reload { force: true });
    }
}
