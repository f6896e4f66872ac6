use crossterm::{
    cursor, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    style::{Color, Modifier},
    text::{Line, Span},
    widgets::*,
};
use std::io::{self, Write};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{TEMPERATURE_RANGE_C, VIBRATION_RANGE_MM_S};
use crate::core::CycleTag;
use crate::monitoring::{AnomalyDetector, Batch, MetricType};

/// What the cycle hands over after each iteration.
#[derive(Debug, Clone)]
pub struct DashboardFrame {
    pub tag: CycleTag,
    pub batch: Batch,
}

/// Sending side of the dashboard queue. Never blocks the caller.
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    tx: mpsc::Sender<DashboardFrame>,
}

impl DashboardHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DashboardFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queues a frame; returns false when it had to be dropped.
    pub fn submit(&self, tag: CycleTag, batch: Batch) -> bool {
        match self.tx.try_send(DashboardFrame { tag, batch }) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                debug!(cycle = frame.tag.number(), "Dashboard busy, frame dropped");
                false
            }
            Err(TrySendError::Closed(frame)) => {
                warn!(cycle = frame.tag.number(), "Dashboard is gone, frame dropped");
                false
            }
        }
    }
}

pub struct Dashboard<B: Backend> {
    terminal: Terminal<B>,
    detector: AnomalyDetector,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(backend: B) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
            detector: AnomalyDetector::new(),
        })
    }

    pub fn draw(&mut self, frame: &DashboardFrame) -> io::Result<()> {
        let detector = &self.detector;
        self.terminal.draw(|f| render(f, frame, detector))?;
        Ok(())
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

/// Takes over the terminal's alternate screen and redraws it on a blocking
/// worker each time a frame arrives. The screen is restored once every
/// handle has been dropped.
pub fn spawn_terminal_dashboard(
    capacity: usize,
) -> io::Result<(DashboardHandle, JoinHandle<io::Result<()>>)> {
    let (handle, mut rx) = DashboardHandle::channel(capacity);

    let mut dashboard = take_screen(&mut io::stdout(), || {
        Dashboard::new(CrosstermBackend::new(io::stdout()))
    })?;

    let task = tokio::task::spawn_blocking(move || {
        while let Some(frame) = rx.blocking_recv() {
            if let Err(e) = dashboard.draw(&frame) {
                warn!(error = %e, cycle = frame.tag.number(), "Dashboard redraw failed");
            }
        }
        execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
    });

    Ok((handle, task))
}

/// Switches `out` to the alternate screen and builds the dashboard, handing
/// the screen back if that fails.
fn take_screen<W: Write, T>(out: &mut W, open: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
    execute!(out, EnterAlternateScreen, cursor::Hide)?;
    open().map_err(|e| {
        if let Err(restore) = execute!(out, LeaveAlternateScreen, cursor::Show) {
            warn!(error = %restore, "Failed to leave the alternate screen");
        }
        e
    })
}

fn render(f: &mut Frame, frame: &DashboardFrame, detector: &AnomalyDetector) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(f.size());

    let alerts = detector.evaluate(&frame.batch);
    let alert_style = if alerts.is_empty() {
        Style::new().fg(Color::LightGreen)
    } else {
        Style::new().fg(Color::Red).add_modifier(Modifier::BOLD)
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            frame.tag.to_string(),
            Style::new().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" | machines: {} | alerts: ", frame.batch.len())),
        Span::styled(alerts.len().to_string(), alert_style),
    ]))
    .block(
        Block::default()
            .title("Machine Monitor")
            .borders(Borders::ALL)
            .border_style(Style::new().fg(Color::LightBlue)),
    )
    .alignment(Alignment::Center);

    f.render_widget(status, layout[0]);
    for (metric, normal, area) in [
        (MetricType::Temperature, Color::Blue, layout[1]),
        (MetricType::Vibration, Color::Green, layout[2]),
    ] {
        f.render_widget(metric_chart(metric, &frame.batch, detector, normal), area);
        draw_limit_marker(
            f.buffer_mut(),
            area,
            detector.thresholds().limit(metric),
            scale_max(metric),
        );
    }
}

fn scale_max(metric: MetricType) -> f64 {
    match metric {
        MetricType::Temperature => TEMPERATURE_RANGE_C.1,
        MetricType::Vibration => VIBRATION_RANGE_MM_S.1,
    }
}

/// Dashed red row at the limit's height. Only blank cells are touched, so
/// bars taller than the limit stay intact.
fn draw_limit_marker(buf: &mut Buffer, area: Rect, limit: f64, scale_max: f64) {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    // The bottom row holds the machine labels.
    let bar_rows = inner.height.saturating_sub(1);
    if bar_rows == 0 || inner.width == 0 || scale_max <= 0.0 {
        return;
    }

    let filled = ((limit / scale_max).clamp(0.0, 1.0) * f64::from(bar_rows)).round() as u16;
    let row = inner.y + (bar_rows - filled).min(bar_rows - 1);
    for x in inner.left()..inner.right() {
        let cell = buf.get_mut(x, row);
        if cell.symbol() == " " {
            cell.set_symbol("╌").set_fg(Color::Red);
        }
    }
}

// Bar heights are tenths of a unit so vibration keeps some resolution.
fn metric_chart<'a>(
    metric: MetricType,
    batch: &'a Batch,
    detector: &AnomalyDetector,
    normal: Color,
) -> BarChart<'a> {
    let thresholds = detector.thresholds();

    let bars: Vec<Bar> = batch
        .iter()
        .map(|reading| {
            let value = metric.value_of(reading);
            let color = if thresholds.exceeds(metric, value) {
                Color::Red
            } else {
                normal
            };
            Bar::default()
                .label(Line::from(reading.machine_id.as_str()))
                .value((value * 10.0).round().max(0.0) as u64)
                .text_value(format!("{:.1}", value))
                .style(Style::new().fg(color))
                .value_style(Style::new().fg(Color::Black).bg(color))
        })
        .collect();

    let title = format!(
        "Machine {} ({}) | limit {} {}",
        metric,
        metric.unit(),
        thresholds.limit(metric),
        metric.unit()
    );

    BarChart::default()
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::new().fg(Color::LightBlue)),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(6)
        .bar_gap(1)
        .max((scale_max(metric) * 10.0) as u64)
}
