use crate::app::{App, AppView, Panel};
use pathspeed::settings::SettingsField;
use pathspeed::speedtest::{Measurement, PhaseStatus, TestPhase};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

const ACCENT: Color = Color::Rgb(100, 149, 237);
const SUCCESS: Color = Color::Rgb(134, 194, 156);
const SUCCESS_DIM: Color = Color::Rgb(80, 120, 90);
const INFO: Color = Color::Rgb(147, 180, 220);
const INFO_DIM: Color = Color::Rgb(90, 110, 140);
const WARN: Color = Color::Rgb(220, 180, 130);
const ERROR: Color = Color::Rgb(220, 120, 120);
const TEXT_PRIMARY: Color = Color::Rgb(230, 230, 230);
const TEXT_SECONDARY: Color = Color::Rgb(160, 160, 160);
const TEXT_MUTED: Color = Color::Rgb(100, 100, 100);
const BORDER: Color = Color::Rgb(60, 60, 65);
const BORDER_ACTIVE: Color = Color::Rgb(100, 100, 110);

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.view {
        AppView::Main => draw_main_view(frame, area, app),
        AppView::Settings => draw_settings_view(frame, area, app),
    }
}

fn draw_main_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(1),
    ])
    .split(area);

    draw_header(frame, chunks[0], app);

    if app.expanded {
        draw_panel(frame, chunks[1], app, app.selected_panel, true);
    } else {
        let panels = Layout::horizontal([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(chunks[1]);

        for (area, panel) in panels
            .iter()
            .zip([Panel::Download, Panel::Upload, Panel::Ping])
        {
            draw_panel(frame, *area, app, panel, app.selected_panel == panel);
        }
    }

    draw_help(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::horizontal([
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Length(20),
    ])
    .split(inner);

    frame.render_widget(
        Paragraph::new("pathspeed")
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let (status, color) = match app.phase() {
        TestPhase::Idle => ("Ready", TEXT_MUTED),
        TestPhase::Ping => ("Measuring latency...", WARN),
        TestPhase::Download => ("Testing download...", SUCCESS),
        TestPhase::Upload => ("Testing upload...", INFO),
        TestPhase::Complete => ("Complete", ACCENT),
        TestPhase::Failed => ("Test failed", ERROR),
    };
    frame.render_widget(
        Paragraph::new(status)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
        chunks[1],
    );

    let statuses = [
        (app.snapshot.ping_status, "ping"),
        (app.snapshot.download_status, "down"),
        (app.snapshot.upload_status, "up"),
    ];
    let mut spans = Vec::new();
    for (i, (status, label)) in statuses.iter().enumerate() {
        let style = match status {
            PhaseStatus::Running => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            PhaseStatus::Completed => Style::default().fg(TEXT_SECONDARY),
            PhaseStatus::Stale => Style::default().fg(TEXT_MUTED),
        };
        spans.push(Span::styled(*label, style));
        if i < statuses.len() - 1 {
            spans.push(Span::styled(" / ", Style::default().fg(TEXT_MUTED)));
        }
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Right),
        chunks[2],
    );
}

fn draw_panel(frame: &mut Frame, area: Rect, app: &App, panel: Panel, selected: bool) {
    let snapshot = &app.snapshot;
    let (title, color, dim_color, status, samples) = match panel {
        Panel::Download => (
            "Download",
            SUCCESS,
            SUCCESS_DIM,
            snapshot.download_status,
            app.download_samples.as_slice(),
        ),
        Panel::Upload => (
            "Upload",
            INFO,
            INFO_DIM,
            snapshot.upload_status,
            app.upload_samples.as_slice(),
        ),
        Panel::Ping => ("Latency", WARN, WARN, snapshot.ping_status, &[][..]),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if selected { BORDER_ACTIVE } else { BORDER }))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(if selected { color } else { TEXT_SECONDARY }),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Min(3),
    ])
    .split(inner);

    let (headline, detail) = match panel {
        Panel::Download => (format_measurement(&snapshot.download_speed), stats_line(samples)),
        Panel::Upload => (format_measurement(&snapshot.upload_speed), stats_line(samples)),
        Panel::Ping => (
            format_measurement(&snapshot.ping),
            format!("jitter {}", format_measurement(&snapshot.jitter)),
        ),
    };

    frame.render_widget(
        Paragraph::new(headline)
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        chunks[0],
    );

    if panel == Panel::Ping || app.expanded {
        frame.render_widget(
            Paragraph::new(detail)
                .style(Style::default().fg(TEXT_MUTED))
                .alignment(Alignment::Center),
            chunks[1],
        );
    } else {
        let progress = match status {
            PhaseStatus::Running => app.phase_progress(),
            PhaseStatus::Completed => 1.0,
            PhaseStatus::Stale => 0.0,
        };
        draw_progress_bar(frame, chunks[1], progress, color, dim_color);
    }

    if !samples.is_empty() {
        draw_chart(frame, chunks[2], samples, color, app.expanded);
    }
}

fn draw_progress_bar(frame: &mut Frame, area: Rect, ratio: f64, color: Color, dim_color: Color) {
    if area.width < 4 {
        return;
    }

    let width = (area.width - 2) as usize;
    let filled = ((ratio * width as f64) as usize).min(width);
    let empty = width.saturating_sub(filled);

    let bar = Line::from(vec![
        Span::raw(" "),
        Span::styled("━".repeat(filled), Style::default().fg(color)),
        Span::styled("━".repeat(empty), Style::default().fg(dim_color)),
        Span::raw(" "),
    ]);

    frame.render_widget(Paragraph::new(bar), area);
}

fn draw_chart(frame: &mut Frame, area: Rect, data: &[f64], color: Color, labelled: bool) {
    if area.width < 4 || area.height < 2 {
        return;
    }

    let (min_val, max_val) = get_data_range(data);
    let range = (max_val - min_val).max(0.1);
    let y_min = (min_val - range * 0.1).max(0.0);
    let y_max = max_val + range * 0.1;

    let points: Vec<(f64, f64)> = data
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points);

    let mut y_axis = Axis::default()
        .style(Style::default().fg(BORDER))
        .bounds([y_min, y_max]);
    if labelled {
        y_axis = y_axis.labels(vec![
            Span::styled(format!("{:.0}", y_min), Style::default().fg(TEXT_MUTED)),
            Span::styled(format!("{:.0} Mbps", y_max), Style::default().fg(TEXT_MUTED)),
        ]);
    }

    let chart = Chart::new(vec![dataset])
        .x_axis(Axis::default().bounds([0.0, data.len() as f64]))
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

fn draw_settings_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(1),
    ])
    .split(area);

    let header_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));
    let header_inner = header_block.inner(chunks[0]);
    frame.render_widget(header_block, chunks[0]);

    frame.render_widget(
        Paragraph::new("Settings")
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)),
        header_inner,
    );

    let content_area = Layout::horizontal([
        Constraint::Length(2),
        Constraint::Min(30),
        Constraint::Length(2),
    ])
    .split(chunks[1])[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(content_area);
    frame.render_widget(block, content_area);

    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .split(inner);

    let settings = &app.settings;
    draw_setting_row(
        frame,
        rows[0],
        "Ping probes",
        &settings.ping_frequency().to_string(),
        app.selected_setting == SettingsField::PingFrequency,
    );
    draw_setting_row(
        frame,
        rows[1],
        "Phase length",
        &format!("{} s", settings.test_duration_secs()),
        app.selected_setting == SettingsField::TestDuration,
    );
    draw_setting_row(
        frame,
        rows[2],
        "Speed unit",
        &settings.speed_unit().to_string(),
        app.selected_setting == SettingsField::SpeedUnit,
    );

    frame.render_widget(
        Paragraph::new("↑↓ select · ←→ adjust · enter done")
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_setting_row(frame: &mut Frame, area: Rect, label: &str, value: &str, selected: bool) {
    let chunks = Layout::horizontal([Constraint::Length(16), Constraint::Min(10)]).split(area);

    let label_style = if selected {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(TEXT_SECONDARY)
    };
    frame.render_widget(
        Paragraph::new(format!(" {}", label)).style(label_style),
        chunks[0],
    );

    let (value_text, value_style) = if selected {
        (format!("< {} >", value), Style::default().fg(TEXT_PRIMARY))
    } else {
        (value.to_string(), Style::default().fg(TEXT_MUTED))
    };
    frame.render_widget(Paragraph::new(value_text).style(value_style), chunks[1]);
}

fn draw_help(frame: &mut Frame, area: Rect, app: &App) {
    let help = if app.expanded {
        "esc close · q quit"
    } else if app.snapshot.is_running {
        "tab select · space expand · q quit"
    } else {
        "enter start · s settings · tab select · space expand · q quit"
    };

    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        area,
    );
}

fn format_measurement(measurement: &Measurement) -> String {
    if measurement.value > 0.0 {
        measurement.to_string()
    } else {
        "—".to_string()
    }
}

fn stats_line(samples: &[f64]) -> String {
    if samples.is_empty() {
        return String::new();
    }
    let avg = samples.iter().sum::<f64>() / samples.len() as f64;
    let (min, max) = get_data_range(samples);
    format!("avg {:.1} · max {:.1} · min {:.1} Mbps", avg, max, min)
}

fn get_data_range(data: &[f64]) -> (f64, f64) {
    let min = data.iter().cloned().fold(f64::MAX, f64::min);
    let max = data.iter().cloned().fold(f64::MIN, f64::max);
    (if min == f64::MAX { 0.0 } else { min }, if max == f64::MIN { 0.0 } else { max })
}
