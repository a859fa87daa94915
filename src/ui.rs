//! TUI rendering for ipatlas
//!
//! This module handles all UI rendering logic using the `ratatui` crate:
//! connection banners, the input line, the lookup result, the history list
//! and the world map canvas with its markers.

use crate::app::{App, BannerLine, InputMode, SelfStatus};
use crate::config::BaseLayer;
use crate::coordinator::MapState;
use ratatui::{
    prelude::*,
    widgets::canvas::{Canvas, Context, Line as CanvasLine, Map, MapResolution},
    widgets::*,
};

use ratatui::text::Line;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Renders one frame of the TUI based on current application state.
///
/// Banners across the top, input/result/history on the left (35%), the map
/// on the right (65%) and a one-line status/help bar at the bottom.
pub fn render(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_banners(f, app, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(9),
            Constraint::Min(3),
        ])
        .split(columns[0]);

    render_input(f, app, sidebar[0]);
    render_result(f, app, sidebar[1]);
    render_history(f, app, sidebar[2]);
    render_map(f, app, columns[1]);
    render_status_bar(f, app, rows[2]);
}

fn render_banners(f: &mut Frame, app: &App, area: Rect) {
    let labels = ["  YOU:     ", "  EGRESS:  ", "  CARRIER: "];
    let lines: Vec<Line> = labels
        .iter()
        .zip(app.banners.iter())
        .map(|(label, banner)| {
            let value = match banner {
                BannerLine::Loading => Span::styled(
                    format!("{} loading", SPINNER[app.tick_count % SPINNER.len()]),
                    Style::default().fg(Color::DarkGray),
                ),
                BannerLine::Ready(text) => Span::styled(text.as_str(), Style::default().fg(Color::Cyan)),
                BannerLine::Failed(e) => Span::styled(e.as_str(), Style::default().fg(Color::Red)),
            };
            Line::from(vec![
                Span::styled(*label, Style::default().add_modifier(Modifier::BOLD)),
                value,
            ])
        })
        .collect();

    let block = Paragraph::new(lines).block(
        Block::default()
            .title(" Connection ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(block, area);
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.mode {
        InputMode::Lookup => " IP / Domain ",
        InputMode::Place => " Place Search ",
    };
    let busy = if app.in_flight.is_some() {
        format!(" {}", SPINNER[app.tick_count % SPINNER.len()])
    } else {
        String::new()
    };

    let input = Paragraph::new(Line::from(vec![
        Span::raw(app.input.as_str()),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        Span::styled(busy, Style::default().fg(Color::Yellow)),
    ]))
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(input, area);
}

fn field_line<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

fn render_result(f: &mut Frame, app: &App, area: Rect) {
    let map = app.coordinator.map();
    let mut lines = Vec::new();

    if let Some(ref e) = map.error {
        lines.push(Line::from(Span::styled(e.as_str(), Style::default().fg(Color::Red))));
        lines.push(Line::from(""));
    }

    match map.text {
        Some(ref text) => {
            lines.push(field_line("IP:       ", text.identifier.clone()));
            lines.push(field_line(
                "Location: ",
                format!("{}, {}", text.address, text.region),
            ));
            lines.push(field_line("Org:      ", text.organization.clone()));
            if let Some(km) = map.distance_km {
                lines.push(field_line("Distance: ", format!("{km:.2} km")));
            } else if map.query_marker.is_none() {
                lines.push(Line::from(Span::styled(
                    "No coordinates to plot.",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        None if map.error.is_none() => lines.push(Line::from(Span::styled(
            "Type an IP address or domain and press Enter.",
            Style::default().fg(Color::DarkGray),
        ))),
        None => {}
    }

    if let Some(at) = app.last_result_at {
        lines.push(field_line("Updated:  ", at.format("%H:%M:%S").to_string()));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Result ")
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1)),
    );
    f.render_widget(p, area);
}

fn render_history(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .coordinator
        .history()
        .iter()
        .enumerate()
        .rev()
        .map(|(i, entry)| {
            let style = if Some(i) == app.history_cursor {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {}", entry)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" History ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(list, area);
}

fn render_map(f: &mut Frame, app: &App, area: Rect) {
    let state = app.coordinator.map();
    let view = state.viewport;
    let layer = app.layer;

    let canvas = Canvas::default()
        .block(Block::bordered().title(format!(" Map [{}] ", layer.label())))
        .marker(symbols::Marker::Braille)
        .x_bounds(view.x_bounds())
        .y_bounds(view.y_bounds())
        .paint(move |ctx| {
            draw_base_layer(ctx, layer);
            ctx.layer();
            draw_overlay(ctx, state);
        });

    f.render_widget(canvas, area);
}

fn draw_base_layer(ctx: &mut Context, layer: BaseLayer) {
    match layer {
        BaseLayer::Coastline => ctx.draw(&Map {
            color: Color::Rgb(70, 70, 70),
            resolution: MapResolution::Low,
        }),
        BaseLayer::Detailed => ctx.draw(&Map {
            color: Color::Rgb(70, 70, 70),
            resolution: MapResolution::High,
        }),
        BaseLayer::Graticule => {
            let grid = Color::Rgb(40, 40, 60);
            for lon in (-180..=180).step_by(30) {
                let x = f64::from(lon);
                ctx.draw(&CanvasLine {
                    x1: x,
                    y1: -90.0,
                    x2: x,
                    y2: 90.0,
                    color: grid,
                });
            }
            for lat in (-90..=90).step_by(30) {
                let y = f64::from(lat);
                ctx.draw(&CanvasLine {
                    x1: -180.0,
                    y1: y,
                    x2: 180.0,
                    y2: y,
                    color: grid,
                });
            }
        }
    }
}

fn draw_overlay(ctx: &mut Context, state: &MapState) {
    if let Some((from, to)) = state.query_line {
        ctx.draw(&CanvasLine {
            x1: from.longitude,
            y1: from.latitude,
            x2: to.longitude,
            y2: to.latitude,
            color: Color::Yellow,
        });
    }

    if let Some(ref marker) = state.query_marker {
        let mut spans = vec![Span::styled(
            "◉",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )];
        if let Some(ref popup) = marker.popup {
            spans.push(Span::styled(
                format!(" {} ", popup),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ));
        }
        ctx.print(marker.point.longitude, marker.point.latitude, Line::from(spans));
    }

    if let Some(me) = state.self_marker {
        ctx.print(
            me.longitude,
            me.latitude,
            Line::from(Span::styled("⌖ you", Style::default().fg(Color::Cyan))),
        );
    }
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let self_text = match (app.self_status, app.coordinator.self_location()) {
        (SelfStatus::Known, Some(p)) => format!("({:.2}, {:.2})", p.latitude, p.longitude),
        (SelfStatus::Unavailable, _) => "unavailable".to_string(),
        _ => "locating".to_string(),
    };

    let bar = Paragraph::new(Line::from(vec![
        Span::styled(" SELF: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(self_text),
        Span::raw("  │  "),
        Span::styled(
            "Enter search  Tab mode  ↑/↓ history  Ctrl+L layer  Ctrl+R relocate  Esc quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    f.render_widget(bar, area);
}
