use crate::api::Banner;
use crate::config::BaseLayer;
use crate::coordinator::Coordinator;
use crate::events::{BannerKind, Event};
use crate::geo::GeoPoint;
use crate::models::{LookupResult, Place};
use crate::query::classify;
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{error, info, warn};

/// What Enter does with the input line.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum InputMode {
    /// IP address or domain name lookup.
    #[default]
    Lookup,
    /// Free-text place search.
    Place,
}

/// Work the main loop has to start on the app's behalf.
#[derive(Debug, PartialEq, Clone)]
pub enum Action {
    Lookup { seq: u64, query: String },
    FindPlace { seq: u64, query: String },
    Relocate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfStatus {
    Locating,
    Known,
    Unavailable,
}

/// Text of one banner line: loading, loaded or failed.
#[derive(Debug, Clone, PartialEq)]
pub enum BannerLine {
    Loading,
    Ready(String),
    Failed(String),
}

pub struct App {
    pub should_quit: bool,
    pub mode: InputMode,
    pub input: String,
    pub layer: BaseLayer,
    pub coordinator: Coordinator,
    pub self_status: SelfStatus,
    pub visitor_ip: Option<String>,
    pub banners: [BannerLine; 3],
    /// Index into the history while recalling with Up/Down.
    pub history_cursor: Option<usize>,
    /// Sequence number of the request currently awaited, if any.
    pub in_flight: Option<u64>,
    pub last_result_at: Option<DateTime<Local>>,
    pub tick_count: usize,
}

impl App {
    pub fn new(coordinator: Coordinator, layer: BaseLayer) -> Self {
        Self {
            should_quit: false,
            mode: InputMode::Lookup,
            input: String::new(),
            layer,
            coordinator,
            self_status: SelfStatus::Locating,
            visitor_ip: None,
            banners: [BannerLine::Loading, BannerLine::Loading, BannerLine::Loading],
            history_cursor: None,
            in_flight: None,
            last_result_at: None,
            tick_count: 0,
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    /// Applies a background completion. Key presses go through
    /// [`handle_key`](Self::handle_key) instead.
    pub fn handle_event(&mut self, event: Event) -> Option<Action> {
        match event {
            Event::Tick => self.on_tick(),
            Event::Input(key) => return self.handle_key(key),
            Event::Banner(kind, outcome) => self.on_banner(kind, outcome),
            Event::SelfLocated(point) => self.on_self_located(point),
            Event::LookupDone { seq, query, outcome } => self.on_lookup_done(seq, &query, outcome),
            Event::PlaceDone { seq, outcome } => self.on_place_done(seq, outcome),
        }
        None
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('l') if ctrl => {
                self.layer = self.layer.next();
                info!("Switched base layer to {}", self.layer.label());
            }
            KeyCode::Char('r') if ctrl => {
                self.self_status = SelfStatus::Locating;
                return Some(Action::Relocate);
            }
            KeyCode::Tab => {
                self.mode = match self.mode {
                    InputMode::Lookup => InputMode::Place,
                    InputMode::Place => InputMode::Lookup,
                };
            }
            KeyCode::Enter => return self.submit(),
            KeyCode::Up => self.recall(-1),
            KeyCode::Down => self.recall(1),
            KeyCode::Backspace => {
                self.input.pop();
                self.history_cursor = None;
            }
            KeyCode::Char(c) if !ctrl => {
                self.input.push(c);
                self.history_cursor = None;
            }
            _ => {}
        }
        None
    }

    fn submit(&mut self) -> Option<Action> {
        let query = self.input.trim().to_string();
        match self.mode {
            InputMode::Lookup => {
                // Blank input issues nothing.
                classify(&query)?;
                let seq = self.coordinator.begin_request();
                self.in_flight = Some(seq);
                Some(Action::Lookup { seq, query })
            }
            InputMode::Place => {
                if query.is_empty() {
                    return None;
                }
                let seq = self.coordinator.begin_request();
                self.in_flight = Some(seq);
                Some(Action::FindPlace { seq, query })
            }
        }
    }

    fn recall(&mut self, step: isize) {
        let len = self.coordinator.history().len();
        if len == 0 {
            return;
        }
        let last = len - 1;
        let next = match (self.history_cursor, step < 0) {
            (None, true) => last,
            (None, false) => return,
            (Some(i), true) => i.saturating_sub(1),
            (Some(i), false) if i >= last => {
                self.history_cursor = None;
                self.input.clear();
                return;
            }
            (Some(i), false) => i + 1,
        };
        self.input = self.coordinator.history()[next].clone();
        self.history_cursor = Some(next);
    }

    fn on_banner(&mut self, kind: BannerKind, outcome: Result<Banner, String>) {
        let slot = match kind {
            BannerKind::Visitor => 0,
            BannerKind::Egress => 1,
            BannerKind::Carrier => 2,
        };
        self.banners[slot] = match outcome {
            Ok(banner) => {
                if kind == BannerKind::Visitor {
                    self.visitor_ip = banner.ip.clone();
                }
                BannerLine::Ready(banner.line)
            }
            Err(e) => BannerLine::Failed(e),
        };
    }

    fn on_self_located(&mut self, point: Option<GeoPoint>) {
        match point {
            Some(p) => {
                self.coordinator.set_self_location(p);
                self.self_status = SelfStatus::Known;
            }
            None if self.coordinator.self_location().is_some() => {
                // Keep the previous fix when a re-acquire fails.
                self.self_status = SelfStatus::Known;
            }
            None => self.self_status = SelfStatus::Unavailable,
        }
    }

    fn on_lookup_done(&mut self, seq: u64, query: &str, outcome: Result<Option<LookupResult>, String>) {
        if !self.coordinator.accept(seq) {
            return;
        }
        self.in_flight = None;
        match outcome {
            Ok(Some(result)) => {
                if let Err(e) = self.coordinator.display(query, &result) {
                    error!("Could not save '{}' to history: {}", query, e);
                }
                self.last_result_at = Some(Local::now());
            }
            Ok(None) => {}
            Err(message) => {
                warn!("Lookup for '{}' failed: {}", query, message);
                self.coordinator.show_failure(message);
            }
        }
    }

    fn on_place_done(&mut self, seq: u64, outcome: Result<Option<Place>, String>) {
        if !self.coordinator.accept(seq) {
            return;
        }
        self.in_flight = None;
        match outcome {
            Ok(Some(place)) => {
                self.coordinator.show_place(&place);
                self.last_result_at = Some(Local::now());
            }
            Ok(None) => {}
            Err(message) => {
                self.coordinator.show_failure(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CameraSettings;
    use crate::history::History;

    fn app() -> App {
        let camera = CameraSettings {
            self_zoom: 3.0,
            query_zoom: 4.0,
            fit_padding: 0.25,
        };
        App::new(
            Coordinator::new(History::in_memory().unwrap(), camera),
            BaseLayer::Coastline,
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn result(lat: f64, lon: f64) -> LookupResult {
        LookupResult {
            point: Some(GeoPoint::new(lat, lon)),
            address: "X".to_string(),
            region: "R".to_string(),
            organization: "Y".to_string(),
            resolved_identifier: "1.1.1.1".to_string(),
        }
    }

    #[test]
    fn enter_on_blank_input_does_nothing() {
        let mut app = app();
        type_text(&mut app, "   ");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.in_flight, None);
    }

    #[test]
    fn enter_issues_trimmed_lookup() {
        let mut app = app();
        type_text(&mut app, " 8.8.8.8 ");
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::Lookup {
                seq: 1,
                query: "8.8.8.8".to_string()
            })
        );
    }

    #[test]
    fn stale_lookup_is_discarded() {
        let mut app = app();
        type_text(&mut app, "1.1.1.1");
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Enter));

        // The second request lands first, then the first one straggles in.
        app.handle_event(Event::LookupDone {
            seq: 2,
            query: "1.1.1.1".to_string(),
            outcome: Ok(Some(result(10.0, 10.0))),
        });
        app.handle_event(Event::LookupDone {
            seq: 1,
            query: "1.1.1.1".to_string(),
            outcome: Ok(Some(result(-40.0, 100.0))),
        });

        let marker = app.coordinator.map().query_marker.as_ref().unwrap();
        assert_eq!(marker.point, GeoPoint::new(10.0, 10.0));
        assert_eq!(app.in_flight, None);
    }

    #[test]
    fn failed_lookup_shows_message() {
        let mut app = app();
        type_text(&mut app, "example.invalid");
        app.handle_key(key(KeyCode::Enter));
        app.handle_event(Event::LookupDone {
            seq: 1,
            query: "example.invalid".to_string(),
            outcome: Err("No DNS records found for example.invalid.".to_string()),
        });
        assert_eq!(
            app.coordinator.map().error.as_deref(),
            Some("No DNS records found for example.invalid.")
        );
        assert!(app.coordinator.history().is_empty());
    }

    #[test]
    fn tab_switches_to_place_search() {
        let mut app = app();
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "Berlin");
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::FindPlace {
                seq: 1,
                query: "Berlin".to_string()
            })
        );
    }

    #[test]
    fn history_recall_walks_backwards() {
        let mut app = app();
        for (seq, q) in ["a.com", "b.com"].iter().enumerate() {
            app.coordinator.begin_request();
            app.handle_event(Event::LookupDone {
                seq: seq as u64 + 1,
                query: q.to_string(),
                outcome: Ok(Some(result(1.0, 1.0))),
            });
        }
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.input, "b.com");
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.input, "a.com");
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.input, "b.com");
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.input, "");
    }

    #[test]
    fn visitor_banner_records_ip() {
        let mut app = app();
        app.handle_event(Event::Banner(
            BannerKind::Visitor,
            Ok(Banner {
                ip: Some("203.0.113.9".to_string()),
                line: "203.0.113.9 NL Amsterdam".to_string(),
            }),
        ));
        assert_eq!(app.visitor_ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(app.banners[0], BannerLine::Ready("203.0.113.9 NL Amsterdam".to_string()));
    }

    #[test]
    fn ctrl_shortcuts() {
        let mut app = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert_eq!(app.layer, BaseLayer::Detailed);
        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            Some(Action::Relocate)
        );
        assert!(app.input.is_empty());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn self_location_failure_is_soft() {
        let mut app = app();
        app.handle_event(Event::SelfLocated(None));
        assert_eq!(app.self_status, SelfStatus::Unavailable);
        app.handle_event(Event::SelfLocated(Some(GeoPoint::new(1.0, 2.0))));
        assert_eq!(app.self_status, SelfStatus::Known);
        assert_eq!(app.coordinator.map().self_marker, Some(GeoPoint::new(1.0, 2.0)));
    }
}
