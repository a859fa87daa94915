//! Turns lookup results into map changes and owns everything the map shows.
//!
//! The [`Coordinator`] is the only owner of the self location, the map
//! overlay state and the query history. Each operation emits a list of
//! [`DrawInstruction`]s, applies them to its [`MapState`] and hands them back
//! so the caller can log or inspect them.

use crate::error::HistoryError;
use crate::geo::{distance_km, Bounds, GeoPoint, Viewport};
use crate::history::History;
use crate::models::{LookupResult, Place, PLACEHOLDER};
use tracing::{debug, info};

/// Text lines for the result panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultText {
    pub identifier: String,
    pub address: String,
    pub region: String,
    pub organization: String,
}

impl ResultText {
    fn from_result(result: &LookupResult) -> Self {
        let or_placeholder = |s: &str| {
            if s.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                s.to_string()
            }
        };
        Self {
            identifier: or_placeholder(&result.resolved_identifier),
            address: or_placeholder(&result.address),
            region: or_placeholder(&result.region),
            organization: or_placeholder(&result.organization),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawInstruction {
    ShowText(ResultText),
    ShowError(String),
    /// Remove the current query marker and connecting line, if any.
    RetireQueryOverlay,
    PlaceSelfMarker(GeoPoint),
    PlaceMarker(GeoPoint),
    DrawLine { from: GeoPoint, to: GeoPoint },
    FitBounds { bounds: Bounds, padding: f64 },
    CenterOn { point: GeoPoint, zoom: f64 },
    /// Label attached to the query marker.
    Popup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryMarker {
    pub point: GeoPoint,
    pub popup: Option<String>,
}

/// What the map and result panel currently show.
///
/// Holds at most one self marker, one query marker and one connecting line.
#[derive(Debug, Clone, Default)]
pub struct MapState {
    pub viewport: Viewport,
    pub self_marker: Option<GeoPoint>,
    pub query_marker: Option<QueryMarker>,
    pub query_line: Option<(GeoPoint, GeoPoint)>,
    pub text: Option<ResultText>,
    pub error: Option<String>,
    /// Distance shown with the current query marker, if one was computed.
    pub distance_km: Option<f64>,
}

impl MapState {
    pub fn apply(&mut self, instruction: &DrawInstruction) {
        match instruction {
            DrawInstruction::ShowText(text) => {
                self.text = Some(text.clone());
                self.error = None;
            }
            DrawInstruction::ShowError(message) => {
                self.error = Some(message.clone());
                self.text = None;
                self.distance_km = None;
            }
            DrawInstruction::RetireQueryOverlay => {
                self.query_marker = None;
                self.query_line = None;
                self.distance_km = None;
            }
            DrawInstruction::PlaceSelfMarker(point) => self.self_marker = Some(*point),
            DrawInstruction::PlaceMarker(point) => {
                self.query_marker = Some(QueryMarker {
                    point: *point,
                    popup: None,
                })
            }
            DrawInstruction::DrawLine { from, to } => self.query_line = Some((*from, *to)),
            DrawInstruction::FitBounds { bounds, padding } => {
                self.viewport = Viewport::fit(*bounds, *padding)
            }
            DrawInstruction::CenterOn { point, zoom } => {
                self.viewport = Viewport::centered(*point, *zoom)
            }
            DrawInstruction::Popup(label) => {
                if let Some(marker) = self.query_marker.as_mut() {
                    marker.popup = Some(label.clone());
                }
            }
        }
    }
}

/// Zoom levels and padding used when moving the camera.
#[derive(Debug, Clone, Copy)]
pub struct CameraSettings {
    pub self_zoom: f64,
    pub query_zoom: f64,
    pub fit_padding: f64,
}

pub struct Coordinator {
    self_location: Option<GeoPoint>,
    map: MapState,
    history: History,
    camera: CameraSettings,
    issued_seq: u64,
    /// Point of the lookup result on the map. Place search results do not count.
    lookup_point: Option<GeoPoint>,
}

impl Coordinator {
    pub fn new(history: History, camera: CameraSettings) -> Self {
        Self {
            self_location: None,
            map: MapState::default(),
            history,
            camera,
            issued_seq: 0,
            lookup_point: None,
        }
    }

    pub fn map(&self) -> &MapState {
        &self.map
    }

    pub fn self_location(&self) -> Option<GeoPoint> {
        self.self_location
    }

    pub fn history(&self) -> &[String] {
        self.history.entries()
    }

    /// Issues the sequence number for a new lookup. Any result still in
    /// flight for an older number will be dropped by [`accept`](Self::accept).
    pub fn begin_request(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// `true` only for the most recently issued request.
    pub fn accept(&self, seq: u64) -> bool {
        let fresh = seq == self.issued_seq;
        if !fresh {
            debug!("Dropping stale result #{} (latest is #{})", seq, self.issued_seq);
        }
        fresh
    }

    fn apply_all(&mut self, instructions: &[DrawInstruction]) {
        for instruction in instructions {
            self.map.apply(instruction);
        }
    }

    /// Records the operator's position and puts the self marker on the map.
    ///
    /// The camera only moves there while no query result is shown. If a
    /// lookup result is already on the map, its line and distance are
    /// redrawn from the new position.
    pub fn set_self_location(&mut self, point: GeoPoint) -> Vec<DrawInstruction> {
        self.self_location = Some(point);
        let mut out = vec![DrawInstruction::PlaceSelfMarker(point)];
        let mut distance = None;
        if let Some(target) = self.lookup_point {
            let km = distance_km(point, target);
            out.push(DrawInstruction::DrawLine { from: point, to: target });
            out.push(DrawInstruction::Popup(distance_label(km)));
            distance = Some(km);
        } else if self.map.query_marker.is_none() {
            out.push(DrawInstruction::CenterOn {
                point,
                zoom: self.camera.self_zoom,
            });
        }
        self.apply_all(&out);
        if distance.is_some() {
            self.map.distance_km = distance;
        }
        out
    }

    /// Shows a finished lookup and records `query` in the history.
    ///
    /// `query` must already be trimmed; history deduplication is exact.
    pub fn display(&mut self, query: &str, result: &LookupResult) -> Result<Vec<DrawInstruction>, HistoryError> {
        let mut out = vec![
            DrawInstruction::ShowText(ResultText::from_result(result)),
            DrawInstruction::RetireQueryOverlay,
        ];

        let mut distance = None;
        if let Some(point) = result.point {
            out.push(DrawInstruction::PlaceMarker(point));
            match self.self_location {
                Some(me) => {
                    let km = distance_km(me, point);
                    info!("{} is {:.2} km away", result.resolved_identifier, km);
                    out.push(DrawInstruction::DrawLine { from: me, to: point });
                    if let Some(bounds) = Bounds::around(&[me, point]) {
                        out.push(DrawInstruction::FitBounds {
                            bounds,
                            padding: self.camera.fit_padding,
                        });
                    }
                    out.push(DrawInstruction::Popup(distance_label(km)));
                    distance = Some(km);
                }
                None => {
                    out.push(DrawInstruction::CenterOn {
                        point,
                        zoom: self.camera.query_zoom,
                    });
                    out.push(DrawInstruction::Popup("Query result".to_string()));
                }
            }
        } else {
            info!("{} has no coordinates, showing text only", result.resolved_identifier);
        }

        self.apply_all(&out);
        self.map.distance_km = distance;
        self.lookup_point = result.point;

        self.history.append(query)?;
        Ok(out)
    }

    /// Shows the top candidate of a place search. No distance, no history.
    pub fn show_place(&mut self, place: &Place) -> Vec<DrawInstruction> {
        self.lookup_point = None;
        let out = vec![
            DrawInstruction::RetireQueryOverlay,
            DrawInstruction::PlaceMarker(place.point),
            DrawInstruction::CenterOn {
                point: place.point,
                zoom: self.camera.query_zoom,
            },
            DrawInstruction::Popup(place.label.clone()),
        ];
        self.apply_all(&out);
        out
    }

    /// Replaces the result text and distance with `message`. Markers, line
    /// and camera are left untouched.
    pub fn show_failure(&mut self, message: String) -> Vec<DrawInstruction> {
        let out = vec![DrawInstruction::ShowError(message)];
        self.apply_all(&out);
        out
    }
}

fn distance_label(km: f64) -> String {
    format!("{km:.2} km from you")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMERA: CameraSettings = CameraSettings {
        self_zoom: 3.0,
        query_zoom: 4.0,
        fit_padding: 0.25,
    };

    fn coordinator() -> Coordinator {
        Coordinator::new(History::in_memory().unwrap(), CAMERA)
    }

    fn result_at(point: Option<GeoPoint>) -> LookupResult {
        LookupResult {
            point,
            address: "X".to_string(),
            region: PLACEHOLDER.to_string(),
            organization: "Y".to_string(),
            resolved_identifier: "1.1.1.1".to_string(),
        }
    }

    #[test]
    fn end_to_end_with_self_location() {
        let mut c = coordinator();
        let me = GeoPoint::new(0.0, 0.0);
        let target = GeoPoint::new(10.0, 10.0);
        c.set_self_location(me);

        let out = c.display("1.1.1.1", &result_at(Some(target))).unwrap();

        assert!(out.contains(&DrawInstruction::PlaceMarker(target)));
        assert!(out.contains(&DrawInstruction::DrawLine { from: me, to: target }));
        assert!(out.contains(&DrawInstruction::Popup("1568.52 km from you".to_string())));
        assert!(out
            .iter()
            .any(|i| matches!(i, DrawInstruction::FitBounds { bounds, .. } if bounds.contains(me) && bounds.contains(target))));

        let map = c.map();
        assert_eq!(map.query_marker.as_ref().map(|m| m.point), Some(target));
        assert_eq!(map.query_line, Some((me, target)));
        assert_eq!(map.distance_km, Some(1568.52));
        assert!(map.viewport.contains(me) && map.viewport.contains(target));
        assert_eq!(c.history(), ["1.1.1.1"]);
    }

    #[test]
    fn without_self_location_centers_on_result() {
        let mut c = coordinator();
        let target = GeoPoint::new(48.85, 2.35);
        let out = c.display("1.1.1.1", &result_at(Some(target))).unwrap();

        assert!(out.contains(&DrawInstruction::CenterOn {
            point: target,
            zoom: CAMERA.query_zoom
        }));
        assert!(out.contains(&DrawInstruction::Popup("Query result".to_string())));
        assert!(!out.iter().any(|i| matches!(i, DrawInstruction::DrawLine { .. })));
        assert_eq!(c.map().query_line, None);
        assert_eq!(c.map().distance_km, None);
    }

    #[test]
    fn missing_point_retires_overlay_and_still_records_history() {
        let mut c = coordinator();
        c.set_self_location(GeoPoint::new(1.0, 1.0));
        c.display("1.1.1.1", &result_at(Some(GeoPoint::new(5.0, 5.0)))).unwrap();

        let out = c.display("10.0.0.1", &result_at(None)).unwrap();

        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], DrawInstruction::ShowText(_)));
        assert_eq!(out[1], DrawInstruction::RetireQueryOverlay);
        assert!(c.map().query_marker.is_none());
        assert!(c.map().query_line.is_none());
        assert!(c.map().text.is_some());
        assert_eq!(c.history(), ["1.1.1.1", "10.0.0.1"]);
    }

    #[test]
    fn new_lookup_replaces_previous_overlay() {
        let mut c = coordinator();
        let me = GeoPoint::new(0.0, 0.0);
        c.set_self_location(me);
        c.display("a", &result_at(Some(GeoPoint::new(10.0, 10.0)))).unwrap();
        c.display("b", &result_at(Some(GeoPoint::new(-20.0, 30.0)))).unwrap();

        let marker = c.map().query_marker.as_ref().unwrap();
        assert_eq!(marker.point, GeoPoint::new(-20.0, 30.0));
        assert_eq!(c.map().query_line, Some((me, GeoPoint::new(-20.0, 30.0))));
    }

    #[test]
    fn repeated_query_is_stored_once() {
        let mut c = coordinator();
        c.display("8.8.8.8", &result_at(None)).unwrap();
        c.display("8.8.8.8", &result_at(None)).unwrap();
        assert_eq!(c.history(), ["8.8.8.8"]);
    }

    #[test]
    fn only_latest_request_is_accepted() {
        let mut c = coordinator();
        let first = c.begin_request();
        let second = c.begin_request();
        assert!(second > first);
        assert!(!c.accept(first));
        assert!(c.accept(second));
    }

    #[test]
    fn self_location_does_not_steal_camera_from_result() {
        let mut c = coordinator();
        let target = GeoPoint::new(40.0, -70.0);
        c.display("q", &result_at(Some(target))).unwrap();
        let before = c.map().viewport;

        let out = c.set_self_location(GeoPoint::new(0.0, 0.0));
        assert!(!out.iter().any(|i| matches!(i, DrawInstruction::CenterOn { .. } | DrawInstruction::FitBounds { .. })));
        assert_eq!(c.map().viewport, before);
    }

    #[test]
    fn late_self_location_draws_line_to_shown_result() {
        let mut c = coordinator();
        let me = GeoPoint::new(0.0, 0.0);
        let target = GeoPoint::new(10.0, 10.0);
        c.display("q", &result_at(Some(target))).unwrap();
        assert_eq!(c.map().distance_km, None);

        let out = c.set_self_location(me);
        assert_eq!(
            out,
            vec![
                DrawInstruction::PlaceSelfMarker(me),
                DrawInstruction::DrawLine { from: me, to: target },
                DrawInstruction::Popup("1568.52 km from you".to_string()),
            ]
        );

        let map = c.map();
        assert_eq!(map.query_line, Some((me, target)));
        assert_eq!(map.distance_km, Some(1568.52));
        assert_eq!(
            map.query_marker.as_ref().and_then(|m| m.popup.clone()),
            Some("1568.52 km from you".to_string())
        );
    }

    #[test]
    fn late_self_location_leaves_place_result_alone() {
        let mut c = coordinator();
        c.display("q", &result_at(Some(GeoPoint::new(10.0, 10.0)))).unwrap();
        c.show_place(&Place {
            label: "Paris, France".to_string(),
            point: GeoPoint::new(48.85, 2.35),
        });

        let out = c.set_self_location(GeoPoint::new(0.0, 0.0));
        assert_eq!(out, vec![DrawInstruction::PlaceSelfMarker(GeoPoint::new(0.0, 0.0))]);
        assert!(c.map().query_line.is_none());
        assert_eq!(c.map().distance_km, None);
    }

    #[test]
    fn place_search_skips_history() {
        let mut c = coordinator();
        c.set_self_location(GeoPoint::new(0.0, 0.0));
        let place = Place {
            label: "Paris, France".to_string(),
            point: GeoPoint::new(48.85, 2.35),
        };
        c.show_place(&place);
        assert!(c.history().is_empty());
        assert!(c.map().query_line.is_none());
        assert_eq!(
            c.map().query_marker.as_ref().and_then(|m| m.popup.clone()),
            Some("Paris, France".to_string())
        );
    }

    #[test]
    fn failure_keeps_map() {
        let mut c = coordinator();
        let me = GeoPoint::new(0.0, 0.0);
        c.set_self_location(me);
        c.display("q", &result_at(Some(GeoPoint::new(3.0, 3.0)))).unwrap();
        let before = c.map().viewport;

        c.show_failure("Lookup failed".to_string());

        let map = c.map();
        assert!(map.text.is_none());
        assert_eq!(map.distance_km, None);
        assert_eq!(map.error.as_deref(), Some("Lookup failed"));
        assert!(map.query_marker.is_some());
        assert_eq!(map.query_line, Some((me, GeoPoint::new(3.0, 3.0))));
        assert_eq!(map.viewport, before);
    }
}
