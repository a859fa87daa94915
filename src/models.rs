use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label shown for any descriptive field a provider leaves out.
pub const PLACEHOLDER: &str = "Unknown";

/// Where a provider keeps each field in its JSON record. Paths are dotted
/// (`connection.org`) for nested objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub identifier: &'static str,
    pub latitude: &'static str,
    pub longitude: &'static str,
    pub city: &'static str,
    pub region: &'static str,
    pub country: &'static str,
    pub organization: &'static str,
}

/// ipapi.co `/{ip}/json/`
pub const IPAPI_CO_FIELDS: FieldMap = FieldMap {
    identifier: "ip",
    latitude: "latitude",
    longitude: "longitude",
    city: "city",
    region: "region",
    country: "country_name",
    organization: "org",
};

/// ipwho.is `/{ip}`
pub const IPWHO_IS_FIELDS: FieldMap = FieldMap {
    identifier: "ip",
    latitude: "latitude",
    longitude: "longitude",
    city: "city",
    region: "region",
    country: "country",
    organization: "connection.org",
};

/// A normalized lookup, whatever provider produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    /// `None` when the provider gave no usable coordinates; the result is then text only.
    pub point: Option<GeoPoint>,
    /// City label.
    pub address: String,
    /// "region, country" label.
    pub region: String,
    pub organization: String,
    pub resolved_identifier: String,
}

/// Turns a raw provider record into a [`LookupResult`].
///
/// Coordinates count only when both are truthy: a non-zero number, or a
/// non-empty string that parses as a float. A genuine location on the equator
/// or the prime meridian is therefore reported without a point.
pub fn normalize(raw: &Value, fields: &FieldMap, query: &str) -> LookupResult {
    let point = match (
        truthy_coordinate(field(raw, fields.latitude)),
        truthy_coordinate(field(raw, fields.longitude)),
    ) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    };

    let region_parts: Vec<String> = [fields.region, fields.country]
        .iter()
        .filter_map(|path| text(raw, path))
        .collect();
    let region = if region_parts.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        region_parts.join(", ")
    };

    LookupResult {
        point,
        address: text(raw, fields.city).unwrap_or_else(|| PLACEHOLDER.to_string()),
        region,
        organization: text(raw, fields.organization).unwrap_or_else(|| PLACEHOLDER.to_string()),
        resolved_identifier: text(raw, fields.identifier).unwrap_or_else(|| query.to_string()),
    }
}

/// The reason a provider gives when it flags a query as failed, if it did.
///
/// ipapi.co sends `{"error": true, "reason": ..}`, ipwho.is sends
/// `{"success": false, "message": ..}`.
pub fn rejection(raw: &Value) -> Option<String> {
    let failed = raw.get("error").and_then(Value::as_bool) == Some(true)
        || raw.get("success").and_then(Value::as_bool) == Some(false);
    if !failed {
        return None;
    }
    let reason = text(raw, "reason")
        .or_else(|| text(raw, "message"))
        .unwrap_or_else(|| "unspecified error".to_string());
    Some(reason)
}

fn field<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(raw, |node, key| node.get(key))
}

fn text(raw: &Value, path: &str) -> Option<String> {
    match field(raw, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy_coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| *v != 0.0 && v.is_finite()),
        Value::String(s) if !s.is_empty() => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// One-line summary of a connection-info record, e.g. `"1.2.3.4 Germany Berlin"`.
///
/// Missing fields render as [`PLACEHOLDER`].
pub fn banner_line(raw: &Value, paths: &[&str]) -> String {
    paths
        .iter()
        .map(|path| text(raw, path).unwrap_or_else(|| PLACEHOLDER.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Top candidate of a forward geocoding search.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub label: String,
    pub point: GeoPoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_ipapi_record() {
        let raw = json!({
            "ip": "1.1.1.1", "latitude": -33.494, "longitude": 143.2104,
            "city": "Sydney", "region": "New South Wales", "country_name": "Australia",
            "org": "CLOUDFLARENET"
        });
        let r = normalize(&raw, &IPAPI_CO_FIELDS, "1.1.1.1");
        assert_eq!(r.point, Some(GeoPoint::new(-33.494, 143.2104)));
        assert_eq!(r.address, "Sydney");
        assert_eq!(r.region, "New South Wales, Australia");
        assert_eq!(r.organization, "CLOUDFLARENET");
    }

    #[test]
    fn nested_organization_for_ipwhois() {
        let raw = json!({
            "ip": "8.8.8.8", "latitude": 37.386, "longitude": -122.0838,
            "city": "Mountain View", "country": "United States",
            "connection": { "org": "Google LLC" }
        });
        let r = normalize(&raw, &IPWHO_IS_FIELDS, "8.8.8.8");
        assert_eq!(r.organization, "Google LLC");
        assert_eq!(r.region, "United States");
    }

    #[test]
    fn missing_coordinates_leave_text_with_placeholders() {
        let raw = json!({ "ip": "10.0.0.1", "city": "" });
        let r = normalize(&raw, &IPAPI_CO_FIELDS, "10.0.0.1");
        assert_eq!(r.point, None);
        assert_eq!(r.address, PLACEHOLDER);
        assert_eq!(r.region, PLACEHOLDER);
        assert_eq!(r.organization, PLACEHOLDER);
    }

    #[test]
    fn zero_coordinate_reads_as_missing() {
        let raw = json!({ "latitude": 0, "longitude": 12.5 });
        assert_eq!(normalize(&raw, &IPAPI_CO_FIELDS, "x").point, None);
        let raw = json!({ "latitude": null, "longitude": 12.5 });
        assert_eq!(normalize(&raw, &IPAPI_CO_FIELDS, "x").point, None);
    }

    #[test]
    fn string_coordinates_are_parsed() {
        let raw = json!({ "latitude": "51.5", "longitude": "-0.12" });
        assert_eq!(
            normalize(&raw, &IPAPI_CO_FIELDS, "x").point,
            Some(GeoPoint::new(51.5, -0.12))
        );
    }

    #[test]
    fn identifier_falls_back_to_query() {
        let raw = json!({ "latitude": 1.0, "longitude": 2.0 });
        assert_eq!(normalize(&raw, &IPAPI_CO_FIELDS, "example.com").resolved_identifier, "example.com");
        let raw = json!({ "ip": "93.184.216.34" });
        assert_eq!(normalize(&raw, &IPAPI_CO_FIELDS, "example.com").resolved_identifier, "93.184.216.34");
    }

    #[test]
    fn provider_rejections() {
        assert_eq!(
            rejection(&json!({ "error": true, "reason": "Invalid IP Address" })),
            Some("Invalid IP Address".to_string())
        );
        assert_eq!(
            rejection(&json!({ "success": false, "message": "Reserved range" })),
            Some("Reserved range".to_string())
        );
        assert_eq!(rejection(&json!({ "success": true, "ip": "1.1.1.1" })), None);
    }

    #[test]
    fn banner_fills_gaps() {
        let raw = json!({ "ip": "1.2.3.4", "country": "DE" });
        assert_eq!(banner_line(&raw, &["ip", "country", "city"]), "1.2.3.4 DE Unknown");
    }
}
