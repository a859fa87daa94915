//! Self location for ipatlas.
//!
//! [`locate_self`] is the one-shot "where am I" request. It geolocates the
//! visitor address reported by the banner probe through ip-api.com, or uses
//! the manual coordinates from `config.toml`. Failure is never fatal: the
//! self location simply stays unknown and lookups center on their result
//! instead of drawing a distance line.

use crate::config::LocationConfig;
use crate::geo::GeoPoint;
use ipgeolocate::{Locator, Service};
use std::time::Duration;
use tracing::{error, info, warn};

/// Resolves the operator's approximate position.
///
/// With `auto_locate` off this returns the manual coordinates immediately.
/// Otherwise `visitor_ip` is geolocated via [IpApi](https://ip-api.com/),
/// bounded by `timeout_secs`. Returns `None` when there is no visitor IP, the
/// service fails, times out, or answers with unparsable coordinates.
pub async fn locate_self(config: &LocationConfig, visitor_ip: Option<&str>) -> Option<GeoPoint> {
    if !config.auto_locate {
        info!(
            "Using manual location ({}, {})",
            config.manual_lat, config.manual_lon
        );
        return Some(GeoPoint::new(config.manual_lat, config.manual_lon));
    }

    let Some(ip) = visitor_ip else {
        warn!("No visitor IP known, self location unavailable.");
        return None;
    };

    let request = Locator::get(ip, Service::IpApi);
    match tokio::time::timeout(Duration::from_secs(config.timeout_secs), request).await {
        Ok(Ok(loc)) => {
            match (loc.latitude.parse::<f64>(), loc.longitude.parse::<f64>()) {
                (Ok(lat), Ok(lon)) => {
                    info!("Geolocation successful - ({}, {})", lat, lon);
                    Some(GeoPoint::new(lat, lon))
                }
                _ => {
                    warn!(
                        "Geolocation returned unusable coordinates ({:?}, {:?})",
                        loc.latitude, loc.longitude
                    );
                    None
                }
            }
        }
        Ok(Err(e)) => {
            error!("Error using geolocation service: {}", e);
            None
        }
        Err(_) => {
            warn!("Geolocation timed out after {}s", config.timeout_secs);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auto_locate: bool) -> LocationConfig {
        LocationConfig {
            auto_locate,
            manual_lat: 52.52,
            manual_lon: 13.405,
            timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn manual_location_skips_network() {
        assert_eq!(
            locate_self(&config(false), None).await,
            Some(GeoPoint::new(52.52, 13.405))
        );
    }

    #[tokio::test]
    async fn no_visitor_ip_means_unknown() {
        assert_eq!(locate_self(&config(true), None).await, None);
    }
}
