use crate::coordinator::CameraSettings;
use crate::api::DohResolver;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub location: LocationConfig,
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub storage: StorageConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub auto_locate: bool, // Use IP geolocation if true
    pub manual_lat: f64,   // Latitude used if auto_locate is false
    pub manual_lon: f64,   // Longitude used if auto_locate is false
    pub timeout_secs: u64, // Give up on self geolocation after this long
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    IpApi,
    IpWhoIs,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderKind {
    Nominatim,
    Bing,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub provider: ProviderKind,
    pub geocoder: GeocoderKind,
    pub bing_key: String,
    pub doh_endpoint: String,
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BaseLayer {
    #[default]
    Coastline,
    Detailed,
    Graticule,
}

impl BaseLayer {
    pub fn next(self) -> Self {
        match self {
            BaseLayer::Coastline => BaseLayer::Detailed,
            BaseLayer::Detailed => BaseLayer::Graticule,
            BaseLayer::Graticule => BaseLayer::Coastline,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BaseLayer::Coastline => "coastline",
            BaseLayer::Detailed => "detailed",
            BaseLayer::Graticule => "graticule",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub default_layer: BaseLayer,
    pub tick_rate_ms: u64,
    pub self_zoom: f64,
    pub query_zoom: f64,
    pub fit_padding: f64, // Fraction of the span added around fitted bounds
}

impl UiConfig {
    pub fn camera(&self) -> CameraSettings {
        CameraSettings {
            self_zoom: self.self_zoom,
            query_zoom: self.query_zoom,
            fit_padding: self.fit_padding,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub history_db: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                auto_locate: true,
                manual_lat: 37.7749,
                manual_lon: -122.4194,
                timeout_secs: 10,
            },
            api: ApiConfig {
                provider: ProviderKind::IpApi,
                geocoder: GeocoderKind::Nominatim,
                bing_key: String::new(),
                doh_endpoint: DohResolver::DEFAULT_ENDPOINT.to_string(),
                request_timeout_secs: 10,
            },
            ui: UiConfig {
                default_layer: BaseLayer::Coastline,
                tick_rate_ms: 150,
                self_zoom: 3.0,
                query_zoom: 4.0,
                fit_padding: 0.25,
            },
            storage: StorageConfig {
                history_db: "ipatlas_history.db".to_string(),
            },
        }
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_enums() {
        let text = r#"
            [location]
            auto_locate = false
            manual_lat = 52.52
            manual_lon = 13.405
            timeout_secs = 5

            [api]
            provider = "ipwhois"
            geocoder = "bing"
            bing_key = "abc"
            doh_endpoint = "https://dns.google/resolve"
            request_timeout_secs = 3

            [ui]
            default_layer = "graticule"
            tick_rate_ms = 100
            self_zoom = 2.0
            query_zoom = 5.0
            fit_padding = 0.1

            [storage]
            history_db = "h.db"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.api.provider, ProviderKind::IpWhoIs);
        assert_eq!(config.api.geocoder, GeocoderKind::Bing);
        assert_eq!(config.ui.default_layer, BaseLayer::Graticule);
        assert!(!config.location.auto_locate);
    }

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn layers_cycle() {
        let start = BaseLayer::Coastline;
        assert_eq!(start.next().next().next(), start);
    }
}
