//! HTTP adapters for the hosted services the app leans on.
//!
//! Each capability is a trait ([`LocationProvider`], [`DnsResolver`],
//! [`Geocoder`]) so the provider can be picked from `config.toml` and swapped
//! for a mock server in tests. [`NetworkProbe`] fills the banner panel.

use crate::config::{ApiConfig, GeocoderKind, ProviderKind};
use crate::error::LookupError;
use crate::geo::GeoPoint;
use crate::models::{banner_line, rejection, FieldMap, Place, IPAPI_CO_FIELDS, IPWHO_IS_FIELDS};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("ipatlas-tui/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with the configured request timeout.
pub fn http_client(timeout_secs: u64) -> Result<Client, LookupError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()?)
}

async fn get_json(service: &'static str, request: RequestBuilder) -> Result<Value, LookupError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            service,
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    debug!("{} answered with {} bytes", service, body.len());
    serde_json::from_str(&body).map_err(|e| LookupError::Decode {
        service,
        detail: e.to_string(),
    })
}

fn decode<T: for<'de> Deserialize<'de>>(service: &'static str, raw: Value) -> Result<T, LookupError> {
    serde_json::from_value(raw).map_err(|e| LookupError::Decode {
        service,
        detail: e.to_string(),
    })
}

// IP geolocation

/// An IP-to-location service. Returns the provider's raw record; normalization
/// happens in [`resolve`](crate::resolve) with [`LocationProvider::fields`].
#[async_trait]
pub trait LocationProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn fields(&self) -> &FieldMap;
    async fn fetch(&self, ip: &str) -> Result<Value, LookupError>;
}

pub struct IpApiCo {
    client: Client,
    base_url: String,
}

impl IpApiCo {
    pub const DEFAULT_BASE: &'static str = "https://ipapi.co";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl LocationProvider for IpApiCo {
    fn name(&self) -> &'static str {
        "ipapi.co"
    }

    fn fields(&self) -> &FieldMap {
        &IPAPI_CO_FIELDS
    }

    async fn fetch(&self, ip: &str) -> Result<Value, LookupError> {
        let url = format!("{}/{}/json/", self.base_url, ip);
        let raw = get_json(self.name(), self.client.get(url)).await?;
        match rejection(&raw) {
            Some(reason) => Err(LookupError::Provider {
                provider: self.name(),
                reason,
            }),
            None => Ok(raw),
        }
    }
}

pub struct IpWhoIs {
    client: Client,
    base_url: String,
}

impl IpWhoIs {
    pub const DEFAULT_BASE: &'static str = "https://ipwho.is";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl LocationProvider for IpWhoIs {
    fn name(&self) -> &'static str {
        "ipwho.is"
    }

    fn fields(&self) -> &FieldMap {
        &IPWHO_IS_FIELDS
    }

    async fn fetch(&self, ip: &str) -> Result<Value, LookupError> {
        let url = format!("{}/{}", self.base_url, ip);
        let raw = get_json(self.name(), self.client.get(url)).await?;
        match rejection(&raw) {
            Some(reason) => Err(LookupError::Provider {
                provider: self.name(),
                reason,
            }),
            None => Ok(raw),
        }
    }
}

/// Builds the provider named in the config.
pub fn location_provider(kind: ProviderKind, client: Client) -> Box<dyn LocationProvider> {
    match kind {
        ProviderKind::IpApi => Box::new(IpApiCo::new(client, IpApiCo::DEFAULT_BASE)),
        ProviderKind::IpWhoIs => Box::new(IpWhoIs::new(client, IpWhoIs::DEFAULT_BASE)),
    }
}

// DNS over HTTPS

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Numeric RR type as it appears in DoH JSON answers.
    pub fn code(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Aaaa => 28,
        }
    }
}

/// Resolves a name to the addresses in one answer set. An empty set is a
/// valid answer, not an error.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn answers(&self, domain: &str, record: RecordType) -> Result<Vec<String>, LookupError>;
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    /// Absent or `null` when the name has no records.
    #[serde(rename = "Answer", default)]
    answer: Option<Vec<DohAnswer>>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

/// JSON DoH endpoint in the `/resolve?name=..&type=..` style (AliDNS, Google).
pub struct DohResolver {
    client: Client,
    endpoint: String,
}

impl DohResolver {
    pub const DEFAULT_ENDPOINT: &'static str = "https://dns.alidns.com/resolve";

    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DnsResolver for DohResolver {
    async fn answers(&self, domain: &str, record: RecordType) -> Result<Vec<String>, LookupError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("name", domain), ("type", record.as_str())]);
        let response: DohResponse = decode("dns-over-https", get_json("dns-over-https", request).await?)?;

        // CNAME links in the chain carry other type codes.
        Ok(response
            .answer
            .unwrap_or_default()
            .into_iter()
            .filter(|a| a.record_type == record.code())
            .map(|a| a.data)
            .collect())
    }
}

// Forward geocoding

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best-ranked match for a free-text query.
    async fn top_candidate(&self, query: &str) -> Result<Place, LookupError>;
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
    display_name: String,
}

pub struct Nominatim {
    client: Client,
    base_url: String,
}

impl Nominatim {
    pub const DEFAULT_BASE: &'static str = "https://nominatim.openstreetmap.org";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Geocoder for Nominatim {
    async fn top_candidate(&self, query: &str) -> Result<Place, LookupError> {
        let request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")]);
        let hits: Vec<NominatimHit> = decode("nominatim", get_json("nominatim", request).await?)?;

        let hit = hits.into_iter().next().ok_or_else(|| LookupError::NoGeocodeCandidates {
            query: query.to_string(),
        })?;
        let parse = |v: &str| {
            v.parse::<f64>().map_err(|e| LookupError::Decode {
                service: "nominatim",
                detail: e.to_string(),
            })
        };
        Ok(Place {
            label: hit.display_name,
            point: GeoPoint::new(parse(&hit.lat)?, parse(&hit.lon)?),
        })
    }
}

pub struct BingMaps {
    client: Client,
    base_url: String,
    key: String,
}

impl BingMaps {
    pub const DEFAULT_BASE: &'static str = "https://dev.virtualearth.net";

    pub fn new(client: Client, base_url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl Geocoder for BingMaps {
    async fn top_candidate(&self, query: &str) -> Result<Place, LookupError> {
        if self.key.is_empty() {
            return Err(LookupError::GeocoderUnavailable("api.bing_key is not set".to_string()));
        }
        let request = self
            .client
            .get(format!("{}/REST/v1/Locations", self.base_url))
            .query(&[("q", query), ("key", self.key.as_str())]);
        let raw = get_json("bing maps", request).await?;

        let top = raw
            .pointer("/resourceSets/0/resources/0")
            .ok_or_else(|| LookupError::NoGeocodeCandidates {
                query: query.to_string(),
            })?;
        let coordinate = |i: usize| {
            top.pointer(&format!("/point/coordinates/{i}"))
                .and_then(Value::as_f64)
                .ok_or_else(|| LookupError::Decode {
                    service: "bing maps",
                    detail: "resource without point coordinates".to_string(),
                })
        };
        Ok(Place {
            label: top
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(query)
                .to_string(),
            point: GeoPoint::new(coordinate(0)?, coordinate(1)?),
        })
    }
}

/// Builds the geocoder named in the config.
pub fn geocoder(config: &ApiConfig, client: Client) -> Box<dyn Geocoder> {
    match config.geocoder {
        GeocoderKind::Nominatim => Box::new(Nominatim::new(client, Nominatim::DEFAULT_BASE)),
        GeocoderKind::Bing => Box::new(BingMaps::new(client, BingMaps::DEFAULT_BASE, config.bing_key.clone())),
    }
}

// Banner probes

/// Connection summary for one banner line. `ip` is kept separately so the
/// visitor address can seed self geolocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub ip: Option<String>,
    pub line: String,
}

impl Banner {
    fn from_record(raw: &Value, paths: &[&str]) -> Self {
        Self {
            ip: raw.get("ip").and_then(Value::as_str).map(str::to_string),
            line: banner_line(raw, paths),
        }
    }
}

/// Base URLs for the banner services.
#[derive(Debug, Clone)]
pub struct ProbeEndpoints {
    pub visitor: String,
    pub egress: String,
    pub current_ip: String,
    pub carrier: String,
}

impl Default for ProbeEndpoints {
    fn default() -> Self {
        Self {
            visitor: "https://ipapi.co/json/".to_string(),
            egress: "https://ipleak.net/json/".to_string(),
            current_ip: "https://ipv4_ct.itdog.cn".to_string(),
            carrier: IpWhoIs::DEFAULT_BASE.to_string(),
        }
    }
}

/// Asks a few public services what they see of our own connection.
pub struct NetworkProbe {
    client: Client,
    endpoints: ProbeEndpoints,
}

impl NetworkProbe {
    pub fn new(client: Client, endpoints: ProbeEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Address, country and city as seen by ipapi.co.
    pub async fn visitor(&self) -> Result<Banner, LookupError> {
        let raw = get_json("ipapi.co", self.client.get(&self.endpoints.visitor)).await?;
        Ok(Banner::from_record(&raw, &["ip", "country", "city"]))
    }

    /// Address and country as seen by ipleak.net.
    pub async fn egress(&self) -> Result<Banner, LookupError> {
        let raw = get_json("ipleak.net", self.client.get(&self.endpoints.egress)).await?;
        Ok(Banner::from_record(&raw, &["ip", "country_name"]))
    }

    /// Current IPv4 from itdog, then region, city and carrier from ipwho.is.
    pub async fn carrier(&self) -> Result<Banner, LookupError> {
        let current = get_json("itdog", self.client.get(&self.endpoints.current_ip)).await?;
        let ip = current
            .get("ip")
            .and_then(Value::as_str)
            .ok_or_else(|| LookupError::Decode {
                service: "itdog",
                detail: "missing ip field".to_string(),
            })?;
        let url = format!("{}/{}", self.endpoints.carrier, ip);
        let raw = get_json("ipwho.is", self.client.get(url)).await?;
        Ok(Banner::from_record(&raw, &["ip", "region", "city", "connection.org"]))
    }
}
