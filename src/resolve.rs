//! One lookup from raw input to a normalized [`LookupResult`].
//!
//! Classify, resolve the domain if needed, fetch from the location provider,
//! normalize. Every step is awaited in order and the first failure ends the
//! lookup.

use crate::api::{DnsResolver, Geocoder, LocationProvider, RecordType};
use crate::error::LookupError;
use crate::models::{normalize, LookupResult, Place};
use crate::query::classify;
use tracing::{debug, info};

/// Resolves `domain` to one address: first A answer, else first AAAA answer.
pub async fn resolve_domain(resolver: &dyn DnsResolver, domain: &str) -> Result<String, LookupError> {
    for record in [RecordType::A, RecordType::Aaaa] {
        let answers = resolver.answers(domain, record).await?;
        debug!("{} {} -> {} answers", domain, record.as_str(), answers.len());
        if let Some(first) = answers.into_iter().next() {
            return Ok(first);
        }
    }
    Err(LookupError::NoResolutionRecords {
        domain: domain.to_string(),
    })
}

pub struct LookupPipeline {
    provider: Box<dyn LocationProvider>,
    resolver: Box<dyn DnsResolver>,
    geocoder: Box<dyn Geocoder>,
}

impl LookupPipeline {
    pub fn new(
        provider: Box<dyn LocationProvider>,
        resolver: Box<dyn DnsResolver>,
        geocoder: Box<dyn Geocoder>,
    ) -> Self {
        Self {
            provider,
            resolver,
            geocoder,
        }
    }

    /// Looks up an IP literal or domain name. `Ok(None)` for blank input,
    /// in which case nothing is sent over the network.
    pub async fn lookup(&self, input: &str) -> Result<Option<LookupResult>, LookupError> {
        let query = input.trim();
        let Some(kind) = classify(query) else {
            return Ok(None);
        };

        let address = if kind.is_ip() {
            query.to_string()
        } else {
            resolve_domain(self.resolver.as_ref(), query).await?
        };
        info!("Looking up {} ({:?}) via {}", address, kind, self.provider.name());

        let raw = self.provider.fetch(&address).await?;
        Ok(Some(normalize(&raw, self.provider.fields(), query)))
    }

    /// Free-text place search. `Ok(None)` for blank input.
    pub async fn find_place(&self, input: &str) -> Result<Option<Place>, LookupError> {
        let query = input.trim();
        if query.is_empty() {
            return Ok(None);
        }
        self.geocoder.top_candidate(query).await.map(Some)
    }
}
