//! CEP (postal code) auto-fill
//!
//! Looks up a client's CEP from its city and street through the ViaCEP
//! collaborator. The resolver is dependency-injected so callers and tests
//! control caching and the endpoint; lookups use a short timeout and any
//! failure degrades to "no value" instead of raising.

use std::sync::LazyLock;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use adega_common::{digits_only, normalize_spaces};

use crate::model::ClientRecord;

const VIACEP_BASE_URL: &str = "https://viacep.com.br";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(4);
const CACHE_CAPACITY: u64 = 10_000;
const DEFAULT_UF: &str = "SP";

/// Street length cap applied before querying ViaCEP.
const STREET_LOOKUP_MAX: usize = 80;

static HOUSE_NUMBER_SUFFIX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\s+\d+.*$").expect("Invalid regex pattern"));

/// Normalize a CEP to `#####-###`; anything without exactly 8 digits is
/// treated as absent.
pub fn normalize_cep(value: &str) -> String {
    let digits = digits_only(value);
    if digits.len() != 8 {
        return String::new();
    }
    format!("{}-{}", &digits[..5], &digits[5..])
}

/// Strip the house number and anything after it, then cap the length; the
/// address service matches on bare street names.
pub fn street_for_lookup(value: &str) -> String {
    let street = normalize_spaces(value);
    if street.is_empty() {
        return String::new();
    }
    let bare = HOUSE_NUMBER_SUFFIX.replace(&street, "").trim().to_string();
    bare.chars().take(STREET_LOOKUP_MAX).collect()
}

/// Address-lookup collaborator with a process-local cache keyed by
/// (uf, cidade, street).
pub struct CepResolver {
    http: reqwest::Client,
    cache: Cache<(String, String, String), String>,
    base_url: String,
}

impl Default for CepResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CepResolver {
    pub fn new() -> Self {
        Self::with_base_url(VIACEP_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        CepResolver {
            http: reqwest::Client::builder()
                .timeout(LOOKUP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            cache: Cache::builder().max_capacity(CACHE_CAPACITY).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up a CEP by state, city, and street. Returns an empty string
    /// when the address is incomplete, unknown, or the service misbehaves.
    pub async fn lookup_by_address(&self, uf: &str, cidade: &str, endereco: &str) -> String {
        let city = normalize_spaces(cidade);
        let street = street_for_lookup(endereco);
        if city.is_empty() || street.is_empty() {
            return String::new();
        }

        let key = (uf.to_string(), city.clone(), street.clone());
        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        match self.fetch(uf, &city, &street).await {
            Some(value) => {
                self.cache.insert(key, value.clone()).await;
                value
            }
            // Transport/parse failures are not cached so a later call can
            // still succeed once the service recovers.
            None => {
                debug!("CEP lookup degraded to empty for {city}/{street}");
                String::new()
            }
        }
    }

    /// Ensure a client payload carries a normalized CEP, auto-filling it
    /// from the address when the export left it blank.
    pub async fn ensure_client_cep(&self, client: &mut ClientRecord) {
        let normalized = normalize_cep(&client.cep);
        if !normalized.is_empty() {
            client.cep = normalized;
            return;
        }
        let auto = self
            .lookup_by_address(DEFAULT_UF, &client.cidade, &client.endereco)
            .await;
        if !auto.is_empty() {
            client.cep = auto;
        }
    }

    async fn fetch(&self, uf: &str, city: &str, street: &str) -> Option<String> {
        let mut endpoint = url::Url::parse(&self.base_url).ok()?;
        endpoint
            .path_segments_mut()
            .ok()?
            .extend(["ws", uf, city, street, "json", ""]);

        let payload: serde_json::Value = self
            .http
            .get(endpoint)
            .send()
            .await
            .ok()?
            .json()
            .await
            .ok()?;

        // ViaCEP answers a list of candidate addresses; the first row with a
        // well-formed CEP wins. A non-list answer means "no match".
        let candidates = payload.as_array()?;
        for candidate in candidates {
            if let Some(cep) = candidate.get("cep").and_then(|value| value.as_str()) {
                let normalized = normalize_cep(cep);
                if !normalized.is_empty() {
                    return Some(normalized);
                }
            }
        }
        Some(String::new())
    }
}
