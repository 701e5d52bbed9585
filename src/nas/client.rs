use crate::error::{CrateError, Result};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "http://nas.er.usgs.gov/api/v1";
pub const USER_AGENT: &str = concat!("nas-occurrences/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_LIMIT: i64 = 100;

/// Parameters of one occurrence search. A `limit` of -1 asks for every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceQuery {
    pub species_id: String,
    pub api_key: Option<String>,
    pub limit: i64,
}

impl OccurrenceQuery {
    pub fn new(species_id: impl Into<String>) -> Self {
        Self {
            species_id: species_id.into(),
            api_key: None,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

// Envelope shared by the occurrence and species search endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    pub count: Option<i64>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "endOfRecords")]
    pub end_of_records: Option<bool>,
}

/// Query string for an occurrence search, in request order.
pub fn occurrence_params(query: &OccurrenceQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("species_ID", query.species_id.clone())];
    if let Some(key) = &query.api_key {
        params.push(("api_key", key.clone()));
    }
    params.push(("limit", query.limit.to_string()));
    params
}

/// Hides all but the last four characters of an API key for logging.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

pub struct NasClient {
    client: reqwest::Client,
    base_url: String,
}

impl NasClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(CrateError::ApiRequestError)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Searches occurrence records of one species.
    pub async fn search_occurrences(&self, query: &OccurrenceQuery) -> Result<SearchResponse> {
        info!(
            "Requesting occurrences for species {} (limit {}, api key: {})",
            query.species_id,
            query.limit,
            query
                .api_key
                .as_deref()
                .map(mask_key)
                .unwrap_or_else(|| "none".to_string())
        );
        let response = self
            .get("occurrence/search", &occurrence_params(query))
            .await?;
        info!(
            "Received {} occurrence records (reported count: {:?})",
            response.results.len(),
            response.count
        );
        Ok(response)
    }

    /// Searches species by genus and specific epithet.
    pub async fn search_species(&self, genus: &str, species: &str) -> Result<SearchResponse> {
        info!("Searching species {} {}", genus, species);
        let params = [("genus", genus.to_string()), ("species", species.to_string())];
        self.get("species/search", &params).await
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<SearchResponse> {
        let url = self.endpoint(path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(CrateError::ApiRequestError)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrateError::ApiStatusError {
                status,
                endpoint: url,
            });
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(CrateError::ApiJsonDecodeError)
    }
}
