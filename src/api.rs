use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::config::Config;
use crate::error::EvolutionError;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiResource {
    pub url: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PokemonResponse {
    pub id: u32,
    pub name: String,
    pub species: Option<NamedResource>,
    pub types: Vec<PokemonTypeSlot>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PokemonTypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub type_info: Option<NamedResource>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PokemonSpeciesResponse {
    pub id: u32,
    pub name: String,
    pub varieties: Vec<VarietySlot>,
    pub evolution_chain: Option<ApiResource>,
    pub evolves_from_species: Option<NamedResource>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct VarietySlot {
    pub is_default: bool,
    pub pokemon: Option<NamedResource>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PokemonFormResponse {
    pub name: String,
    pub version_group: Option<NamedResource>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EvolutionChainResponse {
    pub id: u32,
    pub chain: Option<ChainLink>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChainLink {
    pub species: Option<NamedResource>,
    pub evolves_to: Vec<ChainLink>,
    pub evolution_details: Vec<EvolutionDetailResponse>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EvolutionDetailResponse {
    pub trigger: Option<NamedResource>,
    pub item: Option<NamedResource>,
    pub held_item: Option<NamedResource>,
    pub known_move: Option<NamedResource>,
    pub known_move_type: Option<NamedResource>,
    pub location: Option<NamedResource>,
    pub party_species: Option<NamedResource>,
    pub party_type: Option<NamedResource>,
    pub trade_species: Option<NamedResource>,
    pub min_level: Option<u32>,
    pub min_happiness: Option<u32>,
    pub min_affection: Option<u32>,
    pub min_beauty: Option<u32>,
    pub time_of_day: Option<String>,
    pub gender: Option<u8>,
    pub relative_physical_stats: Option<i8>,
    pub needs_overworld_rain: bool,
    pub turn_upside_down: bool,
}

/// Byte-level access to the upstream REST API.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, EvolutionError>;

    /// Drops any locally cached copy of `url`.
    async fn invalidate(&self, _url: &str) {}
}

pub async fn fetch_json<T: DeserializeOwned + Send>(
    upstream: &dyn Upstream,
    url: &str,
) -> Result<T, EvolutionError> {
    let bytes = upstream.get_bytes(url).await?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(err) => {
            upstream.invalidate(url).await;
            Err(EvolutionError::malformed(format!("{url}: {err}")))
        }
    }
}

/// Last non-empty path segment of a resource URL (`.../pokemon-species/37/` -> `37`).
pub fn id_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(|segment| segment.to_string())
}

/// reqwest transport with an on-disk response cache keyed by URL digest.
pub struct HttpUpstream {
    client: reqwest::Client,
    cache_dir: Option<PathBuf>,
}

impl HttpUpstream {
    pub fn new(config: &Config) -> Result<Self, EvolutionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build().map_err(EvolutionError::upstream)?,
            cache_dir: config.cache_dir.clone(),
        })
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_deref()
            .map(|root| cache_path(root, "http", url))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, EvolutionError> {
        let cache_path = self.cache_path(url);
        if let Some(path) = cache_path.as_deref() {
            if let Some(bytes) = read_cache(path).await {
                tracing::debug!(url, "disk cache hit");
                return Ok(bytes);
            }
        }

        tracing::debug!(url, "upstream request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(EvolutionError::upstream)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EvolutionError::NotFound(url.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(EvolutionError::upstream)?;
        let bytes = response
            .bytes()
            .await
            .map_err(EvolutionError::upstream)?
            .to_vec();
        if let Some(path) = cache_path.as_deref() {
            write_cache(path, &bytes).await;
        }
        Ok(bytes)
    }

    async fn invalidate(&self, url: &str) {
        if let Some(path) = self.cache_path(url) {
            let _ = fs::remove_file(&path).await;
        }
    }
}

fn cache_path(root: &Path, kind: &str, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    root.join(kind).join(digest)
}

async fn read_cache(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).await.ok()
}

async fn write_cache(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent).await;
    }
    if let Err(err) = fs::write(path, bytes).await {
        tracing::debug!(path = %path.display(), error = %err, "failed to write disk cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn id_from_url_takes_last_segment() {
        assert_eq!(
            id_from_url("https://pokeapi.co/api/v2/pokemon-species/37/").as_deref(),
            Some("37")
        );
        assert_eq!(id_from_url("evolution-chain/12").as_deref(), Some("12"));
        assert_eq!(id_from_url(""), None);
        assert_eq!(id_from_url("https://"), None);
    }

    #[test]
    fn cache_path_is_stable_per_url() {
        let root = Path::new("/tmp/evodex");
        let a = cache_path(root, "http", "https://pokeapi.co/api/v2/pokemon/1");
        let b = cache_path(root, "http", "https://pokeapi.co/api/v2/pokemon/1");
        let c = cache_path(root, "http", "https://pokeapi.co/api/v2/pokemon/2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("/tmp/evodex/http"));
    }

    #[tokio::test]
    async fn cached_bytes_are_served_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().with_cache_dir(Some(dir.path().to_path_buf()));
        let upstream = HttpUpstream::new(&config).unwrap();
        let url = "http://127.0.0.1:9/pokemon/1";
        let path = upstream.cache_path(url).unwrap();
        write_cache(&path, br#"{"id":1,"name":"bulbasaur"}"#).await;

        let record: PokemonResponse = fetch_json(&upstream, url).await.unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.name, "bulbasaur");
    }

    #[tokio::test]
    async fn undecodable_cache_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().with_cache_dir(Some(dir.path().to_path_buf()));
        let upstream = HttpUpstream::new(&config).unwrap();
        let url = "http://127.0.0.1:9/pokemon/2";
        let path = upstream.cache_path(url).unwrap();
        write_cache(&path, b"not json").await;

        let result: Result<PokemonResponse, _> = fetch_json(&upstream, url).await;
        assert!(matches!(result, Err(EvolutionError::MalformedRecord(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn client_timeout_surfaces_as_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        std::thread::spawn(move || {
            if let Ok((_socket, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(2));
            }
        });
        let config = Config::default()
            .with_cache_dir(None)
            .with_timeout(Some(Duration::from_millis(100)));
        let upstream = HttpUpstream::new(&config).unwrap();

        let result = upstream.get_bytes(&format!("http://{addr}/pokemon/1")).await;
        assert!(matches!(result, Err(EvolutionError::UpstreamUnavailable(_))));
    }

    #[test]
    fn missing_fields_default_instead_of_failing() {
        let link: ChainLink = serde_json::from_str(r#"{"evolves_to":[{}]}"#).unwrap();
        assert!(link.species.is_none());
        assert_eq!(link.evolves_to.len(), 1);
        assert!(link.evolves_to[0].evolution_details.is_empty());

        let detail: EvolutionDetailResponse =
            serde_json::from_str(r#"{"min_level":null,"time_of_day":""}"#).unwrap();
        assert!(detail.trigger.is_none());
        assert!(!detail.turn_upside_down);
    }
}
