use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::api::{
    fetch_json, EvolutionChainResponse, PokemonFormResponse, PokemonResponse,
    PokemonSpeciesResponse, Upstream,
};
use crate::config::Config;
use crate::error::EvolutionError;
use crate::records::{FormRecord, PokemonRecord, SpeciesRecord};

pub type Fetched<T> = Result<Arc<T>, EvolutionError>;
type SharedFetch<T> = Shared<BoxFuture<'static, Fetched<T>>>;

/// Per-key cache that stores the in-flight request rather than its result,
/// so every caller for a key awaits the same upstream call.
struct InflightCache<T> {
    entries: Mutex<HashMap<String, SharedFetch<T>>>,
}

impl<T: Send + Sync + 'static> InflightCache<T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_fetch<Fut>(&self, key: &str, fetch: impl FnOnce() -> Fut) -> SharedFetch<T>
    where
        Fut: Future<Output = Fetched<T>> + Send + 'static,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(key) {
            tracing::debug!(key, "joining cached request");
            return existing.clone();
        }
        let shared = fetch().boxed().shared();
        entries.insert(key.to_string(), shared.clone());
        shared
    }
}

/// Fetches and caches pokemon, species, form and evolution-chain records.
///
/// One resolver is meant to live for one chart load; clones share caches.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    upstream: Arc<dyn Upstream>,
    config: Config,
    pokemon: InflightCache<PokemonRecord>,
    species: InflightCache<SpeciesRecord>,
    forms: InflightCache<FormRecord>,
    chains: InflightCache<EvolutionChainResponse>,
}

impl Resolver {
    pub fn new(upstream: Arc<dyn Upstream>, config: Config) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                upstream,
                config,
                pokemon: InflightCache::new(),
                species: InflightCache::new(),
                forms: InflightCache::new(),
                chains: InflightCache::new(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Pokemon record by numeric id, species slug or form slug.
    pub async fn resolve(&self, identifier: &str) -> Fetched<PokemonRecord> {
        let key = normalize(identifier)?;
        let url = self.inner.config.endpoint("pokemon", &key);
        let upstream = Arc::clone(&self.inner.upstream);
        self.inner
            .pokemon
            .get_or_fetch(&key, move || {
                fetch_record::<PokemonResponse, PokemonRecord>(upstream, url)
            })
            .await
    }

    pub async fn species(&self, identifier: &str) -> Fetched<SpeciesRecord> {
        let key = normalize(identifier)?;
        let url = self.inner.config.endpoint("pokemon-species", &key);
        let upstream = Arc::clone(&self.inner.upstream);
        self.inner
            .species
            .get_or_fetch(&key, move || {
                fetch_record::<PokemonSpeciesResponse, SpeciesRecord>(upstream, url)
            })
            .await
    }

    pub async fn form(&self, identifier: &str) -> Fetched<FormRecord> {
        let key = normalize(identifier)?;
        let url = self.inner.config.endpoint("pokemon-form", &key);
        let upstream = Arc::clone(&self.inner.upstream);
        self.inner
            .forms
            .get_or_fetch(&key, move || {
                fetch_record::<PokemonFormResponse, FormRecord>(upstream, url)
            })
            .await
    }

    pub async fn evolution_chain(&self, url: &str) -> Fetched<EvolutionChainResponse> {
        if url.trim().is_empty() {
            return Err(EvolutionError::MalformedRecord(
                "empty evolution chain url".to_string(),
            ));
        }
        let key = url.to_string();
        let url = key.clone();
        let upstream = Arc::clone(&self.inner.upstream);
        self.inner
            .chains
            .get_or_fetch(&key, move || async move {
                let response: EvolutionChainResponse =
                    fetch_json(upstream.as_ref(), &url).await?;
                Ok(Arc::new(response))
            })
            .await
    }

    /// Species record for whatever pokemon `identifier` names.
    pub async fn species_for_pokemon(&self, identifier: &str) -> Fetched<SpeciesRecord> {
        let pokemon = self.resolve(identifier).await?;
        let species_key = pokemon
            .species_id
            .clone()
            .unwrap_or_else(|| pokemon.species_name.clone());
        self.species(&species_key).await
    }

    /// Resolves many pokemon with at most `config.concurrency` requests in flight.
    /// Results come back in input order.
    pub async fn resolve_many(
        &self,
        identifiers: &[String],
    ) -> Vec<(String, Fetched<PokemonRecord>)> {
        let resolver = self.clone();
        self.fan_out(identifiers, move |identifier| {
            let resolver = resolver.clone();
            async move { resolver.resolve(&identifier).await }
        })
        .await
    }

    pub async fn species_many(
        &self,
        identifiers: &[String],
    ) -> Vec<(String, Fetched<SpeciesRecord>)> {
        let resolver = self.clone();
        self.fan_out(identifiers, move |identifier| {
            let resolver = resolver.clone();
            async move { resolver.species(&identifier).await }
        })
        .await
    }

    async fn fan_out<T, F, Fut>(&self, identifiers: &[String], fetch: F) -> Vec<(String, Fetched<T>)>
    where
        T: Send + Sync + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Fetched<T>> + Send + 'static,
    {
        if identifiers.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.inner.config.concurrency.max(1)));
        let mut join_set = JoinSet::new();
        for (index, identifier) in identifiers.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let task = fetch(identifier.clone());
            join_set.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => task.await,
                    Err(_) => Err(EvolutionError::UpstreamUnavailable(
                        "fan-out semaphore closed".to_string(),
                    )),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Fetched<T>>> = identifiers.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => tracing::warn!(error = %err, "fan-out task failed"),
            }
        }

        identifiers
            .iter()
            .cloned()
            .zip(slots)
            .map(|(identifier, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(EvolutionError::UpstreamUnavailable(format!(
                        "request for {identifier} did not complete"
                    )))
                });
                (identifier, result)
            })
            .collect()
    }
}

async fn fetch_record<R, T>(upstream: Arc<dyn Upstream>, url: String) -> Fetched<T>
where
    R: DeserializeOwned + Send,
    T: From<R>,
{
    let response: R = fetch_json(upstream.as_ref(), &url).await?;
    Ok(Arc::new(T::from(response)))
}

fn normalize(identifier: &str) -> Result<String, EvolutionError> {
    let key = identifier.trim().to_ascii_lowercase();
    if key.is_empty() {
        return Err(EvolutionError::NotFound("empty identifier".to_string()));
    }
    Ok(key)
}
