//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::debug;

use crate::cache::{Cache, Compression};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::requests::validate_key;
use crate::models::{
    AmountQuery, CounterResponse, DeleteQuery, DeleteResponse, FlushResponse, GetManyRequest,
    GetManyResponse, GetQuery, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::tasks::{run_blocking, shared, SharedCache};

/// Application state shared across all handlers.
///
/// Backends do blocking file I/O, so the facade sits behind a std `Mutex`
/// and every call runs on the blocking pool via [`AppState::with_cache`].
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache facade
    pub cache: SharedCache,
}

impl AppState {
    /// Creates a new AppState with the given cache facade.
    pub fn new(cache: Cache) -> Self {
        Self {
            cache: shared(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Fails when the configured backend cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Cache::from_config(config)?))
    }

    /// Runs `op` against the facade off the async executor.
    pub async fn with_cache<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Cache) -> T + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(&self.cache, op).await
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /set
///
/// Stores a value under a key that is not already present.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let (expiration, compression) = (req.expiration(), req.compression());
    let SetRequest { key, value, .. } = req;
    let target = key.clone();
    let stored = state
        .with_cache(move |cache| cache.set(&target, value, expiration, compression))
        .await?;

    match stored {
        Some(_) => Ok(Json(SetResponse::stored(key))),
        None => Err(CacheError::NotStored(key)),
    }
}

/// Handler for PUT /replace
///
/// Overwrites the value of a key, whether or not it exists.
pub async fn replace_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let (expiration, compression) = (req.expiration(), req.compression());
    let SetRequest { key, value, .. } = req;
    let target = key.clone();
    let stored = state
        .with_cache(move |cache| cache.replace(&target, value, expiration, compression))
        .await?;

    match stored {
        Some(_) => Ok(Json(SetResponse::replaced(key))),
        None => Err(CacheError::NotStored(key)),
    }
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;

    let compression = query.compress.map(Compression::from_bool);
    let target = key.clone();
    let value = state
        .with_cache(move |cache| cache.get(&target, compression))
        .await?;

    match value {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for POST /get
pub async fn get_many_handler(
    State(state): State<AppState>,
    Json(req): Json<GetManyRequest>,
) -> Result<Json<GetManyResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let requested = req.keys.len();
    let values = state
        .with_cache(move |cache| {
            let keys: Vec<&str> = req.keys.iter().map(String::as_str).collect();
            cache.get_many(&keys, None)
        })
        .await?;
    debug!(requested, "Batch get");

    Ok(Json(GetManyResponse { values }))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key, or with `?timeout=n` lets it expire after n seconds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;

    let timeout = query.timeout;
    let target = key.clone();
    let deleted = state
        .with_cache(move |cache| cache.delete(&target, timeout))
        .await?;

    if deleted {
        Ok(Json(DeleteResponse::new(key, timeout)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for POST /incr/:key
pub async fn increment_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<AmountQuery>,
) -> Result<Json<CounterResponse>> {
    check_key(&key)?;

    let target = key.clone();
    let counter = state
        .with_cache(move |cache| cache.increment(&target, query.amount))
        .await?;

    match counter {
        Some(value) => Ok(Json(CounterResponse { key, value })),
        None => Err(CacheError::NotStored(key)),
    }
}

/// Handler for POST /decr/:key
pub async fn decrement_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<AmountQuery>,
) -> Result<Json<CounterResponse>> {
    check_key(&key)?;

    let target = key.clone();
    let counter = state
        .with_cache(move |cache| cache.decrement(&target, query.amount))
        .await?;

    match counter {
        Some(value) => Ok(Json(CounterResponse { key, value })),
        None => Err(CacheError::NotStored(key)),
    }
}

/// Handler for POST /flush
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    let flushed = state.with_cache(|cache| cache.flush()).await?;
    Ok(Json(FlushResponse { flushed }))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let response = state
        .with_cache(|cache| StatsResponse::new(cache.name(), &cache.stats()))
        .await?;
    Ok(Json(response))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
