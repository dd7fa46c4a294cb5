#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone persistence façade.
//!
//! [`ZoneRepository`] is the only thing that talks to a [`ZoneStore`]. It
//! validates drafts, assigns identifiers and timestamps, encodes every
//! coordinate representation through `taxi_zones_codec`, and decodes
//! records back into [`Zone`]s, counting the ones that had to fall back to
//! a substitute shape.

pub mod file_store;
pub mod retry;
pub mod store;

use std::time::Duration;

use chrono::Utc;
use taxi_zones_codec::{CodecError, EncodingProfile, decode_zone, encode_zone};
use taxi_zones_drawing::{DrawTool, DrawingError, DrawingSession};
use taxi_zones_geometry::{Polygon, area_km2_for_storage};
use taxi_zones_zone_models::{ValidationError, Zone, ZoneDraft, ZoneId};
use thiserror::Error;

pub use file_store::JsonFileStore;
pub use store::{MemoryStore, StoredRecord, ZoneStore};

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "zones";

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The draft was rejected before anything was written.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No zone with this id exists.
    #[error("Zone not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The store could not be reached or refused the request.
    #[error("Store transport error: {message}")]
    Transport {
        /// Description of what went wrong.
        message: String,
        /// Whether a read may be retried.
        retryable: bool,
    },

    /// The drawing session ended before the write returned.
    #[error("Drawing session is no longer active")]
    StaleSession,

    /// A drawing session refused the operation.
    #[error("Drawing error: {0}")]
    Drawing(DrawingError),

    /// File store I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File store contents are not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid configuration value.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

impl RepositoryError {
    /// Returns `true` for failures a read may succeed on if retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                retryable: true,
                ..
            } | Self::Io(_)
        )
    }
}

impl From<DrawingError> for RepositoryError {
    fn from(e: DrawingError) -> Self {
        match e {
            DrawingError::Validation(v) => Self::Validation(v),
            DrawingError::StaleSession => Self::StaleSession,
            other => Self::Drawing(other),
        }
    }
}

/// Repository settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Store collection holding zone records.
    pub collection: String,
    /// Which coordinate representations writes produce.
    pub encoding: EncodingProfile,
    /// Total attempts for `list_zones` when the store read fails
    /// transiently.
    pub list_attempts: u32,
    /// Fixed delay between list attempts.
    pub list_retry_delay: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            encoding: EncodingProfile::default(),
            list_attempts: 3,
            list_retry_delay: Duration::from_millis(500),
        }
    }
}

impl RepositoryConfig {
    /// Reads settings from the environment.
    ///
    /// * `ZONES_COLLECTION` (default `zones`)
    /// * `ZONES_ENCODING`: `redundant` or `canonical` (default `redundant`)
    /// * `ZONES_LIST_ATTEMPTS`: total list attempts (default 3)
    /// * `ZONES_LIST_RETRY_DELAY_MS` (default 500)
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Config`] if a variable is set but does
    /// not parse.
    pub fn from_env() -> Result<Self, RepositoryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RepositoryConfig::from_env`], with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Config`] if a variable is set but does
    /// not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RepositoryError> {
        let defaults = Self::default();

        let collection = lookup("ZONES_COLLECTION")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(defaults.collection);

        let encoding = match lookup("ZONES_ENCODING") {
            Some(value) => value
                .trim()
                .parse::<EncodingProfile>()
                .map_err(|_| RepositoryError::Config {
                    message: format!("ZONES_ENCODING must be redundant or canonical, got '{value}'"),
                })?,
            None => defaults.encoding,
        };

        let list_attempts = match lookup("ZONES_LIST_ATTEMPTS") {
            Some(value) => parse_number("ZONES_LIST_ATTEMPTS", &value)?,
            None => defaults.list_attempts,
        };

        let list_retry_delay = match lookup("ZONES_LIST_RETRY_DELAY_MS") {
            Some(value) => {
                Duration::from_millis(parse_number("ZONES_LIST_RETRY_DELAY_MS", &value)?)
            }
            None => defaults.list_retry_delay,
        };

        Ok(Self {
            collection,
            encoding,
            list_attempts,
            list_retry_delay,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RepositoryError> {
    value.trim().parse().map_err(|_| RepositoryError::Config {
        message: format!("{key} must be a non-negative integer, got '{value}'"),
    })
}

/// Result of listing zones.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneList {
    pub zones: Vec<Zone>,
    /// How many zones were decoded from the fallback shape.
    pub degraded: usize,
}

/// CRUD façade over a [`ZoneStore`].
#[derive(Debug)]
pub struct ZoneRepository<S: ZoneStore> {
    store: S,
    config: RepositoryConfig,
}

impl<S: ZoneStore> ZoneRepository<S> {
    #[must_use]
    pub const fn new(store: S, config: RepositoryConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Loads and decodes every zone.
    ///
    /// Transient store failures are retried with a fixed delay. Records
    /// whose coordinates cannot be decoded come back with the fallback
    /// shape and are counted in [`ZoneList::degraded`].
    ///
    /// # Errors
    ///
    /// Returns the store error once retries are exhausted.
    pub async fn list_zones(&self) -> Result<ZoneList, RepositoryError> {
        let records = retry::with_retry(
            "list zones",
            self.config.list_attempts,
            self.config.list_retry_delay,
            || self.store.fetch_all(&self.config.collection),
        )
        .await?;

        let zones: Vec<Zone> = records
            .iter()
            .map(|stored| decode_zone(&stored.id, &stored.record))
            .collect();
        let degraded = zones.iter().filter(|zone| zone.degraded).count();

        if degraded > 0 {
            log::warn!(
                "{degraded} of {} zones could not be decoded and use a fallback shape",
                zones.len()
            );
        } else {
            log::debug!("Loaded {} zones", zones.len());
        }

        Ok(ZoneList { zones, degraded })
    }

    /// Loads one zone.
    ///
    /// # Errors
    ///
    /// Returns the store error once retries are exhausted.
    pub async fn get_zone(&self, id: &ZoneId) -> Result<Option<Zone>, RepositoryError> {
        let stored = retry::with_retry(
            "get zone",
            self.config.list_attempts,
            self.config.list_retry_delay,
            || self.store.fetch(&self.config.collection, id.as_str()),
        )
        .await?;

        Ok(stored.map(|stored| decode_zone(&stored.id, &stored.record)))
    }

    /// Persists a new zone under a freshly generated id.
    ///
    /// # Errors
    ///
    /// * [`RepositoryError::Validation`] if the draft is invalid; nothing
    ///   is written
    /// * If encoding or the store write fails
    pub async fn create_zone(&self, draft: &ZoneDraft) -> Result<Zone, RepositoryError> {
        draft.validate()?;

        let now = Utc::now();
        let zone = build_zone(ZoneId::generate(), draft, now, now);
        self.write(&zone).await?;

        log::info!(
            "Created zone {} '{}' ({} km²)",
            zone.id,
            zone.name,
            zone.area_km2
        );
        Ok(zone)
    }

    /// Replaces an existing zone with the draft's contents, keeping its
    /// creation time.
    ///
    /// # Errors
    ///
    /// * [`RepositoryError::Validation`] if the draft is invalid
    /// * [`RepositoryError::NotFound`] if `id` does not exist
    /// * If encoding or the store write fails
    pub async fn update_zone(
        &self,
        id: &ZoneId,
        draft: &ZoneDraft,
    ) -> Result<Zone, RepositoryError> {
        draft.validate()?;

        let existing = self
            .get_zone(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;

        let zone = build_zone(id.clone(), draft, existing.created_at, Utc::now());
        self.write(&zone).await?;

        log::info!("Updated zone {} '{}'", zone.id, zone.name);
        Ok(zone)
    }

    /// Deletes a zone. Deleting a missing id succeeds.
    ///
    /// # Errors
    ///
    /// If the store delete fails.
    pub async fn delete_zone(&self, id: &ZoneId) -> Result<(), RepositoryError> {
        self.store
            .delete(&self.config.collection, id.as_str())
            .await?;
        log::info!("Deleted zone {id}");
        Ok(())
    }

    /// Saves a drawing session's draft, creating or updating depending on
    /// whether the draft has been persisted before, then marks the session
    /// committed.
    ///
    /// # Errors
    ///
    /// * [`RepositoryError::Validation`] if the draft is invalid; the
    ///   session keeps its state
    /// * [`RepositoryError::StaleSession`] if the session ended while the
    ///   write was in flight
    /// * Any create or update error
    pub async fn commit_session<T: DrawTool>(
        &self,
        session: &mut DrawingSession<T>,
    ) -> Result<Zone, RepositoryError> {
        let pending = session.prepare_commit()?;

        let zone = if pending.draft.is_new() {
            self.create_zone(&pending.draft).await?
        } else {
            self.update_zone(&pending.draft.id, &pending.draft).await?
        };

        session.finish_commit(&pending.token, zone.id.clone())?;
        Ok(zone)
    }

    async fn write(&self, zone: &Zone) -> Result<(), RepositoryError> {
        let record = encode_zone(zone, self.config.encoding)?;
        self.store
            .upsert(&self.config.collection, zone.id.as_str(), record)
            .await
    }
}

fn build_zone(
    id: ZoneId,
    draft: &ZoneDraft,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
) -> Zone {
    let polygon = Polygon::new(draft.polygon.rings.clone());
    Zone {
        id,
        name: draft.name.trim().to_string(),
        description: draft.description.clone(),
        area_km2: area_km2_for_storage(&polygon),
        polygon,
        color: draft.color.clone(),
        fare_rule_id: draft.fare_rule_id.clone(),
        is_active: draft.is_active,
        surcharge_multiplier: draft.surcharge_multiplier,
        created_at,
        updated_at,
        degraded: false,
    }
}
