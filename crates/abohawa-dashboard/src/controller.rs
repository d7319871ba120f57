//! Display controller: owns the current selection, unit and snapshots, and
//! turns commands into cached, cancellable loads.
//!
//! State sits behind a `parking_lot::Mutex` that is never held across an
//! `.await`. Every load takes a generation number; a continuation whose
//! generation is no longer current drops its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use abohawa_core::Config;
use abohawa_weather::{
    geocode, CacheKey, CascadeSelection, Catalog, Clock, Coordinates, ForecastSnapshot,
    PlaceCandidate, QueryKind, ResultCache, SearchHit, SystemClock, TemperatureUnit,
    ValidationError, WeatherApi, WeatherError, WeatherSnapshot, POPULAR_LOCATIONS,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::prefs::{PreferenceStore, Preferences, SavedLocation};
use crate::view::DashboardView;

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub cache_ttl: Duration,
    pub reverse_geocode_ttl: Duration,
    /// `None` disables auto refresh
    pub refresh_interval: Option<Duration>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            reverse_geocode_ttl: Duration::from_secs(1800),
            refresh_interval: Some(Duration::from_secs(300)),
        }
    }
}

impl DashboardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_ttl: config.weather.cache_ttl(),
            reverse_geocode_ttl: config.weather.reverse_geocode_ttl(),
            refresh_interval: config.weather.refresh_interval(),
        }
    }
}

/// A named point. Coordinates are validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    name: String,
    coordinates: Coordinates,
}

impl Selection {
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: name.into(),
            coordinates: Coordinates::new(latitude, longitude)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    phase: Phase,
    selection: Selection,
    loading: Option<Selection>,
    unit: TemperatureUnit,
    current: Option<WeatherSnapshot>,
    forecast: Option<ForecastSnapshot>,
    last_error: Option<WeatherError>,
    last_updated: Option<DateTime<Utc>>,
}

impl DashboardState {
    fn new(selection: Selection, unit: TemperatureUnit) -> Self {
        Self {
            phase: Phase::Idle,
            selection,
            loading: None,
            unit,
            current: None,
            forecast: None,
            last_error: None,
            last_updated: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last selection that loaded successfully (or the start-up location).
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selection currently being fetched, if any.
    pub fn loading(&self) -> Option<&Selection> {
        self.loading.as_ref()
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn current(&self) -> Option<&WeatherSnapshot> {
        self.current.as_ref()
    }

    pub fn forecast(&self) -> Option<&ForecastSnapshot> {
        self.forecast.as_ref()
    }

    pub fn last_error(&self) -> Option<&WeatherError> {
        self.last_error.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn preferences(&self) -> Preferences {
        Preferences {
            unit: Some(self.unit),
            last_location: Some(SavedLocation {
                name: self.selection.name.clone(),
                latitude: self.selection.coordinates.latitude,
                longitude: self.selection.coordinates.longitude,
            }),
        }
    }
}

/// How a load request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded,
    Failed(WeatherError),
    /// A newer request replaced this one; its result was discarded.
    Superseded,
    /// A load for the same selection was already running; nothing was sent.
    AlreadyInFlight,
    /// The dashboard shut down mid-load.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Loading { name: String },
    Ready { name: String },
    Failed { error: WeatherError },
    UnitChanged(TemperatureUnit),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopularTemperature {
    pub name: &'static str,
    /// `None` when the fetch failed
    pub celsius: Option<f64>,
}

impl PopularTemperature {
    /// `"31°"`, or `"--°"` when unavailable.
    pub fn display(&self, unit: TemperatureUnit) -> String {
        match self.celsius {
            Some(c) => format!("{}°", unit.display_degrees(c)),
            None => "--°".to_string(),
        }
    }
}

enum PlaceName {
    Known(String),
    /// Look the name up from the coordinates.
    Reverse,
}

enum Target {
    /// Reload the last good selection; never displaces a running load.
    Refresh,
    Pick {
        name: PlaceName,
        coordinates: Coordinates,
    },
}

struct Loaded {
    name: String,
    current: WeatherSnapshot,
    forecast: ForecastSnapshot,
}

struct InFlight {
    coordinates: Coordinates,
    token: CancellationToken,
}

struct Shared {
    state: DashboardState,
    generation: u64,
    in_flight: Option<InFlight>,
}

struct Inner<A> {
    api: A,
    catalog: Arc<Catalog>,
    settings: DashboardSettings,
    clock: Arc<dyn Clock>,
    current_cache: ResultCache<WeatherSnapshot>,
    forecast_cache: ResultCache<ForecastSnapshot>,
    place_cache: ResultCache<String>,
    /// One upstream request per cache key at a time.
    fetch_gates: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    prefs: Option<PreferenceStore>,
    shared: Mutex<Shared>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<DashboardEvent>>>,
    shutdown: CancellationToken,
}

/// Cheaply clonable handle; clones share state.
pub struct Dashboard<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Dashboard<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct DashboardBuilder<A> {
    api: A,
    catalog: Option<Arc<Catalog>>,
    settings: DashboardSettings,
    clock: Arc<dyn Clock>,
    prefs: Option<PreferenceStore>,
    initial: Option<Selection>,
    unit: TemperatureUnit,
}

impl<A: WeatherApi> DashboardBuilder<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            catalog: None,
            settings: DashboardSettings::default(),
            clock: Arc::new(SystemClock),
            prefs: None,
            initial: None,
            unit: TemperatureUnit::default(),
        }
    }

    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn settings(mut self, settings: DashboardSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stored unit and last location override the initial values.
    pub fn preferences(mut self, store: PreferenceStore) -> Self {
        self.prefs = Some(store);
        self
    }

    pub fn initial(mut self, selection: Selection, unit: TemperatureUnit) -> Self {
        self.initial = Some(selection);
        self.unit = unit;
        self
    }

    pub fn build(self) -> Result<Dashboard<A>, WeatherError> {
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(Catalog::embedded()?),
        };

        let mut selection = match self.initial {
            Some(selection) => selection,
            None => {
                let dhaka = POPULAR_LOCATIONS[0];
                Selection::new(dhaka.name, dhaka.latitude, dhaka.longitude)?
            }
        };
        let mut unit = self.unit;

        if let Some(store) = &self.prefs {
            let prefs = store.load();
            if let Some(stored) = prefs.unit {
                unit = stored;
            }
            if let Some(saved) = prefs.last_location {
                match Selection::new(saved.name, saved.latitude, saved.longitude) {
                    Ok(restored) => {
                        tracing::info!("Restored last location: {}", restored.name);
                        selection = restored;
                    }
                    Err(e) => tracing::warn!("Ignoring stored location: {}", e),
                }
            }
        }

        let clock = self.clock;
        Ok(Dashboard {
            inner: Arc::new(Inner {
                api: self.api,
                catalog,
                settings: self.settings,
                current_cache: ResultCache::new(clock.clone()),
                forecast_cache: ResultCache::new(clock.clone()),
                place_cache: ResultCache::new(clock.clone()),
                fetch_gates: Mutex::new(HashMap::new()),
                clock,
                prefs: self.prefs,
                shared: Mutex::new(Shared {
                    state: DashboardState::new(selection, unit),
                    generation: 0,
                    in_flight: None,
                }),
                subscribers: Mutex::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
        })
    }
}

impl<A: WeatherApi> Dashboard<A> {
    pub fn builder(api: A) -> DashboardBuilder<A> {
        DashboardBuilder::new(api)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn state(&self) -> DashboardState {
        self.inner.shared.lock().state.clone()
    }

    pub fn view(&self) -> DashboardView {
        let now = self.inner.clock.now();
        DashboardView::from_state(&self.inner.shared.lock().state, now)
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DashboardEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    fn emit(&self, event: DashboardEvent) {
        self.inner
            .subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub async fn select_location(
        &self,
        name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<LoadOutcome, ValidationError> {
        let coordinates = Coordinates::new(latitude, longitude)?;
        Ok(self
            .pick(PlaceName::Known(name.to_string()), coordinates)
            .await)
    }

    /// Load a catalog entry given all three filter levels at once.
    pub async fn select_catalog(
        &self,
        district: &str,
        thana: &str,
        gram: Option<&str>,
    ) -> Result<LoadOutcome, ValidationError> {
        let mut cascade = CascadeSelection::new();
        cascade.set_district(Some(district.to_string()));
        cascade.set_thana(Some(thana.to_string()));
        cascade.set_gram(gram.map(str::to_string));
        self.select_cascade(&cascade).await
    }

    /// Load the entry the cascading filter points at, named by its label.
    pub async fn select_cascade(
        &self,
        cascade: &CascadeSelection,
    ) -> Result<LoadOutcome, ValidationError> {
        let label = cascade.label().unwrap_or_default();
        let location = cascade
            .resolve(&self.inner.catalog)
            .ok_or_else(|| ValidationError::UnknownLocation(label.clone()))?;
        let coordinates = Coordinates::new(location.latitude, location.longitude)?;
        Ok(self.pick(PlaceName::Known(label), coordinates).await)
    }

    /// Load an arbitrary point, naming it by reverse geocoding.
    pub async fn select_point(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<LoadOutcome, ValidationError> {
        let coordinates = Coordinates::new(latitude, longitude)?;
        Ok(self.pick(PlaceName::Reverse, coordinates).await)
    }

    /// Reload the current selection. No-op while any load is running.
    pub async fn refresh(&self) -> LoadOutcome {
        self.load(Target::Refresh).await
    }

    async fn pick(&self, name: PlaceName, coordinates: Coordinates) -> LoadOutcome {
        self.load(Target::Pick { name, coordinates }).await
    }

    pub fn toggle_unit(&self) -> TemperatureUnit {
        let unit = self.inner.shared.lock().state.unit.toggled();
        self.set_unit(unit);
        unit
    }

    /// Display-only: stored values stay Celsius and the phase is untouched.
    pub fn set_unit(&self, unit: TemperatureUnit) {
        let prefs = {
            let mut shared = self.inner.shared.lock();
            shared.state.unit = unit;
            shared.state.preferences()
        };
        tracing::info!("Temperature unit set to {}", unit.symbol());
        self.emit(DashboardEvent::UnitChanged(unit));
        self.persist(&prefs);
    }

    pub fn search_catalog(&self, query: &str) -> Vec<SearchHit> {
        self.inner.catalog.search(query)
    }

    pub async fn search_places(&self, query: &str) -> Result<Vec<PlaceCandidate>, WeatherError> {
        self.inner.api.search(query).await
    }

    /// Current temperature for each popular location, fetched concurrently.
    /// Failures are logged and reported as `None`.
    pub async fn popular_temperatures(&self) -> Vec<PopularTemperature> {
        let mut temps: Vec<PopularTemperature> = POPULAR_LOCATIONS
            .iter()
            .map(|p| PopularTemperature {
                name: p.name,
                celsius: None,
            })
            .collect();

        let mut tasks = JoinSet::new();
        for (index, popular) in POPULAR_LOCATIONS.iter().copied().enumerate() {
            let this = self.clone();
            tasks.spawn(async move {
                let result = match popular.coordinates() {
                    Ok(coords) => this.current_for(coords).await.map(|s| s.temperature),
                    Err(e) => Err(e),
                };
                (index, popular.name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(celsius))) => {
                    if let Some(slot) = temps.get_mut(index) {
                        slot.celsius = Some(celsius);
                    }
                }
                Ok((_, name, Err(e))) => {
                    tracing::warn!("Failed to fetch temperature for {}: {}", name, e);
                }
                // The row keeps `None`.
                Err(e) => tracing::warn!("Popular temperature task failed: {}", e),
            }
        }

        temps
    }

    /// Refresh on the configured interval until `shutdown`.
    pub fn spawn_auto_refresh(&self) -> Option<JoinHandle<()>> {
        let period = self.inner.settings.refresh_interval?;
        let this = self.clone();
        let shutdown = self.inner.shutdown.clone();

        Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let outcome = this.refresh().await;
                        tracing::debug!("Auto refresh finished: {:?}", outcome);
                    }
                }
            }
            tracing::debug!("Auto refresh stopped");
        }))
    }

    /// Cancel any running load and stop auto refresh.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down dashboard");
        self.inner.shutdown.cancel();
    }

    async fn load(&self, target: Target) -> LoadOutcome {
        // Checking and claiming the in-flight slot happen under one lock.
        let (name, coordinates, label, generation, token) = {
            let mut shared = self.inner.shared.lock();
            let (name, coordinates) = match target {
                Target::Refresh => {
                    if shared.in_flight.is_some() {
                        tracing::debug!("Refresh skipped, load already in flight");
                        return LoadOutcome::AlreadyInFlight;
                    }
                    let selection = &shared.state.selection;
                    (
                        PlaceName::Known(selection.name.clone()),
                        selection.coordinates,
                    )
                }
                Target::Pick { name, coordinates } => {
                    if let Some(in_flight) = &shared.in_flight {
                        if in_flight.coordinates == coordinates {
                            tracing::debug!("Load for {:?} already in flight", coordinates);
                            return LoadOutcome::AlreadyInFlight;
                        }
                        in_flight.token.cancel();
                    }
                    (name, coordinates)
                }
            };
            let label = match &name {
                PlaceName::Known(n) => n.clone(),
                PlaceName::Reverse => geocode::fallback_label(coordinates),
            };

            shared.generation += 1;
            let generation = shared.generation;
            let token = self.inner.shutdown.child_token();
            shared.in_flight = Some(InFlight {
                coordinates,
                token: token.clone(),
            });
            shared.state.phase = Phase::Loading;
            shared.state.loading = Some(Selection {
                name: label.clone(),
                coordinates,
            });
            (name, coordinates, label, generation, token)
        };
        self.emit(DashboardEvent::Loading {
            name: label.clone(),
        });

        let fetched = tokio::select! {
            _ = token.cancelled() => None,
            result = self.fetch(name, coordinates) => Some(result),
        };

        let (outcome, event, prefs) = {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                tracing::debug!("Discarding superseded load for {}", label);
                return LoadOutcome::Superseded;
            }
            shared.in_flight = None;
            let state = &mut shared.state;
            state.loading = None;

            let Some(result) = fetched else {
                state.phase = if state.current.is_some() {
                    Phase::Ready
                } else {
                    Phase::Idle
                };
                return LoadOutcome::Cancelled;
            };

            match result {
                Ok(loaded) => {
                    state.selection = Selection {
                        name: loaded.name.clone(),
                        coordinates,
                    };
                    state.current = Some(loaded.current);
                    state.forecast = Some(loaded.forecast);
                    state.last_error = None;
                    state.last_updated = Some(self.inner.clock.now());
                    state.phase = Phase::Ready;
                    tracing::info!("Weather loaded for {}", loaded.name);
                    (
                        LoadOutcome::Loaded,
                        DashboardEvent::Ready { name: loaded.name },
                        Some(state.preferences()),
                    )
                }
                Err(error) => {
                    tracing::error!("Failed to load weather for {}: {}", label, error);
                    state.current = None;
                    state.forecast = None;
                    state.last_error = Some(error.clone());
                    state.phase = Phase::Error;
                    (
                        LoadOutcome::Failed(error.clone()),
                        DashboardEvent::Failed { error },
                        None,
                    )
                }
            }
        };

        self.emit(event);
        if let Some(prefs) = prefs {
            self.persist(&prefs);
        }
        outcome
    }

    /// Both snapshots or nothing; the name lookup never fails the load.
    async fn fetch(&self, name: PlaceName, coords: Coordinates) -> Result<Loaded, WeatherError> {
        let name = async {
            match name {
                PlaceName::Known(n) => n,
                PlaceName::Reverse => self.place_name(coords).await,
            }
        };
        let snapshots = async {
            tokio::try_join!(self.current_for(coords), self.forecast_for(coords))
        };

        let (snapshots, name) = tokio::join!(snapshots, name);
        let (current, forecast) = snapshots?;
        Ok(Loaded {
            name,
            current,
            forecast,
        })
    }

    fn gate(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .fetch_gates
            .lock()
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Cache hit, or one upstream request per key; concurrent callers for
    /// the same key wait for it and read its result from the cache.
    async fn cached<V, F, Fut>(
        &self,
        cache: &ResultCache<V>,
        key: CacheKey,
        fetch: F,
    ) -> Result<V, WeatherError>
    where
        V: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, WeatherError>>,
    {
        if let Some(hit) = cache.get(&key) {
            return Ok(hit);
        }
        let gate = self.gate(&key);
        let _claim = gate.lock().await;
        if let Some(hit) = cache.get(&key) {
            return Ok(hit);
        }

        let value = fetch().await?;
        cache.put(key, value.clone(), self.inner.settings.cache_ttl);
        Ok(value)
    }

    async fn current_for(&self, coords: Coordinates) -> Result<WeatherSnapshot, WeatherError> {
        let key = CacheKey::new(QueryKind::Current, coords);
        self.cached(&self.inner.current_cache, key, || {
            self.inner
                .api
                .fetch_current(coords.latitude, coords.longitude)
        })
        .await
    }

    async fn forecast_for(&self, coords: Coordinates) -> Result<ForecastSnapshot, WeatherError> {
        let key = CacheKey::new(QueryKind::Forecast, coords);
        self.cached(&self.inner.forecast_cache, key, || {
            self.inner
                .api
                .fetch_forecast(coords.latitude, coords.longitude)
        })
        .await
    }

    async fn place_name(&self, coords: Coordinates) -> String {
        let key = CacheKey::new(QueryKind::ReverseGeocode, coords);
        if let Some(name) = self.inner.place_cache.get(&key) {
            return name;
        }
        let gate = self.gate(&key);
        let _claim = gate.lock().await;
        if let Some(name) = self.inner.place_cache.get(&key) {
            return name;
        }
        match self
            .inner
            .api
            .reverse_geocode(coords.latitude, coords.longitude)
            .await
        {
            Ok(Some(name)) => {
                self.inner
                    .place_cache
                    .put(key, name.clone(), self.inner.settings.reverse_geocode_ttl);
                name
            }
            Ok(None) => geocode::fallback_label(coords),
            Err(e) => {
                tracing::warn!("Reverse geocode failed, using coordinates: {}", e);
                geocode::fallback_label(coords)
            }
        }
    }

    fn persist(&self, prefs: &Preferences) {
        if let Some(store) = &self.inner.prefs {
            store.save(prefs);
        }
    }
}
