use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{InvalidFix, WATCH_MIN_DISTANCE_M, WATCH_MIN_INTERVAL_MS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Denied,
    DeniedForever,
    WhileInUse,
    Always,
}

impl PermissionStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::WhileInUse | Self::Always)
    }

    #[must_use]
    pub const fn is_denied(self) -> bool {
        matches!(self, Self::Denied | Self::DeniedForever)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    Lowest,
    Low,
    Medium,
    High,
    #[default]
    Best,
    BestForNavigation,
}

/// A single reported geographic position reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    pub timestamp_ms: u64,
}

impl PositionFix {
    #[must_use]
    pub const fn new(
        latitude: f64,
        longitude: f64,
        accuracy_m: Option<f64>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            timestamp_ms,
        }
    }

    /// Checks the coordinate ranges the provider is supposed to guarantee.
    pub fn validated(self) -> Result<Self, InvalidFix> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(InvalidFix::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(InvalidFix::BadLatitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(InvalidFix::BadLongitude(self.longitude));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchOptions {
    pub accuracy: AccuracyTier,
    pub min_interval_ms: u64,
    pub min_distance_m: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: AccuracyTier::Best,
            min_interval_ms: WATCH_MIN_INTERVAL_MS,
            min_distance_m: WATCH_MIN_DISTANCE_M,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "data")]
pub enum GeolocationOperation {
    CheckServiceEnabled,
    RequestPermission,
    GetCurrentPosition { accuracy: AccuracyTier },
    WatchPosition(WatchOptions),
}

impl Operation for GeolocationOperation {
    type Output = GeolocationResult;
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("location services are disabled")]
    ServiceDisabled,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("position could not be determined")]
    PositionUnavailable,

    #[error("location request timed out")]
    Timeout,

    #[error("platform error: {message}")]
    Platform { message: String },
}

impl GeolocationError {
    #[must_use]
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum GeolocationOutput {
    ServiceEnabled(bool),
    PermissionStatus(PermissionStatus),
    Position(PositionFix),
}

impl GeolocationOutput {
    #[must_use]
    pub const fn service_enabled(&self) -> Option<bool> {
        match self {
            Self::ServiceEnabled(enabled) => Some(*enabled),
            _ => None,
        }
    }

    #[must_use]
    pub const fn permission_status(&self) -> Option<PermissionStatus> {
        match self {
            Self::PermissionStatus(status) => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn position(self) -> Option<PositionFix> {
        match self {
            Self::Position(fix) => Some(fix),
            _ => None,
        }
    }
}

#[must_use = "geolocation results must be handled"]
pub type GeolocationResult = Result<GeolocationOutput, GeolocationError>;

#[derive(Debug, Clone)]
pub struct Geolocation<E> {
    context: CapabilityContext<GeolocationOperation, E>,
}

impl<Ev> Capability<Ev> for Geolocation<Ev> {
    type Operation = GeolocationOperation;
    type MappedSelf<MappedEv> = Geolocation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + Copy + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Geolocation::new(self.context.map_event(f))
    }
}

impl<E> Geolocation<E> {
    pub fn new(context: CapabilityContext<GeolocationOperation, E>) -> Self {
        Self { context }
    }

    /// Asks the shell whether the device location service is switched on.
    pub fn check_service_enabled<F>(&self, callback: F)
    where
        F: Fn(GeolocationResult) -> E + Send + Sync + 'static,
    {
        self.context
            .request_from_shell(GeolocationOperation::CheckServiceEnabled, callback);
    }

    /// Requests foreground location permission from the platform.
    pub fn request_permission<F>(&self, callback: F)
    where
        F: Fn(GeolocationResult) -> E + Send + Sync + 'static,
    {
        self.context
            .request_from_shell(GeolocationOperation::RequestPermission, callback);
    }

    /// One-shot position fetch at the given accuracy tier.
    pub fn get_current_position<F>(&self, accuracy: AccuracyTier, callback: F)
    where
        F: Fn(GeolocationResult) -> E + Send + Sync + 'static,
    {
        self.context
            .request_from_shell(GeolocationOperation::GetCurrentPosition { accuracy }, callback);
    }

    /// Subscribes to position updates. The shell delivers a fix whenever the
    /// interval or distance threshold is crossed, whichever triggers first.
    pub fn watch_position<F>(&self, options: WatchOptions, callback: F)
    where
        F: Fn(GeolocationResult) -> E + Send + Sync + 'static,
    {
        self.context
            .stream_from_shell(GeolocationOperation::WatchPosition(options), callback);
    }
}
