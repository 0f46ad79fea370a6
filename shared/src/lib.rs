#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use capabilities::{
    AccuracyTier, AlertRequest, GeolocationError, GeolocationOperation, GeolocationOutput,
    GeolocationResult, LauncherError, LauncherOperation, LauncherOutput, LauncherResult,
    PermissionStatus, PositionFix, WatchOptions,
};
pub use crux_core::App as CruxApp;

pub const APP_TITLE: &str = "Location Echo";
pub const LOCATION_REQUIRED_MESSAGE: &str = "Please enable precise location to use this app";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong while fetching your location.";
pub const VALUE_PLACEHOLDER: &str = "N/A";
pub const BASELINE_COORDINATE_DECIMALS: usize = 6;
pub const EXTENDED_COORDINATE_DECIMALS: usize = 8;
pub const MAP_ZOOM: u32 = 18;
pub const MAP_TYPE: &str = "roadmap";
pub const WATCH_MIN_INTERVAL_MS: u64 = 5_000;
pub const WATCH_MIN_DISTANCE_M: u32 = 10;

/// A fix the provider should never have reported.
#[derive(Debug, Clone, Error)]
pub enum InvalidFix {
    #[error("fix latitude {0} falls outside -90..=90 degrees")]
    BadLatitude(f64),
    #[error("fix longitude {0} falls outside -180..=180 degrees")]
    BadLongitude(f64),
    #[error("fix coordinates must be finite numbers")]
    NotFinite,
}

/// Terminal outcome of the location acquisition sequence. All four kinds end
/// the sequence for the rest of the session; the user has to restart the app
/// (or change system settings) to re-attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFailure {
    #[error("location services are disabled")]
    ServiceDisabled,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("no position fix available")]
    FixUnavailable,

    #[error("location request failed: {0}")]
    Unknown(String),
}

impl LocationFailure {
    /// Wraps an underlying message verbatim, falling back to a generic
    /// string when the platform gave us nothing usable.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Unknown(GENERIC_FAILURE_MESSAGE.into())
        } else {
            Self::Unknown(message)
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ServiceDisabled => "SERVICE_DISABLED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::FixUnavailable => "FIX_UNAVAILABLE",
            Self::Unknown(_) => "UNKNOWN_FAILURE",
        }
    }

    #[must_use]
    pub const fn alert_title(&self) -> &'static str {
        match self {
            Self::ServiceDisabled => "Location Services Disabled",
            Self::PermissionDenied => "Permission Denied",
            Self::FixUnavailable => "Position Unavailable",
            Self::Unknown(_) => "Location Error",
        }
    }

    #[must_use]
    pub fn alert_message(&self) -> String {
        match self {
            Self::ServiceDisabled => {
                "Location services are disabled. Please enable them in your device settings.".into()
            }
            Self::PermissionDenied => {
                "Location permission was denied. Please allow location access in your device settings."
                    .into()
            }
            Self::FixUnavailable => "Your current position could not be determined.".into(),
            Self::Unknown(message) => message.clone(),
        }
    }

    #[must_use]
    pub fn alert_request(&self) -> AlertRequest {
        AlertRequest::new(self.alert_title(), self.alert_message())
    }

    #[must_use]
    pub const fn terminal_phase(&self) -> AcquisitionPhase {
        match self {
            Self::ServiceDisabled | Self::PermissionDenied | Self::FixUnavailable => {
                AcquisitionPhase::Denied
            }
            Self::Unknown(_) => AcquisitionPhase::Failed,
        }
    }
}

impl From<GeolocationError> for LocationFailure {
    fn from(error: GeolocationError) -> Self {
        match error {
            GeolocationError::ServiceDisabled => Self::ServiceDisabled,
            GeolocationError::PermissionDenied => Self::PermissionDenied,
            GeolocationError::PositionUnavailable | GeolocationError::Timeout => {
                Self::FixUnavailable
            }
            GeolocationError::Platform { message } => Self::unknown(message),
        }
    }
}

#[must_use]
pub fn format_coordinate(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => VALUE_PLACEHOLDER.into(),
    }
}

#[must_use]
pub fn format_accuracy(accuracy_m: Option<f64>) -> String {
    match accuracy_m {
        Some(a) if a.is_finite() && a >= 0.0 => format!("\u{b1}{a:.0}m"),
        _ => VALUE_PLACEHOLDER.into(),
    }
}

/// Embeddable markup for the map view, recomputed for every new fix.
#[must_use]
pub fn map_embed_markup(fix: &PositionFix, api_key: &str) -> String {
    format!(
        "<iframe width=\"100%\" height=\"100%\" frameborder=\"0\" style=\"border:0\" \
         src=\"https://www.google.com/maps/embed/v1/view?key={api_key}&center={lat},{lng}\
&zoom={MAP_ZOOM}&maptype={MAP_TYPE}\" allowfullscreen></iframe>",
        lat = fix.latitude,
        lng = fix.longitude,
    )
}

/// URL handed to the platform opener to show the fix in the native maps app.
#[must_use]
pub fn maps_search_url(fix: &PositionFix) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={lat},{lng}",
        lat = fix.latitude,
        lng = fix.longitude,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    Unrequested,
    Granted,
    Denied,
}

impl PermissionState {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub const fn is_denied(self) -> bool {
        matches!(self, Self::Denied)
    }
}

/// The two shipped renditions of the app. They share one core; the variant
/// only toggles behavior at well-defined points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Baseline,
    #[default]
    Extended,
}

impl Variant {
    /// The baseline rendition never asks the OS whether location services
    /// are switched on before requesting permission.
    #[must_use]
    pub const fn checks_service(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub const fn subscribes_to_updates(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub const fn shows_accuracy(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub const fn embeds_map(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub const fn supports_external_map(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub const fn shows_loading_screen(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub const fn requires_nonblank_draft(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub const fn coordinate_decimals(self) -> usize {
        match self {
            Self::Baseline => BASELINE_COORDINATE_DECIMALS,
            Self::Extended => EXTENDED_COORDINATE_DECIMALS,
        }
    }
}

/// Startup configuration delivered by the shell with [`Event::Started`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StartConfig {
    pub variant: Variant,
    #[serde(default)]
    pub maps_api_key: Option<String>,
}

impl StartConfig {
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            maps_api_key: None,
        }
    }

    #[must_use]
    pub fn with_maps_api_key(mut self, key: impl Into<String>) -> Self {
        self.maps_api_key = Some(key.into());
        self
    }
}

/// Explicit state machine for the acquisition sequence. Capability results
/// arriving in a non-matching phase are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionPhase {
    #[default]
    Idle,
    CheckingService,
    RequestingPermission,
    FetchingFix,
    Acquired,
    Subscribed,
    Denied,
    Failed,
}

impl AcquisitionPhase {
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::CheckingService | Self::RequestingPermission | Self::FetchingFix
        )
    }

    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !self.is_pending()
    }

    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Denied | Self::Failed)
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub variant: Variant,
    pub maps_api_key: Option<String>,
    pub phase: AcquisitionPhase,
    pub permission: PermissionState,
    pub service_enabled: Option<bool>,
    pub fix: Option<PositionFix>,
    pub failure: Option<LocationFailure>,
    pub active_alert: Option<AlertRequest>,
    pub draft_text: String,
    pub committed_echo: String,
}

impl Model {
    /// Coordinates may only be shown when permission is granted, a fix is
    /// present, and the location service is not known to be off.
    #[must_use]
    pub fn location_available(&self) -> bool {
        self.permission.is_granted() && self.fix.is_some() && self.service_enabled != Some(false)
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        if !self.location_available() {
            return false;
        }
        if self.variant.requires_nonblank_draft() {
            !self.draft_text.trim().is_empty()
        } else {
            true
        }
    }

    /// Copies the draft into the committed echo. The draft is deliberately
    /// retained; resubmitting is a no-op producing the same value.
    pub fn commit_draft(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }
        self.committed_echo = self.draft_text.clone();
        true
    }

    /// Each new fix replaces the previous one wholesale.
    pub fn apply_fix(&mut self, fix: PositionFix) {
        self.fix = Some(fix);
    }

    pub fn resolve_failure(&mut self, failure: LocationFailure) -> AlertRequest {
        let request = failure.alert_request();
        self.phase = failure.terminal_phase();
        self.active_alert = Some(request.clone());
        self.failure = Some(failure);
        request
    }

    pub fn dismiss_alert(&mut self) {
        self.active_alert = None;
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Started(StartConfig),
    ServiceChecked(Box<GeolocationResult>),
    PermissionResolved(Box<GeolocationResult>),
    FixResolved(Box<GeolocationResult>),
    WatchFix(Box<GeolocationResult>),
    AlertDismissed,

    DraftChanged { text: String },
    EchoSubmitted,
    OpenInMapsRequested,
    MapsLaunched(Box<LauncherResult>),
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started(_) => "started",
            Self::ServiceChecked(_) => "service_checked",
            Self::PermissionResolved(_) => "permission_resolved",
            Self::FixResolved(_) => "fix_resolved",
            Self::WatchFix(_) => "watch_fix",
            Self::AlertDismissed => "alert_dismissed",
            Self::DraftChanged { .. } => "draft_changed",
            Self::EchoSubmitted => "echo_submitted",
            Self::OpenInMapsRequested => "open_in_maps_requested",
            Self::MapsLaunched(_) => "maps_launched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Loading,
    LocationRequired {
        message: String,
    },
    Position {
        latitude_text: String,
        longitude_text: String,
        accuracy_text: Option<String>,
        map_markup: Option<String>,
        draft_text: String,
        committed_echo: Option<String>,
        submit_enabled: bool,
        can_open_external_map: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub title: String,
    pub screen: Screen,
    pub alert: Option<AlertRequest>,
}

pub mod app {
    use super::*;
    use crate::capabilities::Capabilities;
    use tracing::{debug, info, warn};
    use url::Url;

    #[derive(Default)]
    pub struct App;

    impl App {
        fn resolve_failure(model: &mut Model, caps: &Capabilities, failure: LocationFailure) {
            warn!(code = failure.code(), "location acquisition failed");
            let request = model.resolve_failure(failure);
            caps.alert.show(request, |_| Event::AlertDismissed);
        }

        fn request_permission(model: &mut Model, caps: &Capabilities) {
            model.phase = AcquisitionPhase::RequestingPermission;
            caps.geolocation
                .request_permission(|result| Event::PermissionResolved(Box::new(result)));
        }

        fn position_screen(model: &Model) -> Screen {
            let decimals = model.variant.coordinate_decimals();
            let fix = model.fix.as_ref();

            let accuracy_text = model.variant.shows_accuracy().then(|| {
                format!(
                    "Accuracy: {}",
                    format_accuracy(fix.and_then(|f| f.accuracy_m))
                )
            });

            let map_markup = if model.variant.embeds_map() {
                match (fix, model.maps_api_key.as_deref()) {
                    (Some(fix), Some(key)) => Some(map_embed_markup(fix, key)),
                    _ => None,
                }
            } else {
                None
            };

            Screen::Position {
                latitude_text: format!(
                    "Latitude: {}",
                    format_coordinate(fix.map(|f| f.latitude), decimals)
                ),
                longitude_text: format!(
                    "Longitude: {}",
                    format_coordinate(fix.map(|f| f.longitude), decimals)
                ),
                accuracy_text,
                map_markup,
                draft_text: model.draft_text.clone(),
                committed_echo: (!model.committed_echo.is_empty())
                    .then(|| model.committed_echo.clone()),
                submit_enabled: model.can_submit(),
                can_open_external_map: model.variant.supports_external_map() && fix.is_some(),
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            debug!(event = event.name(), "handling event");

            match event {
                Event::Started(config) => {
                    *model = Model {
                        variant: config.variant,
                        maps_api_key: config.maps_api_key,
                        ..Model::default()
                    };

                    if model.variant.checks_service() {
                        model.phase = AcquisitionPhase::CheckingService;
                        caps.geolocation.check_service_enabled(|result| {
                            Event::ServiceChecked(Box::new(result))
                        });
                    } else {
                        Self::request_permission(model, caps);
                    }

                    caps.render.render();
                }

                Event::ServiceChecked(result) => {
                    if model.phase != AcquisitionPhase::CheckingService {
                        return;
                    }

                    match *result {
                        Ok(output) => match output.service_enabled() {
                            Some(true) => {
                                model.service_enabled = Some(true);
                                Self::request_permission(model, caps);
                            }
                            Some(false) => {
                                model.service_enabled = Some(false);
                                Self::resolve_failure(
                                    model,
                                    caps,
                                    LocationFailure::ServiceDisabled,
                                );
                            }
                            None => Self::resolve_failure(
                                model,
                                caps,
                                LocationFailure::unknown("unexpected geolocation response"),
                            ),
                        },
                        Err(error) => {
                            Self::resolve_failure(model, caps, LocationFailure::from(error));
                        }
                    }

                    caps.render.render();
                }

                Event::PermissionResolved(result) => {
                    if model.phase != AcquisitionPhase::RequestingPermission {
                        return;
                    }

                    match *result {
                        Ok(output) => match output.permission_status() {
                            Some(status) if status.is_granted() => {
                                model.permission = PermissionState::Granted;
                                model.phase = AcquisitionPhase::FetchingFix;
                                caps.geolocation.get_current_position(
                                    AccuracyTier::Best,
                                    |result| Event::FixResolved(Box::new(result)),
                                );
                            }
                            Some(_) => {
                                model.permission = PermissionState::Denied;
                                Self::resolve_failure(
                                    model,
                                    caps,
                                    LocationFailure::PermissionDenied,
                                );
                            }
                            None => Self::resolve_failure(
                                model,
                                caps,
                                LocationFailure::unknown("unexpected geolocation response"),
                            ),
                        },
                        Err(error) => {
                            Self::resolve_failure(model, caps, LocationFailure::from(error));
                        }
                    }

                    caps.render.render();
                }

                Event::FixResolved(result) => {
                    if model.phase != AcquisitionPhase::FetchingFix {
                        return;
                    }

                    match *result {
                        Ok(output) => match output.position() {
                            Some(fix) => match fix.validated() {
                                Ok(fix) => {
                                    info!(
                                        lat = fix.latitude,
                                        lng = fix.longitude,
                                        "initial fix acquired"
                                    );
                                    model.apply_fix(fix);

                                    // The watch is only established once the
                                    // one-shot fetch has resolved.
                                    if model.variant.subscribes_to_updates() {
                                        model.phase = AcquisitionPhase::Subscribed;
                                        caps.geolocation.watch_position(
                                            WatchOptions::default(),
                                            |result| Event::WatchFix(Box::new(result)),
                                        );
                                    } else {
                                        model.phase = AcquisitionPhase::Acquired;
                                    }
                                }
                                Err(error) => {
                                    warn!(error = %error, "provider returned invalid coordinates");
                                    Self::resolve_failure(
                                        model,
                                        caps,
                                        LocationFailure::FixUnavailable,
                                    );
                                }
                            },
                            None => {
                                Self::resolve_failure(model, caps, LocationFailure::FixUnavailable);
                            }
                        },
                        Err(error) => {
                            Self::resolve_failure(model, caps, LocationFailure::from(error));
                        }
                    }

                    caps.render.render();
                }

                Event::WatchFix(result) => {
                    if model.phase != AcquisitionPhase::Subscribed {
                        return;
                    }

                    match *result {
                        Ok(output) => {
                            if let Some(fix) = output.position() {
                                match fix.validated() {
                                    Ok(fix) => {
                                        model.apply_fix(fix);
                                        caps.render.render();
                                    }
                                    Err(error) => {
                                        warn!(error = %error, "ignoring invalid position update");
                                    }
                                }
                            }
                        }
                        Err(error) => {
                            warn!(error = %error, "position update failed");
                        }
                    }
                }

                Event::AlertDismissed => {
                    model.dismiss_alert();
                    caps.render.render();
                }

                Event::DraftChanged { text } => {
                    model.draft_text = text;
                    caps.render.render();
                }

                Event::EchoSubmitted => {
                    if !model.commit_draft() {
                        debug!("echo submission ignored");
                    }
                    caps.render.render();
                }

                Event::OpenInMapsRequested => {
                    if !model.variant.supports_external_map() {
                        return;
                    }
                    let Some(fix) = model.fix else {
                        return;
                    };

                    let url = maps_search_url(&fix);
                    match Url::parse(&url) {
                        Ok(_) => {
                            info!(url = %url, "opening external maps application");
                            caps.launcher
                                .open_url(url, |result| Event::MapsLaunched(Box::new(result)));
                        }
                        Err(error) => {
                            warn!(error = %error, "constructed an invalid maps url");
                        }
                    }
                }

                Event::MapsLaunched(result) => {
                    // Handoff failures are logged, never surfaced to the user.
                    if let Err(error) = *result {
                        warn!(error = %error, "failed to open external maps application");
                    }
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let screen = if model.variant.shows_loading_screen() && model.phase.is_pending() {
                Screen::Loading
            } else if model.location_available() {
                Self::position_screen(model)
            } else {
                Screen::LocationRequired {
                    message: LOCATION_REQUIRED_MESSAGE.into(),
                }
            };

            ViewModel {
                title: APP_TITLE.into(),
                screen,
                alert: model.active_alert.clone(),
            }
        }
    }
}
