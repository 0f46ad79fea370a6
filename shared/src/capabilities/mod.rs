mod alert;
mod geolocation;
mod launcher;

pub use self::alert::{Alert, AlertOperation, AlertOutput, AlertRequest, DEFAULT_DISMISS_LABEL};
pub use self::geolocation::{
    AccuracyTier, Geolocation, GeolocationError, GeolocationOperation, GeolocationOutput,
    GeolocationResult, PermissionStatus, PositionFix, WatchOptions,
};
pub use self::launcher::{
    Launcher, LauncherError, LauncherOperation, LauncherOutput, LauncherResult,
};

// Crux's built-in Render capability is all we need for view updates.
pub use crux_core::render::Render;

use crate::Event;

pub type AppGeolocation = Geolocation<Event>;
pub type AppAlert = Alert<Event>;
pub type AppLauncher = Launcher<Event>;
pub type AppRender = Render<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub geolocation: AppGeolocation,
    pub alert: AppAlert,
    pub launcher: AppLauncher,
    pub render: AppRender,
}
