use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum LauncherOperation {
    OpenUrl { url: String },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LauncherError {
    #[error("no application available to handle {url}")]
    NoHandler { url: String },

    #[error("platform error: {message}")]
    Platform { message: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LauncherOutput {
    Opened,
}

#[must_use = "launcher results must be handled"]
pub type LauncherResult = Result<LauncherOutput, LauncherError>;

impl Operation for LauncherOperation {
    type Output = LauncherResult;
}

#[derive(Debug, Clone)]
pub struct Launcher<E> {
    context: CapabilityContext<LauncherOperation, E>,
}

impl<Ev> Capability<Ev> for Launcher<Ev> {
    type Operation = LauncherOperation;
    type MappedSelf<MappedEv> = Launcher<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + Copy + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Launcher::new(self.context.map_event(f))
    }
}

impl<E> Launcher<E> {
    pub fn new(context: CapabilityContext<LauncherOperation, E>) -> Self {
        Self { context }
    }

    /// Hands the URL to the platform's opener (browser, maps app, ...).
    pub fn open_url<F>(&self, url: impl Into<String>, callback: F)
    where
        F: Fn(LauncherResult) -> E + Send + Sync + 'static,
    {
        self.context
            .request_from_shell(LauncherOperation::OpenUrl { url: url.into() }, callback);
    }
}
