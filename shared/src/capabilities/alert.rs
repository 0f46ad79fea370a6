use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DISMISS_LABEL: &str = "OK";

/// A blocking, single-acknowledgement notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertRequest {
    pub title: String,
    pub message: String,
    pub dismiss_label: String,
}

impl AlertRequest {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            dismiss_label: DEFAULT_DISMISS_LABEL.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum AlertOperation {
    Show(AlertRequest),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertOutput {
    Dismissed,
}

impl Operation for AlertOperation {
    type Output = AlertOutput;
}

#[derive(Debug, Clone)]
pub struct Alert<E> {
    context: CapabilityContext<AlertOperation, E>,
}

impl<Ev> Capability<Ev> for Alert<Ev> {
    type Operation = AlertOperation;
    type MappedSelf<MappedEv> = Alert<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + Copy + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Alert::new(self.context.map_event(f))
    }
}

impl<E> Alert<E> {
    pub fn new(context: CapabilityContext<AlertOperation, E>) -> Self {
        Self { context }
    }

    /// Presents a modal alert; the callback fires when the user dismisses it.
    pub fn show<F>(&self, request: AlertRequest, callback: F)
    where
        F: Fn(AlertOutput) -> E + Send + Sync + 'static,
    {
        self.context
            .request_from_shell(AlertOperation::Show(request), callback);
    }
}
