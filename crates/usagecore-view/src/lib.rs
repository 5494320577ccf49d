mod context;
mod debounce;
mod publisher;
mod switcher;

pub use context::{ui_channel, UiHandle, UiQueue};
pub use debounce::Debouncer;
pub use publisher::{ProgressMessages, UiPublisher};
pub use switcher::{
    PanelHost, ProgressView, ResultView, Shown, UsageViewPresentation, ViewFactory, ViewKind,
    ViewSwitcher,
};
