mod panel;
mod worker;

pub use panel::{run, PanelCollaborators, PanelError, PanelMessage, UsagesPanel};
pub use worker::{WorkerOutcome, WorkerRunner};
