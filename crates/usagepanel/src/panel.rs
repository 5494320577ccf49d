use std::sync::Arc;

use tokio::runtime::{Handle, TryCurrentError};
use tracing::{debug, info, warn};
use usagecore_config::{BuilderContext, PanelSettings};
use usagecore_find::{
    file_label, DependencyFinder, FileSet, ReadIsolation, SearchRequest, TargetElements,
    UsageConverter, UsageInfo,
};
use usagecore_progress::CancelHandle;
use usagecore_view::{
    Debouncer, PanelHost, ProgressMessages, ProgressView, UiHandle, UiPublisher, UiQueue,
    UsageViewPresentation, ViewFactory, ViewKind, ViewSwitcher,
};

use crate::worker::{WorkerOutcome, WorkerRunner};

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("the usages panel needs a running tokio runtime")]
    NoRuntime(#[from] TryCurrentError),
}

#[derive(Debug)]
pub enum PanelMessage {
    RequestSearch {
        search_in: FileSet,
        search_for: FileSet,
    },
    CancelSearch,
    ResetToInitial,
    Dispose,
    DebounceFired {
        epoch: u64,
    },
    ProgressStarted {
        generation: u64,
    },
    ProgressChanged {
        generation: u64,
    },
    WorkerSettled {
        generation: u64,
        outcome: WorkerOutcome,
    },
}

impl ProgressMessages for PanelMessage {
    fn progress_started(generation: u64) -> Self {
        PanelMessage::ProgressStarted { generation }
    }

    fn progress_changed(generation: u64) -> Self {
        PanelMessage::ProgressChanged { generation }
    }
}

pub struct PanelCollaborators<F: ?Sized, R, C, VF> {
    pub finder: Arc<F>,
    pub isolation: Arc<R>,
    pub converter: C,
    pub views: VF,
}

struct ActiveSearch {
    handle: CancelHandle,
    publisher: Arc<UiPublisher<PanelMessage>>,
    targets: TargetElements,
}

pub struct UsagesPanel<F, R, C, VF, H>
where
    F: ?Sized,
    VF: ViewFactory,
    H: PanelHost<VF::View>,
{
    settings: PanelSettings,
    runner: WorkerRunner<F, R>,
    converter: C,
    views: VF,
    switcher: ViewSwitcher<VF::View, H>,
    debouncer: Debouncer<PanelMessage>,
    ui: UiHandle<PanelMessage>,
    pending_request: Option<SearchRequest>,
    current: Option<ActiveSearch>,
    generation: u64,
    started_workers: u64,
    disposed: bool,
}

impl<F, R, C, VF, H> UsagesPanel<F, R, C, VF, H>
where
    F: DependencyFinder + ?Sized + 'static,
    R: ReadIsolation + 'static,
    C: UsageConverter,
    VF: ViewFactory,
    H: PanelHost<VF::View>,
{
    pub fn new(
        settings: PanelSettings,
        collaborators: PanelCollaborators<F, R, C, VF>,
        host: H,
        ui: UiHandle<PanelMessage>,
    ) -> Result<Self, PanelError> {
        let runtime = Handle::try_current()?;
        let PanelCollaborators {
            finder,
            isolation,
            converter,
            views,
        } = collaborators;

        let mut panel = Self {
            runner: WorkerRunner::new(finder, isolation, settings.builder_context(), runtime.clone()),
            settings,
            converter,
            views,
            switcher: ViewSwitcher::new(host),
            debouncer: Debouncer::new(ui.clone(), runtime),
            ui,
            pending_request: None,
            current: None,
            generation: 0,
            started_workers: 0,
            disposed: false,
        };
        panel.reset_to_initial();
        Ok(panel)
    }

    pub fn update(&mut self, message: PanelMessage) {
        match message {
            PanelMessage::RequestSearch {
                search_in,
                search_for,
            } => self.request_search(search_in, search_for),
            PanelMessage::CancelSearch => self.cancel_search(),
            PanelMessage::ResetToInitial => self.reset_to_initial(),
            PanelMessage::Dispose => self.dispose(),
            PanelMessage::DebounceFired { epoch } => {
                if self.debouncer.take_fired(epoch) {
                    self.start_operation();
                } else {
                    debug!(epoch, "ignoring stale debounce fire");
                }
            }
            PanelMessage::ProgressStarted { generation } => {
                let Some(active) = self.current_for(generation) else {
                    return;
                };
                let view = ProgressView::new(active.handle.text(), active.handle.fraction());
                self.switcher.show_progress(view);
            }
            PanelMessage::ProgressChanged { generation } => {
                let Some(active) = self.current_for(generation) else {
                    return;
                };
                let view = active.publisher.drain(&active.handle);
                self.switcher.update_progress(view);
            }
            PanelMessage::WorkerSettled {
                generation,
                outcome,
            } => self.settle(generation, outcome),
        }
    }

    pub fn request_search(&mut self, search_in: FileSet, search_for: FileSet) {
        if self.disposed {
            warn!("search requested on a disposed usages panel");
            return;
        }

        self.supersede_current();
        self.switcher
            .show_placeholder(self.runner.context().initial_usages_position.clone());

        let context = self.runner.context();
        self.pending_request = Some(SearchRequest::new(search_in, search_for, context.direction));
        self.debouncer
            .schedule(self.settings.debounce_delay(), |epoch| {
                PanelMessage::DebounceFired { epoch }
            });
    }

    pub fn reset_to_initial(&mut self) {
        if self.disposed {
            return;
        }
        self.debouncer.cancel_pending();
        self.pending_request = None;
        self.supersede_current();
        self.switcher
            .show_placeholder(self.runner.context().initial_usages_position.clone());
    }

    pub fn cancel_search(&mut self) {
        if self.disposed {
            return;
        }
        if self.debouncer.cancel_pending() {
            self.pending_request = None;
            self.switcher.show_canceled(self.settings.canceled_text.clone());
        }
        if let Some(active) = &self.current {
            active.handle.cancel();
        }
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.debouncer.cancel_pending();
        self.pending_request = None;
        if let Some(active) = self.current.take() {
            active.handle.cancel();
        }
        self.switcher.dispose();
        info!("usages panel disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn context(&self) -> &BuilderContext {
        self.runner.context()
    }

    pub fn view_kind(&self) -> Option<ViewKind> {
        self.switcher.kind()
    }

    pub fn switcher(&self) -> &ViewSwitcher<VF::View, H> {
        &self.switcher
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.current.as_ref().map(|active| active.handle.generation())
    }

    pub fn is_searching(&self) -> bool {
        self.current.is_some() || self.debouncer.is_pending()
    }

    pub fn started_workers(&self) -> u64 {
        self.started_workers
    }

    fn start_operation(&mut self) {
        let Some(request) = self.pending_request.take() else {
            return;
        };

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let publisher = Arc::new(UiPublisher::new(self.ui.clone(), generation));
        let handle = CancelHandle::with_listener(generation, publisher.clone());
        let targets = request.targets();

        let ui = self.ui.clone();
        self.runner
            .spawn(request, handle.clone(), move |outcome| {
                ui.invoke_later(PanelMessage::WorkerSettled {
                    generation,
                    outcome,
                });
            });

        self.current = Some(ActiveSearch {
            handle,
            publisher,
            targets,
        });
        self.started_workers += 1;
        info!(generation, "dependency search started");
    }

    fn settle(&mut self, generation: u64, outcome: WorkerOutcome) {
        if self.current_for(generation).is_none() {
            debug!(generation, "discarding superseded search outcome");
            return;
        }
        let Some(active) = self.current.take() else {
            return;
        };

        match outcome {
            WorkerOutcome::Completed { usages } if !active.handle.is_canceled() => {
                self.show_usages(generation, &active.targets, &usages);
            }
            _ => {
                debug!(generation, "dependency search canceled");
                self.switcher.show_canceled(self.settings.canceled_text.clone());
            }
        }
    }

    fn show_usages(&mut self, generation: u64, targets: &TargetElements, usages: &[UsageInfo]) {
        let items = self.converter.convert(targets, usages);
        let presentation = UsageViewPresentation {
            code_usages_string: self.runner.context().root_node_name.clone(),
            targets: targets.elements.iter().map(|path| file_label(path)).collect(),
        };
        info!(generation, usages = items.len(), "showing dependency usages");
        let view = self.views.create_result_view(&presentation, items);
        self.switcher.show_result(view);
    }

    fn supersede_current(&mut self) {
        if let Some(active) = self.current.take() {
            active.handle.cancel();
            debug!(generation = active.handle.generation(), "search superseded");
        }
    }

    fn current_for(&self, generation: u64) -> Option<&ActiveSearch> {
        self.current
            .as_ref()
            .filter(|active| active.handle.generation() == generation)
    }
}

pub async fn run<F, R, C, VF, H>(
    mut panel: UsagesPanel<F, R, C, VF, H>,
    mut queue: UiQueue<PanelMessage>,
) -> UsagesPanel<F, R, C, VF, H>
where
    F: DependencyFinder + ?Sized + 'static,
    R: ReadIsolation + 'static,
    C: UsageConverter,
    VF: ViewFactory,
    H: PanelHost<VF::View>,
{
    while let Some(message) = queue.recv().await {
        panel.update(message);
        if panel.is_disposed() {
            break;
        }
    }
    panel
}
