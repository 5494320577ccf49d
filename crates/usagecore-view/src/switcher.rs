use tracing::debug;
use usagecore_find::DisplayUsage;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub text: String,
    pub fraction: f64,
    pub percent: u32,
}

impl ProgressView {
    pub fn new(text: String, fraction: f64) -> Self {
        // 0..=99: a running search never shows 100%.
        let percent = (fraction.clamp(0.0, 1.0) * 99.0 + 0.5) as u32;
        Self {
            text,
            fraction,
            percent,
        }
    }
}

impl Default for ProgressView {
    fn default() -> Self {
        Self::new(String::new(), 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageViewPresentation {
    pub code_usages_string: String,
    pub targets: Vec<String>,
}

pub trait ResultView: Send {
    fn item_count(&self) -> usize;
    fn release(&mut self);
}

pub trait ViewFactory: Send + Sync {
    type View: ResultView;

    fn create_result_view(
        &self,
        presentation: &UsageViewPresentation,
        items: Vec<DisplayUsage>,
    ) -> Self::View;
}

pub enum Shown<V> {
    Placeholder(String),
    Progress(ProgressView),
    Result(V),
    Canceled(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Placeholder,
    Progress,
    Result,
    Canceled,
}

impl<V> Shown<V> {
    pub fn kind(&self) -> ViewKind {
        match self {
            Shown::Placeholder(_) => ViewKind::Placeholder,
            Shown::Progress(_) => ViewKind::Progress,
            Shown::Result(_) => ViewKind::Result,
            Shown::Canceled(_) => ViewKind::Canceled,
        }
    }
}

pub trait PanelHost<V>: Send {
    fn relayout(&mut self, shown: &Shown<V>);
}

pub struct ViewSwitcher<V: ResultView, H: PanelHost<V>> {
    slot: Option<Shown<V>>,
    host: H,
    disposed: bool,
}

impl<V: ResultView, H: PanelHost<V>> ViewSwitcher<V, H> {
    pub fn new(host: H) -> Self {
        Self {
            slot: None,
            host,
            disposed: false,
        }
    }

    pub fn show_placeholder(&mut self, text: impl Into<String>) {
        self.install(Shown::Placeholder(text.into()));
    }

    pub fn show_progress(&mut self, view: ProgressView) {
        self.install(Shown::Progress(view));
    }

    pub fn show_result(&mut self, view: V) {
        self.install(Shown::Result(view));
    }

    pub fn show_canceled(&mut self, text: impl Into<String>) {
        self.install(Shown::Canceled(text.into()));
    }

    pub fn update_progress(&mut self, view: ProgressView) -> bool {
        let Some(Shown::Progress(current)) = self.slot.as_mut() else {
            return false;
        };
        *current = view;
        if let Some(shown) = &self.slot {
            self.host.relayout(shown);
        }
        true
    }

    pub fn shown(&self) -> Option<&Shown<V>> {
        self.slot.as_ref()
    }

    pub fn kind(&self) -> Option<ViewKind> {
        self.slot.as_ref().map(Shown::kind)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(Shown::Result(mut view)) = self.slot.take() {
            view.release();
        }
        debug!("view slot disposed");
    }

    fn install(&mut self, next: Shown<V>) {
        if self.disposed {
            if let Shown::Result(mut view) = next {
                view.release();
            }
            return;
        }

        if let Some(Shown::Result(mut previous)) = self.slot.take() {
            previous.release();
        }
        debug!(kind = ?next.kind(), "view installed");
        let shown = self.slot.insert(next);
        self.host.relayout(shown);
    }
}

impl<V: ResultView, H: PanelHost<V>> Drop for ViewSwitcher<V, H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
