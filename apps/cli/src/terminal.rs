use tracing::info;
use usagecore_find::DisplayUsage;
use usagecore_view::{PanelHost, ResultView, Shown, UiHandle, UsageViewPresentation, ViewFactory};
use usagepanel::PanelMessage;

pub(crate) struct TerminalResultView {
    title: String,
    items: Vec<DisplayUsage>,
    released: bool,
}

impl TerminalResultView {
    fn render(&self) {
        println!("{} ({})", self.title, self.items.len());
        for item in &self.items {
            println!("  {:<24} {}  {}", item.target, item.location, item.preview);
        }
    }
}

impl ResultView for TerminalResultView {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        info!(items = self.items.len(), "result view released");
        self.items.clear();
    }
}

#[derive(Debug, Default)]
pub(crate) struct TerminalViews;

impl ViewFactory for TerminalViews {
    type View = TerminalResultView;

    fn create_result_view(
        &self,
        presentation: &UsageViewPresentation,
        items: Vec<DisplayUsage>,
    ) -> TerminalResultView {
        let title = if presentation.targets.is_empty() {
            presentation.code_usages_string.clone()
        } else {
            format!(
                "{} of {}",
                presentation.code_usages_string,
                presentation.targets.join(", ")
            )
        };
        TerminalResultView {
            title,
            items,
            released: false,
        }
    }
}

pub(crate) struct TerminalHost {
    ui: UiHandle<PanelMessage>,
    last_percent: Option<u32>,
}

impl TerminalHost {
    pub(crate) fn new(ui: UiHandle<PanelMessage>) -> Self {
        Self {
            ui,
            last_percent: None,
        }
    }
}

impl PanelHost<TerminalResultView> for TerminalHost {
    fn relayout(&mut self, shown: &Shown<TerminalResultView>) {
        match shown {
            Shown::Placeholder(text) => {
                self.last_percent = None;
                println!("{text}");
            }
            Shown::Progress(progress) => {
                if self.last_percent != Some(progress.percent) {
                    self.last_percent = Some(progress.percent);
                    eprintln!("[{:>2}%] {}", progress.percent, progress.text);
                }
            }
            Shown::Result(view) => {
                view.render();
                self.ui.invoke_later(PanelMessage::Dispose);
            }
            Shown::Canceled(text) => {
                println!("{text}");
                self.ui.invoke_later(PanelMessage::Dispose);
            }
        }
    }
}
