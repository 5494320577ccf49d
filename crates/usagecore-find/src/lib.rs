use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use usagecore_config::{BuilderContext, Direction};
use usagecore_progress::{CancelHandle, Canceled};

pub type FileSet = BTreeSet<PathBuf>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub search_in: FileSet,
    pub search_for: FileSet,
    pub direction: Direction,
}

impl SearchRequest {
    pub fn new(search_in: FileSet, search_for: FileSet, direction: Direction) -> Self {
        Self {
            search_in,
            search_for,
            direction,
        }
    }

    pub fn targets(&self) -> TargetElements {
        let elements = match self.direction {
            Direction::Forward => &self.search_for,
            Direction::Backward => &self.search_in,
        };
        TargetElements {
            elements: elements.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetElements {
    pub elements: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageInfo {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub line_text: String,
    pub target: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUsage {
    pub target: String,
    pub location: String,
    pub preview: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FindError {
    #[error(transparent)]
    Canceled(#[from] Canceled),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dependency search failed: {0}")]
    Failed(String),
    #[error("dependency search panicked: {0}")]
    Panicked(String),
}

impl FindError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FindError::Canceled(_))
    }
}

/// Finds dependency usages between two file sets.
///
/// Implementations must poll `handle` between units of work and return
/// `FindError::Canceled` once it is canceled; nothing else will stop them. They may
/// report progress through `handle.set_text` / `handle.set_fraction`.
pub trait DependencyFinder: Send + Sync {
    fn find_forward(
        &self,
        context: &BuilderContext,
        search_in: &FileSet,
        search_for: &FileSet,
        handle: &CancelHandle,
    ) -> Result<Vec<UsageInfo>, FindError>;

    fn find_backward(
        &self,
        context: &BuilderContext,
        search_for: &FileSet,
        search_in: &FileSet,
        handle: &CancelHandle,
    ) -> Result<Vec<UsageInfo>, FindError>;
}

pub trait ReadIsolation: Send + Sync {
    fn run_read<T>(&self, body: impl FnOnce() -> T) -> T;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoIsolation;

impl ReadIsolation for NoIsolation {
    fn run_read<T>(&self, body: impl FnOnce() -> T) -> T {
        body()
    }
}

pub trait UsageConverter: Send + Sync {
    fn convert(&self, targets: &TargetElements, usages: &[UsageInfo]) -> Vec<DisplayUsage>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainConverter;

impl UsageConverter for PlainConverter {
    fn convert(&self, _targets: &TargetElements, usages: &[UsageInfo]) -> Vec<DisplayUsage> {
        usages
            .iter()
            .map(|usage| DisplayUsage {
                target: file_label(&usage.target),
                location: format!("{}:{}:{}", usage.file.display(), usage.line, usage.column),
                preview: usage.line_text.trim().to_string(),
            })
            .collect()
    }
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn find_usages<F>(
    finder: &F,
    context: &BuilderContext,
    request: &SearchRequest,
    handle: &CancelHandle,
) -> Result<Vec<UsageInfo>, FindError>
where
    F: DependencyFinder + ?Sized,
{
    match request.direction {
        Direction::Forward => {
            finder.find_forward(context, &request.search_in, &request.search_for, handle)
        }
        Direction::Backward => {
            finder.find_backward(context, &request.search_for, &request.search_in, handle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn files(names: &[&str]) -> FileSet {
        names.iter().map(PathBuf::from).collect()
    }

    fn usage(file: &str, line: usize, target: &str) -> UsageInfo {
        UsageInfo {
            file: file.into(),
            line,
            column: 1,
            line_text: format!("  use {target};  "),
            target: target.into(),
        }
    }

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(&'static str, FileSet, FileSet)>>,
    }

    impl DependencyFinder for Recording {
        fn find_forward(
            &self,
            _context: &BuilderContext,
            search_in: &FileSet,
            search_for: &FileSet,
            _handle: &CancelHandle,
        ) -> Result<Vec<UsageInfo>, FindError> {
            self.calls
                .lock()
                .unwrap()
                .push(("forward", search_in.clone(), search_for.clone()));
            Ok(Vec::new())
        }

        fn find_backward(
            &self,
            _context: &BuilderContext,
            search_for: &FileSet,
            search_in: &FileSet,
            _handle: &CancelHandle,
        ) -> Result<Vec<UsageInfo>, FindError> {
            self.calls
                .lock()
                .unwrap()
                .push(("backward", search_for.clone(), search_in.clone()));
            Err(FindError::Failed("boom".into()))
        }
    }

    #[test]
    fn targets_follow_direction() {
        let forward = SearchRequest::new(files(&["f1"]), files(&["f2", "f3"]), Direction::Forward);
        assert_eq!(
            forward.targets().elements,
            vec![PathBuf::from("f2"), PathBuf::from("f3")]
        );

        let backward = SearchRequest {
            direction: Direction::Backward,
            ..forward
        };
        assert_eq!(backward.targets().elements, vec![PathBuf::from("f1")]);
    }

    #[test]
    fn find_usages_dispatches_on_direction() {
        let finder = Recording::default();
        let context = usagecore_config::PanelSettings::default().builder_context();
        let handle = CancelHandle::new(1);

        let forward = SearchRequest::new(files(&["a"]), files(&["b"]), Direction::Forward);
        assert!(find_usages(&finder, &context, &forward, &handle).is_ok());

        let backward = SearchRequest::new(files(&["a"]), files(&["b"]), Direction::Backward);
        assert!(find_usages(&finder, &context, &backward, &handle).is_err());

        let calls = finder.calls.lock().unwrap();
        assert_eq!(calls[0], ("forward", files(&["a"]), files(&["b"])));
        assert_eq!(calls[1], ("backward", files(&["b"]), files(&["a"])));
    }

    #[test]
    fn plain_converter_maps_every_usage() {
        let targets = TargetElements {
            elements: vec!["src/f2.rs".into()],
        };
        let usages = vec![usage("src/f1.rs", 3, "./src/f2.rs"), usage("src/f1.rs", 9, "src/other.rs")];

        let items = PlainConverter.convert(&targets, &usages);
        assert_eq!(
            items,
            vec![
                DisplayUsage {
                    target: "f2.rs".into(),
                    location: "src/f1.rs:3:1".into(),
                    preview: "use ./src/f2.rs;".into(),
                },
                DisplayUsage {
                    target: "other.rs".into(),
                    location: "src/f1.rs:9:1".into(),
                    preview: "use src/other.rs;".into(),
                },
            ]
        );
    }

    #[test]
    fn only_canceled_counts_as_cancellation() {
        assert!(FindError::from(Canceled).is_cancellation());
        assert!(!FindError::Failed("x".into()).is_cancellation());
    }
}
