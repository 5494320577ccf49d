use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use usagecore_config::BuilderContext;
use usagecore_find::{DependencyFinder, FileSet, FindError, ReadIsolation, UsageInfo};
use usagecore_progress::CancelHandle;

const CANCEL_CHECK_LINES: usize = 256;

/// A usage is any line of a scanned file that mentions a target's file stem.
#[derive(Debug, Default)]
pub(crate) struct TextReferenceFinder;

impl TextReferenceFinder {
    fn scan(
        &self,
        scanned: &FileSet,
        targets: &FileSet,
        handle: &CancelHandle,
    ) -> Result<Vec<UsageInfo>, FindError> {
        let stems: Vec<(String, &PathBuf)> = targets
            .iter()
            .filter_map(|target| {
                let stem = target.file_stem()?.to_string_lossy().into_owned();
                (!stem.is_empty()).then_some((stem, target))
            })
            .collect();

        let total = scanned.len().max(1);
        let mut usages = Vec::new();

        for (index, file) in scanned.iter().enumerate() {
            handle.check_canceled()?;
            handle.set_text(&file.display().to_string());
            handle.set_fraction(index as f64 / total as f64);

            if targets.contains(file) {
                continue;
            }

            let bytes = std::fs::read(file).map_err(|source| FindError::Io {
                path: file.clone(),
                source,
            })?;
            let content = String::from_utf8_lossy(&bytes);

            for (line_index, line) in content.lines().enumerate() {
                if line_index % CANCEL_CHECK_LINES == 0 {
                    handle.check_canceled()?;
                }
                for (stem, target) in &stems {
                    if let Some(offset) = line.find(stem.as_str()) {
                        usages.push(UsageInfo {
                            file: file.clone(),
                            line: line_index + 1,
                            column: line[..offset].chars().count() + 1,
                            line_text: line.to_string(),
                            target: (*target).clone(),
                        });
                    }
                }
            }
        }

        handle.set_fraction(1.0);
        Ok(usages)
    }
}

impl DependencyFinder for TextReferenceFinder {
    fn find_forward(
        &self,
        _context: &BuilderContext,
        search_in: &FileSet,
        search_for: &FileSet,
        handle: &CancelHandle,
    ) -> Result<Vec<UsageInfo>, FindError> {
        self.scan(search_in, search_for, handle)
    }

    fn find_backward(
        &self,
        _context: &BuilderContext,
        search_for: &FileSet,
        search_in: &FileSet,
        handle: &CancelHandle,
    ) -> Result<Vec<UsageInfo>, FindError> {
        self.scan(search_for, search_in, handle)
    }
}

#[derive(Debug, Default)]
pub(crate) struct WorkspaceLock {
    lock: RwLock<()>,
}

impl ReadIsolation for WorkspaceLock {
    fn run_read<T>(&self, body: impl FnOnce() -> T) -> T {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        body()
    }
}
