use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use usagecore_config::BuilderContext;
use usagecore_find::{find_usages, DependencyFinder, FindError, ReadIsolation, SearchRequest, UsageInfo};
use usagecore_progress::CancelHandle;

#[derive(Debug)]
pub enum WorkerOutcome {
    Completed { usages: Vec<UsageInfo> },
    Canceled,
}

pub struct WorkerRunner<F: ?Sized, R> {
    finder: Arc<F>,
    isolation: Arc<R>,
    context: BuilderContext,
    runtime: Handle,
}

impl<F, R> WorkerRunner<F, R>
where
    F: DependencyFinder + ?Sized + 'static,
    R: ReadIsolation + 'static,
{
    pub fn new(finder: Arc<F>, isolation: Arc<R>, context: BuilderContext, runtime: Handle) -> Self {
        Self {
            finder,
            isolation,
            context,
            runtime,
        }
    }

    pub fn context(&self) -> &BuilderContext {
        &self.context
    }

    /// `on_settled` runs exactly once, on the worker thread, whatever the finder does.
    pub fn spawn<C>(&self, request: SearchRequest, handle: CancelHandle, on_settled: C) -> JoinHandle<()>
    where
        C: FnOnce(WorkerOutcome) + Send + 'static,
    {
        let finder = self.finder.clone();
        let isolation = self.isolation.clone();
        let context = self.context.clone();
        self.runtime.spawn_blocking(move || {
            let outcome = run_search(&*finder, &*isolation, &context, &request, &handle);
            on_settled(outcome);
        })
    }
}

pub(crate) fn run_search<F, R>(
    finder: &F,
    isolation: &R,
    context: &BuilderContext,
    request: &SearchRequest,
    handle: &CancelHandle,
) -> WorkerOutcome
where
    F: DependencyFinder + ?Sized,
    R: ReadIsolation,
{
    let generation = handle.generation();
    handle.start();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        isolation.run_read(|| find_usages(finder, context, request, handle))
    }))
    .unwrap_or_else(|payload| Err(FindError::Panicked(panic_message(payload))));

    handle.stop();

    let usages = match result {
        Ok(usages) => usages,
        Err(err) if err.is_cancellation() => {
            debug!(generation, "dependency search stopped on cancellation");
            Vec::new()
        }
        Err(err) => {
            error!(generation, error = %err, "dependency search failed");
            Vec::new()
        }
    };

    if handle.is_canceled() {
        WorkerOutcome::Canceled
    } else {
        WorkerOutcome::Completed { usages }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use usagecore_config::{Direction, PanelSettings};
    use usagecore_find::{FileSet, NoIsolation};
    use usagecore_progress::Canceled;

    type Body = dyn Fn(&CancelHandle) -> Result<Vec<UsageInfo>, FindError> + Send + Sync;

    struct FnFinder(Box<Body>);

    impl DependencyFinder for FnFinder {
        fn find_forward(
            &self,
            _context: &BuilderContext,
            _search_in: &FileSet,
            _search_for: &FileSet,
            handle: &CancelHandle,
        ) -> Result<Vec<UsageInfo>, FindError> {
            (self.0)(handle)
        }

        fn find_backward(
            &self,
            _context: &BuilderContext,
            _search_for: &FileSet,
            _search_in: &FileSet,
            _handle: &CancelHandle,
        ) -> Result<Vec<UsageInfo>, FindError> {
            Err(FindError::Failed("backward not scripted".into()))
        }
    }

    #[derive(Default)]
    struct CountingIsolation(AtomicUsize);

    impl ReadIsolation for CountingIsolation {
        fn run_read<T>(&self, body: impl FnOnce() -> T) -> T {
            self.0.fetch_add(1, Ordering::SeqCst);
            body()
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn finder(
        body: impl Fn(&CancelHandle) -> Result<Vec<UsageInfo>, FindError> + Send + Sync + 'static,
    ) -> FnFinder {
        FnFinder(Box::new(body))
    }

    fn usage(line: usize) -> UsageInfo {
        UsageInfo {
            file: "src/f1.rs".into(),
            line,
            column: 1,
            line_text: "use f2;".into(),
            target: "src/f2.rs".into(),
        }
    }

    fn request() -> SearchRequest {
        let search_in: FileSet = [PathBuf::from("src/f1.rs")].into_iter().collect();
        let search_for: FileSet = [PathBuf::from("src/f2.rs")].into_iter().collect();
        SearchRequest::new(search_in, search_for, Direction::Forward)
    }

    fn run(finder: &FnFinder, handle: &CancelHandle) -> WorkerOutcome {
        let context = PanelSettings::default().builder_context();
        run_search(finder, &NoIsolation, &context, &request(), handle)
    }

    #[test]
    fn completed_search_runs_inside_read_isolation() {
        let finder = finder(|handle| {
            handle.set_text("src/f1.rs");
            handle.set_fraction(1.0);
            Ok(vec![usage(1), usage(2)])
        });
        let isolation = CountingIsolation::default();
        let context = PanelSettings::default().builder_context();
        let handle = CancelHandle::new(1);

        let outcome = run_search(&finder, &isolation, &context, &request(), &handle);
        assert!(matches!(outcome, WorkerOutcome::Completed { ref usages } if usages.len() == 2));
        assert_eq!(isolation.0.load(Ordering::SeqCst), 1);
        assert!(!handle.is_running());
    }

    #[test]
    fn canceled_handle_settles_as_canceled() {
        let finder = finder(|handle| {
            handle.cancel();
            handle.check_canceled()?;
            Ok(vec![usage(1)])
        });
        assert!(matches!(run(&finder, &CancelHandle::new(1)), WorkerOutcome::Canceled));
    }

    #[test]
    fn canceled_after_results_still_settles_as_canceled() {
        let finder = finder(|handle| {
            handle.cancel();
            Ok(vec![usage(1)])
        });
        assert!(matches!(run(&finder, &CancelHandle::new(1)), WorkerOutcome::Canceled));
    }

    #[test]
    fn stray_cancellation_signal_is_an_empty_result() {
        let finder = finder(|_| Err(Canceled.into()));
        let outcome = run(&finder, &CancelHandle::new(1));
        assert!(matches!(outcome, WorkerOutcome::Completed { ref usages } if usages.is_empty()));
    }

    #[test]
    fn failure_is_logged_and_becomes_empty_result() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let finder = finder(|_| Err(FindError::Failed("index unavailable".into())));

        let outcome = tracing::subscriber::with_default(subscriber, || {
            run(&finder, &CancelHandle::new(9))
        });

        assert!(matches!(outcome, WorkerOutcome::Completed { ref usages } if usages.is_empty()));
        let log = String::from_utf8_lossy(&captured.0.lock().unwrap()).into_owned();
        assert!(log.contains("dependency search failed"));
        assert!(log.contains("index unavailable"));
    }

    #[test]
    fn panicking_finder_becomes_empty_result() {
        let finder = finder(|_| panic!("finder exploded"));
        let outcome = run(&finder, &CancelHandle::new(1));
        assert!(matches!(outcome, WorkerOutcome::Completed { ref usages } if usages.is_empty()));
    }

    #[tokio::test]
    async fn spawned_worker_settles_exactly_once() {
        let settled = Arc::new(AtomicUsize::new(0));
        let runner = WorkerRunner::new(
            Arc::new(finder(|_| Err(FindError::Failed("boom".into())))),
            Arc::new(NoIsolation),
            PanelSettings::default().builder_context(),
            Handle::current(),
        );

        let counter = settled.clone();
        runner
            .spawn(request(), CancelHandle::new(1), move |outcome| {
                assert!(matches!(outcome, WorkerOutcome::Completed { .. }));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(settled.load(Ordering::SeqCst), 1);
    }
}
