//! Resident application worker.
//!
//! An [`ApplicationWorker`] is assembled by a factory, then consumed by
//! [`ApplicationWorker::start`], which moves it onto a dedicated thread and
//! returns a [`WorkerHandle`]. On that thread the worker activates its class
//! loaders in reverse insertion order, builds the framework entry object
//! once, and idles until it is stopped.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, info_span, trace};

use crate::bootstrap::{Bootstrap, BootstrapContext, EntryHandle};
use crate::chain::{ChainEntry, ChainWriter, Resolution, ResolutionChain};
use crate::error::WorkerError;
use crate::lifecycle::{LifecycleObserver, StatusCell, WorkerState};
use crate::registry::ClassLoaderRegistry;
use crate::resolver::{ActivationFlags, Resolver};

/// Default idle quantum between keep-alive checks.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Control messages accepted by a running worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Leave the idle loop and terminate.
    Stop,
}

/// Why a worker left its idle loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A `Control::Stop` was received.
    Stopped,
    /// Every handle to the worker was dropped.
    Detached,
}

/// Outcome of a normally terminated worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    /// Why the idle loop ended.
    pub reason: ExitReason,
    /// Idle quanta that elapsed while running.
    pub idle_cycles: u64,
}

/// Name and paths of an application, fixed once the worker starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    name: String,
    base_directory: String,
    app_base: String,
}

impl WorkerIdentity {
    /// Application name, unique across the host.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host install root, with `suffix` appended verbatim if given.
    pub fn base_directory(&self, suffix: Option<&str>) -> String {
        join_suffix(&self.base_directory, suffix)
    }

    /// Root directory of all hosted applications.
    pub fn app_base(&self) -> &str {
        &self.app_base
    }

    /// `app_base + "/" + name`, without separator normalization.
    pub fn webapp_path(&self) -> String {
        webapp_path(&self.app_base, &self.name)
    }
}

fn join_suffix(base: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{base}{suffix}"),
        None => base.to_string(),
    }
}

fn webapp_path(app_base: &str, name: &str) -> String {
    format!("{app_base}/{name}")
}

/// A hosted application, before it is started.
pub struct ApplicationWorker {
    name: Option<String>,
    base_directory: Option<String>,
    app_base: Option<String>,
    class_loaders: ClassLoaderRegistry,
    bootstrap: Arc<dyn Bootstrap>,
    local_chain: Arc<ResolutionChain>,
    shared_chain: Arc<ResolutionChain>,
    idle_interval: Duration,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl ApplicationWorker {
    /// Allocate a worker that will bootstrap through `bootstrap`.
    pub fn new(bootstrap: Arc<dyn Bootstrap>) -> Self {
        Self {
            name: None,
            base_directory: None,
            app_base: None,
            class_loaders: ClassLoaderRegistry::new(),
            bootstrap,
            local_chain: ResolutionChain::shared(),
            shared_chain: ResolutionChain::shared(),
            idle_interval: DEFAULT_IDLE_INTERVAL,
            observers: Vec::new(),
        }
    }

    /// Current lifecycle state. `Configured` once name and app base are set.
    pub fn state(&self) -> WorkerState {
        if self.name.is_some() && self.app_base.is_some() {
            WorkerState::Configured
        } else {
            WorkerState::Constructed
        }
    }

    /// Inject the application name.
    pub fn inject_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Inject the host install root.
    pub fn inject_base_directory(&mut self, base_directory: impl Into<String>) {
        self.base_directory = Some(base_directory.into());
    }

    /// Inject the root directory of all hosted applications.
    pub fn inject_app_base(&mut self, app_base: impl Into<String>) {
        self.app_base = Some(app_base.into());
    }

    /// Replace the class loader registry.
    pub fn inject_class_loaders(&mut self, class_loaders: ClassLoaderRegistry) {
        self.class_loaders = class_loaders;
    }

    /// Share the host-wide resolution chain with this worker.
    pub fn inject_shared_chain(&mut self, shared_chain: Arc<ResolutionChain>) {
        self.shared_chain = shared_chain;
    }

    /// Set the idle quantum.
    pub fn inject_idle_interval(&mut self, idle_interval: Duration) {
        self.idle_interval = idle_interval;
    }

    /// Add a lifecycle observer.
    pub fn inject_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    /// Put a class loader into the registry under `name`.
    pub fn add_class_loader(&mut self, name: impl Into<String>, resolver: Arc<dyn Resolver>) {
        self.class_loaders.put(name, resolver);
    }

    /// Get a class loader by name.
    pub fn class_loader(&self, name: &str) -> Option<&Arc<dyn Resolver>> {
        self.class_loaders.get(name)
    }

    /// The class loader registry.
    pub fn class_loaders(&self) -> &ClassLoaderRegistry {
        &self.class_loaders
    }

    /// Application name, empty until injected.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Host install root with `suffix` appended verbatim if given.
    pub fn base_directory(&self, suffix: Option<&str>) -> String {
        join_suffix(self.base_directory.as_deref().unwrap_or_default(), suffix)
    }

    /// Root directory of all hosted applications, empty until injected.
    pub fn app_base(&self) -> &str {
        self.app_base.as_deref().unwrap_or_default()
    }

    /// `app_base + "/" + name`. Always derived, never stored.
    pub fn webapp_path(&self) -> String {
        webapp_path(self.app_base(), self.name())
    }

    /// The application's own resolution chain.
    pub fn local_chain(&self) -> &Arc<ResolutionChain> {
        &self.local_chain
    }

    /// Bootstrap kind this worker was built with.
    pub fn bootstrap_kind(&self) -> &str {
        self.bootstrap.kind()
    }

    /// Move the worker onto its own thread.
    ///
    /// Consumes the worker, so a worker can be started at most once.
    pub fn start(self) -> Result<WorkerHandle, WorkerError> {
        let identity = WorkerIdentity {
            name: self.name.ok_or(WorkerError::NotConfigured("name"))?,
            base_directory: self.base_directory.unwrap_or_default(),
            app_base: self.app_base.ok_or(WorkerError::NotConfigured("app base"))?,
        };
        let status = Arc::new(StatusCell::new(self.observers));
        let (control_tx, control_rx) = crossbeam_channel::unbounded::<Control>();

        let runner = Runner {
            identity: identity.clone(),
            class_loaders: self.class_loaders,
            bootstrap: self.bootstrap,
            local_chain: Arc::clone(&self.local_chain),
            shared_chain: self.shared_chain,
            idle_interval: self.idle_interval,
            status: Arc::clone(&status),
            entry: None,
        };

        let join = thread::Builder::new()
            .name(format!("apphost-{}", identity.name().replace('\0', "")))
            .spawn(move || runner.run(control_rx))
            .map_err(WorkerError::Spawn)?;

        Ok(WorkerHandle {
            identity,
            control: control_tx,
            status,
            local_chain: self.local_chain,
            join,
        })
    }
}

impl fmt::Debug for ApplicationWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationWorker")
            .field("name", &self.name)
            .field("app_base", &self.app_base)
            .field("bootstrap", &self.bootstrap.kind())
            .field("class_loaders", &self.class_loaders)
            .field("idle_interval", &self.idle_interval)
            .finish()
    }
}

/// The part of a worker that lives on its thread.
struct Runner {
    identity: WorkerIdentity,
    class_loaders: ClassLoaderRegistry,
    bootstrap: Arc<dyn Bootstrap>,
    local_chain: Arc<ResolutionChain>,
    shared_chain: Arc<ResolutionChain>,
    idle_interval: Duration,
    status: Arc<StatusCell>,
    entry: Option<EntryHandle>,
}

impl Runner {
    fn run(mut self, control: Receiver<Control>) -> Result<WorkerExit, WorkerError> {
        let span = info_span!("worker", app = %self.identity.name());
        let _guard = span.enter();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.serve(&control)));
        let result = outcome
            .unwrap_or_else(|payload| Err(WorkerError::Panicked(panic_message(&*payload))));

        let withdrawn = self.shared_chain.withdraw(self.identity.name());
        debug!(withdrawn, "class loaders withdrawn from shared chain");
        self.entry = None;
        self.status
            .transition(self.identity.name(), WorkerState::Terminated);

        match &result {
            Ok(exit) => {
                info!(reason = ?exit.reason, cycles = exit.idle_cycles, "application stopped")
            }
            Err(err) => error!(error = %err, "application terminated abnormally"),
        }
        result
    }

    fn serve(&mut self, control: &Receiver<Control>) -> Result<WorkerExit, WorkerError> {
        self.status
            .transition(self.identity.name(), WorkerState::Activating);
        self.register_class_loaders()?;
        self.bootstrap_entry()?;
        self.status
            .transition(self.identity.name(), WorkerState::Running);
        info!(
            webapp = %self.identity.webapp_path(),
            entry = self.entry.as_ref().map(EntryHandle::type_name).unwrap_or_default(),
            "application running"
        );
        Ok(self.idle(control))
    }

    /// Activate class loaders last-inserted first.
    ///
    /// The whole pass holds the chain writer, so the activation order is the
    /// resulting lookup order: the last-configured loader is consulted first.
    fn register_class_loaders(&self) -> Result<(), WorkerError> {
        let flags = ActivationFlags::PRECEDENCE;
        let mut writer = ChainWriter::open(&self.local_chain, &self.shared_chain);
        for (loader, resolver) in self.class_loaders.entries().rev() {
            resolver
                .activate(flags)
                .map_err(|source| WorkerError::Activation {
                    loader: loader.to_string(),
                    source,
                })?;
            writer.install(
                ChainEntry::new(self.identity.name(), loader, Arc::clone(resolver)),
                flags,
            );
            debug!(loader, kind = resolver.kind(), "class loader registered");
        }
        Ok(())
    }

    fn bootstrap_entry(&mut self) -> Result<(), WorkerError> {
        let webapp_path = self.identity.webapp_path();
        let ctx = BootstrapContext {
            name: self.identity.name(),
            webapp_path: &webapp_path,
            chain: &self.local_chain,
        };
        let entry = self.bootstrap.build_entry(&ctx)?;
        self.status.set_entry_type(entry.type_name());
        self.entry = Some(entry);
        Ok(())
    }

    // Keep-alive only. Requests are not dispatched here.
    fn idle(&self, control: &Receiver<Control>) -> WorkerExit {
        loop {
            match control.recv_timeout(self.idle_interval) {
                Ok(Control::Stop) => return self.exit(ExitReason::Stopped),
                Err(RecvTimeoutError::Timeout) => {
                    let cycles = self.status.tick();
                    trace!(cycles, "idle");
                }
                Err(RecvTimeoutError::Disconnected) => return self.exit(ExitReason::Detached),
            }
        }
    }

    fn exit(&self, reason: ExitReason) -> WorkerExit {
        WorkerExit {
            reason,
            idle_cycles: self.status.idle_cycles(),
        }
    }
}

/// Handle to a started worker.
///
/// Dropping the handle detaches the worker: it notices on its next idle
/// check and terminates on its own.
pub struct WorkerHandle {
    identity: WorkerIdentity,
    control: Sender<Control>,
    status: Arc<StatusCell>,
    local_chain: Arc<ResolutionChain>,
    join: JoinHandle<Result<WorkerExit, WorkerError>>,
}

impl WorkerHandle {
    /// Name and paths of the application.
    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Application name.
    pub fn name(&self) -> &str {
        self.identity.name()
    }

    /// Host install root, with `suffix` appended verbatim if given.
    pub fn base_directory(&self, suffix: Option<&str>) -> String {
        self.identity.base_directory(suffix)
    }

    /// Root directory of all hosted applications.
    pub fn app_base(&self) -> &str {
        self.identity.app_base()
    }

    /// Derived webapp path.
    pub fn webapp_path(&self) -> String {
        self.identity.webapp_path()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.status.state()
    }

    /// Idle quanta elapsed so far.
    pub fn idle_cycles(&self) -> u64 {
        self.status.idle_cycles()
    }

    /// Type name of the entry object, once built.
    pub fn entry_type(&self) -> Option<&'static str> {
        self.status.entry_type()
    }

    /// Whether the worker thread has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// The application's own resolution chain.
    pub fn local_chain(&self) -> &Arc<ResolutionChain> {
        &self.local_chain
    }

    /// Resolve a symbol through the application's own chain.
    pub fn resolve(&self, symbol: &str) -> Option<Resolution> {
        self.local_chain.resolve(symbol)
    }

    /// Block until `target` or `Terminated` is reached, or `timeout` elapses.
    /// Returns the state observed last.
    pub fn wait_for(&self, target: WorkerState, timeout: Duration) -> WorkerState {
        self.status.wait_for(target, timeout)
    }

    /// Signal the worker to stop and wait for its thread.
    pub fn stop(self) -> Result<WorkerExit, WorkerError> {
        if self.control.send(Control::Stop).is_err() {
            debug!(app = self.name(), "worker already gone");
        }
        self.join()
    }

    /// Wait for the worker thread without signalling it.
    pub fn join(self) -> Result<WorkerExit, WorkerError> {
        self.join
            .join()
            .unwrap_or_else(|payload| Err(WorkerError::Panicked(panic_message(&*payload))))
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .field("idle_cycles", &self.idle_cycles())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    use crate::bootstrap::BootstrapError;
    use crate::resolver::{Definition, ResolverError};

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Debug)]
    struct Recording {
        tag: &'static str,
        symbols: &'static [&'static str],
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Resolver for Recording {
        fn kind(&self) -> &str {
            "recording"
        }

        fn resolve(&self, symbol: &str) -> Option<Definition> {
            self.symbols
                .iter()
                .any(|s| *s == symbol)
                .then(|| Definition::new(symbol, format!("{}/{}", self.tag, symbol)))
        }

        fn activate(&self, flags: ActivationFlags) -> Result<(), ResolverError> {
            assert_eq!(flags, ActivationFlags::PRECEDENCE);
            self.log.lock().unwrap().push(self.tag);
            if self.fail {
                return Err(ResolverError::Activation("boom".into()));
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    enum Outcome {
        #[default]
        Succeed,
        Fail,
        Panic,
    }

    #[derive(Debug, Default)]
    struct CountingBootstrap {
        calls: AtomicUsize,
        outcome: Outcome,
        seen_path: Mutex<Option<String>>,
    }

    impl Bootstrap for CountingBootstrap {
        fn kind(&self) -> &str {
            "counting"
        }

        fn build_entry(&self, ctx: &BootstrapContext<'_>) -> Result<EntryHandle, BootstrapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_path.lock().unwrap() = Some(ctx.webapp_path.to_string());
            match self.outcome {
                Outcome::Succeed => Ok(EntryHandle::new(ctx.chain.len())),
                Outcome::Fail => Err(BootstrapError::MissingWebapp(ctx.webapp_path.into())),
                Outcome::Panic => panic!("framework exploded"),
            }
        }
    }

    fn bootstrap(outcome: Outcome) -> Arc<CountingBootstrap> {
        Arc::new(CountingBootstrap {
            outcome,
            ..Default::default()
        })
    }

    fn configured(name: &str, bootstrap: Arc<CountingBootstrap>) -> ApplicationWorker {
        let mut worker = ApplicationWorker::new(bootstrap);
        worker.inject_name(name);
        worker.inject_base_directory("/opt/appserver");
        worker.inject_app_base("/opt/apps");
        worker.inject_idle_interval(Duration::from_millis(5));
        worker
    }

    fn recording(
        tag: &'static str,
        symbols: &'static [&'static str],
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn Resolver> {
        Arc::new(Recording {
            tag,
            symbols,
            log: Arc::clone(log),
            fail: false,
        })
    }

    // === Identity and paths ===

    #[test]
    fn test_webapp_path_is_plain_concatenation() {
        let worker = configured("shop", bootstrap(Outcome::Succeed));
        assert_eq!(worker.webapp_path(), "/opt/apps/shop");
    }

    #[test]
    fn test_webapp_path_keeps_duplicate_separators() {
        let worker = configured("/shop", bootstrap(Outcome::Succeed));
        assert_eq!(worker.webapp_path(), "/opt/apps//shop");
    }

    #[test]
    fn test_webapp_path_follows_injection() {
        let mut worker = configured("shop", bootstrap(Outcome::Succeed));
        worker.inject_app_base("/srv");
        worker.inject_name("blog");
        assert_eq!(worker.webapp_path(), "/srv/blog");
    }

    #[test]
    fn test_base_directory_suffix() {
        let worker = configured("shop", bootstrap(Outcome::Succeed));
        assert_eq!(worker.base_directory(None), "/opt/appserver");
        assert_eq!(worker.base_directory(Some("/etc")), "/opt/appserver/etc");
        assert_eq!(worker.base_directory(Some("etc")), "/opt/appserveretc");
    }

    #[test]
    fn test_state_constructed_until_configured() {
        let mut worker = ApplicationWorker::new(bootstrap(Outcome::Succeed));
        assert_eq!(worker.state(), WorkerState::Constructed);
        worker.inject_name("shop");
        assert_eq!(worker.state(), WorkerState::Constructed);
        worker.inject_app_base("");
        assert_eq!(worker.state(), WorkerState::Configured);
    }

    #[test]
    fn test_start_requires_configuration() {
        let worker = ApplicationWorker::new(bootstrap(Outcome::Succeed));
        let err = worker.start().unwrap_err();
        assert!(matches!(err, WorkerError::NotConfigured("name")));
    }

    // === Activation ===

    #[test]
    fn test_activation_runs_in_reverse_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut worker = configured("shop", bootstrap(Outcome::Succeed));
        worker.add_class_loader("a", recording("A", &[], &log));
        worker.add_class_loader("b", recording("B", &["Shared"], &log));
        worker.add_class_loader("c", recording("C", &["Shared"], &log));

        let handle = worker.start().unwrap();
        assert_eq!(handle.wait_for(WorkerState::Running, WAIT), WorkerState::Running);

        assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);
        let order: Vec<String> = handle
            .local_chain()
            .order()
            .into_iter()
            .map(|(_, loader)| loader)
            .collect();
        assert_eq!(order, vec!["c", "b", "a"]);

        let hit = handle.resolve("Shared").unwrap();
        assert_eq!(hit.loader, "c");
        assert_eq!(hit.definition.location, std::path::PathBuf::from("C/Shared"));

        handle.stop().unwrap();
    }

    #[test]
    fn test_shared_chain_populated_then_withdrawn() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = ResolutionChain::shared();
        let mut worker = configured("shop", bootstrap(Outcome::Succeed));
        worker.inject_shared_chain(Arc::clone(&shared));
        worker.add_class_loader("a", recording("A", &["Only"], &log));
        worker.add_class_loader("b", recording("B", &[], &log));

        let handle = worker.start().unwrap();
        handle.wait_for(WorkerState::Running, WAIT);
        assert_eq!(shared.len(), 2);
        assert_eq!(shared.resolve("Only").map(|r| r.application).as_deref(), Some("shop"));

        handle.stop().unwrap();
        assert!(shared.is_empty());
    }

    #[derive(Debug)]
    struct Slow;

    impl Resolver for Slow {
        fn kind(&self) -> &str {
            "slow"
        }

        fn resolve(&self, _symbol: &str) -> Option<Definition> {
            None
        }

        fn activate(&self, _flags: ActivationFlags) -> Result<(), ResolverError> {
            thread::sleep(Duration::from_millis(2));
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_activation_keeps_passes_contiguous() {
        const WORKERS: usize = 8;
        const LOADERS: usize = 5;

        let shared = ResolutionChain::shared();
        let handles: Vec<WorkerHandle> = (0..WORKERS)
            .map(|i| {
                let mut worker = configured(&format!("app{i}"), bootstrap(Outcome::Succeed));
                worker.inject_shared_chain(Arc::clone(&shared));
                for j in 0..LOADERS {
                    worker.add_class_loader(format!("l{j}"), Arc::new(Slow));
                }
                worker.start().unwrap()
            })
            .collect();
        for handle in &handles {
            assert_eq!(handle.wait_for(WorkerState::Running, WAIT), WorkerState::Running);
        }

        let owners: Vec<String> = shared.entries().into_iter().map(|e| e.application).collect();
        assert_eq!(owners.len(), WORKERS * LOADERS);
        let switches = owners.windows(2).filter(|pair| pair[0] != pair[1]).count();
        assert_eq!(switches, WORKERS - 1);

        for handle in handles {
            handle.stop().unwrap();
        }
        assert!(shared.is_empty());
    }

    #[test]
    fn test_activation_failure_is_fatal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let counting = bootstrap(Outcome::Succeed);
        let mut worker = configured("shop", Arc::clone(&counting));
        worker.add_class_loader("good", recording("G", &[], &log));
        worker.add_class_loader(
            "broken",
            Arc::new(Recording {
                tag: "X",
                symbols: &[],
                log: Arc::clone(&log),
                fail: true,
            }),
        );

        let handle = worker.start().unwrap();
        assert_eq!(handle.wait_for(WorkerState::Running, WAIT), WorkerState::Terminated);

        let err = handle.join().unwrap_err();
        assert!(matches!(err, WorkerError::Activation { ref loader, .. } if loader == "broken"));
        assert!(err.is_fatal());
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), vec!["X"]);
    }

    // === Bootstrap ===

    #[test]
    fn test_bootstrap_runs_once_with_webapp_path() {
        let counting = bootstrap(Outcome::Succeed);
        let handle = configured("shop", Arc::clone(&counting)).start().unwrap();
        handle.wait_for(WorkerState::Running, WAIT);

        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            counting.seen_path.lock().unwrap().as_deref(),
            Some("/opt/apps/shop")
        );
        assert_eq!(handle.entry_type(), Some("usize"));

        handle.stop().unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bootstrap_failure_is_fatal() {
        let handle = configured("shop", bootstrap(Outcome::Fail)).start().unwrap();
        let err = handle.join().unwrap_err();
        assert!(matches!(err, WorkerError::Bootstrap(BootstrapError::MissingWebapp(_))));
    }

    #[test]
    fn test_bootstrap_panic_is_reported() {
        let handle = configured("shop", bootstrap(Outcome::Panic)).start().unwrap();
        let state = handle.wait_for(WorkerState::Terminated, WAIT);
        assert_eq!(state, WorkerState::Terminated);

        let err = handle.join().unwrap_err();
        assert!(matches!(err, WorkerError::Panicked(ref msg) if msg == "framework exploded"));
    }

    // === Idle loop ===

    #[test]
    fn test_running_worker_survives_idle_cycles() {
        let handle = configured("shop", bootstrap(Outcome::Succeed)).start().unwrap();
        handle.wait_for(WorkerState::Running, WAIT);

        let deadline = Instant::now() + WAIT;
        while handle.idle_cycles() < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.idle_cycles() >= 5);
        assert_eq!(handle.state(), WorkerState::Running);
        assert!(!handle.is_finished());

        let exit = handle.stop().unwrap();
        assert_eq!(exit.reason, ExitReason::Stopped);
        assert!(exit.idle_cycles >= 5);
    }

    #[test]
    fn test_dropped_handle_detaches_worker() {
        #[derive(Default)]
        struct Terminated(Mutex<bool>);

        impl LifecycleObserver for Terminated {
            fn on_transition(&self, _application: &str, _from: WorkerState, to: WorkerState) {
                if to == WorkerState::Terminated {
                    *self.0.lock().unwrap() = true;
                }
            }
        }

        let observer = Arc::new(Terminated::default());
        let mut worker = configured("shop", bootstrap(Outcome::Succeed));
        worker.inject_observer(observer.clone());
        let handle = worker.start().unwrap();
        handle.wait_for(WorkerState::Running, WAIT);
        drop(handle);

        let deadline = Instant::now() + WAIT;
        while !*observer.0.lock().unwrap() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(*observer.0.lock().unwrap());
    }

    // === Isolation ===

    #[test]
    fn test_workers_do_not_share_chains() {
        let first = configured("shop", bootstrap(Outcome::Succeed));
        let second = configured("shop", bootstrap(Outcome::Succeed));

        assert!(!Arc::ptr_eq(first.local_chain(), second.local_chain()));
        assert_eq!(first.webapp_path(), second.webapp_path());
    }
}
