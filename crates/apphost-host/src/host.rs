//! In-process container that owns application workers by name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use apphost_core::{
    ApplicationFactory, ApplicationWorker, BuildError, Container, LifecycleObserver, Resolution,
    ResolutionChain, TypeRegistry, WorkerError, WorkerExit, WorkerHandle, WorkerState,
};
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::error::HostError;

/// Point-in-time view of one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationStatus {
    pub name: String,
    pub state: WorkerState,
    pub webapp_path: String,
    pub idle_cycles: u64,
    pub entry_type: Option<&'static str>,
    /// Why the worker terminated, if it failed.
    pub error: Option<String>,
}

/// Result of building every enabled application of a config.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Applications handed to the host.
    pub built: Vec<String>,
    /// Disabled applications.
    pub skipped: Vec<String>,
    /// Applications that failed to build.
    pub failed: Vec<BuildError>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A worker that has terminated, kept for status reporting.
#[derive(Debug)]
struct Finished {
    webapp_path: String,
    idle_cycles: u64,
    entry_type: Option<&'static str>,
    error: Option<String>,
}

/// Builds, starts and stops applications, and owns the shared chain.
///
/// Applications are started in build order and stopped in reverse start
/// order. Each application can be started once.
pub struct Host {
    base_directory: String,
    app_base: String,
    idle_interval: Duration,
    shared_chain: Arc<ResolutionChain>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    order: Vec<String>,
    pending: HashMap<String, ApplicationWorker>,
    running: Vec<WorkerHandle>,
    finished: HashMap<String, Finished>,
}

impl Host {
    /// Create an empty host.
    pub fn new(base_directory: impl Into<String>, app_base: impl Into<String>) -> Self {
        Self {
            base_directory: base_directory.into(),
            app_base: app_base.into(),
            idle_interval: apphost_core::DEFAULT_IDLE_INTERVAL,
            shared_chain: ResolutionChain::shared(),
            observers: Vec::new(),
            order: Vec::new(),
            pending: HashMap::new(),
            running: Vec::new(),
            finished: HashMap::new(),
        }
    }

    /// Create an empty host with the paths and interval of `config`.
    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(config.base_directory.as_str(), config.app_base.as_str())
            .with_idle_interval(config.idle_interval())
    }

    /// Set the idle quantum for workers added from now on.
    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    /// Observe every worker added from now on.
    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build every enabled application of `config`.
    ///
    /// A failing application is reported and skipped; the others are built.
    pub fn build_all(&mut self, config: &HostConfig, types: &TypeRegistry) -> BuildReport {
        let factory = ApplicationFactory::new(types);
        let mut report = BuildReport::default();
        for application in &config.applications {
            if application.disabled {
                report.skipped.push(application.name.clone());
                continue;
            }
            match factory.build(&mut *self, application) {
                Ok(()) => report.built.push(application.name.clone()),
                Err(err) => {
                    warn!(app = %application.name, error = %err, "application not built");
                    report.failed.push(err);
                }
            }
        }
        report
    }

    /// Application names, in build order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of applications with a live worker handle.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|known| known == name)
    }

    /// Start one application.
    pub fn start(&mut self, name: &str) -> Result<(), HostError> {
        if self.handle(name).is_some() || self.finished.contains_key(name) {
            return Err(HostError::AlreadyStarted(name.to_string()));
        }
        let worker = self
            .pending
            .remove(name)
            .ok_or_else(|| HostError::UnknownApplication(name.to_string()))?;
        let webapp_path = worker.webapp_path();
        match worker.start() {
            Ok(handle) => {
                info!(app = name, "application started");
                self.running.push(handle);
                Ok(())
            }
            Err(source) => {
                warn!(app = name, error = %source, "application failed to start");
                let finished = Finished {
                    webapp_path,
                    idle_cycles: 0,
                    entry_type: None,
                    error: Some(source.to_string()),
                };
                self.finished.insert(name.to_string(), finished);
                Err(HostError::Worker {
                    application: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Start every pending application, in build order.
    ///
    /// Returns the names started. Stops at the first failure.
    pub fn start_all(&mut self) -> Result<Vec<String>, HostError> {
        let pending: Vec<String> = self
            .order
            .iter()
            .filter(|name| self.pending.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in &pending {
            self.start(name)?;
        }
        Ok(pending)
    }

    /// Block until `name` is running or terminated, or `timeout` elapses.
    pub fn wait_running(&self, name: &str, timeout: Duration) -> Result<WorkerState, HostError> {
        match self.handle(name) {
            Some(handle) => Ok(handle.wait_for(WorkerState::Running, timeout)),
            None if self.finished.contains_key(name) => Ok(WorkerState::Terminated),
            None => Err(self.not_running(name)),
        }
    }

    /// Block until every started application is running or terminated.
    pub fn wait_all_running(&self, timeout: Duration) -> Vec<(String, WorkerState)> {
        let deadline = Instant::now() + timeout;
        self.running
            .iter()
            .map(|handle| {
                let remaining = deadline.saturating_duration_since(Instant::now());
                (handle.name().to_string(), handle.wait_for(WorkerState::Running, remaining))
            })
            .collect()
    }

    /// Stop one application and wait for its thread.
    pub fn stop(&mut self, name: &str) -> Result<WorkerExit, HostError> {
        let Some(index) = self.running.iter().position(|handle| handle.name() == name) else {
            return Err(self.not_running(name));
        };
        let handle = self.running.remove(index);
        let outcome = self.retire(handle, WorkerHandle::stop);
        outcome.map_err(|source| HostError::Worker {
            application: name.to_string(),
            source,
        })
    }

    /// Stop every running application, in reverse start order.
    pub fn stop_all(&mut self) -> Vec<(String, Result<WorkerExit, WorkerError>)> {
        let mut outcomes = Vec::with_capacity(self.running.len());
        while let Some(handle) = self.running.pop() {
            let name = handle.name().to_string();
            let outcome = self.retire(handle, WorkerHandle::stop);
            outcomes.push((name, outcome));
        }
        outcomes
    }

    /// Collect applications whose threads ended on their own.
    pub fn reap(&mut self) -> Vec<(String, Result<WorkerExit, WorkerError>)> {
        let mut outcomes = Vec::new();
        let mut index = 0;
        while index < self.running.len() {
            if self.running[index].is_finished() {
                let handle = self.running.remove(index);
                let name = handle.name().to_string();
                let outcome = self.retire(handle, WorkerHandle::join);
                outcomes.push((name, outcome));
            } else {
                index += 1;
            }
        }
        outcomes
    }

    /// Status of every application, in build order.
    pub fn status(&self) -> Vec<ApplicationStatus> {
        self.order.iter().filter_map(|name| self.status_of(name)).collect()
    }

    /// Status of one application.
    pub fn status_of(&self, name: &str) -> Option<ApplicationStatus> {
        if let Some(handle) = self.handle(name) {
            return Some(ApplicationStatus {
                name: name.to_string(),
                state: handle.state(),
                webapp_path: handle.webapp_path(),
                idle_cycles: handle.idle_cycles(),
                entry_type: handle.entry_type(),
                error: None,
            });
        }
        if let Some(worker) = self.pending.get(name) {
            return Some(ApplicationStatus {
                name: name.to_string(),
                state: worker.state(),
                webapp_path: worker.webapp_path(),
                idle_cycles: 0,
                entry_type: None,
                error: None,
            });
        }
        self.finished.get(name).map(|finished| ApplicationStatus {
            name: name.to_string(),
            state: WorkerState::Terminated,
            webapp_path: finished.webapp_path.clone(),
            idle_cycles: finished.idle_cycles,
            entry_type: finished.entry_type,
            error: finished.error.clone(),
        })
    }

    /// Resolve a symbol through one running application's own chain.
    pub fn resolve(&self, name: &str, symbol: &str) -> Result<Option<Resolution>, HostError> {
        match self.handle(name) {
            Some(handle) => Ok(handle.resolve(symbol)),
            None => Err(self.not_running(name)),
        }
    }

    /// Resolve a symbol through the shared chain.
    pub fn resolve_shared(&self, symbol: &str) -> Option<Resolution> {
        self.shared_chain.resolve(symbol)
    }

    fn handle(&self, name: &str) -> Option<&WorkerHandle> {
        self.running.iter().find(|handle| handle.name() == name)
    }

    /// The error for an application that has no running handle.
    fn not_running(&self, name: &str) -> HostError {
        if self.pending.contains_key(name) {
            HostError::NotStarted(name.to_string())
        } else if self.finished.contains_key(name) {
            HostError::AlreadyStopped(name.to_string())
        } else {
            HostError::UnknownApplication(name.to_string())
        }
    }

    fn retire(
        &mut self,
        handle: WorkerHandle,
        finish: fn(WorkerHandle) -> Result<WorkerExit, WorkerError>,
    ) -> Result<WorkerExit, WorkerError> {
        let name = handle.name().to_string();
        let webapp_path = handle.webapp_path();
        let entry_type = handle.entry_type();
        let outcome = finish(handle);

        let finished = Finished {
            webapp_path,
            idle_cycles: outcome.as_ref().map_or(0, |exit| exit.idle_cycles),
            entry_type,
            error: outcome.as_ref().err().map(ToString::to_string),
        };
        match &finished.error {
            Some(error) => warn!(app = %name, error = %error, "application terminated abnormally"),
            None => info!(app = %name, cycles = finished.idle_cycles, "application stopped"),
        }
        self.finished.insert(name, finished);
        outcome
    }
}

impl Container for Host {
    fn base_directory(&self) -> &str {
        &self.base_directory
    }

    fn app_base(&self) -> &str {
        &self.app_base
    }

    fn shared_chain(&self) -> Arc<ResolutionChain> {
        Arc::clone(&self.shared_chain)
    }

    fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    fn add_application(&mut self, mut worker: ApplicationWorker) -> Result<(), BuildError> {
        let name = worker.name().to_string();
        if self.contains(&name) {
            return Err(BuildError::DuplicateApplication(name));
        }
        for observer in &self.observers {
            worker.inject_observer(Arc::clone(observer));
        }
        self.order.push(name.clone());
        self.pending.insert(name, worker);
        Ok(())
    }
}
