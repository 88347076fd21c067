use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, error};
use wrtmon_common::config::ProbeConfig;
use wrtmon_common::error::ProbeError;
use wrtmon_common::probe::{ProbeResult, ProbeStats, ProbeTarget};

use super::{Prober, Resolver};

/// A target whose address is known and that is waiting for a worker.
struct Job {
    target: ProbeTarget,
    addr: IpAddr,
}

type WorkQueue = Arc<Mutex<VecDeque<Job>>>;

/// Runs one probe per configured target on a capped pool of blocking workers.
#[derive(Clone)]
pub struct ProbeDispatcher {
    config: Arc<ProbeConfig>,
    prober: Arc<dyn Prober>,
    resolver: Arc<dyn Resolver>,
}

impl ProbeDispatcher {
    pub fn new(config: ProbeConfig, prober: Arc<dyn Prober>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            config: Arc::new(config),
            prober,
            resolver,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Starts a probe round and returns the stream of its results.
    ///
    /// Exactly one result per target is sent, in completion order. The
    /// stream ends once every worker has finished.
    pub fn dispatch(&self) -> UnboundedReceiver<ProbeResult> {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let dispatcher: ProbeDispatcher = self.clone();
        tokio::spawn(async move { dispatcher.run_round(results_tx).await });
        results_rx
    }

    /// Runs a full round and gathers its results.
    pub async fn run(&self) -> Vec<ProbeResult> {
        let mut results_rx = self.dispatch();
        let mut results: Vec<ProbeResult> = Vec::with_capacity(self.config.targets.len());
        while let Some(result) = results_rx.recv().await {
            results.push(result);
        }
        results
    }

    async fn run_round(self, results_tx: UnboundedSender<ProbeResult>) {
        let queue: WorkQueue = Arc::new(Mutex::new(VecDeque::new()));

        for resolved in self.resolve_all().await {
            match resolved {
                Ok(job) => lock(&queue).push_back(job),
                Err(failed) => {
                    let _ = results_tx.send(failed);
                }
            }
        }

        let pending: usize = lock(&queue).len();
        let worker_count: usize = self.config.concurrency.min(pending);
        debug!("probing {pending} targets with {worker_count} workers");

        let mut workers: JoinSet<()> = JoinSet::new();
        for _ in 0..worker_count {
            let queue: WorkQueue = Arc::clone(&queue);
            let prober: Arc<dyn Prober> = Arc::clone(&self.prober);
            let config: Arc<ProbeConfig> = Arc::clone(&self.config);
            let results_tx: UnboundedSender<ProbeResult> = results_tx.clone();
            workers.spawn_blocking(move || {
                while let Some(job) = next_job(&queue) {
                    let result: ProbeResult = probe_job(prober.as_ref(), &config, job);
                    if results_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("probe worker stopped abnormally: {e}");
            }
        }
        // `results_tx` drops here, which closes the stream for the caller.
    }

    /// Resolves every target concurrently, without taking a worker slot.
    async fn resolve_all(&self) -> Vec<Result<Job, ProbeResult>> {
        let lookups = self
            .config
            .targets
            .iter()
            .map(|target| self.resolve_target(target.clone()));
        join_all(lookups).await
    }

    async fn resolve_target(&self, target: ProbeTarget) -> Result<Job, ProbeResult> {
        let addrs: Vec<IpAddr> = match self.resolver.resolve(&target.host).await {
            Ok(addrs) => addrs,
            Err(source) => {
                let error = ProbeError::Resolve {
                    host: target.host.clone(),
                    source,
                };
                return Err(ProbeResult::failed(target, error));
            }
        };

        match addrs.into_iter().find(|addr| target.family.matches(addr)) {
            Some(addr) => Ok(Job { target, addr }),
            None => {
                let error = ProbeError::NoAddress {
                    host: target.host.clone(),
                    family: target.family,
                };
                Err(ProbeResult::failed(target, error))
            }
        }
    }
}

fn lock(queue: &WorkQueue) -> std::sync::MutexGuard<'_, VecDeque<Job>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

fn next_job(queue: &WorkQueue) -> Option<Job> {
    lock(queue).pop_front()
}

fn probe_job(prober: &dyn Prober, config: &ProbeConfig, job: Job) -> ProbeResult {
    let Job { target, addr } = job;
    match prober.probe(addr, config) {
        Ok(rtts) => ProbeResult::ok(target, ProbeStats::from_round_trips(addr, config.count, &rtts)),
        Err(e) => ProbeResult::failed(target, e),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
