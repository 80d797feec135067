//! Sequential and parallel plan execution.
//!
//! Both modes drive the same [`TopoSorter`]. Sequential execution walks a
//! full static order in one thread. Parallel execution keeps a pool of
//! workers fed with every step whose upstreams have completed; each task
//! carries a snapshot of the session, which is safe because a step is only
//! dispatched once all the results it can read are already in the snapshot.
//!
//! Failure is fail-fast and total: the first step error stops dispatch,
//! tears the pool down, and the run returns `Err`. A failed run never
//! yields a partial session.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use ratekit_core::{Book, Frame};
use ratekit_plan::{Plan, PlanError, Step, StepError};

use crate::config::ExecConfig;
use crate::error::RunError;
use crate::session::Session;

enum Task {
    Run {
        name: String,
        step: Arc<Step>,
        session: Session,
    },
    Shutdown,
}

struct Done {
    name: String,
    result: Result<Frame, StepError>,
}

/// Plan executor. Holds tuning config only; all run state lives in the
/// session it returns.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    cfg: ExecConfig,
}

impl Engine {
    pub fn new(cfg: ExecConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.cfg
    }

    /// Build a custom step whose input inference runs at this engine's
    /// configured probe depth.
    pub fn custom_step(&self, name: impl Into<String>, f: ratekit_plan::CustomFn) -> Step {
        Step::custom_probed(name, f, self.cfg.probe_depth)
    }

    /// Run every step of the plan against the book.
    pub fn run(&self, plan: &Plan, book: Arc<Book>, parallel: bool) -> Result<Session, RunError> {
        if parallel {
            self.run_parallel(plan, book)
        } else {
            self.run_sequential(plan, book)
        }
    }

    pub fn run_sequential(&self, plan: &Plan, book: Arc<Book>) -> Result<Session, RunError> {
        let order = plan.graph().static_order()?;
        let mut session = Session::new(book);
        for name in order {
            let step = plan
                .get(&name)
                .ok_or_else(|| PlanError::UnknownStep(name.clone()))?;
            debug!(step = %name, "evaluating");
            let frame = step
                .evaluate(&session)
                .map_err(|source| RunError::Step {
                    step: name.clone(),
                    source,
                })?;
            session.insert(name, Arc::new(frame));
        }
        Ok(session)
    }

    pub fn run_parallel(&self, plan: &Plan, book: Arc<Book>) -> Result<Session, RunError> {
        let mut sorter = plan.graph();
        sorter.prepare()?;

        let mut session = Session::new(book);
        if !sorter.is_active() {
            return Ok(session);
        }

        let workers = self.worker_count(plan.len());
        let (task_tx, task_rx) = unbounded::<Task>();
        let (done_tx, done_rx) = unbounded::<Done>();

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|i| spawn_worker(i, task_rx.clone(), done_tx.clone()))
            .collect();
        drop(done_tx);

        let poll = Duration::from_millis(self.cfg.poll_timeout_ms);
        let outcome = loop {
            let mut dispatch_failed = None;
            for name in sorter.get_ready() {
                let step = match plan.get(&name) {
                    Some(s) => Arc::clone(s),
                    None => {
                        dispatch_failed = Some(RunError::Plan(PlanError::UnknownStep(name)));
                        break;
                    }
                };
                debug!(step = %name, "dispatching");
                if task_tx
                    .send(Task::Run {
                        name,
                        step,
                        session: session.clone(),
                    })
                    .is_err()
                {
                    dispatch_failed = Some(RunError::Scheduler(
                        "task channel closed mid-run".to_string(),
                    ));
                    break;
                }
            }
            if let Some(err) = dispatch_failed {
                break Err(err);
            }

            match done_rx.recv_timeout(poll) {
                Ok(Done { name, result }) => match result {
                    Ok(frame) => {
                        session.insert(name.clone(), Arc::new(frame));
                        sorter.done(&name);
                        if !sorter.is_active() {
                            break Ok(());
                        }
                    }
                    Err(source) => break Err(RunError::Step { step: name, source }),
                },
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    break Err(RunError::Scheduler(
                        "all workers exited before the run completed".to_string(),
                    ))
                }
            }
        };

        // teardown: in-flight tasks finish, then every worker sees a
        // sentinel and exits; late results are simply not read
        for _ in 0..workers {
            let _ = task_tx.send(Task::Shutdown);
        }
        drop(task_tx);
        drop(done_rx);
        for h in handles {
            let _ = h.join();
        }

        outcome.map(|_| session)
    }

    fn worker_count(&self, steps: usize) -> usize {
        let configured = self.cfg.workers.unwrap_or_else(|| {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        });
        configured.clamp(1, steps.max(1))
    }
}

fn spawn_worker(id: usize, tasks: Receiver<Task>, done: Sender<Done>) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(task) = tasks.recv() {
            let (name, step, session) = match task {
                Task::Run {
                    name,
                    step,
                    session,
                } => (name, step, session),
                Task::Shutdown => break,
            };
            debug!(worker = id, step = %name, "running");
            let result = catch_unwind(AssertUnwindSafe(|| step.evaluate(&session)))
                .unwrap_or_else(|payload| Err(StepError::Panicked(panic_text(payload))));
            if done.send(Done { name, result }).is_err() {
                break;
            }
        }
    })
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
