use std::collections::{HashSet, VecDeque};
use std::env;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use super::compiler::QueryMap;
use super::error::EngineError;
use super::matcher::Matcher;

const NUM_THREADS_ENV_VAR: &str = "WE_API_FINDER_NUM_THREADS";

/// Sentinel recognized only in test builds: a source text equal to this
/// forces the worker processing it to panic, so the crash/retire path can be
/// exercised deterministically without relying on the matcher ever
/// panicking on real data (it's designed not to).
#[cfg(test)]
const INDUCE_PANIC_SOURCE: &str = "__induce_worker_panic_for_test__";

enum Message {
    Task(Task),
    Shutdown,
}

struct Task {
    sources: Vec<String>,
    reply: tokio::sync::oneshot::Sender<Result<HashSet<String>, EngineError>>,
}

struct PoolState {
    workers: Vec<Option<mpsc::Sender<Message>>>,
    /// Count of worker slots currently holding a live sender. Distinct from
    /// `workers.len()`, which only ever grows: slots are reused by index
    /// once a worker retires, so `workers.len()` reflects the high-water
    /// mark of slots ever allocated, not how many are live right now.
    live: usize,
    idle: VecDeque<usize>,
    pending: VecDeque<Task>,
}

/// A bounded pool of OS-thread workers, each an isolated synchronous
/// [`Matcher`] host preloaded with a snapshot of the compiler's queries.
/// Workers are spawned lazily up to `num_threads` and reused from an idle
/// queue before a new one is created. Task dispatch is FIFO; completion is
/// not.
pub struct PoolInner {
    queries: QueryMap,
    num_threads: usize,
    state: Mutex<PoolState>,
}

impl PoolInner {
    pub fn new(queries: QueryMap) -> Arc<Self> {
        Arc::new(Self {
            queries,
            num_threads: resolve_num_threads(),
            state: Mutex::new(PoolState {
                workers: Vec::new(),
                live: 0,
                idle: VecDeque::new(),
                pending: VecDeque::new(),
            }),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Number of workers currently holding a live sender (spawned and not
    /// yet retired), as opposed to the number of slots ever allocated.
    pub fn worker_count(self: &Arc<Self>) -> usize {
        self.state.lock().expect("pool mutex poisoned").live
    }

    pub fn idle_count(self: &Arc<Self>) -> usize {
        self.state.lock().expect("pool mutex poisoned").idle.len()
    }

    /// Enqueues a batch of source texts for matching and returns a receiver
    /// that resolves with the matched query set, or a worker-crash error.
    pub fn submit(
        self: &Arc<Self>,
        sources: Vec<String>,
    ) -> tokio::sync::oneshot::Receiver<Result<HashSet<String>, EngineError>> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        {
            let mut state = self.state.lock().expect("pool mutex poisoned");
            state.pending.push_back(Task { sources, reply: tx });
        }
        self.dispatch();
        rx
    }

    fn dispatch(self: &Arc<Self>) {
        loop {
            let (worker_idx, task, spawn_new) = {
                let mut state = self.state.lock().expect("pool mutex poisoned");
                if state.pending.is_empty() {
                    return;
                }
                match obtain_worker_slot(&mut state, self.num_threads) {
                    Some((idx, spawn_new)) => {
                        let task = state.pending.pop_front().expect("checked non-empty above");
                        (idx, task, spawn_new)
                    }
                    None => return,
                }
            };

            let sender = if spawn_new {
                let (tx, rx) = mpsc::channel::<Message>();
                {
                    let mut state = self.state.lock().expect("pool mutex poisoned");
                    state.workers[worker_idx] = Some(tx.clone());
                }
                let pool = Arc::clone(self);
                thread::spawn(move || worker_loop(pool, worker_idx, rx));
                tx
            } else {
                let state = self.state.lock().expect("pool mutex poisoned");
                state.workers[worker_idx]
                    .clone()
                    .expect("idle worker always has a live sender")
            };

            match sender.send(Message::Task(task)) {
                Ok(()) => {}
                Err(mpsc::SendError(Message::Task(task))) => {
                    // The worker's thread died between being handed out and
                    // receiving the task. Retire it and put the task back at
                    // the front of the queue for the next dispatch pass.
                    let mut state = self.state.lock().expect("pool mutex poisoned");
                    state.workers[worker_idx] = None;
                    state.live -= 1;
                    state.pending.push_front(task);
                }
                Err(mpsc::SendError(Message::Shutdown)) => unreachable!(),
            }
        }
    }

    fn on_worker_idle(self: &Arc<Self>, idx: usize) {
        {
            let mut state = self.state.lock().expect("pool mutex poisoned");
            state.idle.push_back(idx);
        }
        self.dispatch();
    }

    /// Marks a worker's slot as dead without returning it to the idle queue.
    /// `workers[idx]` becomes a respawn opportunity the next time `dispatch`
    /// needs a free worker, rather than permanently consuming one of
    /// `num_threads`' worth of capacity.
    fn on_worker_retired(self: &Arc<Self>, idx: usize) {
        {
            let mut state = self.state.lock().expect("pool mutex poisoned");
            state.workers[idx] = None;
            state.live -= 1;
        }
        self.dispatch();
    }

    /// Terminates every live worker and clears the pool's bookkeeping.
    /// Pending tasks that haven't been dispatched yet are left unresolved;
    /// callers must await all outstanding futures before calling this.
    pub fn shutdown(self: &Arc<Self>) {
        let mut state = self.state.lock().expect("pool mutex poisoned");
        for worker in state.workers.drain(..) {
            if let Some(sender) = worker {
                let _ = sender.send(Message::Shutdown);
            }
        }
        state.live = 0;
        state.idle.clear();
        state.pending.clear();
    }
}

/// Decides which worker slot a pending task should go to: an idle worker if
/// one is waiting, otherwise a fresh slot if the pool has room. Reuses the
/// first retired (`None`) slot by index before growing `workers` — the
/// vector's length is a high-water mark of slots ever allocated, not the
/// live worker count, so a dead slot is always a respawn opportunity rather
/// than permanently lost capacity. Returns `(slot index, needs a new thread)`.
fn obtain_worker_slot(state: &mut PoolState, num_threads: usize) -> Option<(usize, bool)> {
    if let Some(idx) = state.idle.pop_front() {
        return Some((idx, false));
    }
    if state.live < num_threads {
        let idx = match state.workers.iter().position(|w| w.is_none()) {
            Some(idx) => idx,
            None => {
                state.workers.push(None);
                state.workers.len() - 1
            }
        };
        state.live += 1;
        return Some((idx, true));
    }
    None
}

fn worker_loop(pool: Arc<PoolInner>, idx: usize, rx: mpsc::Receiver<Message>) {
    while let Ok(msg) = rx.recv() {
        let task = match msg {
            Message::Shutdown => break,
            Message::Task(task) => task,
        };

        let queries = Arc::clone(&pool.queries);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            #[cfg(test)]
            if task.sources.iter().any(|s| s == INDUCE_PANIC_SOURCE) {
                panic!("induced worker panic for test");
            }

            let mut matcher = Matcher::new(queries);
            for source in task.sources {
                matcher.add_source(source);
            }
            matcher.find_matches();
            matcher.matched_results().clone()
        }));

        match outcome {
            Ok(matched) => {
                let _ = task.reply.send(Ok(matched));
                pool.on_worker_idle(idx);
            }
            Err(panic) => {
                log::warn!("worker {idx} panicked and is being retired: {panic:?}");
                let _ = task.reply.send(Err(EngineError::WorkerCrashed));
                pool.on_worker_retired(idx);
                return;
            }
        }
    }
}

fn resolve_num_threads() -> usize {
    if let Ok(value) = env::var(NUM_THREADS_ENV_VAR) {
        if let Ok(n) = value.parse::<usize>() {
            if n > 0 {
                return n;
            }
        }
        log::warn!("ignoring invalid {NUM_THREADS_ENV_VAR}={value:?}");
    }

    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
