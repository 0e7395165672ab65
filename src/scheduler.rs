//! Manager thread (C6) and worker pool (C7).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::node::Node;
use crate::task_queue::TaskQueue;

/// Advisory condition variable the manager waits on and workers signal on
/// completion. Paired with a throwaway `Mutex<()>` purely to satisfy
/// `Condvar`'s API; no state lives in the mutex.
type TaskCond = Arc<(Mutex<()>, Condvar)>;

/// The running manager + worker threads for one pipeline. Dropping this
/// without calling `stop` leaves the threads running; `Context` always
/// routes through `stop` on teardown.
pub struct PipelineHandle {
    shutdown: Arc<AtomicBool>,
    task_queue: Arc<TaskQueue>,
    task_cond: TaskCond,
    manager: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Spawns the manager thread and `worker_count` worker threads over the
    /// given node arena. `nodes` must not be mutated for the lifetime of
    /// the returned handle (enforced by `Context` taking exclusive
    /// ownership of the arena while the pipeline runs).
    pub fn start(nodes: Arc<[Node]>, worker_count: usize) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let task_queue = Arc::new(TaskQueue::new(nodes.len()));
        let task_cond: TaskCond = Arc::new((Mutex::new(()), Condvar::new()));

        log::info!(
            "starting pipeline: {} nodes, {} workers",
            nodes.len(),
            worker_count
        );

        let manager = {
            let nodes = nodes.clone();
            let task_queue = task_queue.clone();
            let task_cond = task_cond.clone();
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name("rivulet-manager".into())
                .spawn(move || manager_loop(nodes, task_queue, task_cond, shutdown))
                .expect("failed to spawn manager thread")
        };

        let workers = (0..worker_count.max(1))
            .map(|i| {
                let nodes = nodes.clone();
                let task_queue = task_queue.clone();
                let task_cond = task_cond.clone();
                let shutdown = shutdown.clone();
                std::thread::Builder::new()
                    .name(format!("rivulet-worker-{i}"))
                    .spawn(move || worker_loop(nodes, task_queue, task_cond, shutdown))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            shutdown,
            task_queue,
            task_cond,
            manager: Some(manager),
            workers,
        }
    }

    /// Signals shutdown, wakes every blocked thread, and joins them all
    /// unconditionally. Returns the node arena so the caller can resume
    /// mutating the graph.
    pub fn stop(mut self) {
        log::info!("stopping pipeline");
        self.shutdown.store(true, Ordering::Release);
        self.task_queue.shutdown();
        {
            let _guard = self.task_cond.0.lock().unwrap();
            self.task_cond.1.notify_all();
        }
        if let Some(manager) = self.manager.take() {
            manager.join().expect("manager thread panicked");
        }
        for worker in self.workers.drain(..) {
            worker.join().expect("worker thread panicked");
        }
    }
}

fn manager_loop(nodes: Arc<[Node]>, task_queue: Arc<TaskQueue>, task_cond: TaskCond, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Acquire) {
        for (index, node) in nodes.iter().enumerate() {
            if !node.try_claim() {
                // Another actor (a worker still running it, or a previous
                // scan pass) already owns this node this round.
                continue;
            }

            if node.all_output_buffers_full() {
                node.release();
                continue;
            }

            let mut ready = true;
            for port in &node.ports {
                if !port.kind.is_input() {
                    continue;
                }
                let Some(upstream) = port.input_from else {
                    continue;
                };
                let child = &nodes[upstream.node];
                if !child.try_claim() {
                    // The producer is mid-run; we can't tell if it's about
                    // to deposit more data, so don't schedule yet.
                    ready = false;
                    break;
                }
                let child_full = child.all_output_buffers_full();
                child.release();
                if !child_full {
                    ready = false;
                    break;
                }
            }

            if !ready {
                node.release();
                continue;
            }

            // Worker clears `being_processed` after `run` completes.
            task_queue.push(index);
        }

        let guard = task_cond.0.lock().unwrap();
        if shutdown.load(Ordering::Acquire) {
            break;
        }
        let _ = task_cond.1.wait(guard).unwrap();
    }
}

fn worker_loop(nodes: Arc<[Node]>, task_queue: Arc<TaskQueue>, task_cond: TaskCond, shutdown: Arc<AtomicBool>) {
    loop {
        let index = match task_queue.pop() {
            Some(index) => index,
            None => break,
        };
        if shutdown.load(Ordering::Acquire) {
            nodes[index].release();
            break;
        }

        nodes[index].run();
        nodes[index].release();

        let _guard = task_cond.0.lock().unwrap();
        task_cond.1.notify_all();
    }
}
