//! Bounded MPMC queue of ready node handles (C5).

use std::sync::Mutex;

use crossbeam_channel::{Receiver, RecvError, Sender};

/// A bounded queue of node handles, sized to the node count so `push`
/// never has to report backpressure in normal operation.
///
/// The queue owns the single producer-side `Sender`; `shutdown` drops it,
/// which closes the channel and unblocks every worker parked in `pop`.
pub struct TaskQueue {
    tx: Mutex<Option<Sender<usize>>>,
    rx: Receiver<usize>,
}

impl TaskQueue {
    /// Creates a queue sized to hold every node in the graph at once.
    pub fn new(node_count: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(node_count.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Publishes a ready node handle. Non-blocking; by construction the
    /// queue is at least as large as the graph, so this only fails if the
    /// queue has already been shut down.
    pub fn push(&self, node_index: usize) -> bool {
        match self.tx.lock().unwrap().as_ref() {
            Some(tx) => tx.try_send(node_index).is_ok(),
            None => false,
        }
    }

    /// Blocks until a node handle is available or the queue has been shut
    /// down, in which case `None` is returned.
    pub fn pop(&self) -> Option<usize> {
        match self.rx.recv() {
            Ok(handle) => Some(handle),
            Err(RecvError) => None,
        }
    }

    /// Closes the queue, unblocking every waiter in `pop`. Called once,
    /// from the control thread, during `stop_pipeline`.
    pub fn shutdown(&self) {
        self.tx.lock().unwrap().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop() {
        let q = TaskQueue::new(4);
        assert!(q.push(2));
        assert_eq!(q.pop(), Some(2));
    }

    #[test]
    fn sized_to_node_count_never_blocks_push() {
        let q = TaskQueue::new(3);
        assert!(q.push(0));
        assert!(q.push(1));
        assert!(q.push(2));
    }

    #[test]
    fn shutdown_unblocks_pop() {
        let q = std::sync::Arc::new(TaskQueue::new(2));
        let q2 = q.clone();
        let handle = std::thread::spawn(move || q2.pop());
        std::thread::sleep(std::time::Duration::from_millis(20));
        q.shutdown();
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn push_after_shutdown_fails() {
        let q = TaskQueue::new(2);
        q.shutdown();
        assert!(!q.push(0));
    }
}
