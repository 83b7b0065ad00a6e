use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

static GLOBAL_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// A grow-only pool of worker threads. Workers pull boxed jobs off a shared
/// queue and run each to completion; a panicking job is caught on the worker
/// and resumed on whoever joins its [`TaskHandle`].
#[derive(Debug)]
pub struct ThreadPool {
    sender: Sender<Job>,
    receiver: Arc<Mutex<Receiver<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

/// Completion handle for a pooled task. `join` blocks until the task has run.
#[derive(Debug)]
pub struct TaskHandle<T> {
    result: Receiver<thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Wait for the task and return its result, resuming the task's panic if
    /// it had one.
    pub fn join(self) -> T {
        match self.result.recv() {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => resume_unwind(payload),
            Err(_) => panic!("worker dropped a task before completing it"),
        }
    }
}

impl ThreadPool {
    fn new() -> Self {
        let (sender, receiver) = channel::<Job>();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide pool. Created empty on first use; callers are
    /// expected to `enlarge` it before enqueueing.
    pub fn global() -> &'static ThreadPool {
        GLOBAL_POOL.get_or_init(ThreadPool::new)
    }

    /// Grow the pool to at least `n` workers. The pool never shrinks during
    /// the life of the process.
    pub fn enlarge(&self, n: usize) {
        let mut workers = self.workers.lock().unwrap();
        while workers.len() < n {
            let receiver = Arc::clone(&self.receiver);
            workers.push(thread::spawn(move || loop {
                let job = receiver.lock().unwrap().recv();
                match job {
                    Ok(job) => job(),
                    Err(_) => break,
                }
            }));
        }
    }

    /// Current number of workers.
    pub fn size(&self) -> usize {
        self.workers.lock().unwrap().len()
    }

    /// Run `task` on a pool worker and hand back its completion handle.
    pub fn enqueue<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = channel();
        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(task));
            let _ = tx.send(result);
        });
        self.sender
            .send(job)
            .expect("the worker queue outlives the pool");
        TaskHandle { result: rx }
    }
}

#[cfg(test)]
mod pool_tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_tasks_and_returns_values() {
        let pool = ThreadPool::new();
        pool.enlarge(3);
        assert_eq!(pool.size(), 3);

        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..10usize)
            .map(|i| {
                let counter = Arc::clone(&counter);
                pool.enqueue(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    i * 2
                })
            })
            .collect();
        let mut results: Vec<usize> = handles.into_iter().map(TaskHandle::join).collect();
        results.sort_unstable();
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn enlarge_never_shrinks() {
        let pool = ThreadPool::new();
        pool.enlarge(4);
        pool.enlarge(2);
        assert_eq!(pool.size(), 4);
    }

    #[test]
    #[should_panic(expected = "worker task failed")]
    fn worker_panics_resume_on_join() {
        let pool = ThreadPool::new();
        pool.enlarge(1);
        let handle = pool.enqueue(|| -> () { panic!("worker task failed") });
        handle.join();
    }
}
