use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads created once and reused across the
/// server's lifetime. `ThreadPool::new` is called exactly once, from
/// `Server::listen`, before the accept loop starts, rather than once per
/// accepted connection.
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<Job>>,
}

impl ThreadPool {
    /// Spawns `size` worker threads, each blocking on the shared job
    /// queue. `size` must be non-zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "ThreadPool size must be non-zero");

        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| Worker::new(id, receiver.clone()))
            .collect();

        Self {
            workers,
            sender: Some(sender),
        }
    }

    /// Queues `job` for execution on the next free worker. Never spawns a
    /// new thread; if every worker is busy, `job` waits in the channel.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            if sender.send(Box::new(job)).is_err() {
                log::error!("ThreadPool::execute called after the pool started shutting down");
            }
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Dropping the sender unblocks every worker's `recv`, letting each
        // one exit its loop so `join` below doesn't hang.
        drop(self.sender.take());

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if let Err(err) = handle.join() {
                    log::error!("worker {} panicked while shutting down: {:?}", worker.id, err);
                }
            }
        }
    }
}

struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) -> Self {
        let handle = thread::spawn(move || loop {
            let job = {
                let guard = receiver.lock().unwrap_or_else(|e| e.into_inner());
                guard.recv()
            };
            match job {
                Ok(job) => job(),
                Err(_) => break,
            }
        });

        Self {
            id,
            handle: Some(handle),
        }
    }
}
