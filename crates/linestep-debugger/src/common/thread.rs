use indexmap::IndexMap;

/// State of a traced thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    /// The thread is stopped and waits to be resumed.
    Stopped,

    /// The thread was resumed (continued or single-stepped).
    Running,

    /// The thread has exited.
    Exited,
}

/// Traced threads, ordered by first sighting.
#[derive(Clone, Debug, Default)]
pub struct ThreadManager {
    threads: IndexMap<u64, ThreadState>,
}

impl ThreadManager {
    /// Creates an empty thread table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers that the given thread is stopped.
    ///
    /// Returns whether the thread was never seen before.
    pub fn register_thread_stop(&mut self, thread_id: u64) -> bool {
        let is_new = !self.threads.contains_key(&thread_id);

        if is_new {
            tracing::debug!(thread_id, "new thread");
        }

        self.threads.insert(thread_id, ThreadState::Stopped);

        is_new
    }

    /// Registers that the given thread was resumed.
    pub fn register_thread_resume(&mut self, thread_id: u64) {
        if let Some(state) = self.threads.get_mut(&thread_id) {
            *state = ThreadState::Running;
        }
    }

    /// Registers that the given thread has exited.
    pub fn register_thread_exit(&mut self, thread_id: u64) {
        self.threads.insert(thread_id, ThreadState::Exited);
    }

    /// Returns the state of the given thread.
    pub fn state(&self, thread_id: u64) -> Option<ThreadState> {
        self.threads.get(&thread_id).copied()
    }

    /// Returns an iterator over the threads, by order of first sighting.
    pub fn iter(&self) -> impl Iterator<Item = (u64, ThreadState)> + '_ {
        self.threads.iter().map(|(id, state)| (*id, *state))
    }

    /// Returns the number of threads seen so far.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Returns whether no thread was seen so far.
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Returns the number of threads which have not exited.
    pub fn live_count(&self) -> usize {
        self.threads
            .values()
            .filter(|state| **state != ThreadState::Exited)
            .count()
    }
}
