use anyhow::anyhow;
use rayon::ThreadPool;

/// Host execution policy.
///
/// The default policy runs on the global rayon pool. Setting `num_threads`
/// builds a dedicated pool that every `compute_with` call runs inside.
pub struct HostPolicy {
    pool: Option<ThreadPool>,
}

impl HostPolicy {
    pub fn new() -> Self {
        HostPolicy { pool: None }
    }

    pub fn with_threads(num_threads: usize) -> anyhow::Result<Self> {
        if num_threads == 0 {
            return Err(crate::GraphError::InvalidArgument(
                "Thread count should be positive".to_string(),
            )
            .into());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("single-graph-{}", i))
            .build()
            .map_err(|e| anyhow!("Failed to build thread pool: {}", e))?;
        log::debug!("Created host policy with {} threads", num_threads);
        Ok(HostPolicy { pool: Some(pool) })
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// An algorithm descriptor that can be run against some input on the host.
pub trait Compute<Input: ?Sized> {
    type Output: Send;

    fn compute(&self, input: &Input) -> anyhow::Result<Self::Output>;

    fn compute_with(&self, policy: &HostPolicy, input: &Input) -> anyhow::Result<Self::Output>
    where
        Self: Sync,
        Input: Sync,
    {
        policy.install(|| self.compute(input))
    }
}
