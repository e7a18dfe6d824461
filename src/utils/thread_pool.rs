use once_cell::sync::OnceCell;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

static THREAD_POOL: OnceCell<Arc<rayon::ThreadPool>> = OnceCell::new();

/// Initialize the global thread pool with the specified number of threads
///
/// # Errors
///
/// Returns an error if the thread pool cannot be built or was already initialized
pub fn init_thread_pool(num_threads: usize) -> anyhow::Result<()> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("fm-worker-{i}"))
        .build()?;

    THREAD_POOL
        .set(Arc::new(pool))
        .map_err(|_| anyhow::anyhow!("Thread pool already initialized"))?;

    Ok(())
}

/// Run a function in the configured thread pool, or in rayon's global pool
/// when none was configured
pub fn run_in_pool<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match THREAD_POOL.get() {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

/// Configure the thread pool from config
///
/// A `parallel_threads` value of 0 leaves rayon's defaults in place.
///
/// # Errors
///
/// Returns an error if the thread pool has already been initialized
pub fn configure_from_config(config: &crate::config::Config) -> anyhow::Result<()> {
    if config.performance.parallel_threads > 0 {
        init_thread_pool(config.performance.parallel_threads)?;
    }
    Ok(())
}
