//! Explicit runtime context
//!
//! A [`RuntimeContext`] owns the worker pool and the defaults that the
//! kernels read: where work runs, which probe scheme the hash tables use
//! and the coarsening seed. It is created once, passed to whoever needs it
//! and torn down with [`RuntimeContext::finalize`] or on drop.

use std::env;
use std::fmt;
use std::str::FromStr;

use log::{debug, info};

use crate::constants::DEFAULT_COARSEN_SEED;
use crate::error::{AmgError, Result};
use crate::hash::AtomicScalar;
use crate::matrix::config::{CoarsenConfig, HashType, SpgemmConfig};
use crate::matrix::SparseMatrixCSR;
use crate::spgemm::spgemm;

/// Environment variable selecting the probe scheme (L, Q or D)
pub const ENV_HASH_TYPE: &str = "AMG_HASH_TYPE";
/// Environment variable with the worker count of the device policy
pub const ENV_NUM_THREADS: &str = "AMG_NUM_THREADS";
/// Environment variable with the coarsening seed
pub const ENV_SEED: &str = "AMG_SEED";
/// Environment variable selecting the execution policy (host or device)
pub const ENV_EXEC_POLICY: &str = "AMG_EXEC_POLICY";

/// Where row-parallel work runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// A single worker
    Host,
    /// The full worker pool
    Device,
}

impl FromStr for ExecutionPolicy {
    type Err = AmgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(ExecutionPolicy::Host),
            "device" => Ok(ExecutionPolicy::Device),
            _ => Err(AmgError::InvalidConfig(format!(
                "unknown execution policy '{}', expected host or device",
                s
            ))),
        }
    }
}

impl fmt::Display for ExecutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPolicy::Host => write!(f, "host"),
            ExecutionPolicy::Device => write!(f, "device"),
        }
    }
}

/// Settings of a [`RuntimeContext`]
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub policy: ExecutionPolicy,

    /// Workers used by [`ExecutionPolicy::Device`]
    pub num_threads: usize,

    pub hash_type: HashType,

    /// Base seed of the coarsening measure jitter
    pub seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            policy: ExecutionPolicy::Device,
            num_threads: num_cpus::get(),
            hash_type: HashType::Double,
            seed: DEFAULT_COARSEN_SEED,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by the `AMG_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `AMG_*`
    /// variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_HASH_TYPE) {
            config.hash_type = value.parse()?;
        }
        if let Some(value) = lookup(ENV_NUM_THREADS) {
            config.num_threads = value.trim().parse().map_err(|_| {
                AmgError::InvalidConfig(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_NUM_THREADS, value
                ))
            })?;
        }
        if let Some(value) = lookup(ENV_SEED) {
            config.seed = value.trim().parse().map_err(|_| {
                AmgError::InvalidConfig(format!("{} must be an integer, got '{}'", ENV_SEED, value))
            })?;
        }
        if let Some(value) = lookup(ENV_EXEC_POLICY) {
            config.policy = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(AmgError::InvalidConfig(
                "num_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker pool plus the defaults the kernels run with
pub struct RuntimeContext {
    config: RuntimeConfig,
    pool: rayon::ThreadPool,
    finalized: bool,
}

impl RuntimeContext {
    /// Validates `config` and starts the worker pool
    pub fn init(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let threads = match config.policy {
            ExecutionPolicy::Host => 1,
            ExecutionPolicy::Device => config.num_threads,
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("amg-worker-{}", i))
            .build()
            .map_err(|e| AmgError::InvalidConfig(format!("failed to start worker pool: {}", e)))?;

        info!(
            "runtime context: policy {}, {} worker(s), hash type {}, seed {}",
            config.policy, threads, config.hash_type, config.seed
        );

        Ok(Self {
            config,
            pool,
            finalized: false,
        })
    }

    /// Runs `op` on the context's workers
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// SpGEMM defaults for this context
    pub fn spgemm_config(&self) -> SpgemmConfig {
        SpgemmConfig::with_hash_type(self.config.hash_type)
    }

    /// Coarsening defaults for this context
    pub fn coarsen_config(&self) -> CoarsenConfig {
        CoarsenConfig::with_seed(self.config.seed)
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.config.policy
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Multiplies `a * b` on this context's workers with its defaults
    pub fn spgemm<T: AtomicScalar>(
        &self,
        a: &SparseMatrixCSR<T>,
        b: &SparseMatrixCSR<T>,
    ) -> Result<SparseMatrixCSR<T>> {
        let config = self.spgemm_config();
        self.install(|| spgemm(a, b, &config))
    }

    /// Shuts the context down
    pub fn finalize(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.finalized {
            self.finalized = true;
            debug!("runtime context released");
        }
    }
}

impl Drop for RuntimeContext {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_lookup_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (ENV_HASH_TYPE, "Q"),
            (ENV_NUM_THREADS, "3"),
            (ENV_SEED, "99"),
            (ENV_EXEC_POLICY, "host"),
        ]))
        .unwrap();

        assert_eq!(config.hash_type, HashType::Quadratic);
        assert_eq!(config.num_threads, 3);
        assert_eq!(config.seed, 99);
        assert_eq!(config.policy, ExecutionPolicy::Host);
    }

    #[test]
    fn test_unknown_hash_type_is_rejected() {
        let err = RuntimeConfig::from_lookup(lookup(&[(ENV_HASH_TYPE, "X")])).unwrap_err();
        assert!(matches!(err, AmgError::UnknownHashType(_)));
    }

    #[test]
    fn test_zero_threads_is_rejected() {
        let err = RuntimeConfig::from_lookup(lookup(&[(ENV_NUM_THREADS, "0")])).unwrap_err();
        assert!(matches!(err, AmgError::InvalidConfig(_)));
    }

    #[test]
    fn test_host_policy_uses_one_worker() {
        let context = RuntimeContext::init(RuntimeConfig {
            policy: ExecutionPolicy::Host,
            num_threads: 4,
            ..RuntimeConfig::default()
        })
        .unwrap();

        assert_eq!(context.num_threads(), 1);
        assert_eq!(context.install(rayon::current_num_threads), 1);
        context.finalize();
    }

    #[test]
    fn test_context_spgemm() {
        let context = RuntimeContext::init(RuntimeConfig {
            num_threads: 2,
            ..RuntimeConfig::default()
        })
        .unwrap();
        let a = SparseMatrixCSR::<f64>::identity(3);

        let c = context.spgemm(&a, &a).unwrap();

        assert_eq!(c.to_dense(), a.to_dense());
    }
}
