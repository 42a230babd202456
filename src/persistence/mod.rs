use std::future::Future;
use std::time::Duration;

use crate::imports::*;

pub mod load;


/*
    CONSTS:
    * DEFAULT_MAX_ATTEMPTS - Attempts per backend call, the first one included
    * DEFAULT_BASE_DELAY_MS - Delay before the first retry, doubled for every further retry
*/
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/*
    Traits:
    * SettingsBackend - The four persistence calls of the settings API plus re-authentication

    Types:
    * RetryPolicy - Retry budget and backoff for authentication failures
    * SettingsService - Wraps a backend with retries and the naming checks that must pass before a write
*/
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    async fn fetch_parameters(&self) -> BackendResult<HashMap<String, Parameter>>;
    async fn update_parameters(&self, parameters: &HashMap<String, Parameter>) -> BackendResult<bool>;
    async fn fetch_tables(&self) -> BackendResult<HashMap<String, TableSettings>>;
    async fn update_tables(&self, tables: &HashMap<String, TableSettings>) -> BackendResult<bool>;
    async fn reauthenticate(&self) -> BackendResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub(crate) max_attempts: u32,
    pub(crate) base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

// Builder methods
impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone)]
pub struct SettingsService<B: SettingsBackend> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: SettingsBackend> SettingsService<B> {
    pub fn new(backend: B) -> Self {
        SettingsService {
            backend,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => {
                    tracing::debug!(operation = operation, attempt = attempt, "Backend call succeeded");
                    return Ok(value);
                }
                Err(e) if e.is_authentication() && attempt < max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        operation = operation,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Authentication failed, retrying"
                    );
                    if let Err(reauth) = self.backend.reauthenticate().await {
                        tracing::warn!(operation = operation, error = %reauth, "Re-authentication failed");
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        operation = operation,
                        attempt = attempt,
                        messages = ?e.server_messages(),
                        error = %e,
                        "Backend call failed"
                    );
                    return Err(anyhow::Error::new(e)
                        .context(format!("{operation} failed after {attempt} attempt(s)")));
                }
            }
        }
    }

    fn ensure_accepted(operation: &str, accepted: bool) -> Result<()> {
        if accepted {
            Ok(())
        } else {
            Err(anyhow::anyhow!("{operation} was rejected by the backend"))
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_parameters(&self) -> Result<ParameterSet> {
        let record = self
            .with_retry("fetchParameters", || self.backend.fetch_parameters())
            .await?;
        ParameterSet::from_record(record).context("Persisted parameters conflict")
    }

    /// Rejects the whole set before any write when an equation references an unknown parameter.
    #[tracing::instrument(skip(self, parameters), fields(parameters = parameters.len()))]
    pub async fn save_parameters(&self, parameters: &ParameterSet) -> Result<()> {
        parameters.validate_equations()?;
        let record = parameters.to_record();
        let accepted = self
            .with_retry("updateParameters", || self.backend.update_parameters(&record))
            .await?;
        Self::ensure_accepted("updateParameters", accepted)
    }

    /// Adds one parameter and persists the set; the caller's set only changes when the write succeeded.
    pub async fn add_parameter(&self, parameters: &mut ParameterSet, parameter: Parameter) -> Result<()> {
        let mut next = parameters.clone();
        next.insert(parameter)?;
        self.save_parameters(&next).await?;
        *parameters = next;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_tables(&self) -> Result<TableCatalog> {
        let record = self
            .with_retry("fetchTables", || self.backend.fetch_tables())
            .await?;
        Ok(TableCatalog::from_record(record))
    }

    #[tracing::instrument(skip(self, catalog), fields(tables = catalog.len()))]
    pub async fn save_tables(&self, catalog: &TableCatalog) -> Result<()> {
        catalog.validate_names()?;
        let record = catalog.to_record();
        let accepted = self
            .with_retry("updateTables", || self.backend.update_tables(&record))
            .await?;
        Self::ensure_accepted("updateTables", accepted)
    }

    /// Saves one table into the catalog and persists the catalog, all or nothing.
    pub async fn save_table(&self, catalog: &mut TableCatalog, settings: TableSettings) -> Result<()> {
        let mut next = catalog.clone();
        next.save(settings)?;
        self.save_tables(&next).await?;
        *catalog = next;
        Ok(())
    }

    pub async fn create_table(&self, catalog: &mut TableCatalog, name: &str) -> Result<String> {
        let mut next = catalog.clone();
        let id = next.create_table(name)?.id.clone();
        self.save_tables(&next).await?;
        *catalog = next;
        Ok(id)
    }

    pub async fn delete_table(&self, catalog: &mut TableCatalog, id: &str) -> Result<()> {
        let mut next = catalog.clone();
        next.delete(id)
            .with_context(|| format!("Table '{}' not found", id))?;
        self.save_tables(&next).await?;
        *catalog = next;
        Ok(())
    }
}
