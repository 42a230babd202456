/*
    Discovery lifecycle hooks:
    * A hook is a type that impls DiscoveryHooks, every method has a default so a hook only implements what it cares about.
    * DiscoveryServices holds the registered hooks and dispatches each event to all of them.
    * TracingHooks is the built-in hook, it reports the lifecycle through tracing.
*/
use crate::imports::*;

/*
    Hook dispatch helper - collects errors from multiple hook calls and aggregates them into a single Result.
*/
fn collect_hook_errors(errors: Vec<anyhow::Error>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        let msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(anyhow::anyhow!("Discovery hook errors: {msg}"))
    }
}

macro_rules! hook_dispatch {
    ($method:ident $(, $arg:ident : $arg_ty:ty)?) => {
        pub async fn $method(&self $(, $arg: $arg_ty)?) -> Result<()> {
            let mut errors = Vec::new();
            for hook in &self.hooks {
                if let Err(e) = hook.$method($($arg)?).await {
                    errors.push(e);
                }
            }
            collect_hook_errors(errors)
        }
    };
}

#[derive(Clone, Default)]
pub struct DiscoveryServices {
    hooks: Vec<Arc<dyn DiscoveryHooks>>,
}

impl std::fmt::Debug for DiscoveryServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryServices")
            .field("hooks_count", &self.hooks.len())
            .finish()
    }
}

impl DiscoveryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hook<T: DiscoveryHooks + 'static>(&mut self, hook: T) {
        self.hooks.push(Arc::new(hook));
    }

    pub fn add_shared_hook(&mut self, hook: Arc<dyn DiscoveryHooks>) {
        self.hooks.push(hook);
    }

    hook_dispatch!(on_start);
    hook_dispatch!(on_complete, parameters: &[Parameter]);
    hook_dispatch!(on_error, error: &anyhow::Error);

    pub fn defaults() -> Self {
        let mut services = Self::new();
        services.add_hook(TracingHooks);
        services
    }
}

#[async_trait]
pub trait DiscoveryHooks: Send + Sync {
    async fn on_start(&self) -> Result<()> {
        Ok(())
    }
    async fn on_complete(&self, _parameters: &[Parameter]) -> Result<()> {
        Ok(())
    }
    async fn on_error(&self, _error: &anyhow::Error) -> Result<()> {
        Ok(())
    }
}

pub struct TracingHooks;

#[async_trait]
impl DiscoveryHooks for TracingHooks {
    async fn on_start(&self) -> Result<()> {
        tracing::debug!("Parameter discovery started");
        Ok(())
    }
    async fn on_complete(&self, parameters: &[Parameter]) -> Result<()> {
        tracing::info!(parameter_count = parameters.len(), "Parameter discovery complete");
        Ok(())
    }
    async fn on_error(&self, error: &anyhow::Error) -> Result<()> {
        tracing::error!(error = %error, "Parameter discovery failed");
        Ok(())
    }
}
