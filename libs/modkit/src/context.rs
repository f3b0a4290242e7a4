use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

#[derive(Clone, Default)]
pub struct ModuleCtx {
    pub(crate) db: Option<Arc<modkit_db::DbHandle>>,
    pub(crate) config_provider: Option<Arc<dyn ConfigProvider>>,
    pub(crate) module_name: Option<Arc<str>>,
}

#[derive(Default)]
pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_db(mut self, db: Arc<modkit_db::DbHandle>) -> Self {
        self.inner.db = Some(db);
        self
    }
    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }
    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    /// Scope context to a specific module name (used by the registry).
    pub fn for_module(mut self, name: &str) -> Self {
        self.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn db(&self) -> Option<Arc<modkit_db::DbHandle>> {
        self.db.clone()
    }

    pub fn db_required(&self) -> anyhow::Result<Arc<modkit_db::DbHandle>> {
        self.db
            .clone()
            .ok_or_else(|| anyhow::anyhow!("database is not configured"))
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Best-effort: deserialize the module's config into `T`, fallback to `T::default()`
    /// if section is missing or invalid.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> T {
        match (&self.module_name, &self.config_provider) {
            (Some(name), Some(p)) => p
                .get_module_config(name)
                .and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
                .unwrap_or_default(),
            _ => T::default(),
        }
    }

    /// Strict: deserialize the module's config into `T`, returning a pathful error on failure.
    pub fn module_config_required<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let name = self
            .module_name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("context is not scoped to a module"))?;

        let prov = self
            .config_provider
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no ConfigProvider"))?;

        let val = prov
            .get_module_config(name)
            .ok_or_else(|| anyhow::anyhow!("missing module config: {name}"))?;

        let out: T = serde_json::from_value(val.clone())
            .map_err(|e| anyhow::anyhow!("invalid {name} config: {}", e))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;

    struct MapProvider(HashMap<String, serde_json::Value>);

    impl ConfigProvider for MapProvider {
        fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
            self.0.get(module_name)
        }
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        page_size: u64,
    }

    fn ctx_with(section: serde_json::Value) -> ModuleCtx {
        let mut m = HashMap::new();
        m.insert("sample".to_string(), section);
        ModuleCtxBuilder::new()
            .with_config_provider(Arc::new(MapProvider(m)))
            .build()
            .for_module("sample")
    }

    #[test]
    fn typed_config_is_read_for_scoped_module() {
        let ctx = ctx_with(json!({"page_size": 25}));
        assert_eq!(ctx.current_module(), Some("sample"));
        assert_eq!(ctx.module_config::<Sample>(), Sample { page_size: 25 });
        assert_eq!(
            ctx.module_config_required::<Sample>().unwrap(),
            Sample { page_size: 25 }
        );
    }

    #[test]
    fn invalid_section_falls_back_to_default_but_strict_errors() {
        let ctx = ctx_with(json!({"page_size": "lots"}));
        assert_eq!(ctx.module_config::<Sample>(), Sample::default());
        let err = ctx.module_config_required::<Sample>().unwrap_err();
        assert!(err.to_string().contains("invalid sample config"));
    }

    #[test]
    fn unscoped_context_has_no_config_or_db() {
        let ctx = ModuleCtxBuilder::new().build();
        assert!(ctx.module_config_required::<Sample>().is_err());
        assert!(ctx.db().is_none());
        assert!(ctx.db_required().is_err());
    }
}
