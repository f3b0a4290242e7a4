use axum::Router;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::context::ModuleCtx;
use crate::contracts::{DbModule, Module, RestfulModule};

/// One registered module and the capabilities it exposes.
pub struct ModuleEntry {
    pub name: &'static str,
    pub core: Arc<dyn Module>,
    pub db: Option<Arc<dyn DbModule>>,
    pub rest: Option<Arc<dyn RestfulModule>>,
}

impl ModuleEntry {
    pub fn new(name: &'static str, core: Arc<dyn Module>) -> Self {
        Self {
            name,
            core,
            db: None,
            rest: None,
        }
    }

    pub fn with_db(mut self, db: Arc<dyn DbModule>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_rest(mut self, rest: Arc<dyn RestfulModule>) -> Self {
        self.rest = Some(rest);
        self
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("has_db", &self.db.is_some())
            .field("has_rest", &self.rest.is_some())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("module '{0}' registered twice")]
    Duplicate(&'static str),
    #[error("module '{module}' declares db capability but no database is configured")]
    DbMissing { module: &'static str },
    #[error("init failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("db migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Modules in registration order.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    modules: Vec<ModuleEntry>,
}

impl RegistryBuilder {
    pub fn register(mut self, entry: ModuleEntry) -> Self {
        self.modules.push(entry);
        self
    }

    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        let mut seen = HashSet::new();
        for m in &self.modules {
            if !seen.insert(m.name) {
                return Err(RegistryError::Duplicate(m.name));
            }
        }
        Ok(ModuleRegistry {
            modules: self.modules,
        })
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    // ---- Ordered phases: init → DB → REST (sync) ----

    pub async fn run_init_phase(&self, base_ctx: &ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
            tracing::debug!(module = e.name, "init completed");
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, base_ctx: &ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let Some(dbm) = &e.db else { continue };
            let db = base_ctx
                .db()
                .ok_or(RegistryError::DbMissing { module: e.name })?;
            dbm.migrate(&db)
                .await
                .map_err(|source| RegistryError::DbMigrate {
                    module: e.name,
                    source,
                })?;
            tracing::info!(module = e.name, "migrations applied");
        }
        Ok(())
    }

    pub fn run_rest_phase(
        &self,
        base_ctx: &ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        for e in &self.modules {
            let Some(rest) = &e.rest else { continue };
            let ctx = base_ctx.clone().for_module(e.name);
            router = rest
                .register_rest(&ctx, router)
                .map_err(|source| RegistryError::RestRegister {
                    module: e.name,
                    source,
                })?;
            tracing::debug!(module = e.name, "routes registered");
        }
        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ModuleCtxBuilder;
    use async_trait::async_trait;
    use axum::routing::get;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        inits: AtomicUsize,
        fail_init: bool,
    }

    #[async_trait]
    impl Module for Counting {
        async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                anyhow::bail!("boom");
            }
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[async_trait]
    impl DbModule for Counting {
        async fn migrate(&self, _db: &modkit_db::DbHandle) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl RestfulModule for Counting {
        fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router.route("/ping", get(|| async { "pong" })))
        }
    }

    #[tokio::test]
    async fn phases_run_in_order() {
        let m = Arc::new(Counting::default());
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("counting", m.clone()).with_rest(m.clone()))
            .build()
            .unwrap();
        let ctx = ModuleCtxBuilder::new().build();
        reg.run_init_phase(&ctx).await.unwrap();
        reg.run_db_phase(&ctx).await.unwrap();
        let _router = reg.run_rest_phase(&ctx, Router::new()).unwrap();
        assert_eq!(m.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_failure_names_the_module() {
        let m = Arc::new(Counting {
            fail_init: true,
            ..Default::default()
        });
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("broken", m))
            .build()
            .unwrap();
        let err = reg
            .run_init_phase(&ModuleCtxBuilder::new().build())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Init { module: "broken", .. }));
    }

    #[tokio::test]
    async fn db_capability_without_database_is_rejected() {
        let m = Arc::new(Counting::default());
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("needs_db", m.clone()).with_db(m))
            .build()
            .unwrap();
        let err = reg
            .run_db_phase(&ModuleCtxBuilder::new().build())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DbMissing { module: "needs_db" }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let m = Arc::new(Counting::default());
        let err = ModuleRegistry::builder()
            .register(ModuleEntry::new("dup", m.clone()))
            .register(ModuleEntry::new("dup", m))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate("dup")));
    }
}
