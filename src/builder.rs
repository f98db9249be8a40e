use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::{Config, Engine, Result};

pub struct EngineBuilder {
    config: Config,
    rt: Option<Arc<Runtime>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            rt: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        let runtime = match &self.rt {
            Some(rt) => rt.clone(),
            None => Arc::new(
                Builder::new_multi_thread().worker_threads(self.config.async_worker_thread_number.into()).enable_all().build().unwrap(),
            ),
        };
        let engine = Engine::new_with_runtime(self.config.clone(), runtime);

        Ok(engine)
    }
}
