//! Per-namespace Helm sessions.
//!
//! A session is created the first time a namespace is reconciled and reused
//! by every later pass. The cache belongs to the reconciler instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use helm_client::{HelmClient, HelmClientTrait, HelmError};
use tracing::info;

use crate::config::OperatorConfig;
use crate::error::ControllerError;

/// Creates Helm sessions bound to one namespace
pub trait HelmSessionFactory: Send + Sync {
    fn create(&self, namespace: &str) -> Result<Arc<dyn HelmClientTrait>, HelmError>;
}

/// Factory for sessions backed by the helm CLI
#[derive(Debug, Clone)]
pub struct CliSessionFactory {
    helm_bin: String,
    timeout: Duration,
}

impl CliSessionFactory {
    pub fn new(config: &OperatorConfig) -> Self {
        Self {
            helm_bin: config.helm_bin.clone(),
            timeout: config.helm_timeout,
        }
    }
}

impl HelmSessionFactory for CliSessionFactory {
    fn create(&self, namespace: &str) -> Result<Arc<dyn HelmClientTrait>, HelmError> {
        let client = HelmClient::new(namespace)?
            .with_binary(self.helm_bin.clone())
            .with_timeout(self.timeout);
        Ok(Arc::new(client))
    }
}

/// Lazily populated namespace -> session cache
pub struct HelmSessions {
    factory: Box<dyn HelmSessionFactory>,
    sessions: Mutex<HashMap<String, Arc<dyn HelmClientTrait>>>,
}

impl HelmSessions {
    pub fn new(factory: impl HelmSessionFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for `namespace`, created on first use.
    pub fn get_or_create(&self, namespace: &str) -> Result<Arc<dyn HelmClientTrait>, ControllerError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(namespace) {
            return Ok(Arc::clone(session));
        }

        let session = self.factory.create(namespace).map_err(|e| {
            ControllerError::HelmSession(format!("namespace {namespace}: {e}"))
        })?;
        info!("Created Helm session for namespace {}", session.namespace());
        sessions.insert(namespace.to_string(), Arc::clone(&session));
        Ok(session)
    }
}
