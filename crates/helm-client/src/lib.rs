//! Helm Release Client
//!
//! A thin async wrapper around the `helm` CLI, scoped to one namespace.
//! Provides the release operations the EFK stack controller needs.
//!
//! # Example
//!
//! ```no_run
//! use helm_client::{HelmClient, HelmClientTrait, ReleaseStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HelmClient::new("logging")?;
//!
//! let values = serde_json::json!({ "replicas": 1 });
//! client
//!     .install_or_upgrade("logs-searchengine", "helm-charts/efk-stack/elasticsearch", &values)
//!     .await?;
//!
//! if client.release_status("logs-searchengine").await? == ReleaseStatus::Deployed {
//!     println!("deployed");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod helm_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::HelmClient;
pub use error::HelmError;
pub use helm_trait::HelmClientTrait;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockHelmClient;
