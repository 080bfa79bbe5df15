//! Cluster Client
//!
//! Access to the Kubernetes objects the svc4vmi controller reads and writes,
//! plus the type scheme used to resolve an object's group/version/kind.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, KubeClusterClient, ObjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//!
//! let key: ObjectKey = "default/vm1".parse()?;
//! let vmi = client.get_virtual_machine_instance(&key).await?;
//! println!("{:?}", vmi.metadata.labels);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed point reads**: not-found is a distinct [`ClientError`] variant
//! - **Scheme**: injected type → group/version/kind resolution
//! - **Mocking** (`test-util`): in-memory [`MockClusterClient`] with failure injection

pub mod client;
pub mod error;
pub mod key;
pub mod scheme;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClientError;
pub use key::{ObjectKey, ParseObjectKeyError};
pub use scheme::{Scheme, SchemeError};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterClient, MockOperation};
