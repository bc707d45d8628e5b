//! # azarm
//!
//! Azure Resource Manager client. The runtime (requests, responses, pagers,
//! pollers, pipeline) lives in [`runtime`]; resource clients and the client
//! factory live in [`mgmt`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use azarm::runtime::{ClientOptions, Context, StaticTokenCredential};
//! use azarm::mgmt::ClientFactory;
//!
//! # async fn run() -> azarm::runtime::ArmResult<()> {
//! let cred = Arc::new(StaticTokenCredential::new("token"));
//! let subscription = "00000000-0000-0000-0000-000000000000";
//! let factory = ClientFactory::new(subscription, cred, &ClientOptions::default())?;
//! let groups = factory
//!     .resource_groups_client()
//!     .list_pager(None)?
//!     .collect_all(&Context::new())
//!     .await?;
//! println!("{} resource groups", groups.len());
//! # Ok(())
//! # }
//! ```

pub use azarm_core as runtime;
pub use azarm_mgmt as mgmt;

pub use azarm_core::{ArmError, ArmResult, ClientOptions, Context};
pub use azarm_mgmt::ClientFactory;
