//! # ecs-client – Amazon EC2 Container Service client
//!
//! A service client for the ECS `2014-11-13` API, spoken over AWS JSON-RPC
//! 1.1 and signed with SigV4. The request pipeline itself lives in the
//! `aws-request` crate; this crate describes ECS to it.
//!
//! ```text
//! Session / ConfigProvider ──▶ Ecs::new ──▶ Client { ClientInfo, Handlers }
//!                                   │          sign  += sigv4.Sign
//!                                   │          build += jsonrpc.Build
//!                                   │          unmarshal(_meta/_error) += jsonrpc.*
//!                                   └─ EcsOptions { client_init, request_init }
//! ```
//!
//! ```no_run
//! use ecs_client::{Ecs, ListClustersInput, Session};
//!
//! # async fn run() -> ecs_client::AwsResult<()> {
//! let ecs = Ecs::new(&Session::from_env(), &[]);
//! let arns = ecs.list_clusters_all(&ListClustersInput::default()).await?;
//! println!("{} clusters", arns.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod service;
pub mod types;

pub use service::{Ecs, EcsOptions, API_VERSION, JSON_VERSION, SERVICE_NAME, TARGET_PREFIX};
pub use types::*;

pub use aws_request::{
    AwsError, AwsResult, Client, ClientInfo, Config, ConfigProvider, Credentials, LogLevel,
    Request, RetryConfig, RetryMode, Session,
};
