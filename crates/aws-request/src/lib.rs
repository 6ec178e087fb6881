//! # aws-request – request pipeline for AWS service clients
//!
//! Service crates build on this crate the way generated SDK clients build
//! on a shared runtime: they describe their metadata, push protocol and
//! signing handlers onto a [`Client`], and issue [`Request`]s.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Session  (session.rs)   impl ConfigProvider     │
//! │  └── base Config + default Handlers              │
//! ├──────────────────────────────────────────────────┤
//! │  Client  (client.rs)                             │
//! │  ├── ClientInfo (service, endpoint, region, …)   │
//! │  └── Handlers  (handlers.rs)                     │
//! │       validate · build · sign · validate_response│
//! │       unmarshal_meta · unmarshal · unmarshal_error│
//! │       retry · after_retry · complete             │
//! ├──────────────────────────────────────────────────┤
//! │  Request  (request.rs)  ─▶ Transport (reqwest)   │
//! ├──────────────────────────────────────────────────┤
//! │  corehandlers · signing (SigV4) · protocol/jsonrpc│
//! └──────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod config;
pub mod handlers;
pub mod request;
pub mod client;
pub mod transport;
pub mod session;
pub mod signing;
pub mod corehandlers;
pub mod protocol;

pub use client::{Client, ClientInfo, ClientInitHook, RequestInitHook};
pub use config::{
    ClientConfig, Config, ConfigProvider, Credentials, LogLevel, Region, RetryConfig, RetryMode,
};
pub use error::{AwsError, AwsResult};
pub use handlers::{HandlerList, Handlers, NamedHandler};
pub use request::{HttpRequest, HttpResponse, Operation, Request};
pub use session::Session;
pub use transport::{ReqwestTransport, Transport};
