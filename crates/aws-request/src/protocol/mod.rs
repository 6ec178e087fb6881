//! Wire protocols, each exposed as a set of stage handlers.

pub mod jsonrpc;
