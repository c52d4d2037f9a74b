//! Unary RPC over HTTP
//!
//! Procedures live at `/{package}.{Service}/{Method}` and exchange JSON
//! messages over HTTP/1.1 or cleartext HTTP/2. Failures carry a [`Code`]
//! that fixes the HTTP status and a human-readable message.

pub mod code;
pub mod envelope;
pub mod error;
pub mod unary;
pub mod user_v1;

pub use code::Code;
pub use envelope::{RpcRequest, RpcResponse};
pub use error::RpcError;
pub use unary::serve_unary;
