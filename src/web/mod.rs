//! Framework integration surface.
//!
//! This module is the boundary between an HTTP framework and the guard.
//! It contains no framework-specific code; instead it defines:
//! - [`GuardRequest`] / [`GuardResponse`]: the narrow capability set the
//!   guard reads from a request and writes to a response
//! - [`RequestAdapter`] / [`ResponseAdapter`]: owned implementations for
//!   integrations and tests
//! - [`Middleware`] / [`Chain`]: ordered execution with an explicit
//!   [`Flow`] verdict per stage
//!
//! # Integration Model
//!
//! A framework integration should:
//! 1. Implement `GuardRequest` for its request type (or copy into a `RequestAdapter`)
//! 2. Implement `GuardResponse` for its response type (or replay a `ResponseAdapter`)
//! 3. Run a `Chain` built from `AuthGuard` handlers before the route handler
//! 4. On `Flow::Next` call the route handler, on `Flow::Halt` return the
//!    written response, on `Flow::Error` hand the violation to its error handler
//!
//! # Example Flow
//!
//! ```ignore
//! let chain = Chain::new()
//!     .stage(guard.swap_code(SwapOptions::new().scope("orders").silent(true))?)
//!     .stage(guard.check(CheckOptions::new("orders").redirect_login(true))?);
//!
//! match chain.run(&mut req, &mut res).await {
//!     Flow::Next => handler(req, res).await,
//!     Flow::Halt => res,
//!     Flow::Error(violation) => error_handler(violation),
//! }
//! ```

mod adapter;
mod extract;
mod middleware;

pub use adapter::{CookieChange, Reply, RequestAdapter, ResponseAdapter};
pub use extract::{GuardRequest, GuardResponse, ReplyBody};
pub use middleware::{Chain, Flow, Middleware};
