//! Ordered middleware execution.
//!
//! Every guard component decides one of three things for a request:
//!
//! ```text
//! inbound request
//!   ↓
//! stage 1 ── Halt ──→ response already written, chain stops
//!   │ ── Error ─→ failure handed to the caller's error pipeline
//!   ↓ Next
//! stage 2 ...
//!   ↓ Next
//! application handler
//! ```

use async_trait::async_trait;

use crate::error::Violation;

use super::{GuardRequest, GuardResponse};

/// What a stage decided for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next stage
    Next,
    /// A response was written; stop here
    Halt,
    /// Stop and forward the failure instead of writing a response
    Error(Violation),
}

impl Flow {
    /// Whether the chain should continue.
    pub fn is_next(&self) -> bool {
        matches!(self, Flow::Next)
    }
}

/// A stage in a guard chain.
///
/// Implemented by every guard handler; applications can implement it for
/// their own stages and mix them into a [`Chain`].
#[async_trait]
pub trait Middleware<Req, Res>: Send + Sync
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    /// Runs the stage against one request.
    async fn handle(&self, req: &mut Req, res: &mut Res) -> Flow;
}

/// An ordered list of stages run until one of them stops the request.
///
/// # Examples
///
/// ```no_run
/// use auth_gate::web::{Chain, RequestAdapter, ResponseAdapter};
/// use auth_gate::{AuthGuard, CheckOptions};
/// # async fn demo(guard: AuthGuard) -> Result<(), auth_gate::ConfigError> {
/// let chain: Chain<RequestAdapter, ResponseAdapter> = Chain::new()
///     .stage(guard.xsrf(false))
///     .stage(guard.check(CheckOptions::new("orders").redirect_login(true))?);
///
/// let mut req = RequestAdapter::new("req-1");
/// let mut res = ResponseAdapter::new();
/// let flow = chain.run(&mut req, &mut res).await;
/// # Ok(())
/// # }
/// ```
pub struct Chain<Req, Res>
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    stages: Vec<Box<dyn Middleware<Req, Res>>>,
}

impl<Req, Res> Chain<Req, Res>
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage.
    pub fn stage(mut self, stage: impl Middleware<Req, Res> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the stages in order.
    ///
    /// Returns [`Flow::Next`] when every stage let the request through,
    /// otherwise the first non-`Next` decision.
    pub async fn run(&self, req: &mut Req, res: &mut Res) -> Flow {
        for stage in &self.stages {
            match stage.handle(req, res).await {
                Flow::Next => continue,
                stop => return stop,
            }
        }
        Flow::Next
    }
}

impl<Req, Res> Default for Chain<Req, Res>
where
    Req: GuardRequest + Send + Sync,
    Res: GuardResponse + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
