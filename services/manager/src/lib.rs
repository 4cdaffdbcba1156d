//! # Formlink Manager - Service Side
//!
//! Server-side routing from raw request frames to an injected
//! [`FormService`] implementation, plus the error translation applied at
//! trust boundaries.
//!
//! The [`Dispatcher`] validates the interface token before any argument is
//! decoded, routes by opcode through a single O(1) routing unit, and encodes
//! the reply result-code-first. The [`FormService`] trait is polymorphic
//! over the full operation set: the production [`FormStore`], test doubles,
//! and fuzz harnesses all implement the same contract.

pub mod api;
pub mod dispatcher;
pub mod store;
pub mod translator;

pub use api::{CallerContext, FormService, ServiceResult};
pub use dispatcher::Dispatcher;
pub use store::FormStore;
pub use translator::{translate, ExternalError};
