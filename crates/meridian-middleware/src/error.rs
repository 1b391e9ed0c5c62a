//! Errors raised while assembling filter chains and action descriptors.
//!
//! These are startup-time failures. Nothing in this module is produced while
//! a request is being served.

use thiserror::Error;

use crate::filter::Stage;

/// A filter chain that cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// A core stage appears after a stage it must precede.
    #[error("filter `{filter}` ({stage}) must run before {after}")]
    OutOfOrder {
        /// Name of the misplaced filter.
        filter: &'static str,
        /// Stage of the misplaced filter.
        stage: Stage,
        /// The stage it was placed after.
        after: Stage,
    },

    /// Two filters claim the same core stage.
    #[error("stage {0} appears more than once")]
    DuplicateStage(Stage),

    /// An insertion referenced a stage the chain does not contain.
    #[error("no filter for stage {0} to insert next to")]
    MissingStage(Stage),
}

/// An action descriptor that does not match its handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The number of argument names differs from the handler's arity.
    #[error("action `{action}` declares {declared} argument names but its handler takes {expected}")]
    ArityMismatch {
        /// The action name.
        action: String,
        /// Number of names given.
        declared: usize,
        /// Number of arguments the handler takes.
        expected: usize,
    },
}
