//! Core types for parley: conversation messages, tools and their result
//! envelope, the wire-level step events, the error taxonomy, and the
//! [`ModelClient`] collaborator trait.

pub mod error;
pub mod event;
pub mod model;
pub mod traits;
pub mod transcript;
pub mod types;

pub use error::*;
pub use event::*;
pub use model::*;
pub use traits::*;
pub use transcript::*;
pub use types::*;
