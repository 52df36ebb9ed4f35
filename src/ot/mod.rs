//! Operations and the inclusion transformation between them.

pub mod op;
pub mod transform;

pub use op::Delete;
pub use op::Insert;
pub use op::Operation;
pub use op::Split;
pub use transform::transform;
