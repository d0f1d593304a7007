pub mod board;
pub mod credentials;
pub mod error;
pub mod stage;

pub use board::{Attachment, BoardSnapshot, Card, Comment, Label};
pub use credentials::Credentials;
pub use error::{ErrorCategory, ErrorKind, InsightsError, LlmError, Result};
pub use stage::{Provenance, StageBinding, StageKind, StageOutput, StageResult};
