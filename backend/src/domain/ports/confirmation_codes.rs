//! Port for confirmation-code generation.

use crate::domain::ConfirmationCode;

/// Length of generated confirmation codes.
pub const CONFIRMATION_CODE_LENGTH: usize = 12;

/// Produces fresh confirmation codes.
#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationCodeGenerator: Send + Sync {
    /// Generate a new code.
    fn generate(&self) -> ConfirmationCode;
}
