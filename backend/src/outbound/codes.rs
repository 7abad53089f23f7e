//! Random confirmation codes.

use rand::distributions::{Alphanumeric, DistString};

use crate::domain::ConfirmationCode;
use crate::domain::ports::{CONFIRMATION_CODE_LENGTH, ConfirmationCodeGenerator};

/// Draws alphanumeric codes from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl ConfirmationCodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> ConfirmationCode {
        let raw = Alphanumeric.sample_string(&mut rand::thread_rng(), CONFIRMATION_CODE_LENGTH);
        ConfirmationCode::from_generated(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn codes_are_alphanumeric_and_fixed_length() {
        let code = RandomCodeGenerator.generate();
        assert_eq!(code.expose().len(), CONFIRMATION_CODE_LENGTH);
        assert!(code.expose().chars().all(|ch| ch.is_ascii_alphanumeric()));
    }

    #[rstest]
    fn consecutive_codes_differ() {
        let first = RandomCodeGenerator.generate();
        let second = RandomCodeGenerator.generate();
        assert_ne!(first.expose(), second.expose());
    }
}
