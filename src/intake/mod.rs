use thiserror::Error;
use tracing::debug;

/// Whatever accepts a validated "select the first N records" directive.
pub trait BulkTarget {
    fn apply_bulk_directive(&mut self, count: u64);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    Empty,
    Negative,
    NotANumber,
    TooLarge,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidReason::Empty => write!(f, "no count entered"),
            InvalidReason::Negative => write!(f, "count must not be negative"),
            InvalidReason::NotANumber => write!(f, "count must be a whole number"),
            InvalidReason::TooLarge => write!(f, "count is too large"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("invalid bulk count '{input}': {reason}")]
    InvalidBulkInput {
        input: String,
        reason: InvalidReason,
    },
}

pub fn parse_count(raw: &str) -> Result<u64, IntakeError> {
    let invalid = |reason| IntakeError::InvalidBulkInput {
        input: raw.to_string(),
        reason,
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(InvalidReason::Empty));
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        let reason = if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            InvalidReason::Negative
        } else {
            InvalidReason::NotANumber
        };
        return Err(invalid(reason));
    }
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(InvalidReason::NotANumber));
    }
    digits
        .parse::<u64>()
        .map_err(|_| invalid(InvalidReason::TooLarge))
}

/// Transient input surface for a bulk count. It knows nothing about pages:
/// it validates, hands the count to its target, then closes itself.
#[derive(Clone, Debug, Default)]
pub struct BulkIntake {
    input: String,
    open: bool,
}

impl BulkIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.input.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_input(&mut self, raw: &str) {
        self.input = raw.to_string();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Mirrors a disabled submit button.
    pub fn can_submit(&self) -> bool {
        parse_count(&self.input).is_ok()
    }

    pub fn submit<T: BulkTarget + ?Sized>(&mut self, target: &mut T) -> Result<u64, IntakeError> {
        let count = parse_count(&self.input)?;
        target.apply_bulk_directive(count);
        debug!(count, "bulk count submitted");
        self.close();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        applied: Vec<u64>,
    }

    impl BulkTarget for Recorder {
        fn apply_bulk_directive(&mut self, count: u64) {
            self.applied.push(count);
        }
    }

    #[test]
    fn parse_count_accepts_whole_numbers() {
        assert_eq!(parse_count("20"), Ok(20));
        assert_eq!(parse_count("  7 "), Ok(7));
        assert_eq!(parse_count("+3"), Ok(3));
        assert_eq!(parse_count("0"), Ok(0));
    }

    #[test]
    fn parse_count_rejects_bad_input() {
        let reason = |raw: &str| match parse_count(raw) {
            Err(IntakeError::InvalidBulkInput { reason, .. }) => Some(reason),
            Ok(_) => None,
        };
        assert_eq!(reason(""), Some(InvalidReason::Empty));
        assert_eq!(reason("   "), Some(InvalidReason::Empty));
        assert_eq!(reason("-5"), Some(InvalidReason::Negative));
        assert_eq!(reason("-"), Some(InvalidReason::NotANumber));
        assert_eq!(reason("1.5"), Some(InvalidReason::NotANumber));
        assert_eq!(reason("ten"), Some(InvalidReason::NotANumber));
        assert_eq!(reason("+"), Some(InvalidReason::NotANumber));
        assert_eq!(
            reason("99999999999999999999999"),
            Some(InvalidReason::TooLarge)
        );
    }

    #[test]
    fn rejected_submit_leaves_target_and_surface_alone() {
        let mut intake = BulkIntake::new();
        let mut target = Recorder::default();
        intake.open();
        intake.set_input("-5");
        assert!(!intake.can_submit());
        assert!(intake.submit(&mut target).is_err());
        assert!(target.applied.is_empty());
        assert!(intake.is_open());
        assert_eq!(intake.input(), "-5");
    }

    #[test]
    fn accepted_submit_applies_then_closes() {
        let mut intake = BulkIntake::new();
        let mut target = Recorder::default();
        intake.open();
        intake.set_input("25");
        assert!(intake.can_submit());
        assert_eq!(intake.submit(&mut target), Ok(25));
        assert_eq!(target.applied, vec![25]);
        assert!(!intake.is_open());
        assert_eq!(intake.input(), "");
    }
}
