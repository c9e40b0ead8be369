use tracing::debug;

use crate::code::{binary_array_to_decimal, Code};
use crate::mode::{GameMode, Representation};
use crate::timer::Millis;

/// Correct answers between full deals refreshes
pub const REFRESH_EVERY: u32 = 5;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    TimeExpired,
}

impl Outcome {
    /// Whether the game is over and needs a full reset
    pub fn ends_game(self) -> bool {
        !matches!(self, Outcome::Correct)
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Awaiting,
    Resolved(Outcome),
}

/// How much of the menu gets redrawn for the next round
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// New deals from the catalog and a new order
    Catalog,
    /// New order from the deals on display
    OrderOnly,
}

pub fn refresh_after_correct(score: u32) -> Refresh {
    if score > 0 && score % REFRESH_EVERY == 0 {
        Refresh::Catalog
    } else {
        Refresh::OrderOnly
    }
}

/// The pair of numbers actually compared, as (true, current).
///
/// In bit modes the true value comes from the order's bit array and the
/// current value from the shown bits. In reverse the order carries a decimal
/// target and the shown bits are read back into a decimal.
pub fn compared_values(mode: GameMode, expected: Code, shown: Code) -> (u8, u8) {
    match mode.policy().exposed_as {
        Representation::Bits => (
            binary_array_to_decimal(&expected.bits()),
            binary_array_to_decimal(&shown.bits()),
        ),
        Representation::Decimal => (expected.decimal(), binary_array_to_decimal(&shown.bits())),
    }
}

/// What the result overlay shows after an evaluation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub outcome: Outcome,
    pub mode: GameMode,
    pub expected: Code,
    pub shown: Option<Code>,
}

impl Feedback {
    /// The true code in both forms, ordered by what the player was given.
    pub fn true_line(&self) -> String {
        let (decimal, binary) = (self.expected.decimal(), self.expected.binary_string());
        match self.mode.policy().exposed_as {
            Representation::Bits => format!("{}(10) -> {}(2)", decimal, binary),
            Representation::Decimal => format!("{}(2) -> {}(10)", binary, decimal),
        }
    }

    /// The mismatch line; reverse compares in decimal, the rest in binary.
    pub fn current_line(&self) -> Option<String> {
        let shown = self.shown?;
        if self.outcome != Outcome::Incorrect {
            return None;
        }
        Some(match self.mode.policy().exposed_as {
            Representation::Bits => format!(
                "{}(2) != {}(2)",
                shown.binary_string(),
                self.expected.binary_string()
            ),
            Representation::Decimal => format!(
                "{}(2) != {}(10)",
                self.expected.binary_string(),
                shown.decimal()
            ),
        })
    }
}

/// Round lifecycle: Idle -> Awaiting -> Resolved -> Idle
#[derive(Debug, Clone, Default)]
pub struct AnswerEvaluator {
    phase: Phase,
}

impl AnswerEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == Phase::Awaiting
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn begin(&mut self) {
        self.phase = Phase::Awaiting;
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Resolve as timed out. No-op unless awaiting.
    pub fn expire(&mut self, mode: GameMode, expected: Code) -> Option<Feedback> {
        if !self.is_awaiting() {
            return None;
        }
        self.phase = Phase::Resolved(Outcome::TimeExpired);
        debug!(%mode, "round timed out");

        Some(Feedback {
            outcome: Outcome::TimeExpired,
            mode,
            expected,
            shown: None,
        })
    }

    /// Judge a shown code. No-op unless awaiting; an exhausted timer wins
    /// over the submission.
    pub fn evaluate(
        &mut self,
        mode: GameMode,
        expected: Code,
        shown: Code,
        remaining_ms: Millis,
    ) -> Option<Feedback> {
        if !self.is_awaiting() {
            return None;
        }
        if remaining_ms == 0 {
            return self.expire(mode, expected);
        }

        let (true_value, current_value) = compared_values(mode, expected, shown);
        let outcome = if true_value == current_value {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        debug!(%mode, true_value, current_value, ?outcome, remaining_ms, "evaluated submission");
        self.phase = Phase::Resolved(outcome);

        Some(Feedback {
            outcome,
            mode,
            expected,
            shown: Some(shown),
        })
    }
}
