/// Bounded retry budget for automatic error fixing. Re-armed to the full
/// budget whenever the user submits a fresh prompt; each retry consumes one
/// attempt. Once the budget is spent, `note_exhausted` reports true exactly
/// once so the caller can append a single terminal failure message.
#[derive(Debug, Clone, Copy)]
pub struct AutoFix {
    enabled: bool,
    max_attempts: u32,
    remaining: u32,
    exhaustion_reported: bool,
}

impl AutoFix {
    pub fn new(enabled: bool, max_attempts: u32) -> Self {
        Self {
            enabled,
            max_attempts,
            remaining: max_attempts,
            exhaustion_reported: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn configure(&mut self, enabled: bool, max_attempts: u32) {
        self.enabled = enabled;
        self.max_attempts = max_attempts;
        self.rearm();
    }

    pub fn rearm(&mut self) {
        self.remaining = self.max_attempts;
        self.exhaustion_reported = false;
    }

    /// Consume one attempt. Returns false when the budget is spent.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// True the first time it is called after the budget ran out.
    pub fn note_exhausted(&mut self) -> bool {
        if self.remaining > 0 || self.exhaustion_reported {
            return false;
        }
        self.exhaustion_reported = true;
        true
    }
}
