use std::num::ParseIntError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Steps by one.
    #[default]
    Linear,
    /// Doubles up; halves (rounding up) down, but never below 2.
    Exponential,
}

/// A number with `<` and `>` buttons and an editable text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stepper {
    value: i64,
    mode: StepMode,
}

impl Stepper {
    pub fn new(value: i64, mode: StepMode) -> Self {
        Self { value, mode }
    }

    pub fn linear(value: i64) -> Self {
        Self::new(value, StepMode::Linear)
    }

    pub fn exponential(value: i64) -> Self {
        Self::new(value, StepMode::Exponential)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn mode(&self) -> StepMode {
        self.mode
    }

    /// The `<` button.
    pub fn step_down(&mut self) -> i64 {
        self.value = match self.mode {
            StepMode::Linear => self.value.saturating_sub(1),
            StepMode::Exponential if self.value > 2 => self.value / 2 + self.value % 2,
            StepMode::Exponential => self.value,
        };
        self.value
    }

    /// The `>` button.
    pub fn step_up(&mut self) -> i64 {
        self.value = match self.mode {
            StepMode::Linear => self.value.saturating_add(1),
            StepMode::Exponential => self.value.saturating_mul(2),
        };
        self.value
    }

    /// Text typed into the field. The value is left unchanged if it does not parse.
    pub fn set_from_input(&mut self, input: &str) -> Result<i64, ParseIntError> {
        self.value = input.trim().parse()?;
        Ok(self.value)
    }
}

impl Default for Stepper {
    fn default() -> Self {
        Self::linear(0)
    }
}
