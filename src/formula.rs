use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use crate::ingredient::Ingredient;

/// Rounding tolerance for the "does this formula sum to 100%" apply gate.
pub const TOTAL_TOLERANCE: f32 = 0.01;

/// Round to two decimals, the precision used for displayed percentages and
/// currency amounts.
pub(crate) fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug)]
pub enum FormulaError {
    DuplicateLine(String),
    UnknownLine(String),
    InvalidPercentage(f32),
    TotalExceeded { attempted: f32 },
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::DuplicateLine(name) => {
                write!(f, "Formula already contains a line for '{}'", name)
            }
            FormulaError::UnknownLine(name) => {
                write!(f, "No formula line for ingredient '{}'", name)
            }
            FormulaError::InvalidPercentage(percentage) => {
                write!(f, "Invalid percentage: {}", percentage)
            }
            FormulaError::TotalExceeded { attempted } => {
                write!(
                    f,
                    "Total percentage would reach {:.2}, above 100",
                    attempted
                )
            }
        }
    }
}

impl Error for FormulaError {}

/// One allocation line: an ingredient at an inclusion percentage.
/// `total_cost` is always derived from the stored percentage, never carried
/// independently.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FormulaLine {
    pub ingredient: String,
    pub percentage: f32,
    pub cost_per_kg: f32,
    pub total_cost: f32,
}

impl FormulaLine {
    pub fn new(ingredient: &str, percentage: f32, cost_per_kg: f32) -> Self {
        let mut line = FormulaLine {
            ingredient: ingredient.to_string(),
            percentage: 0.0,
            cost_per_kg,
            total_cost: 0.0,
        };
        line.set_percentage(percentage);
        line
    }

    pub(crate) fn set_percentage(&mut self, percentage: f32) {
        self.percentage = round2(percentage);
        self.total_cost = round2(self.cost_per_kg * self.percentage / 100.0);
    }

    pub(crate) fn add_percentage(&mut self, extra: f32) {
        self.set_percentage(self.percentage + extra);
    }
}

/// A set of formula lines, unique by ingredient name. Intermediate states may
/// sum to anything; `is_balanced` is the gate a caller checks before treating
/// the formula as final.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Formula {
    lines: Vec<FormulaLine>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_lines(lines: Vec<FormulaLine>) -> Self {
        Formula { lines }
    }

    pub fn lines(&self) -> &[FormulaLine] {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<FormulaLine> {
        &mut self.lines
    }

    pub fn line(&self, ingredient: &str) -> Option<&FormulaLine> {
        self.lines.iter().find(|line| line.ingredient == ingredient)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Add a new line. Rejected without mutating the formula when the
    /// ingredient already has a line, the percentage is not a positive finite
    /// number, or the resulting total would exceed 100.
    pub fn add_line(&mut self, ingredient: &Ingredient, percentage: f32) -> Result<(), FormulaError> {
        if self.line(&ingredient.name).is_some() {
            return Err(FormulaError::DuplicateLine(ingredient.name.clone()));
        }
        if !percentage.is_finite() || percentage <= 0.0 {
            return Err(FormulaError::InvalidPercentage(percentage));
        }
        let attempted = self.total_percentage() + percentage;
        if attempted > 100.0 + TOTAL_TOLERANCE {
            return Err(FormulaError::TotalExceeded { attempted });
        }
        self.lines.push(FormulaLine::new(
            &ingredient.name,
            percentage,
            ingredient.price_per_kg,
        ));
        Ok(())
    }

    /// Replace one line's percentage and recompute its cost. Other lines are
    /// never renormalized; whether the new total is acceptable is the
    /// caller's call (compare against 100 within `TOTAL_TOLERANCE`).
    pub fn set_line_percentage(
        &mut self,
        ingredient: &str,
        percentage: f32,
    ) -> Result<(), FormulaError> {
        if !percentage.is_finite() || percentage < 0.0 {
            return Err(FormulaError::InvalidPercentage(percentage));
        }
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.ingredient == ingredient)
            .ok_or_else(|| FormulaError::UnknownLine(ingredient.to_string()))?;
        line.set_percentage(percentage);
        Ok(())
    }

    /// Drop a line. Its percentage is not redistributed; redistribution is a
    /// deliberate follow-up action (`optim::allocator::distribute_remainder`).
    pub fn remove_line(&mut self, ingredient: &str) -> Result<FormulaLine, FormulaError> {
        let index = self
            .lines
            .iter()
            .position(|line| line.ingredient == ingredient)
            .ok_or_else(|| FormulaError::UnknownLine(ingredient.to_string()))?;
        Ok(self.lines.remove(index))
    }

    pub fn total_percentage(&self) -> f32 {
        self.lines.iter().map(|line| line.percentage).sum()
    }

    pub fn total_cost(&self) -> f32 {
        self.lines.iter().map(|line| line.total_cost).sum()
    }

    pub fn is_balanced(&self, epsilon: f32) -> bool {
        (self.total_percentage() - 100.0).abs() <= epsilon
    }

    /// Percentage map keyed by ingredient name, the aggregator's input shape.
    pub fn percentages(&self) -> HashMap<String, f32> {
        self.lines
            .iter()
            .map(|line| (line.ingredient.clone(), line.percentage))
            .collect()
    }
}
