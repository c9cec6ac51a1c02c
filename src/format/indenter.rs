/// `IndentTracker` - Indentation-based block structure
///
/// Keeps a stack of indent increments for one input file. The sum of the
/// stack is always the leading whitespace of the last processed line, and
/// its length is the logical block depth.
use crate::error::BuildError;

/// Classification of a line's indentation relative to the previous line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentChange {
    /// One new level was opened
    Increase,
    /// Same level as the previous line
    Same,
    /// `popped` levels were closed. `aligned` is false when the new
    /// indentation did not land on a previously recorded level.
    Decrease { popped: usize, aligned: bool },
}

/// What the previous line allows the next line to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentExpectation {
    /// Next line must not be deeper
    #[default]
    Forbidden,
    /// Next line may open a block or stay level (labels)
    Optional,
    /// Next line must be deeper (lines ending with `:`)
    Required,
}

#[derive(Debug, Clone, Default)]
pub struct IndentTracker {
    /// Width of each open level, outermost first
    increments: Vec<usize>,
    /// Depth of the previously validated line
    prev_depth: usize,
    /// Constraint set by the previous line
    expectation: IndentExpectation,
}

impl IndentTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.increments.len()
    }

    /// Leading whitespace width of the current level
    #[must_use]
    pub fn total(&self) -> usize {
        self.increments.iter().sum()
    }

    #[must_use]
    pub fn expectation(&self) -> IndentExpectation {
        self.expectation
    }

    /// Update the stack for a line with `leading` whitespace characters.
    ///
    /// A misaligned dedent pops every level deeper than `leading` and then
    /// records the remainder as a fresh level so the stack sum still equals
    /// `leading`. The caller decides whether that is fatal.
    pub fn update(&mut self, leading: usize) -> IndentChange {
        let total = self.total();

        if leading > total {
            self.increments.push(leading - total);
            return IndentChange::Increase;
        }
        if leading == total {
            return IndentChange::Same;
        }

        let mut popped = 0;
        let mut sum = total;
        while sum > leading {
            match self.increments.pop() {
                Some(width) => {
                    sum -= width;
                    popped += 1;
                }
                None => break,
            }
        }

        let aligned = sum == leading;
        if !aligned {
            self.increments.push(leading - sum);
        }
        IndentChange::Decrease { popped, aligned }
    }

    /// Check the current depth against what the previous line expected,
    /// then remember the depth for the next check.
    pub fn validate(&mut self) -> Result<(), BuildError> {
        let depth = self.depth();
        let deeper = depth > self.prev_depth;
        self.prev_depth = depth;

        match self.expectation {
            IndentExpectation::Required if !deeper => Err(BuildError::ExpectedIndent),
            IndentExpectation::Forbidden if deeper => Err(BuildError::UnexpectedIndent),
            _ => Ok(()),
        }
    }

    /// Set the constraint for the next non-blank line
    pub fn expect_next(&mut self, expectation: IndentExpectation) {
        self.expectation = expectation;
    }

    /// Nearest recorded level at or below `leading`, used in error messages
    #[must_use]
    pub fn nearest_level(&self, leading: usize) -> usize {
        let mut sum = 0;
        for width in &self.increments {
            if sum + width > leading {
                break;
            }
            sum += width;
        }
        sum
    }
}
