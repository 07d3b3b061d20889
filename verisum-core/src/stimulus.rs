/// Content the presentation surface can show. Semantic only; how each
/// variant is drawn is the surface's business.
#[derive(Debug, Clone, PartialEq)]
pub enum Stimulus {
    /// Neutral fixation cue
    Fixation,
    /// The two operands of the addition, shown stacked
    Problem { left: u32, right: u32 },
    /// The presented sum the participant judges
    Probe { value: u32 },
    /// Free-form instruction text (welcome and debrief screens)
    Message(String),
}

/// One generated addition problem: two operands and the value presented for
/// judgement, which either equals their sum or is off by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumProblem {
    pub left: u32,
    pub right: u32,
    pub presented: u32,
}

impl SumProblem {
    pub fn true_sum(&self) -> u32 {
        self.left + self.right
    }

    /// Whether the presented value equals the true sum
    pub fn is_match(&self) -> bool {
        self.presented == self.true_sum()
    }
}
