//! Continuation and reversal grading over the W1/D1/H4/M15 stack.

use super::topdown::TopDownSnapshot;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::structure::types::{Direction, StructureLabel, StructureSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            9.. => Grade::APlus,
            6..=8 => Grade::A,
            4..=5 => Grade::B,
            _ => Grade::C,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::APlus => write!(f, "A+"),
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeContext {
    Continuation,
    Reversal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub alignment: u32,
    pub structural_bonus: u32,
    pub momentum: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.alignment + self.structural_bonus + self.momentum
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityScore {
    pub grade: Grade,
    pub total_score: u32,
    pub context: TradeContext,
    pub breakdown: ScoreBreakdown,
}

impl OpportunityScore {
    fn new(context: TradeContext, breakdown: ScoreBreakdown) -> Self {
        let total_score = breakdown.total();
        Self {
            grade: Grade::from_score(total_score),
            total_score,
            context,
            breakdown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunitySnapshot {
    pub continuation: OpportunityScore,
    pub reversal: OpportunityScore,
}

/// Grade both trade contexts. `None` unless W1, D1, H4 and M15 are present.
pub fn grade_opportunity(topdown: &TopDownSnapshot) -> Option<OpportunitySnapshot> {
    let weekly = topdown.snapshot(Timeframe::W1)?;
    let daily = topdown.snapshot(Timeframe::D1)?;
    let h4 = topdown.snapshot(Timeframe::H4)?;
    let m15 = topdown.snapshot(Timeframe::M15)?;

    Some(OpportunitySnapshot {
        continuation: continuation_score(weekly, daily, h4, m15),
        reversal: reversal_score(weekly, daily, h4, m15),
    })
}

pub fn continuation_score(
    weekly: &StructureSnapshot,
    daily: &StructureSnapshot,
    h4: &StructureSnapshot,
    m15: &StructureSnapshot,
) -> OpportunityScore {
    let dominant = if weekly.bias.external.is_neutral() {
        daily.bias.external
    } else {
        weekly.bias.external
    };

    let mut alignment = 0;
    if daily.bias.external == weekly.bias.external {
        alignment += 3;
    }
    alignment += cascade(daily, h4, m15);

    OpportunityScore::new(
        TradeContext::Continuation,
        ScoreBreakdown {
            alignment,
            structural_bonus: structural_bonus(h4.state, dominant),
            momentum: momentum_support(m15.momentum, dominant),
        },
    )
}

/// Pressure builds when the daily disagrees with the weekly and the lower
/// timeframes follow the daily.
pub fn reversal_score(
    weekly: &StructureSnapshot,
    daily: &StructureSnapshot,
    h4: &StructureSnapshot,
    m15: &StructureSnapshot,
) -> OpportunityScore {
    let (w, d) = (weekly.bias.external, daily.bias.external);

    let mut alignment = 0;
    if !w.is_neutral() && !d.is_neutral() && w != d {
        alignment += 3;
    }
    alignment += cascade(daily, h4, m15);

    OpportunityScore::new(
        TradeContext::Reversal,
        ScoreBreakdown {
            alignment,
            structural_bonus: 0,
            momentum: momentum_support(m15.momentum, d),
        },
    )
}

fn cascade(daily: &StructureSnapshot, h4: &StructureSnapshot, m15: &StructureSnapshot) -> u32 {
    let mut score = 0;
    if h4.bias.external == daily.bias.external {
        score += 2;
    }
    if m15.bias.external == h4.bias.external {
        score += 1;
    }
    score
}

fn structural_bonus(state: StructureLabel, dominant: Direction) -> u32 {
    if dominant.is_neutral() || state.direction() != dominant {
        return 0;
    }
    if state.is_correction() { 2 } else { 1 }
}

fn momentum_support(momentum: i32, direction: Direction) -> u32 {
    let agreeing = match direction {
        Direction::Bullish => momentum > 0,
        Direction::Bearish => momentum < 0,
        Direction::Neutral => return 0,
    };
    if agreeing {
        2
    } else if momentum == 0 {
        1
    } else {
        0
    }
}
