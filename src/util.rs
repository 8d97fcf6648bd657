use instant::Duration;
use instant::Instant;

////////////////////////////////////////////////////////////////////////////////
// Timer

#[derive(Debug, Clone)]
enum TimerInner {
    Finite { end: Instant },
    Infinite,
}

/// Reasons a search may be cut off before it reaches a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarlyCutoff {
    TimerExpired,
}

/// A wall-clock deadline that callers poll between oracle queries.
///
/// Oracle calls are never interrupted; the timer is only consulted at the
/// boundaries between them.
#[derive(Debug, Clone)]
pub struct Timer(TimerInner);

impl Timer {
    pub fn finite(duration: Duration) -> Self {
        Timer(TimerInner::Finite {
            end: Instant::now() + duration,
        })
    }

    pub fn infinite() -> Self {
        Timer(TimerInner::Infinite)
    }

    pub fn from_millis(millis: Option<u64>) -> Self {
        match millis {
            Some(ms) => Self::finite(Duration::from_millis(ms)),
            None => Self::infinite(),
        }
    }

    pub fn tick(&self) -> Result<(), EarlyCutoff> {
        match self.0 {
            TimerInner::Finite { end } => {
                if Instant::now() > end {
                    Err(EarlyCutoff::TimerExpired)
                } else {
                    Ok(())
                }
            }
            TimerInner::Infinite => Ok(()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Utilities

pub fn subscript_numbers(s: &str) -> String {
    s.chars()
        .map(|digit| match digit {
            '0' => '₀',
            '1' => '₁',
            '2' => '₂',
            '3' => '₃',
            '4' => '₄',
            '5' => '₅',
            '6' => '₆',
            '7' => '₇',
            '8' => '₈',
            '9' => '₉',
            _ => digit,
        })
        .collect()
}
