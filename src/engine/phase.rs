//! Engine phases.

use std::fmt;

/// One of the four sequential stages of a triggered run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Failsafes,
    Savers,
    Disablers,
    Destructors,
}

impl Phase {
    /// Fixed execution order.
    pub const ORDER: [Phase; 4] = [
        Phase::Failsafes,
        Phase::Savers,
        Phase::Disablers,
        Phase::Destructors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Failsafes => "failsafes",
            Phase::Savers => "savers",
            Phase::Disablers => "disablers",
            Phase::Destructors => "destructors",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
