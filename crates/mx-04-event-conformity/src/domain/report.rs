//! The conformity report bitset.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use super::code::{Code, NUM_CODES};

/// One bit per violated rule. Clean means fully conforming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Report(u64);

impl Report {
    pub const CLEAN: Report = Report(0);

    pub const ALL: Report = Report((1u64 << NUM_CODES) - 1);

    pub const fn of(codes: &[Code]) -> Report {
        let mut bits = 0;
        let mut i = 0;
        while i < codes.len() {
            bits |= codes[i].bit();
            i += 1;
        }
        Report(bits)
    }

    /// Bits outside the known rules are dropped.
    pub const fn from_bits(bits: u64) -> Report {
        Report(bits & Report::ALL.0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn has(self, code: Code) -> bool {
        self.0 & code.bit() != 0
    }

    pub fn set(&mut self, code: Code) {
        self.0 |= code.bit();
    }

    pub fn del(&mut self, code: Code) {
        self.0 &= !code.bit();
    }

    pub const fn clean(self) -> bool {
        self.0 == 0
    }

    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// This report with every rule in `mask` cleared.
    pub const fn without(self, mask: Report) -> Report {
        Report(self.0 & !mask.0)
    }

    /// Set codes in bit order.
    pub fn iter(self) -> impl Iterator<Item = Code> {
        Code::ALL.into_iter().filter(move |code| self.has(*code))
    }

    pub fn names(self) -> Vec<&'static str> {
        self.iter().map(Code::name).collect()
    }

    /// Parse reflected names; `None` if any name is unknown.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<Report> {
        names
            .into_iter()
            .try_fold(Report::CLEAN, |report, name| Some(report | Code::from_name(name)?))
    }
}

impl From<Code> for Report {
    fn from(code: Code) -> Self {
        Report(code.bit())
    }
}

impl FromIterator<Code> for Report {
    fn from_iter<I: IntoIterator<Item = Code>>(iter: I) -> Self {
        iter.into_iter().fold(Report::CLEAN, |report, code| report | code)
    }
}

impl BitOr for Report {
    type Output = Report;

    fn bitor(self, rhs: Report) -> Report {
        Report(self.0 | rhs.0)
    }
}

impl BitOr<Code> for Report {
    type Output = Report;

    fn bitor(self, rhs: Code) -> Report {
        Report(self.0 | rhs.bit())
    }
}

impl BitOrAssign for Report {
    fn bitor_assign(&mut self, rhs: Report) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for code in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(code.name())?;
            first = false;
        }
        Ok(())
    }
}
