//! Editable dance programs.
//!
//! A program is an ordered list of [`Line`]s. Positions are the only identity
//! a line has: every insert or delete renumbers everything after it.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

pub mod frame;
mod text;

pub use frame::{ActionFrame, ActionGroup};
pub use text::{annotate, reannotate, strip_annotation, DELAY_KEYWORD, MOVE_KEYWORD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Move {
        servo_id: u8,
        angle_deg: u32,
        time_ms: u32,
    },
    Delay {
        duration_ms: u32,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Move {
                servo_id,
                angle_deg,
                time_ms,
            } => write!(
                f,
                "{}({}, {}, {});",
                MOVE_KEYWORD, servo_id, angle_deg, time_ms
            ),
            Instruction::Delay { duration_ms } => {
                write!(f, "{}({});", DELAY_KEYWORD, duration_ms)
            }
        }
    }
}

/// One program line: an instruction, or text kept verbatim so free-form notes
/// survive edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction(Instruction),
    Text(String),
}

impl Line {
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            Line::Instruction(instr) => Some(instr),
            Line::Text(_) => None,
        }
    }

    /// Text that names an instruction but whose arguments did not parse.
    pub fn is_malformed(&self) -> bool {
        match self {
            Line::Text(text) => text.contains(DELAY_KEYWORD) || text.contains(MOVE_KEYWORD),
            Line::Instruction(_) => false,
        }
    }
}

impl From<Instruction> for Line {
    fn from(instr: Instruction) -> Self {
        Line::Instruction(instr)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Instruction(instr) => instr.fmt(f),
            Line::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceProgram {
    lines: Vec<Line>,
}

impl SequenceProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never fails: lines that are not instructions are kept as text.
    pub fn parse(text: &str) -> Self {
        SequenceProgram {
            lines: text.lines().map(text::parse_line).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.lines.iter().filter_map(Line::instruction)
    }

    pub fn append(&mut self, instr: Instruction) {
        self.lines.push(instr.into());
    }

    pub fn append_move(&mut self, servo_id: u8, angle_deg: u32, time_ms: u32) {
        self.append(Instruction::Move {
            servo_id,
            angle_deg,
            time_ms,
        });
    }

    pub fn append_delay(&mut self, duration_ms: u32) {
        self.append(Instruction::Delay { duration_ms });
    }

    /// Inserts before `index`; `index == len` appends. Returns `false` and
    /// leaves the program untouched when `index > len`.
    pub fn insert(&mut self, index: usize, instr: Instruction) -> bool {
        if index > self.lines.len() {
            debug!(index, len = self.lines.len(), "insert out of range, ignored");
            return false;
        }

        self.lines.insert(index, instr.into());
        true
    }

    pub fn insert_move(
        &mut self,
        index: usize,
        servo_id: u8,
        angle_deg: u32,
        time_ms: u32,
    ) -> bool {
        self.insert(
            index,
            Instruction::Move {
                servo_id,
                angle_deg,
                time_ms,
            },
        )
    }

    pub fn insert_delay(&mut self, index: usize, duration_ms: u32) -> bool {
        self.insert(index, Instruction::Delay { duration_ms })
    }

    /// Removes the line at `index`, or does nothing when out of range.
    pub fn delete(&mut self, index: usize) -> Option<Line> {
        if index >= self.lines.len() {
            debug!(index, len = self.lines.len(), "delete out of range, ignored");
            return None;
        }

        Some(self.lines.remove(index))
    }

    /// Appends every line of `text`, returning how many were added.
    pub fn paste(&mut self, text: &str) -> usize {
        let before = self.lines.len();
        self.lines.extend(text.lines().map(text::parse_line));
        self.lines.len() - before
    }

    pub fn replace(&mut self, text: &str) {
        *self = Self::parse(text);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Renders the program with a position annotation on every line.
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SequenceProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&annotate(&line.to_string(), i + 1))?;
        }
        Ok(())
    }
}

impl FromStr for SequenceProgram {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl FromIterator<Instruction> for SequenceProgram {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        SequenceProgram {
            lines: iter.into_iter().map(Line::from).collect(),
        }
    }
}
