//! All-servo snapshots: one frame holds a target angle and a duration for
//! every channel. Kept apart from the instruction list on purpose: the two
//! formats do not mix.

use crate::SERVO_COUNT;

use super::Instruction;

const FIELDS_PER_LINE: usize = SERVO_COUNT * 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFrame {
    pub angles: [i32; SERVO_COUNT],
    pub times: [i32; SERVO_COUNT],
}

impl ActionFrame {
    pub fn new(angles: [i32; SERVO_COUNT], times: [i32; SERVO_COUNT]) -> Self {
        ActionFrame { angles, times }
    }

    /// `angles` then `times`, comma joined.
    pub fn to_line(&self) -> String {
        self.angles
            .iter()
            .chain(self.times.iter())
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn from_line(line: &str) -> Option<Self> {
        let values = line
            .trim()
            .split(',')
            .map(|v| v.trim().parse::<i32>().ok())
            .collect::<Option<Vec<_>>>()?;

        if values.len() != FIELDS_PER_LINE {
            return None;
        }

        let mut frame = ActionFrame {
            angles: [0; SERVO_COUNT],
            times: [0; SERVO_COUNT],
        };
        frame.angles.copy_from_slice(&values[..SERVO_COUNT]);
        frame.times.copy_from_slice(&values[SERVO_COUNT..]);
        Some(frame)
    }

    /// One move per channel, servo ids starting at 1. Channels with a
    /// negative angle or time are left out.
    pub fn moves(&self) -> impl Iterator<Item = Instruction> + '_ {
        self.angles
            .iter()
            .zip(self.times.iter())
            .enumerate()
            .filter_map(|(i, (angle, time))| {
                Some(Instruction::Move {
                    servo_id: (i + 1) as u8,
                    angle_deg: u32::try_from(*angle).ok()?,
                    time_ms: u32::try_from(*time).ok()?,
                })
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionGroup {
    pub frames: Vec<ActionFrame>,
}

impl ActionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_frame(&mut self, angles: [i32; SERVO_COUNT], times: [i32; SERVO_COUNT]) {
        self.frames.push(ActionFrame::new(angles, times));
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.frames.iter().map(ActionFrame::to_line).collect()
    }

    /// Replaces the frames. Lines without exactly 48 integers are dropped.
    pub fn from_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.frames = lines
            .into_iter()
            .filter_map(|line| ActionFrame::from_line(line.as_ref()))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(angle: i32, time: i32) -> ActionFrame {
        ActionFrame::new([angle; SERVO_COUNT], [time; SERVO_COUNT])
    }

    #[test]
    fn line_holds_angles_then_times() {
        let mut f = frame(120, 500);
        f.angles[0] = 10;
        f.times[23] = 7;

        let line = f.to_line();
        let fields: Vec<_> = line.split(',').collect();
        assert_eq!(fields.len(), 48);
        assert_eq!(fields[0], "10");
        assert_eq!(fields[1], "120");
        assert_eq!(fields[24], "500");
        assert_eq!(fields[47], "7");
        assert_eq!(ActionFrame::from_line(&line), Some(f));
    }

    #[test]
    fn drops_lines_with_wrong_width() {
        let good = frame(30, 40).to_line();
        let short = vec!["1"; 47].join(",");
        let long = vec!["1"; 49].join(",");

        let mut group = ActionGroup::new();
        group.add_frame([0; SERVO_COUNT], [0; SERVO_COUNT]);
        group.from_lines([short.as_str(), good.as_str(), long.as_str(), "", "a,b"]);
        assert_eq!(group.frames, vec![frame(30, 40)]);
        assert_eq!(group.to_lines(), vec![good]);

        group.clear();
        assert!(group.frames.is_empty());
    }

    #[test]
    fn frame_expands_to_moves() {
        let mut f = frame(90, 300);
        f.angles[2] = -1;
        let moves: Vec<_> = f.moves().collect();
        assert_eq!(moves.len(), 23);
        assert_eq!(
            moves[0],
            Instruction::Move {
                servo_id: 1,
                angle_deg: 90,
                time_ms: 300
            }
        );
        assert!(matches!(moves[2], Instruction::Move { servo_id: 4, .. }));
    }
}
