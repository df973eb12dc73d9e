use super::{Instruction, Line};

pub const MOVE_KEYWORD: &str = "Servo_Do";
pub const DELAY_KEYWORD: &str = "HAL_Delay";

const ANNOTATION_MARK: &str = "//";
const ANNOTATION_MIN_DIGITS: usize = 2;

/// Removes a trailing `//NN` position annotation (two or more digits) and the
/// surrounding whitespace.
pub fn strip_annotation(line: &str) -> &str {
    let line = line.trim();
    if let Some(pos) = line.rfind(ANNOTATION_MARK) {
        let digits = &line[pos + ANNOTATION_MARK.len()..];
        if digits.len() >= ANNOTATION_MIN_DIGITS && digits.bytes().all(|b| b.is_ascii_digit()) {
            return line[..pos].trim();
        }
    }

    line
}

/// `number` is 1-based.
pub fn annotate(content: &str, number: usize) -> String {
    format!("{}  {}{:02}", content, ANNOTATION_MARK, number)
}

/// Renumbers every line of `text` by position without interpreting it.
/// Applying it twice gives the same text as applying it once.
pub fn reannotate(text: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| annotate(strip_annotation(line), i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A line is an instruction only when it holds nothing but the call and an
/// optional `;`. Anything else stays text so no content is lost on rewrite.
pub(super) fn parse_line(raw: &str) -> Line {
    let content = strip_annotation(raw);

    let parsed = if let Some(args) = content.strip_prefix(DELAY_KEYWORD) {
        parse_args::<1>(args).map(|[duration_ms]| Instruction::Delay { duration_ms })
    } else if let Some(args) = content.strip_prefix(MOVE_KEYWORD) {
        parse_args::<3>(args).and_then(|[servo_id, angle_deg, time_ms]| {
            Some(Instruction::Move {
                servo_id: servo_id.try_into().ok()?,
                angle_deg,
                time_ms,
            })
        })
    } else {
        None
    };

    match parsed {
        Some(instr) => Line::Instruction(instr),
        None => Line::Text(content.to_owned()),
    }
}

/// Reads `(a, b, ..);` holding exactly `N` unsigned integers. The `;` is
/// optional, any other trailing content is refused.
fn parse_args<const N: usize>(rest: &str) -> Option<[u32; N]> {
    let inner = rest.trim_start().strip_prefix('(')?;
    let close = inner.find(')')?;
    let tail = inner[close + 1..].trim();
    if !(tail.is_empty() || tail == ";") {
        return None;
    }

    let mut out = [0u32; N];
    let mut parts = inner[..close].split(',');
    for slot in out.iter_mut() {
        let part = parts.next()?.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(out)
}
