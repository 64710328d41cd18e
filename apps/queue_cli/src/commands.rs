//! Line commands typed at the swipe prompt.

use shared::domain::Decision;

#[derive(Debug, Clone, PartialEq)]
pub enum SwipeCommand {
    Decide(Decision),
    Back,
    /// Simulated drag of the top card released at `dx`.
    Drag { dx: f32, dy: f32 },
    Reset,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  y | like           like the profile on top
  n | dislike        pass on the profile on top
  d <dx> [dy]        drag the card by dx (and dy) and release
  b | back           go back to the previous profile
  r | reset          reload the queue from the start
  s | status         show queue state
  q | quit           exit";

pub fn parse_command(line: &str) -> Result<SwipeCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(SwipeCommand::Status);
    };
    let command = match head.to_ascii_lowercase().as_str() {
        "y" | "yes" | "l" | "like" => SwipeCommand::Decide(Decision::Like),
        "n" | "no" | "dislike" => SwipeCommand::Decide(Decision::Dislike),
        "b" | "back" | "undo" => SwipeCommand::Back,
        "r" | "reset" => SwipeCommand::Reset,
        "s" | "status" => SwipeCommand::Status,
        "h" | "help" | "?" => SwipeCommand::Help,
        "q" | "quit" | "exit" => SwipeCommand::Quit,
        "d" | "drag" => {
            let dx = parse_offset(parts.next(), "dx")?;
            let dy = match parts.next() {
                Some(raw) => parse_offset(Some(raw), "dy")?,
                None => 0.0,
            };
            SwipeCommand::Drag { dx, dy }
        }
        other => return Err(format!("unknown command {other:?}, type 'help'")),
    };
    if parts.next().is_some() {
        return Err(format!("unexpected arguments after {head:?}"));
    }
    Ok(command)
}

fn parse_offset(raw: Option<&str>, name: &str) -> Result<f32, String> {
    let raw = raw.ok_or_else(|| format!("missing {name}"))?;
    raw.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("invalid {name}: {raw:?}"))
}
