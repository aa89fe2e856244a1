//! Input line parsing.
//!
//! `w`/`a`/`s`/`d` step one cell (y grows downwards), `move X Y` requests an
//! arbitrary cell, `quit` leaves.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Relative step from the last known position
    Step { dx: i64, dy: i64 },
    /// Absolute target cell
    MoveTo { x: i64, y: i64 },
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty input".to_string());
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "w" | "up" => Command::Step { dx: 0, dy: -1 },
        "s" | "down" => Command::Step { dx: 0, dy: 1 },
        "a" | "left" => Command::Step { dx: -1, dy: 0 },
        "d" | "right" => Command::Step { dx: 1, dy: 0 },
        "q" | "quit" | "exit" => Command::Quit,
        "move" | "m" => {
            let (Some(x), Some(y)) = (words.next(), words.next()) else {
                return Err("usage: move X Y".to_string());
            };
            let x = x.parse::<i64>().map_err(|_| format!("invalid x: {x}"))?;
            let y = y.parse::<i64>().map_err(|_| format!("invalid y: {y}"))?;
            Command::MoveTo { x, y }
        }
        other => return Err(format!("unknown command: {other}")),
    };

    if words.next().is_some() {
        return Err(format!("too many arguments: {line}"));
    }
    Ok(command)
}
