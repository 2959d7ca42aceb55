//! UCI command parsing.

use crate::search::SearchLimits;

#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(SearchLimits),
    SetOption { name: String, value: Option<String> },
    Stop,
    Quit,
    Display,
    Eval,
    Perft(usize),
    /// A bare FEN string on its own line loads the position
    BareFen(String),
    Unknown(String),
}

/// Parse the next token as type T.
#[inline]
fn parse_next<T: std::str::FromStr>(parts: &[&str], i: usize) -> Option<T> {
    parts.get(i + 1).and_then(|v| v.parse::<T>().ok())
}

#[must_use]
pub fn parse_go_limits(parts: &[&str]) -> SearchLimits {
    let mut limits = SearchLimits::default();
    let mut i = 1;

    while i < parts.len() {
        let consumed = match parts[i] {
            "depth" => {
                limits.depth = parse_next(parts, i);
                2
            }
            "nodes" => {
                limits.nodes = parse_next(parts, i);
                2
            }
            "movetime" => {
                limits.movetime = parse_next(parts, i);
                2
            }
            "wtime" => {
                limits.wtime = parse_next(parts, i);
                2
            }
            "btime" => {
                limits.btime = parse_next(parts, i);
                2
            }
            "winc" => {
                limits.winc = parse_next(parts, i);
                2
            }
            "binc" => {
                limits.binc = parse_next(parts, i);
                2
            }
            "movestogo" => {
                limits.movestogo = parse_next(parts, i);
                2
            }
            "infinite" => {
                limits.infinite = true;
                1
            }
            _ => 1,
        };
        i += consumed;
    }
    limits
}

/// Split a `setoption name X value Y` line into name and value.
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    let mut name_parts: Vec<&str> = Vec::new();
    let mut value_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for part in parts.iter().skip(1) {
        match *part {
            "name" => mode = "name",
            "value" => mode = "value",
            _ => match mode {
                "name" => name_parts.push(part),
                "value" => value_parts.push(part),
                _ => {}
            },
        }
    }

    if name_parts.is_empty() {
        return None;
    }
    let value = if value_parts.is_empty() {
        None
    } else {
        Some(value_parts.join(" "))
    };
    Some((name_parts.join(" "), value))
}

/// True when a line looks like a bare FEN: a piece-placement field with
/// seven rank separators followed by a side to move.
fn looks_like_fen(parts: &[&str]) -> bool {
    parts.len() >= 2
        && parts[0].matches('/').count() == 7
        && matches!(parts[1], "w" | "b")
}

#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let owned = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<_>>();

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned()),
        "go" => UciCommand::Go(parse_go_limits(&parts)),
        "setoption" => match parse_setoption(&parts) {
            Some((name, value)) => UciCommand::SetOption { name, value },
            None => UciCommand::Unknown(trimmed.to_string()),
        },
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "d" => UciCommand::Display,
        "eval" => UciCommand::Eval,
        "perft" => UciCommand::Perft(parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(1)),
        _ if looks_like_fen(&parts) => UciCommand::BareFen(trimmed.to_string()),
        _ => UciCommand::Unknown(trimmed.to_string()),
    };

    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_limits() {
        let parts: Vec<&str> = "go wtime 30000 btime 29000 winc 100 binc 100 movestogo 12"
            .split_whitespace()
            .collect();
        let limits = parse_go_limits(&parts);
        assert_eq!(limits.wtime, Some(30000));
        assert_eq!(limits.btime, Some(29000));
        assert_eq!(limits.winc, Some(100));
        assert_eq!(limits.movestogo, Some(12));
        assert!(!limits.infinite);
    }

    #[test]
    fn test_parse_go_depth_and_infinite() {
        let parts: Vec<&str> = "go depth 9 infinite".split_whitespace().collect();
        let limits = parse_go_limits(&parts);
        assert_eq!(limits.depth, Some(9));
        assert!(limits.infinite);
    }

    #[test]
    fn test_parse_setoption_multiword() {
        let parts: Vec<&str> = "setoption name Move Overhead value 120"
            .split_whitespace()
            .collect();
        let (name, value) = parse_setoption(&parts).unwrap();
        assert_eq!(name, "Move Overhead");
        assert_eq!(value.as_deref(), Some("120"));
    }

    #[test]
    fn test_bare_fen_detection() {
        let cmd = parse_uci_command("8/8/8/8/8/8/6k1/4K2R w K - 0 1").unwrap();
        assert!(matches!(cmd, UciCommand::BareFen(_)));

        let cmd = parse_uci_command("ponderhit").unwrap();
        assert!(matches!(cmd, UciCommand::Unknown(_)));
    }
}
