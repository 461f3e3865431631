// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Control lines accepted on stdin while `printprobe auto` runs.

/// One parsed control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    Print,
    Interval(u32),
    Copies(u32),
    Timeout(u64),
    Reset,
    Status,
    Quit,
    Help,
}

pub const HELP: &str = "commands: print | interval <minutes> | copies <n> | timeout <secs> | reset | status | quit";

impl ControlLine {
    /// Parse a trimmed, case-insensitive command. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let mut words = line.split_whitespace();
        let command = words.next()?.to_ascii_lowercase();
        let argument = words.next();

        let parsed = match (command.as_str(), argument) {
            ("print" | "p", None) => Ok(Self::Print),
            ("reset", None) => Ok(Self::Reset),
            ("status" | "s", None) => Ok(Self::Status),
            ("quit" | "exit" | "q", None) => Ok(Self::Quit),
            ("help" | "?", None) => Ok(Self::Help),
            ("interval", Some(arg)) => number(arg).map(Self::Interval),
            ("copies", Some(arg)) => number(arg).map(Self::Copies),
            ("timeout", Some(arg)) => number(arg).map(Self::Timeout),
            ("interval" | "copies" | "timeout", None) => Err(format!("{command} needs a number")),
            _ => Err(format!("unknown command '{}'; {HELP}", line.trim())),
        };

        if parsed.is_ok() && words.next().is_some() {
            return Some(Err(format!("too many arguments in '{}'", line.trim())));
        }
        Some(parsed)
    }
}

fn number<T: std::str::FromStr>(arg: &str) -> Result<T, String> {
    arg.parse().map_err(|_| format!("'{arg}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(ControlLine::parse("print"), Some(Ok(ControlLine::Print)));
        assert_eq!(ControlLine::parse("  Interval 10 "), Some(Ok(ControlLine::Interval(10))));
        assert_eq!(ControlLine::parse("copies 3"), Some(Ok(ControlLine::Copies(3))));
        assert_eq!(ControlLine::parse("timeout 60"), Some(Ok(ControlLine::Timeout(60))));
        assert_eq!(ControlLine::parse("q"), Some(Ok(ControlLine::Quit)));
        assert_eq!(ControlLine::parse("   "), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(ControlLine::parse("interval"), Some(Err(_))));
        assert!(matches!(ControlLine::parse("copies two"), Some(Err(_))));
        assert!(matches!(ControlLine::parse("print now"), Some(Err(_))));
        assert!(matches!(ControlLine::parse("frobnicate"), Some(Err(_))));
        assert!(matches!(ControlLine::parse("copies -1"), Some(Err(_))));
    }
}
