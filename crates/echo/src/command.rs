/*
 * command.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::time::Duration;

/// The Echo language. A cell holds one command; lines ending with a
/// backslash are joined first. Anything that isn't a command is echoed back.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Echo(String),
    Print(String),
    Eprint(String),
    Error(String),
    Input(String),
    Sleep(Duration),
    Defer(Duration, String),
    Exit { keep_kernel: bool },
    Nothing,
}

impl Command {
    /// Names of the commands, in completion order
    pub const NAMES: &'static [&'static str] = &[
        "defer", "eprint", "error", "exit", "input", "print", "sleep",
    ];

    pub fn parse(code: &str) -> Result<Command, String> {
        let code = code.replace("\\\n", " ");
        let code = code.trim();
        if code.is_empty() {
            return Ok(Command::Nothing);
        }

        let (name, rest) = match code.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim_start()),
            None => (code, ""),
        };

        let command = match name {
            "print" => Command::Print(String::from(rest)),
            "eprint" => Command::Eprint(String::from(rest)),
            "error" => Command::Error(String::from(rest)),
            "input" => Command::Input(String::from(rest)),
            "sleep" => Command::Sleep(parse_millis(rest)?),
            "defer" => {
                let (millis, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Command::Defer(parse_millis(millis)?, String::from(text.trim_start()))
            },
            "exit" => match rest {
                "" => Command::Exit { keep_kernel: false },
                "keep" => Command::Exit { keep_kernel: true },
                other => return Err(format!("Unexpected argument to `exit`: '{other}'")),
            },
            _ => Command::Echo(String::from(code)),
        };
        Ok(command)
    }

    pub fn help(name: &str) -> Option<&'static str> {
        let help = match name {
            "print" => "print <text>: writes text to stdout",
            "eprint" => "eprint <text>: writes text to stderr",
            "error" => "error <message>: raises an error",
            "input" => "input <prompt>: asks the user for a value and returns it",
            "sleep" => "sleep <ms>: waits; can be interrupted",
            "defer" => "defer <ms> <text>: displays text after a delay, in the background",
            "exit" => "exit [keep]: asks the frontend to exit",
            _ => return None,
        };
        Some(help)
    }
}

fn parse_millis(text: &str) -> Result<Duration, String> {
    match text.trim().parse::<u64>() {
        Ok(millis) => Ok(Duration::from_millis(millis)),
        Err(err) => Err(format!("Invalid duration '{text}': {err}")),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("   "), Ok(Command::Nothing));
        assert_eq!(Command::parse("42"), Ok(Command::Echo(String::from("42"))));
        assert_eq!(
            Command::parse("print  hello world"),
            Ok(Command::Print(String::from("hello world")))
        );
        assert_eq!(
            Command::parse("sleep 250"),
            Ok(Command::Sleep(Duration::from_millis(250)))
        );
        assert_eq!(
            Command::parse("defer 10 done"),
            Ok(Command::Defer(Duration::from_millis(10), String::from("done")))
        );
        assert_eq!(
            Command::parse("exit keep"),
            Ok(Command::Exit { keep_kernel: true })
        );
    }

    #[test]
    fn test_parse_continued_lines() {
        assert_eq!(
            Command::parse("print a \\\nb"),
            Ok(Command::Print(String::from("a  b")))
        );
    }

    #[test]
    fn test_parse_invalid_arguments() {
        assert_matches!(Command::parse("sleep soon"), Err(message) => {
            assert!(message.contains("soon"));
        });
        assert_matches!(Command::parse("exit now"), Err(_));
    }

    #[test]
    fn test_every_command_has_help() {
        for name in Command::NAMES {
            assert!(Command::help(name).is_some(), "no help for {name}");
        }
        assert_eq!(Command::help("42"), None);
    }
}
