//! Line commands read from stdin.

use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  key <desc>    send a key (\"a\", \"space\", \"Control+a\", \"BackSpace\")
  char <c>      send one character
  type <text>   send each character of <text>
  select <n>    select candidate <n> (0-based)
  reset         clear the input panel
  empty         print whether the input panel is empty
  stop          stop the engine
  quit          stop the engine and exit
  help          show this text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Key(String),
    Char(char),
    Type(String),
    Select(usize),
    Reset,
    Empty,
    Stop,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'char' takes exactly one character, got '{0}'")]
    NotOneChar(String),
    #[error("invalid candidate index '{0}'")]
    BadIndex(String),
}

impl FromStr for HostCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest),
            None => (line.trim_end(), ""),
        };

        let arg = |name: &'static str| {
            let arg = rest.trim();
            if arg.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(arg)
            }
        };

        match word {
            "key" => Ok(HostCommand::Key(arg("key")?.to_string())),
            "char" => {
                // Not trimmed, so `char  ` sends a space.
                let raw = rest.strip_suffix('\n').unwrap_or(rest);
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(HostCommand::Char(ch)),
                    (None, _) => Err(CommandError::MissingArgument("char")),
                    _ => Err(CommandError::NotOneChar(raw.to_string())),
                }
            }
            "type" => Ok(HostCommand::Type(arg("type")?.to_string())),
            "select" => {
                let index = arg("select")?;
                index
                    .parse()
                    .map(HostCommand::Select)
                    .map_err(|_| CommandError::BadIndex(index.to_string()))
            }
            "reset" => Ok(HostCommand::Reset),
            "empty" => Ok(HostCommand::Empty),
            "stop" => Ok(HostCommand::Stop),
            "quit" | "exit" => Ok(HostCommand::Quit),
            "help" | "?" => Ok(HostCommand::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("key a".parse(), Ok(HostCommand::Key("a".into())));
        assert_eq!(
            "key  Control+space ".parse(),
            Ok(HostCommand::Key("Control+space".into()))
        );
        assert_eq!("type nihao".parse(), Ok(HostCommand::Type("nihao".into())));
        assert_eq!("select 3".parse(), Ok(HostCommand::Select(3)));
        assert_eq!("reset".parse(), Ok(HostCommand::Reset));
        assert_eq!("empty".parse(), Ok(HostCommand::Empty));
        assert_eq!("stop".parse(), Ok(HostCommand::Stop));
        assert_eq!("quit".parse(), Ok(HostCommand::Quit));
        assert_eq!("help".parse(), Ok(HostCommand::Help));
    }

    #[test]
    fn test_char_keeps_whitespace() {
        assert_eq!("char x".parse(), Ok(HostCommand::Char('x')));
        assert_eq!("char  ".parse(), Ok(HostCommand::Char(' ')));
        assert_eq!("char 你".parse(), Ok(HostCommand::Char('你')));
        assert_eq!(
            "char ab".parse::<HostCommand>(),
            Err(CommandError::NotOneChar("ab".into()))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            "key".parse::<HostCommand>(),
            Err(CommandError::MissingArgument("key"))
        );
        assert_eq!(
            "select -1".parse::<HostCommand>(),
            Err(CommandError::BadIndex("-1".into()))
        );
        assert_eq!(
            "launch".parse::<HostCommand>(),
            Err(CommandError::Unknown("launch".into()))
        );
    }
}
