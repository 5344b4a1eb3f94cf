use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::catalog::Orientation;
use crate::events::Command;

/// Line-oriented command surface on stdin, with the kiosk's keyboard
/// mnemonics: n/p step, o toggles offline, a toggles attribution, s sets
/// the search terms.
pub async fn run(commands: Sender<Command>, cancel: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(stdin()).lines();
    loop {
        select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(raw)) => {
                    let trimmed = raw.trim();
                    match parse(trimmed) {
                        Some(command) => {
                            let quit = command == Command::Quit;
                            if commands.send(command).await.is_err() {
                                break;
                            }
                            if quit {
                                break;
                            }
                        }
                        None if trimmed.is_empty() => {}
                        None => warn!(input = %trimmed, "unrecognized command"),
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "stdin read failed");
                    break;
                }
            },
        }
    }
    Ok(())
}

fn parse(line: &str) -> Option<Command> {
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Some(Command::Next),
        "p" | "prev" | "previous" => Some(Command::Previous),
        "g" | "goto" => rest.parse().ok().map(Command::Jump),
        "o" | "offline" => Some(Command::ToggleOffline),
        "a" | "attribution" => Some(Command::ToggleAttribution),
        "s" | "search" if !rest.is_empty() => Some(Command::SetQuery(rest.to_string())),
        "orientation" => rest.parse::<Orientation>().ok().map(Command::SetOrientation),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_mnemonics() {
        assert_eq!(parse("n"), Some(Command::Next));
        assert_eq!(parse("p"), Some(Command::Previous));
        assert_eq!(parse("o"), Some(Command::ToggleOffline));
        assert_eq!(parse("a"), Some(Command::ToggleAttribution));
        assert_eq!(parse("q"), Some(Command::Quit));
    }

    #[test]
    fn search_takes_the_rest_of_the_line() {
        assert_eq!(
            parse("s northern lights"),
            Some(Command::SetQuery("northern lights".to_string()))
        );
        assert_eq!(parse("search  alps "), Some(Command::SetQuery("alps".to_string())));
        assert_eq!(parse("s"), None);
    }

    #[test]
    fn jump_parses_an_index() {
        assert_eq!(parse("g 12"), Some(Command::Jump(12)));
        assert_eq!(parse("goto nowhere"), None);
    }

    #[test]
    fn orientation_change() {
        assert_eq!(
            parse("orientation portrait"),
            Some(Command::SetOrientation(Orientation::Portrait))
        );
        assert_eq!(parse("orientation upside-down"), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse("frobnicate"), None);
        assert_eq!(parse(""), None);
    }
}
