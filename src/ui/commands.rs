use std::path::PathBuf;

use crate::domain::DomainError;

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    List,
    Switch(String),
    Delete(Option<String>),
    Upload(PathBuf),
    Unlink,
    Show,
    Help,
    Quit,
    Ask(String),
}

pub const HELP: &str = "\
Commands:
  /new                     start a new conversation
  /list                    list conversations, most recent first
  /switch <n|id-prefix>    switch to a conversation
  /delete [n|id-prefix]    delete a conversation (default: the active one)
  /upload <path>           upload a PDF and link it to this conversation
  /unlink                  unlink the document from this conversation
  /show                    print this conversation
  /help                    show this help
  /quit                    exit
Anything else is sent as a question about the linked document.";

/// Parses a line; blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, DomainError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if !line.starts_with('/') {
        return Ok(Some(Command::Ask(line.to_string())));
    }

    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim()).filter(|a| !a.is_empty())),
        None => (line, None),
    };

    let command = match (name, arg) {
        ("/new", _) => Command::New,
        ("/list", _) => Command::List,
        ("/switch", Some(target)) => Command::Switch(target.to_string()),
        ("/switch", None) => return Err(DomainError::validation("usage: /switch <n|id-prefix>")),
        ("/delete", target) => Command::Delete(target.map(str::to_string)),
        ("/upload", Some(path)) => Command::Upload(PathBuf::from(path)),
        ("/upload", None) => return Err(DomainError::validation("usage: /upload <path>")),
        ("/unlink", _) => Command::Unlink,
        ("/show", _) => Command::Show,
        ("/help", _) => Command::Help,
        ("/quit" | "/exit", _) => Command::Quit,
        (other, _) => {
            return Err(DomainError::validation(format!(
                "unknown command {other}, try /help"
            )))
        }
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_and_blank_lines() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(
            parse(" What is on page 2? ").unwrap(),
            Some(Command::Ask("What is on page 2?".into()))
        );
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(parse("/switch 2").unwrap(), Some(Command::Switch("2".into())));
        assert_eq!(parse("/delete").unwrap(), Some(Command::Delete(None)));
        assert_eq!(
            parse("/delete 4f1c").unwrap(),
            Some(Command::Delete(Some("4f1c".into())))
        );
        assert_eq!(
            parse("/upload ~/docs/My Report.pdf").unwrap(),
            Some(Command::Upload(PathBuf::from("~/docs/My Report.pdf")))
        );
        assert_eq!(parse("/quit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_missing_arguments_and_unknown_commands() {
        assert!(matches!(parse("/switch"), Err(DomainError::Validation(_))));
        assert!(matches!(parse("/upload   "), Err(DomainError::Validation(_))));
        assert!(matches!(parse("/frobnicate"), Err(DomainError::Validation(_))));
    }
}
