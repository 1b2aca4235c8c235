//! Classification of cleaned lines typed by an active participant.

/// Prefix that turns a line into a rename request
pub const RENAME_PREFIX: &str = "name=";

const QUIT_KEYWORDS: [&str; 2] = ["exit", "quit"];

/// What a cleaned client line asks the server to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInput {
    /// Nothing left after cleaning; dropped silently
    Empty,
    /// `name=<new name>`, with the requested name trimmed
    Rename(String),
    /// `exit` or `quit`, any letter case
    Quit,
    /// Anything else is chat
    Chat(String),
}

impl ClientInput {
    pub fn parse(line: &str) -> Self {
        if line.is_empty() {
            return Self::Empty;
        }
        if let Some(rest) = line.strip_prefix(RENAME_PREFIX) {
            return Self::Rename(rest.trim().to_string());
        }
        if QUIT_KEYWORDS.iter().any(|kw| line.eq_ignore_ascii_case(kw)) {
            return Self::Quit;
        }
        Self::Chat(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_line() {
        // テスト項目: 空行は Empty になる
        assert_eq!(ClientInput::parse(""), ClientInput::Empty);
    }

    #[test]
    fn test_parse_rename_trims_new_name() {
        // テスト項目: name= で始まる行は改名要求になり、新しい名前は trim される
        // given (前提条件):
        let line = "name=  carol ";

        // when (操作):
        let result = ClientInput::parse(line);

        // then (期待する結果):
        assert_eq!(result, ClientInput::Rename("carol".to_string()));
    }

    #[test]
    fn test_parse_rename_with_empty_name() {
        // テスト項目: name= だけの行は空の改名要求になる
        assert_eq!(ClientInput::parse("name="), ClientInput::Rename(String::new()));
    }

    #[test]
    fn test_parse_quit_keywords_case_insensitive() {
        // テスト項目: exit / quit は大文字小文字を区別せず終了要求になる
        for line in ["exit", "EXIT", "Quit", "qUiT"] {
            assert_eq!(ClientInput::parse(line), ClientInput::Quit, "line: {line}");
        }
    }

    #[test]
    fn test_parse_chat_message() {
        // テスト項目: それ以外の行はチャットメッセージになる
        // given (前提条件):
        let lines = ["hello room", "quitting now", "Name=bob"];

        // when (操作) / then (期待する結果):
        for line in lines {
            assert_eq!(ClientInput::parse(line), ClientInput::Chat(line.to_string()));
        }
    }
}
