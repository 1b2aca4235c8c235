//! Everything the server says to a client, verbatim.

use crate::infrastructure::codec::Outbound;

pub const WELCOME: &str = "Welcome to TCP-Chat!";
pub const NAME_PROMPT: &str = "[ENTER YOUR NAME]: ";
pub const INVALID_NAME: &str = "Invalid name.";
pub const NAME_TAKEN: &str = "Name already taken.";
pub const ROOM_FULL: &str = "Chat room is full. Connection closed.";
pub const INVALID_NEW_NAME: &str = "Invalid new name. Name not changed.";
pub const NEW_NAME_TAKEN: &str = "Name already taken. Name not changed.";
pub const FAREWELL: &str = "Exiting chat room.";
pub const SHUTDOWN_NOTICE: &str = "Server shutting down";

pub const LOGO: &str = r#"         _nnnn_
        dGGGGMMb
       @p~qp~~qMb
       M|@||@) M|
       @,----.JM|
      JS^\__/  qKL
     dZP        qKRb
    dZP          qKKb
   fZP            SMMb
   HZM            MMMM
   FqM            MMMM
 __| ".        |\dS"qML
 |    `.       | `' \Zq
_)      \.___.,|     .'
\____   )MMMMMP|   .'
     `-'       `--'"#;

/// Greeting sent as soon as a connection is accepted
pub fn welcome_banner() -> [Outbound; 2] {
    [
        Outbound::line(WELCOME),
        Outbound::prompt(format!("{LOGO}\r\n{NAME_PROMPT}")),
    ]
}

/// Reply to a rejected name during naming, followed by a fresh prompt
pub fn reprompt(reason: &str) -> Outbound {
    Outbound::prompt(format!("{reason}\r\n{NAME_PROMPT}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reprompt_for_taken_name() {
        // テスト項目: 名前重複時の再プロンプトが仕様どおりの文字列になる
        // when (操作):
        let reply = reprompt(NAME_TAKEN);

        // then (期待する結果):
        assert_eq!(
            reply,
            Outbound::prompt("Name already taken.\r\n[ENTER YOUR NAME]: ")
        );
    }

    #[test]
    fn test_welcome_banner_ends_with_prompt() {
        // テスト項目: ウェルカムバナーの最後は名前入力のプロンプトになる
        let [welcome, logo] = welcome_banner();
        assert_eq!(welcome, Outbound::line("Welcome to TCP-Chat!"));
        match logo {
            Outbound::Prompt(text) => assert!(text.ends_with("\r\n[ENTER YOUR NAME]: ")),
            other => panic!("unexpected banner item: {other:?}"),
        }
    }
}
