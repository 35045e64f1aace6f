//! Slash command parsing.
//!
//! Anything that does not start with `/` is a message. Parsing is pure; the
//! [`crate::App`] decides what each command does.

/// Reaction symbols offered by the UI.
pub const REACTION_SYMBOLS: [&str; 3] = ["👍", "❤️", "😊"];

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain message text.
    Message {
        /// Text as typed.
        content: String,
    },
    /// Switch to a room by name or id.
    Join {
        /// Room name (with or without `#`) or id.
        room: String,
    },
    /// React to the n-th displayed message (1-based).
    React {
        /// 1-based message index in the active room.
        index: usize,
        /// Reaction symbol.
        symbol: String,
    },
    /// Retry a failed history load.
    Retry,
    /// End the session and quit.
    Logout,
    /// Quit.
    Quit,
    /// Show command help.
    Help,
    /// Unknown command.
    Unknown {
        /// Command name as typed.
        input: String,
    },
    /// Known command with bad arguments.
    InvalidArgs {
        /// Command name.
        command: &'static str,
        /// What was wrong.
        error: String,
    },
}

/// Help text listing every command.
pub const HELP: &str =
    "/join <room>  /react <n> <+1|heart|smile>  /retry  /logout  /quit  Tab: next room";

/// Parse a line of input.
pub fn parse(input: &str) -> Command {
    let Some(rest) = input.trim().strip_prefix('/') else {
        return Command::Message { content: input.to_owned() };
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match name {
        "join" | "j" => match args.as_slice() {
            [room] => Command::Join { room: (*room).to_owned() },
            _ => invalid("join", "usage: /join <room>"),
        },
        "react" | "r" => parse_react(&args),
        "retry" => Command::Retry,
        "logout" => Command::Logout,
        "quit" | "q" => Command::Quit,
        "help" | "h" | "?" => Command::Help,
        other => Command::Unknown { input: other.to_owned() },
    }
}

fn parse_react(args: &[&str]) -> Command {
    let [index, symbol] = args else {
        return invalid("react", "usage: /react <n> <symbol>");
    };
    let index = match index.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return invalid("react", format!("invalid message number {index}")),
    };
    Command::React { index, symbol: reaction_symbol(symbol).to_owned() }
}

/// Map a reaction alias to its symbol. Anything else is used verbatim.
pub fn reaction_symbol(alias: &str) -> &str {
    match alias {
        "+1" | "like" | "1" => REACTION_SYMBOLS[0],
        "heart" | "love" | "2" => REACTION_SYMBOLS[1],
        "smile" | "3" => REACTION_SYMBOLS[2],
        other => other,
    }
}

fn invalid(command: &'static str, error: impl Into<String>) -> Command {
    Command::InvalidArgs { command, error: error.into() }
}
