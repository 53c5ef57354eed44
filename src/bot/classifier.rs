use serde::{Deserialize, Serialize};

/// Category of an inbound free-text message.
///
/// Commands are conversational text rather than a fixed grammar, so
/// classification is substring containment against localizable keyword
/// tables instead of parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Login,
    Help,
    TomorrowHomework,
    AllHomework,
    Unknown,
}

/// Keyword lists indexed by command variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandKeywords {
    pub login: Vec<String>,
    pub help: Vec<String>,
    pub tomorrow_homework: Vec<String>,
    pub all_homework: Vec<String>,
}

impl Default for CommandKeywords {
    fn default() -> Self {
        Self {
            login: vec![
                "увійти".to_string(),
                "логін".to_string(),
                "login".to_string(),
            ],
            help: vec![
                "допомога".to_string(),
                "довідка".to_string(),
                "help".to_string(),
            ],
            tomorrow_homework: vec![
                "завдання на завтра".to_string(),
                "дз на завтра".to_string(),
                "на завтра".to_string(),
            ],
            all_homework: vec![
                "всі завдання".to_string(),
                "все дз".to_string(),
                "все завдання".to_string(),
            ],
        }
    }
}

impl CommandKeywords {
    /// Returns the keyword list for a recognized command variant.
    pub fn for_command(&self, command: Command) -> &[String] {
        match command {
            Command::Login => &self.login,
            Command::Help => &self.help,
            Command::TomorrowHomework => &self.tomorrow_homework,
            Command::AllHomework => &self.all_homework,
            Command::Unknown => &[],
        }
    }
}

/// Declared priority: a text matching several categories resolves to the
/// first one in this order.
const PRIORITY: [Command; 4] = [
    Command::Login,
    Command::Help,
    Command::TomorrowHomework,
    Command::AllHomework,
];

/// Maps a message body to a command category.
///
/// Matching is case-insensitive substring containment; the first matching
/// category in priority order wins, no match yields [`Command::Unknown`].
pub fn classify(text: &str, keywords: &CommandKeywords) -> Command {
    let lowered = text.to_lowercase();

    for command in PRIORITY {
        let matched = keywords
            .for_command(command)
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()));
        if matched {
            return command;
        }
    }

    Command::Unknown
}
