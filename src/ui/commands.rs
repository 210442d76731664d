use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Every command the main window offers. Each maps to exactly one action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Create,
    Read,
    Update,
    Delete,
    ListAll,
    SearchName,
    SearchAgeRange,
    FilterAge,
    Sort,
    Count,
    DeleteAll,
    IncrementAges,
}

impl Command {
    /// Display order of the command bar.
    pub const ALL: [Command; 12] = [
        Command::Create,
        Command::Read,
        Command::Update,
        Command::Delete,
        Command::ListAll,
        Command::SearchName,
        Command::SearchAgeRange,
        Command::FilterAge,
        Command::Sort,
        Command::Count,
        Command::DeleteAll,
        Command::IncrementAges,
    ];

    /// Letter pressed together with Ctrl to run the command.
    pub fn shortcut(self) -> char {
        match self {
            Command::Create => 'n',
            Command::Read => 'r',
            Command::Update => 'u',
            Command::Delete => 'd',
            Command::ListAll => 'l',
            Command::SearchName => 'f',
            Command::SearchAgeRange => 'g',
            Command::FilterAge => 't',
            Command::Sort => 'o',
            Command::Count => 'k',
            Command::DeleteAll => 'x',
            Command::IncrementAges => 'b',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Command::Create => "Create",
            Command::Read => "Read",
            Command::Update => "Update",
            Command::Delete => "Delete",
            Command::ListAll => "List all",
            Command::SearchName => "Search name",
            Command::SearchAgeRange => "Age range",
            Command::FilterAge => "Filter age",
            Command::Sort => "Sort",
            Command::Count => "Count",
            Command::DeleteAll => "Delete all",
            Command::IncrementAges => "Ages +/-",
        }
    }

    pub fn from_shortcut(ch: char) -> Option<Command> {
        let ch = ch.to_ascii_lowercase();
        Command::ALL.into_iter().find(|command| command.shortcut() == ch)
    }

    /// Resolve a Ctrl+letter key press to its command.
    pub fn from_key(key: &KeyEvent) -> Option<Command> {
        if !key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }
        match key.code {
            KeyCode::Char(ch) => Command::from_shortcut(ch),
            _ => None,
        }
    }
}
