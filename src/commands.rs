//! Slash command parsing.
//!
//! Commands arrive both typed and through the main menu, whose buttons carry
//! a trailing Amharic caption ("/register ምዝገባ"), so only the first token
//! decides the command.

/// Commands understood by the bot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Register,
    EditProfile,
    Profile,
    DeleteProfile,
    Comment,
    Cancel,
    /// Admin: `/request_feedback <chat_id> <pro_id>...`
    RequestFeedback { chat_id: i64, professional_ids: Vec<String> },
    /// Admin: `/send_rating <chat_id> <pro_id>`
    SendRating { chat_id: i64, professional_id: String },
    /// Admin: rebuild the professional name lookup
    Reload,
    /// Admin command with missing or malformed arguments
    Usage(AdminUsage),
    Unknown(String),
}

/// Which admin command was misused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminUsage {
    RequestFeedback,
    SendRating,
    InvalidChatId,
}

impl Command {
    /// Parse a message text. Returns `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let head = tokens.next()?.strip_prefix('/')?;
        // "/start@DeboBot" in group chats
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<&str> = tokens.collect();

        let command = match name.as_str() {
            "start" => Command::Start,
            "register" => Command::Register,
            "editprofile" => Command::EditProfile,
            "profile" => Command::Profile,
            "deleteprofile" => Command::DeleteProfile,
            "comment" => Command::Comment,
            "cancel" => Command::Cancel,
            "reload" => Command::Reload,
            "request_feedback" => parse_request_feedback(&args),
            "send_rating" | "request_rating" => parse_send_rating(&args),
            _ => Command::Unknown(name),
        };
        Some(command)
    }

    /// Whether only configured admins may run the command
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Command::RequestFeedback { .. }
                | Command::SendRating { .. }
                | Command::Reload
                | Command::Usage(_)
        )
    }
}

/// Private chat ids equal the user id and are positive
fn parse_chat_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn parse_request_feedback(args: &[&str]) -> Command {
    let Some((chat, ids)) = args.split_first() else {
        return Command::Usage(AdminUsage::RequestFeedback);
    };
    if ids.is_empty() {
        return Command::Usage(AdminUsage::RequestFeedback);
    }
    match parse_chat_id(chat) {
        Some(chat_id) => Command::RequestFeedback {
            chat_id,
            professional_ids: ids.iter().map(|s| s.to_string()).collect(),
        },
        None => Command::Usage(AdminUsage::InvalidChatId),
    }
}

fn parse_send_rating(args: &[&str]) -> Command {
    match args {
        [chat, id] => match parse_chat_id(chat) {
            Some(chat_id) => Command::SendRating {
                chat_id,
                professional_id: id.to_string(),
            },
            None => Command::Usage(AdminUsage::InvalidChatId),
        },
        _ => Command::Usage(AdminUsage::SendRating),
    }
}
