//! Slash-command parsing and dispatch.
//!
//! The command text is split on whitespace; the first word picks the
//! command and the rest are its arguments:
//!
//! ```text
//! pick                  pick someone from the channel
//! exclude               list excluded users
//! exclude @user         stop picking @user
//! include @user         start picking @user again
//! sample_size           show the cohort width
//! sample_size N         set the cohort width
//! help                  show usage
//! ```
//!
//! Changes are announced in the channel; everything else is answered
//! privately to the user who ran the command.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pickem_core::{ChannelId, SampleSize, UserId};
use tracing::{debug, instrument};

use crate::error::AppError;
use crate::slack::CommandResponse;
use crate::state::AppState;

pub const HELP_TEXT: &str = "*pick* to pick a user from the current channel\n\
    *exclude* to list excluded users\n\
    *exclude @username* to exclude a user from being picked\n\
    *include @username* to include an excluded user\n\
    *sample_size* to see how many of the least recently picked users are eligible\n\
    *sample_size number* to change it\n\
    *help* to see this message\n";

pub const NO_CANDIDATES: &str = "No users to pick.  Are they all excluded?";
pub const NO_EXCLUDED: &str = "No excluded users";
pub const EXCLUDE_USAGE: &str =
    "Try 'exclude' to see current excluded users\nor try exclude @username";
pub const INCLUDE_USAGE: &str = "Try include @username";
pub const SAMPLE_SIZE_USAGE: &str =
    "Try 'sample_size' to see current setting\nor try sample_size number";
pub const INVALID_SAMPLE_SIZE: &str = "sample_size must be a positive integer";
pub const FAILURE: &str = "Error";

/// The form fields Slack sends with a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    /// The slash command itself, e.g. `/pickem`.
    pub command: String,
    /// Everything after the slash command.
    pub text: String,
    /// Name of the invoking user.
    pub user_name: String,
    /// Channel the command was run in.
    pub channel_id: ChannelId,
}

impl SlashCommand {
    /// Parse an `application/x-www-form-urlencoded` slash-command body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if `channel_id` is missing.
    pub fn from_form(body: &str) -> Result<Self, AppError> {
        let mut command = String::new();
        let mut text = String::new();
        let mut user_name = String::new();
        let mut channel_id = None;

        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            match key.as_ref() {
                "command" => command = value.into_owned(),
                "text" => text = value.into_owned(),
                "user_name" => user_name = value.into_owned(),
                "channel_id" if !value.is_empty() => channel_id = Some(ChannelId::new(value)),
                _ => {}
            }
        }

        let channel_id =
            channel_id.ok_or_else(|| AppError::BadRequest("Missing channel_id".to_string()))?;

        Ok(Self {
            command,
            text,
            user_name,
            channel_id,
        })
    }
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pick a channel member.
    Pick,
    /// List excluded users.
    ListExcluded,
    /// Exclude the mentioned user.
    Exclude(String),
    /// Include the mentioned user.
    Include(String),
    /// Show the sample size.
    ShowSampleSize,
    /// Set the sample size to the given value.
    SetSampleSize(String),
    /// Known command, wrong number of arguments.
    Usage(&'static str),
    /// Anything else.
    Help,
}

impl Command {
    /// Parse the text that followed the slash command.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        match words.as_slice() {
            ["pick", ..] => Self::Pick,
            ["exclude"] => Self::ListExcluded,
            ["exclude", user] => Self::Exclude((*user).to_string()),
            ["exclude", ..] => Self::Usage(EXCLUDE_USAGE),
            ["include", user] => Self::Include((*user).to_string()),
            ["include", ..] => Self::Usage(INCLUDE_USAGE),
            ["sample_size"] => Self::ShowSampleSize,
            ["sample_size", size] => Self::SetSampleSize((*size).to_string()),
            ["sample_size", ..] => Self::Usage(SAMPLE_SIZE_USAGE),
            _ => Self::Help,
        }
    }
}

/// What to send back to the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to say privately (an announcement went to the channel).
    Silent,
    /// A private message.
    Ephemeral(String),
}

impl Reply {
    fn ephemeral(text: impl Into<String>) -> Self {
        Self::Ephemeral(text.into())
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Silent => StatusCode::OK.into_response(),
            Self::Ephemeral(text) => Json(CommandResponse::ephemeral(text)).into_response(),
        }
    }
}

/// Extract the user id from a Slack mention like `<@U123>` or `<@U123|name>`.
#[must_use]
pub fn parse_mention(token: &str) -> Option<UserId> {
    let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.split('|').next().unwrap_or_default();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(UserId::new(id))
}

/// Run a slash command and produce the reply.
///
/// Failures are reported and answered with a generic error reply so the user
/// sees something in Slack.
#[instrument(skip_all, fields(channel_id = %request.channel_id, user_name = %request.user_name))]
pub async fn execute(state: &AppState, request: &SlashCommand) -> Reply {
    let command = Command::parse(&request.text);
    debug!(command = ?command, slash = %request.command, "Running command");

    match run(state, request, command).await {
        Ok(reply) => reply,
        Err(e) => {
            e.report("Command failed");
            Reply::ephemeral(FAILURE)
        }
    }
}

async fn run(state: &AppState, request: &SlashCommand, command: Command) -> Result<Reply, AppError> {
    let repository = state.repository();
    let store = state.store();
    let channel_id = &request.channel_id;

    match command {
        Command::Pick => {
            let members = state.slack().conversation_members(channel_id).await?;
            match repository.pick(store, channel_id, &members).await? {
                Some(user_id) => {
                    announce(state, request, &format!("picked <@{user_id}>")).await?;
                    Ok(Reply::Silent)
                }
                None => Ok(Reply::ephemeral(NO_CANDIDATES)),
            }
        }
        Command::ListExcluded => {
            let excluded = repository.excluded(store, channel_id).await?;
            if excluded.is_empty() {
                return Ok(Reply::ephemeral(NO_EXCLUDED));
            }
            let list = excluded
                .iter()
                .map(|user_id| format!("<@{user_id}>"))
                .collect::<Vec<_>>()
                .join(", ");
            Ok(Reply::ephemeral(format!("Excluded users: {list}")))
        }
        Command::Exclude(token) => {
            let Some(user_id) = parse_mention(&token) else {
                return Ok(Reply::ephemeral(format!("Unknown user: {token}")));
            };
            repository.exclude(store, channel_id, user_id.clone()).await?;
            announce(state, request, &format!("excluded <@{user_id}>")).await?;
            Ok(Reply::Silent)
        }
        Command::Include(token) => {
            let Some(user_id) = parse_mention(&token) else {
                return Ok(Reply::ephemeral(format!("Unknown user: {token}")));
            };
            repository.include(store, channel_id, &user_id).await?;
            announce(state, request, &format!("included <@{user_id}>")).await?;
            Ok(Reply::Silent)
        }
        Command::ShowSampleSize => {
            let sample_size = repository.sample_size(store, channel_id).await?;
            Ok(Reply::ephemeral(format!("sample_size is: {sample_size}")))
        }
        Command::SetSampleSize(raw) => {
            let Ok(sample_size) = raw.parse::<SampleSize>() else {
                return Ok(Reply::ephemeral(INVALID_SAMPLE_SIZE));
            };
            repository
                .set_sample_size(store, channel_id, sample_size)
                .await?;
            announce(state, request, &format!("set sample_size to {sample_size}")).await?;
            Ok(Reply::Silent)
        }
        Command::Usage(text) => Ok(Reply::ephemeral(text)),
        Command::Help => Ok(Reply::ephemeral(HELP_TEXT)),
    }
}

/// Tell the channel what the invoking user just did.
async fn announce(state: &AppState, request: &SlashCommand, action: &str) -> Result<(), AppError> {
    let text = format!("{} {action}", request.user_name);
    state.slack().post_text(&request.channel_id, &text).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("pick"), Command::Pick);
        assert_eq!(Command::parse("  pick  extra "), Command::Pick);
        assert_eq!(Command::parse("exclude"), Command::ListExcluded);
        assert_eq!(
            Command::parse("exclude   <@U1|amy>"),
            Command::Exclude("<@U1|amy>".to_string())
        );
        assert_eq!(
            Command::parse("include <@U1>"),
            Command::Include("<@U1>".to_string())
        );
        assert_eq!(Command::parse("sample_size"), Command::ShowSampleSize);
        assert_eq!(
            Command::parse("sample_size 3"),
            Command::SetSampleSize("3".to_string())
        );
        assert_eq!(Command::parse(""), Command::Help);
        assert_eq!(Command::parse("help"), Command::Help);
        assert_eq!(Command::parse("dance"), Command::Help);
    }

    #[test]
    fn test_parse_wrong_arity() {
        assert_eq!(
            Command::parse("exclude <@U1> <@U2>"),
            Command::Usage(EXCLUDE_USAGE)
        );
        assert_eq!(Command::parse("include"), Command::Usage(INCLUDE_USAGE));
        assert_eq!(
            Command::parse("include <@U1> <@U2>"),
            Command::Usage(INCLUDE_USAGE)
        );
        assert_eq!(
            Command::parse("sample_size 1 2"),
            Command::Usage(SAMPLE_SIZE_USAGE)
        );
    }

    #[test]
    fn test_parse_mention() {
        assert_eq!(parse_mention("<@U123>"), Some(UserId::new("U123")));
        assert_eq!(parse_mention("<@U123|amy>"), Some(UserId::new("U123")));
        assert_eq!(parse_mention("@amy"), None);
        assert_eq!(parse_mention("amy"), None);
        assert_eq!(parse_mention("<#C123|general>"), None);
        assert_eq!(parse_mention("<@>"), None);
        assert_eq!(parse_mention("<@U123"), None);
    }

    #[test]
    fn test_slash_command_from_form() {
        let body = "token=x&team_id=T0&channel_id=C0&channel_name=general&user_id=U9\
                    &user_name=amy&command=%2Fpickem&text=exclude+%3C%40U1%7Camy%3E";
        let request = SlashCommand::from_form(body).unwrap();
        assert_eq!(request.channel_id, ChannelId::new("C0"));
        assert_eq!(request.user_name, "amy");
        assert_eq!(request.command, "/pickem");
        assert_eq!(request.text, "exclude <@U1|amy>");
    }

    #[test]
    fn test_slash_command_requires_channel() {
        let err = SlashCommand::from_form("text=pick&user_name=amy").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(SlashCommand::from_form("channel_id=&text=pick").is_err());
    }

    #[test]
    fn test_reply_responses() {
        assert_eq!(Reply::Silent.into_response().status(), StatusCode::OK);
        let response = Reply::ephemeral("hi").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
    }
}
