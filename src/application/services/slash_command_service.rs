//! Slash Command Service
//!
//! Parses `/command` text lines and routes them to the moderation and
//! server services. The command table is static: each entry carries the
//! minimum role, usage string and description, and `/help` is generated
//! from it. User-facing failures (unknown command, bad arguments, denied
//! permission) come back as unsuccessful responses rather than errors;
//! only infrastructure faults surface as `Err`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::application::services::{
    ModerationError, ModerationService, ServerError, ServerService,
};
use crate::domain::entities::{MembershipRepository, UserRepository};
use crate::domain::value_objects::MembershipRole;
use crate::shared::error::AppError;

/// Default mute duration when `/mute` is given no minutes argument.
pub const DEFAULT_MUTE_MINUTES: i64 = 10;

/// Default number of messages removed by a bare `/clear`.
pub const DEFAULT_CLEAR_COUNT: i64 = 10;

/// Upper bound on one `/clear` invocation.
pub const MAX_CLEAR_COUNT: i64 = 100;

/// One entry of the command table.
pub struct CommandSpec {
    pub name: &'static str,
    pub required_role: MembershipRole,
    pub usage: &'static str,
    pub description: &'static str,
}

/// The command table. `/help` renders it filtered by the caller's role.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "kick",
        required_role: MembershipRole::Moderator,
        usage: "/kick @user",
        description: "Remove a member from the server",
    },
    CommandSpec {
        name: "ban",
        required_role: MembershipRole::Admin,
        usage: "/ban @user",
        description: "Remove a member from the server (admin only)",
    },
    CommandSpec {
        name: "mute",
        required_role: MembershipRole::Moderator,
        usage: "/mute @user [minutes]",
        description: "Mute a member for a number of minutes (default 10)",
    },
    CommandSpec {
        name: "unmute",
        required_role: MembershipRole::Moderator,
        usage: "/unmute @user",
        description: "Lift a member's mute",
    },
    CommandSpec {
        name: "clear",
        required_role: MembershipRole::Moderator,
        usage: "/clear [count]",
        description: "Delete the newest messages of this channel",
    },
    CommandSpec {
        name: "nick",
        required_role: MembershipRole::Moderator,
        usage: "/nick @user <nickname>",
        description: "Set a member's nickname",
    },
    CommandSpec {
        name: "undo",
        required_role: MembershipRole::Moderator,
        usage: "/undo",
        description: "Undo the most recent moderation action",
    },
    CommandSpec {
        name: "help",
        required_role: MembershipRole::Member,
        usage: "/help [command]",
        description: "List available commands, or show one command's usage",
    },
];

/// Where a command was issued.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    pub server_id: Uuid,
    pub channel_id: Uuid,
    pub actor_id: Uuid,
}

/// Outcome of a command, shaped for direct display to the caller.
#[derive(Debug, Clone)]
pub struct SlashCommandResponse {
    pub command: String,
    pub success: bool,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

impl SlashCommandResponse {
    fn ok(command: &str, message: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            success: true,
            message: message.into(),
            payload: None,
        }
    }

    fn ok_with(command: &str, message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            command: command.to_string(),
            success: true,
            message: message.into(),
            payload: Some(payload),
        }
    }

    fn fail(command: &str, message: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            success: false,
            message: message.into(),
            payload: None,
        }
    }
}

/// Slash command service errors.
#[derive(Debug, thiserror::Error)]
pub enum SlashCommandError {
    #[error("Input is not a slash command")]
    NotACommand,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for SlashCommandError {
    fn from(err: AppError) -> Self {
        SlashCommandError::Internal(err.to_string())
    }
}

/// Slash command service trait.
#[async_trait]
pub trait SlashCommandService: Send + Sync {
    /// Parse and execute one command line.
    async fn execute(
        &self,
        context: CommandContext,
        input: &str,
    ) -> Result<SlashCommandResponse, SlashCommandError>;

    /// Commands the user may run in this server. Empty for non-members.
    async fn available_commands(
        &self,
        server_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<&'static CommandSpec>, SlashCommandError>;

    /// Whether the user may run the named command in this server.
    async fn has_permission(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        name: &str,
    ) -> Result<bool, SlashCommandError>;
}

/// Slash command service implementation.
pub struct SlashCommandServiceImpl<Md, Sv, M, U>
where
    Md: ModerationService,
    Sv: ServerService,
    M: MembershipRepository,
    U: UserRepository,
{
    moderation: Arc<Md>,
    server_service: Arc<Sv>,
    membership_repo: Arc<M>,
    user_repo: Arc<U>,
}

impl<Md, Sv, M, U> SlashCommandServiceImpl<Md, Sv, M, U>
where
    Md: ModerationService,
    Sv: ServerService,
    M: MembershipRepository,
    U: UserRepository,
{
    pub fn new(
        moderation: Arc<Md>,
        server_service: Arc<Sv>,
        membership_repo: Arc<M>,
        user_repo: Arc<U>,
    ) -> Self {
        Self {
            moderation,
            server_service,
            membership_repo,
            user_repo,
        }
    }

    fn spec(name: &str) -> Option<&'static CommandSpec> {
        COMMANDS.iter().find(|spec| spec.name == name)
    }

    /// Resolve an `@username` argument to a user ID.
    async fn resolve_target(&self, arg: &str) -> Result<Option<Uuid>, SlashCommandError> {
        let username = arg.strip_prefix('@').unwrap_or(arg);
        if username.is_empty() {
            return Ok(None);
        }
        let user = self.user_repo.find_by_username(username).await?;
        Ok(user.map(|u| u.id))
    }

    fn describe_moderation_error(err: &ModerationError) -> String {
        match err {
            ModerationError::NotAMember => "You are not a member of this server".to_string(),
            ModerationError::TargetNotFound => {
                "That user is not a member of this server".to_string()
            }
            ModerationError::Forbidden => "You cannot moderate that member".to_string(),
            ModerationError::MessageNotFound => "Message not found".to_string(),
            ModerationError::ChannelNotFound => "Channel not found".to_string(),
            ModerationError::InvalidDuration => "Invalid duration".to_string(),
            ModerationError::AlreadyMember => "That user is already a member".to_string(),
            ModerationError::Internal(msg) => format!("Internal error: {}", msg),
        }
    }

    fn render_help(actor_role: MembershipRole) -> String {
        let mut lines = vec!["Available commands:".to_string()];
        for spec in COMMANDS {
            if actor_role.meets(spec.required_role) {
                lines.push(format!("  {} - {}", spec.usage, spec.description));
            }
        }
        lines.join("\n")
    }
}

#[async_trait]
impl<Md, Sv, M, U> SlashCommandService for SlashCommandServiceImpl<Md, Sv, M, U>
where
    Md: ModerationService + 'static,
    Sv: ServerService + 'static,
    M: MembershipRepository + 'static,
    U: UserRepository + 'static,
{
    async fn execute(
        &self,
        context: CommandContext,
        input: &str,
    ) -> Result<SlashCommandResponse, SlashCommandError> {
        let input = input.trim();
        let Some(stripped) = input.strip_prefix('/') else {
            return Err(SlashCommandError::NotACommand);
        };

        let mut parts = stripped.split_whitespace();
        let Some(name) = parts.next() else {
            return Err(SlashCommandError::NotACommand);
        };
        let name = name.to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let Some(spec) = Self::spec(&name) else {
            return Ok(SlashCommandResponse::fail(
                &name,
                format!("Unknown command: /{}", name),
            ));
        };

        // Table-level gate; the services re-check with target-aware rules.
        let actor = self
            .membership_repo
            .find(context.server_id, context.actor_id)
            .await?;
        let Some(actor) = actor else {
            return Ok(SlashCommandResponse::fail(
                &name,
                "You are not a member of this server",
            ));
        };
        if !actor.role.meets(spec.required_role) {
            return Ok(SlashCommandResponse::fail(
                &name,
                format!("/{} requires the {} role", name, spec.required_role),
            ));
        }

        tracing::debug!(command = %name, actor = %context.actor_id, "Executing slash command");

        match name.as_str() {
            "kick" | "ban" => {
                let Some(arg) = args.first() else {
                    return Ok(SlashCommandResponse::fail(
                        &name,
                        format!("Usage: {}", spec.usage),
                    ));
                };
                let Some(target_id) = self.resolve_target(arg).await? else {
                    return Ok(SlashCommandResponse::fail(
                        &name,
                        format!("Unknown user: {}", arg),
                    ));
                };

                let result = if name == "ban" {
                    self.moderation
                        .ban_user(context.server_id, context.actor_id, target_id)
                        .await
                } else {
                    self.moderation
                        .kick_user(context.server_id, context.actor_id, target_id)
                        .await
                };

                match result {
                    Ok(()) => Ok(SlashCommandResponse::ok(
                        &name,
                        format!("Removed {}", arg),
                    )),
                    Err(ModerationError::Internal(msg)) => Err(SlashCommandError::Internal(msg)),
                    Err(e) => Ok(SlashCommandResponse::fail(
                        &name,
                        Self::describe_moderation_error(&e),
                    )),
                }
            }

            "mute" | "unmute" => {
                let Some(arg) = args.first() else {
                    return Ok(SlashCommandResponse::fail(
                        &name,
                        format!("Usage: {}", spec.usage),
                    ));
                };
                let Some(target_id) = self.resolve_target(arg).await? else {
                    return Ok(SlashCommandResponse::fail(
                        &name,
                        format!("Unknown user: {}", arg),
                    ));
                };

                let minutes = if name == "unmute" {
                    0
                } else {
                    match args.get(1) {
                        Some(raw) => match raw.parse::<i64>() {
                            Ok(minutes) if minutes > 0 => minutes,
                            _ => {
                                return Ok(SlashCommandResponse::fail(
                                    &name,
                                    "Minutes must be a positive number",
                                ))
                            }
                        },
                        None => DEFAULT_MUTE_MINUTES,
                    }
                };

                match self
                    .moderation
                    .mute_user(context.server_id, context.actor_id, target_id, minutes)
                    .await
                {
                    Ok(()) if minutes == 0 => {
                        Ok(SlashCommandResponse::ok(&name, format!("Unmuted {}", arg)))
                    }
                    Ok(()) => Ok(SlashCommandResponse::ok(
                        &name,
                        format!("Muted {} for {} minutes", arg, minutes),
                    )),
                    Err(ModerationError::Internal(msg)) => Err(SlashCommandError::Internal(msg)),
                    Err(e) => Ok(SlashCommandResponse::fail(
                        &name,
                        Self::describe_moderation_error(&e),
                    )),
                }
            }

            "clear" => {
                let count = match args.first() {
                    Some(raw) => match raw.parse::<i64>() {
                        Ok(count) if (1..=MAX_CLEAR_COUNT).contains(&count) => count,
                        _ => {
                            return Ok(SlashCommandResponse::fail(
                                &name,
                                format!("Count must be between 1 and {}", MAX_CLEAR_COUNT),
                            ))
                        }
                    },
                    None => DEFAULT_CLEAR_COUNT,
                };

                match self
                    .moderation
                    .clear_messages(context.server_id, context.actor_id, context.channel_id, count)
                    .await
                {
                    Ok(deleted) => Ok(SlashCommandResponse::ok_with(
                        &name,
                        format!("Deleted {} messages", deleted),
                        json!({ "deleted": deleted }),
                    )),
                    Err(ModerationError::Internal(msg)) => Err(SlashCommandError::Internal(msg)),
                    Err(e) => Ok(SlashCommandResponse::fail(
                        &name,
                        Self::describe_moderation_error(&e),
                    )),
                }
            }

            "nick" => {
                let Some(arg) = args.first() else {
                    return Ok(SlashCommandResponse::fail(
                        &name,
                        format!("Usage: {}", spec.usage),
                    ));
                };
                let Some(target_id) = self.resolve_target(arg).await? else {
                    return Ok(SlashCommandResponse::fail(
                        &name,
                        format!("Unknown user: {}", arg),
                    ));
                };
                if args.len() < 2 {
                    return Ok(SlashCommandResponse::fail(
                        &name,
                        format!("Usage: {}", spec.usage),
                    ));
                }
                let nickname = args[1..].join(" ");

                match self
                    .server_service
                    .update_nickname(context.server_id, target_id, Some(nickname.clone()))
                    .await
                {
                    Ok(_) => Ok(SlashCommandResponse::ok(
                        &name,
                        format!("Set nickname of {} to {}", arg, nickname),
                    )),
                    Err(ServerError::Internal(msg)) => Err(SlashCommandError::Internal(msg)),
                    Err(e) => Ok(SlashCommandResponse::fail(&name, e.to_string())),
                }
            }

            "undo" => match self
                .moderation
                .undo_last(context.server_id, context.actor_id)
                .await
            {
                Ok(Some(undone)) => Ok(SlashCommandResponse::ok_with(
                    &name,
                    format!("Undid {}", undone),
                    json!({ "undone": undone }),
                )),
                Ok(None) => Ok(SlashCommandResponse::ok(&name, "Nothing to undo")),
                Err(ModerationError::Internal(msg)) => Err(SlashCommandError::Internal(msg)),
                Err(e) => Ok(SlashCommandResponse::fail(
                    &name,
                    Self::describe_moderation_error(&e),
                )),
            },

            "help" => match args.first() {
                // `/help kick` shows that one command's usage.
                Some(arg) => {
                    let wanted = arg.strip_prefix('/').unwrap_or(arg).to_ascii_lowercase();
                    match Self::spec(&wanted) {
                        Some(spec) => Ok(SlashCommandResponse::ok(
                            &name,
                            format!("{} - {}", spec.usage, spec.description),
                        )),
                        None => Ok(SlashCommandResponse::fail(
                            &name,
                            format!("Unknown command: /{}", wanted),
                        )),
                    }
                }
                None => Ok(SlashCommandResponse::ok(
                    &name,
                    Self::render_help(actor.role),
                )),
            },

            // Unreachable: spec lookup already filtered unknown names.
            other => Ok(SlashCommandResponse::fail(
                other,
                format!("Unknown command: /{}", other),
            )),
        }
    }

    async fn available_commands(
        &self,
        server_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<&'static CommandSpec>, SlashCommandError> {
        let Some(actor) = self.membership_repo.find(server_id, user_id).await? else {
            return Ok(Vec::new());
        };

        Ok(COMMANDS
            .iter()
            .filter(|spec| actor.role.meets(spec.required_role))
            .collect())
    }

    async fn has_permission(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        name: &str,
    ) -> Result<bool, SlashCommandError> {
        let wanted = name.strip_prefix('/').unwrap_or(name).to_ascii_lowercase();
        let Some(spec) = Self::spec(&wanted) else {
            return Ok(false);
        };

        let actor = self.membership_repo.find(server_id, user_id).await?;
        Ok(actor.is_some_and(|m| m.role.meets(spec.required_role)))
    }
}
