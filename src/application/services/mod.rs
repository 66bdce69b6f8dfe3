//! Application Services
//!
//! Business logic composed from the domain repositories and the transport.

pub mod invite_service;
pub mod message_service;
pub mod moderation_service;
pub mod presence_service;
pub mod server_service;
pub mod slash_command_service;

pub use invite_service::{
    CreateInviteDto, InviteDto, InviteError, InviteService, InviteServiceImpl,
};
pub use message_service::{
    CreateMessageDto, MessageDto, MessageError, MessageService, MessageServiceImpl,
};
pub use moderation_service::{
    CommandInvoker, ExecutedAction, ModerationAction, ModerationError, ModerationService,
    ModerationServiceImpl, Reversal, DEFAULT_HISTORY_LIMIT,
};
pub use presence_service::PresenceService;
pub use server_service::{
    CreateServerDto, MemberDto, ServerDto, ServerError, ServerService, ServerServiceImpl,
};
pub use slash_command_service::{
    CommandContext, SlashCommandError, SlashCommandResponse, SlashCommandService,
    SlashCommandServiceImpl,
};
