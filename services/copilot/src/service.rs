//! Copilot conversation flow
//!
//! A chat turn reads the conversation, asks the model for a reply and
//! appends the user message plus the reply in one conditional write. When
//! another turn got there first the whole turn is rebuilt from the fresh
//! history, so appends to one conversation are totally ordered.

use chrono::{DateTime, Utc};
use common::{
    audit::{self, AuditAction, AuditEntity, AuditLog, AuditRecord},
    error::DatabaseResult,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::CopilotError,
    models::{
        AppendOutcome, ChatMessage, ChatResponse, Conversation, ConversationSummary,
        NewConversation, Page, ProfileContext,
    },
    provider::{ContextMessage, LanguageModel, ProviderError},
    repositories::{ConversationStore, ProfileStore},
};

/// Attached to every chat response
pub const DISCLAIMER: &str = "⚕️ This information is for educational purposes only and should not replace professional medical advice. Always consult your healthcare provider for personalized guidance.";

const SYSTEM_PROMPT: &str = "You are HealBridge AI, a supportive health companion. Your role is to:
1. Provide evidence-based health information from verified medical sources
2. Offer emotional support and coping strategies
3. Help users understand their conditions and treatment options
4. Suggest when to consult healthcare professionals

CRITICAL RULES:
- NEVER provide medical diagnoses
- NEVER prescribe medications or treatments
- NEVER replace professional medical advice
- ALWAYS include disclaimers when discussing health topics
- ALWAYS suggest consulting a healthcare provider for serious concerns
- If a user expresses suicidal thoughts or self-harm, immediately provide crisis hotline numbers:
  - National Suicide Prevention Lifeline: 988
  - Crisis Text Line: Text HOME to 741741

You have access to verified medical information from PubMed, Mayo Clinic, and NIH sources.
When citing information, always reference the source.";

const TITLE_MAX_CHARS: usize = 100;
const MESSAGE_MAX_CHARS: usize = 4000;
const MAX_TURN_ATTEMPTS: usize = 3;
const NOT_SPECIFIED: &str = "Not specified";

/// Reply used when the model could not answer
pub fn fallback_reply(err: &ProviderError) -> String {
    match err {
        ProviderError::NotConfigured => format!(
            "I understand you're looking for health information. {}\n\nPlease configure the GOOGLE_AI_API_KEY environment variable to enable AI responses.",
            DISCLAIMER
        ),
        ProviderError::RateLimited => format!(
            "I apologize, but I've reached my message limit for the moment. Please try again in a few minutes. {}",
            DISCLAIMER
        ),
        _ => format!(
            "I apologize, but I'm having trouble connecting to my knowledge base right now. Please try again later. {}",
            DISCLAIMER
        ),
    }
}

/// Validate a chat message, returning the trimmed form
pub fn validate_message(message: &str) -> Result<String, String> {
    let trimmed = message.trim();
    let length = trimmed.chars().count();

    if length == 0 {
        return Err("Message is required".to_string());
    }

    if length > MESSAGE_MAX_CHARS {
        return Err(format!(
            "Message must be at most {} characters long",
            MESSAGE_MAX_CHARS
        ));
    }

    Ok(trimmed.to_string())
}

fn title_from(message: &str) -> String {
    message.chars().take(TITLE_MAX_CHARS).collect()
}

fn describe_profile(profile: &ProfileContext) -> String {
    format!(
        "User condition: {}. Stage: {}.",
        profile.condition_name.as_deref().unwrap_or(NOT_SPECIFIED),
        profile.condition_stage.as_deref().unwrap_or(NOT_SPECIFIED)
    )
}

/// System instruction, optional user context, prior history, new message
fn build_context(
    user_context: Option<&str>,
    history: &[ChatMessage],
    message: &str,
) -> Vec<ContextMessage> {
    let system = match user_context {
        Some(user_context) => format!("{}\n\nUser Context: {}", SYSTEM_PROMPT, user_context),
        None => SYSTEM_PROMPT.to_string(),
    };

    let mut context = Vec::with_capacity(history.len() + 2);
    context.push(ContextMessage::system(system));
    context.extend(history.iter().map(ContextMessage::from));
    context.push(ContextMessage::user(message));
    context
}

/// `now`, pushed forward if the log already holds a later timestamp
fn not_before(now: DateTime<Utc>, floor: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match floor {
        Some(floor) if floor > now => floor,
        _ => now,
    }
}

/// Copilot flow over the conversation store and the language model
#[derive(Clone)]
pub struct CopilotService {
    conversations: Arc<dyn ConversationStore>,
    profiles: Arc<dyn ProfileStore>,
    model: Arc<dyn LanguageModel>,
    audit_log: Arc<dyn AuditLog>,
    provider_timeout: Duration,
}

impl CopilotService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        profiles: Arc<dyn ProfileStore>,
        model: Arc<dyn LanguageModel>,
        audit_log: Arc<dyn AuditLog>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            conversations,
            profiles,
            model,
            audit_log,
            provider_timeout,
        }
    }

    /// Run one chat turn, creating the conversation when no id is given
    pub async fn chat(
        &self,
        user_id: Uuid,
        message: &str,
        conversation_id: Option<Uuid>,
    ) -> Result<ChatResponse, CopilotError> {
        let message = validate_message(message).map_err(CopilotError::Validation)?;
        let user_context = self
            .profiles
            .find_context(user_id)
            .await?
            .map(|profile| describe_profile(&profile));

        for attempt in 1..=MAX_TURN_ATTEMPTS {
            let existing = match conversation_id {
                Some(id) => Some(
                    self.conversations
                        .find_owned(user_id, id)
                        .await?
                        .ok_or(CopilotError::ConversationNotFound)?,
                ),
                None => None,
            };

            let history = existing.as_ref().map_or(&[][..], |c| &c.messages[..]);
            let context = build_context(user_context.as_deref(), history, &message);
            let reply = self.reply(&context).await;

            let floor = existing.as_ref().and_then(Conversation::last_timestamp);
            let user_message = ChatMessage::user(message.clone(), not_before(Utc::now(), floor));
            let assistant_message = ChatMessage::assistant(
                reply,
                not_before(Utc::now(), Some(user_message.timestamp)),
            );
            let updated_at = assistant_message.timestamp;

            let saved_id = match existing {
                None => {
                    let conversation = self
                        .conversations
                        .create(&NewConversation {
                            user_id,
                            title: title_from(&message),
                            messages: vec![user_message, assistant_message.clone()],
                        })
                        .await?;
                    info!(user_id = %user_id, conversation_id = %conversation.id, "Conversation started");
                    conversation.id
                }
                Some(conversation) => {
                    let outcome = self
                        .conversations
                        .append_messages(
                            user_id,
                            conversation.id,
                            conversation.version,
                            &[user_message, assistant_message.clone()],
                            updated_at,
                        )
                        .await?;

                    if outcome == AppendOutcome::Stale {
                        debug!(
                            conversation_id = %conversation.id,
                            attempt,
                            "Conversation changed during chat turn, retrying"
                        );
                        continue;
                    }
                    conversation.id
                }
            };

            audit::record(
                self.audit_log.as_ref(),
                AuditRecord::new(user_id, AuditAction::AiChat)
                    .with_entity(AuditEntity::AiConversation(saved_id)),
            )
            .await;

            return Ok(ChatResponse {
                conversation_id: saved_id,
                message: assistant_message,
                disclaimer: DISCLAIMER,
            });
        }

        warn!(
            user_id = %user_id,
            attempts = MAX_TURN_ATTEMPTS,
            "Chat turn kept losing to concurrent updates"
        );
        Err(CopilotError::ConcurrentUpdate)
    }

    /// Model reply, or a fallback when the provider fails or times out
    async fn reply(&self, context: &[ContextMessage]) -> String {
        let result = match tokio::time::timeout(self.provider_timeout, self.model.generate(context))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };

        match result {
            Ok(text) => text,
            Err(ProviderError::NotConfigured) => {
                debug!("No provider API key configured, using fallback reply");
                fallback_reply(&ProviderError::NotConfigured)
            }
            Err(e) => {
                warn!("Language model call failed: {}", e);
                fallback_reply(&e)
            }
        }
    }

    /// Conversations of a user, most recently updated first
    pub async fn history(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<ConversationSummary>, CopilotError> {
        Ok(self.conversations.list_for_user(user_id, page).await?)
    }

    pub async fn conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Conversation, CopilotError> {
        self.conversations
            .find_owned(user_id, conversation_id)
            .await?
            .ok_or(CopilotError::ConversationNotFound)
    }

    pub async fn delete_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(), CopilotError> {
        if !self
            .conversations
            .delete_owned(user_id, conversation_id)
            .await?
        {
            return Err(CopilotError::ConversationNotFound);
        }

        info!(user_id = %user_id, conversation_id = %conversation_id, "Conversation deleted");
        Ok(())
    }

    pub async fn health_check(&self) -> DatabaseResult<bool> {
        self.conversations.health_check().await
    }
}
