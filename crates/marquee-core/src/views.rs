use crate::error::CoreError;
use marquee_db::conversations::ConversationRow;
use marquee_db::events::EventRow;
use marquee_db::messages::MessageRow;
use marquee_db::users::UserRow;
use marquee_db::DbPool;
use marquee_models::conversation::{ConversationView, EventSummary, ParticipantProfile};
use marquee_models::message::MessageView;

/// Resolve a file reference to its display URL, falling back to an
/// empty string when the reference is absent or dangling.
async fn file_url_or_empty(db: &DbPool, file_id: Option<i64>) -> Result<String, CoreError> {
    let Some(file_id) = file_id else {
        return Ok(String::new());
    };
    Ok(marquee_db::files::get_file_url(db, file_id)
        .await?
        .unwrap_or_default())
}

/// Resolve an optional media reference; dangling references collapse
/// to None rather than an empty URL.
async fn media_url(db: &DbPool, file_id: Option<i64>) -> Result<Option<String>, CoreError> {
    let Some(file_id) = file_id else {
        return Ok(None);
    };
    Ok(marquee_db::files::get_file_url(db, file_id).await?)
}

async fn participant_profile(db: &DbPool, user: &UserRow) -> Result<ParticipantProfile, CoreError> {
    Ok(ParticipantProfile {
        avatar: file_url_or_empty(db, user.avatar_file_id).await?,
        full_name: user.full_name().to_string(),
    })
}

pub async fn conversation_view(
    db: &DbPool,
    conversation: &ConversationRow,
    event: &EventRow,
    host: &UserRow,
    user: &UserRow,
) -> Result<ConversationView, CoreError> {
    Ok(ConversationView {
        id: conversation.id,
        event_id: conversation.event_id,
        event: EventSummary {
            name: event.name.clone(),
            cover_image: file_url_or_empty(db, event.cover_file_id).await?,
        },
        host_id: conversation.host_id,
        host: participant_profile(db, host).await?,
        user_id: conversation.user_id,
        user: participant_profile(db, user).await?,
        created_at: conversation.created_at,
        updated_at: conversation.updated_at,
    })
}

/// Media URLs are resolved from the persisted ids, never trusted from
/// the sender.
pub async fn message_view(db: &DbPool, message: &MessageRow) -> Result<MessageView, CoreError> {
    Ok(MessageView {
        id: message.id,
        user_id: message.user_id,
        content: message.content.clone(),
        conversation_id: message.conversation_id,
        image: media_url(db, message.image_id).await?,
        video: media_url(db, message.video_id).await?,
        audio: media_url(db, message.audio_id).await?,
        created_at: message.created_at,
        updated_at: message.updated_at,
    })
}
