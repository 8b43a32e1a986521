use crate::error::CoreError;
use crate::{views, AppState};
use marquee_models::conversation::ConversationView;
use marquee_models::gateway::{SendMessageRequest, EVENT_CONVERSATION_JOINED, EVENT_MESSAGE_CREATE};
use marquee_models::message::MessageView;

/// Admit the joining connection to the conversation's group and
/// announce the (re)join to every current member. Rejoins broadcast
/// again; the admit itself is idempotent.
pub fn announce_join(state: &AppState, connection_id: &str, view: &ConversationView) {
    state.registry.admit(connection_id, view.id);
    let members = state.registry.members_of(view.id);
    tracing::debug!(
        conversation_id = view.id,
        connection_id,
        members = members.len(),
        "join announced"
    );
    state.event_bus.dispatch_to_connections(
        EVENT_CONVERSATION_JOINED,
        serde_json::json!(view),
        members,
    );
}

/// Validate, persist, and fan out one chat message.
///
/// Delivery is fire-and-forget per member: a member that cannot be
/// reached neither fails the send nor triggers a retry.
pub async fn send(
    state: &AppState,
    connection_id: &str,
    req: &SendMessageRequest,
) -> Result<MessageView, CoreError> {
    let conversation =
        marquee_db::conversations::get_conversation(&state.db, req.conversation_id)
            .await?
            .ok_or(CoreError::ConversationNotFound)?;
    marquee_db::users::get_user_by_id(&state.db, req.user_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    let message = marquee_db::messages::create_message(
        &state.db,
        state.next_id(),
        conversation.id,
        req.user_id,
        req.content.as_deref(),
        req.image_id,
        req.video_id,
        req.audio_id,
    )
    .await?;

    if let Err(err) =
        marquee_db::conversations::set_last_message(&state.db, conversation.id, message.id).await
    {
        tracing::warn!(
            conversation_id = conversation.id,
            message_id = message.id,
            error = %err,
            "failed to advance last_message_id"
        );
    }

    let view = views::message_view(&state.db, &message).await?;

    // A sender that skipped the join handshake still lands in the
    // group before fan-out.
    state.registry.admit(connection_id, conversation.id);
    let members = state.registry.members_of(conversation.id);
    tracing::debug!(
        conversation_id = conversation.id,
        message_id = message.id,
        members = members.len(),
        "message broadcast"
    );
    state
        .event_bus
        .dispatch_to_connections(EVENT_MESSAGE_CREATE, serde_json::json!(view), members);

    Ok(view)
}
