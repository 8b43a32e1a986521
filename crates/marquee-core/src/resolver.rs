use crate::error::CoreError;
use crate::{views, AppState};
use marquee_models::conversation::ConversationView;

/// Turn an (event, host, user) triple into its single, stable
/// conversation, creating one on first join.
///
/// Validation happens strictly before any write: the event must
/// exist, the host must be the event's creator, and both participants
/// must exist. The find-or-create step is atomic against the unique
/// index on the triple, so concurrent joins for the same triple all
/// land on one conversation.
pub async fn resolve(
    state: &AppState,
    event_id: i64,
    host_id: i64,
    user_id: i64,
) -> Result<ConversationView, CoreError> {
    let event = marquee_db::events::get_event(&state.db, event_id)
        .await?
        .ok_or(CoreError::EventNotFound)?;
    if event.creator_id != host_id {
        return Err(CoreError::HostNotEventCreator);
    }
    let host = marquee_db::users::get_user_by_id(&state.db, host_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;
    let user = marquee_db::users::get_user_by_id(&state.db, user_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    let conversation =
        match marquee_db::conversations::find_by_participants(&state.db, event_id, host_id, user_id)
            .await?
        {
            Some(existing) => existing,
            None => {
                let created = marquee_db::conversations::create_conversation(
                    &state.db,
                    state.next_id(),
                    event_id,
                    host_id,
                    user_id,
                )
                .await?;
                tracing::info!(
                    conversation_id = created.id,
                    event_id,
                    host_id,
                    user_id,
                    "conversation created"
                );
                created
            }
        };

    views::conversation_view(&state.db, &conversation, &event, &host, &user).await
}
