use std::sync::Arc;

use marquee_core::error::CoreError;
use marquee_core::events::ServerEvent;
use marquee_core::{broadcaster, resolver, AppConfig, AppState};
use marquee_models::gateway::{SendMessageRequest, EVENT_CONVERSATION_JOINED, EVENT_MESSAGE_CREATE};
use tokio::sync::Notify;

const EVENT_ID: i64 = 100;
const HOST_ID: i64 = 10;
const GUEST_ID: i64 = 20;
const OTHER_USER_ID: i64 = 30;

struct TestContext {
    state: AppState,
}

impl TestContext {
    async fn new() -> anyhow::Result<Self> {
        let db = marquee_db::create_pool("sqlite::memory:", 1).await?;
        marquee_db::run_migrations(&db).await?;

        marquee_db::files::create_file(&db, 1, "https://files.test/host-avatar.png").await?;
        marquee_db::files::create_file(&db, 2, "https://files.test/cover.jpg").await?;

        marquee_db::users::create_user(&db, HOST_ID, "ava", Some("Ava Hartley"), Some(1)).await?;
        marquee_db::users::create_user(&db, GUEST_ID, "ben", None, None).await?;
        marquee_db::users::create_user(&db, OTHER_USER_ID, "cleo", Some("Cleo Marsh"), None)
            .await?;
        marquee_db::events::create_event(&db, EVENT_ID, HOST_ID, "Launch Party", Some(2)).await?;

        let state = AppState {
            db,
            event_bus: marquee_core::events::EventBus::default(),
            registry: Arc::new(marquee_core::registry::ConnectionRegistry::new()),
            config: AppConfig {
                jwt_secret: "integration-test-secret".to_string(),
                jwt_expiry_seconds: 3600,
                worker_id: 1,
                heartbeat_interval_ms: 41_250,
                heartbeat_timeout_ms: 90_000,
            },
            shutdown: Arc::new(Notify::new()),
        };

        Ok(Self { state })
    }

    async fn conversation_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.state.db)
            .await
            .expect("count conversations")
    }

    async fn message_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.state.db)
            .await
            .expect("count messages")
    }

    fn send_request(&self, conversation_id: i64, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            conversation_id,
            user_id: GUEST_ID,
            content: Some(content.to_string()),
            image_id: None,
            video_id: None,
            audio_id: None,
            image_url: None,
            video_url: None,
            audio_url: None,
        }
    }
}

#[tokio::test]
async fn resolving_twice_reuses_the_conversation() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;

    let first = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;
    assert_eq!(first.event.name, "Launch Party");
    assert_eq!(first.event.cover_image, "https://files.test/cover.jpg");
    assert_eq!(first.host.full_name, "Ava Hartley");
    assert_eq!(first.host.avatar, "https://files.test/host-avatar.png");
    // Guest has no display name and no avatar.
    assert_eq!(first.user.full_name, "ben");
    assert_eq!(first.user.avatar, "");

    let second = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;
    assert_eq!(first.id, second.id);
    assert_eq!(ctx.conversation_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn distinct_triples_get_distinct_conversations() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;

    let a = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;
    let b = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, OTHER_USER_ID).await?;
    assert_ne!(a.id, b.id);
    assert_eq!(ctx.conversation_count().await, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolves_converge_on_one_conversation() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = ctx.state.clone();
        handles.push(tokio::spawn(async move {
            resolver::resolve(&state, EVENT_ID, HOST_ID, GUEST_ID).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let view = handle.await.expect("task").expect("resolve");
        ids.push(view.id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1, "all racers must observe the same id");
    assert_eq!(ctx.conversation_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn resolve_validates_before_any_write() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;

    let err = resolver::resolve(&ctx.state, 999, HOST_ID, GUEST_ID)
        .await
        .expect_err("missing event");
    assert!(matches!(err, CoreError::EventNotFound));

    // A host who did not create the event is rejected.
    let err = resolver::resolve(&ctx.state, EVENT_ID, OTHER_USER_ID, GUEST_ID)
        .await
        .expect_err("host mismatch");
    assert!(matches!(err, CoreError::HostNotEventCreator));

    let err = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, 999)
        .await
        .expect_err("missing user");
    assert!(matches!(err, CoreError::UserNotFound));

    assert_eq!(ctx.conversation_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn join_is_announced_to_every_group_member() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let mut rx = ctx.state.event_bus.subscribe();

    let view = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;
    broadcaster::announce_join(&ctx.state, "conn-host", &view);
    broadcaster::announce_join(&ctx.state, "conn-guest", &view);

    let first: ServerEvent = rx.recv().await?;
    assert_eq!(first.event_type, EVENT_CONVERSATION_JOINED);
    assert_eq!(first.target_connection_ids, vec!["conn-host".to_string()]);

    let second: ServerEvent = rx.recv().await?;
    assert_eq!(second.event_type, EVENT_CONVERSATION_JOINED);
    assert_eq!(second.target_connection_ids.len(), 2);
    assert!(second
        .target_connection_ids
        .contains(&"conn-guest".to_string()));
    assert_eq!(second.payload["event"]["name"], "Launch Party");
    Ok(())
}

#[tokio::test]
async fn send_persists_once_and_broadcasts_once() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let view = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;
    broadcaster::announce_join(&ctx.state, "conn-host", &view);
    broadcaster::announce_join(&ctx.state, "conn-guest", &view);

    let mut rx = ctx.state.event_bus.subscribe();
    let sent = broadcaster::send(
        &ctx.state,
        "conn-guest",
        &ctx.send_request(view.id, "hello"),
    )
    .await?;
    assert_eq!(sent.content.as_deref(), Some("hello"));
    assert_eq!(
        marquee_db::messages::count_conversation_messages(&ctx.state.db, view.id).await?,
        1
    );
    let row = marquee_db::messages::get_message(&ctx.state.db, sent.id)
        .await?
        .expect("persisted message");
    assert_eq!(row.content.as_deref(), Some("hello"));

    let event: ServerEvent = rx.recv().await?;
    assert_eq!(event.event_type, EVENT_MESSAGE_CREATE);
    assert_eq!(event.payload["content"], "hello");
    assert_eq!(event.payload["conversation_id"], view.id);
    assert_eq!(event.target_connection_ids.len(), 2);

    // Exactly one broadcast per send.
    assert!(rx.try_recv().is_err());

    let reloaded = marquee_db::conversations::get_conversation(&ctx.state.db, view.id)
        .await?
        .expect("conversation");
    assert_eq!(reloaded.last_message_id, Some(sent.id));
    Ok(())
}

#[tokio::test]
async fn messages_arrive_in_send_order() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let view = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;
    broadcaster::announce_join(&ctx.state, "conn-host", &view);

    let mut rx = ctx.state.event_bus.subscribe();
    broadcaster::send(&ctx.state, "conn-host", &ctx.send_request(view.id, "m1")).await?;
    broadcaster::send(&ctx.state, "conn-host", &ctx.send_request(view.id, "m2")).await?;

    let first: ServerEvent = rx.recv().await?;
    let second: ServerEvent = rx.recv().await?;
    assert_eq!(first.payload["content"], "m1");
    assert_eq!(second.payload["content"], "m2");
    Ok(())
}

#[tokio::test]
async fn send_lazily_admits_the_sender() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let view = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;

    // Sender never joined explicitly; it still ends up in the group.
    assert!(!ctx.state.registry.is_member("conn-late", view.id));
    broadcaster::send(&ctx.state, "conn-late", &ctx.send_request(view.id, "hi")).await?;
    assert!(ctx.state.registry.is_member("conn-late", view.id));
    Ok(())
}

#[tokio::test]
async fn send_validates_before_any_write() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let view = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;

    let err = broadcaster::send(&ctx.state, "conn-a", &ctx.send_request(999, "hello"))
        .await
        .expect_err("missing conversation");
    assert!(matches!(err, CoreError::ConversationNotFound));

    let mut req = ctx.send_request(view.id, "hello");
    req.user_id = 999;
    let err = broadcaster::send(&ctx.state, "conn-a", &req)
        .await
        .expect_err("missing sender");
    assert!(matches!(err, CoreError::UserNotFound));

    assert_eq!(ctx.message_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn media_urls_come_from_the_file_store_not_the_caller() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let view = resolver::resolve(&ctx.state, EVENT_ID, HOST_ID, GUEST_ID).await?;
    marquee_db::files::create_file(&ctx.state.db, 7, "https://files.test/real.jpg").await?;

    let mut req = ctx.send_request(view.id, "look");
    req.image_id = Some(7);
    // A spoofed display URL from the client is ignored.
    req.image_url = Some("https://evil.test/spoof.jpg".to_string());

    let sent = broadcaster::send(&ctx.state, "conn-a", &req).await?;
    assert_eq!(sent.image.as_deref(), Some("https://files.test/real.jpg"));
    assert!(sent.video.is_none());
    Ok(())
}
