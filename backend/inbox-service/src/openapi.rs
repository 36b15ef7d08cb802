/// OpenAPI documentation for the Loopline Inbox Service
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Loopline Inbox Service API",
        version = "1.0.0",
        description = "Pairwise conversations, unread counters, notifications, story views, and real-time delivery",
        contact(
            name = "Loopline Team",
            email = "team@loopline.dev"
        ),
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Development server"),
        (url = "https://api.loopline.dev/inbox", description = "Production server"),
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Conversations", description = "Pairwise conversation management"),
        (name = "Messages", description = "Message send, read, delete, history"),
        (name = "Notifications", description = "Deduplicated notifications and unread queries"),
        (name = "Stories", description = "Story view tracking and expiry"),
        (name = "WebSocket", description = "Real-time delivery sessions"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn title() -> &'static str {
        "Loopline Inbox Service"
    }

    pub fn version() -> &'static str {
        "1.0.0"
    }
}
