use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

pub mod conversations;
pub mod messages;
pub mod notifications;
pub mod stories;
pub mod wsroute;

use conversations::{
    find_or_create_conversation, get_conversation, get_conversation_messages,
    get_user_conversations, mark_conversation_read,
};
use messages::{delete_message, mark_message_read, send_message};
use notifications::{
    create_notification, get_notifications, get_unread_count, mark_all_notifications_read,
    mark_notification_read,
};
use stories::{add_story_frame, is_viewed_by, publish_story, record_story_view, sweep_stories};
use wsroute::ws_handler;

/// Shared pagination query: 1-based page, capped page size.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl PageQuery {
    pub const MAX_LIMIT: u32 = 100;

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, Self::MAX_LIMIT) as i64
    }

    pub fn offset(&self) -> i64 {
        let page = self.page.max(1) as i64;
        (page - 1) * self.limit()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "inbox-service" }))
}

// OpenAPI endpoint handler
async fn openapi_json() -> Json<serde_json::Value> {
    use utoipa::OpenApi;
    Json(serde_json::to_value(crate::openapi::ApiDoc::openapi()).unwrap_or_default())
}

// Swagger UI handler
async fn docs() -> axum::response::Html<&'static str> {
    axum::response::Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Loopline Inbox Service API</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>"#,
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(docs))
        .route("/ws", get(ws_handler))
        .route(
            "/api/v1/conversations",
            post(find_or_create_conversation).get(get_user_conversations),
        )
        .route("/api/v1/conversations/:id", get(get_conversation))
        .route(
            "/api/v1/conversations/:id/read",
            post(mark_conversation_read),
        )
        .route(
            "/api/v1/conversations/:id/messages",
            get(get_conversation_messages),
        )
        .route("/api/v1/messages", post(send_message))
        .route("/api/v1/messages/:id/read", put(mark_message_read))
        .route("/api/v1/messages/:id", delete(delete_message))
        .route(
            "/api/v1/notifications",
            post(create_notification).get(get_notifications),
        )
        .route(
            "/api/v1/notifications/read-all",
            put(mark_all_notifications_read),
        )
        .route(
            "/api/v1/notifications/unread-count",
            get(get_unread_count),
        )
        .route(
            "/api/v1/notifications/:id/read",
            put(mark_notification_read),
        )
        .route("/api/v1/stories", post(publish_story))
        .route("/api/v1/stories/sweep", post(sweep_stories))
        .route("/api/v1/stories/:id/frames", post(add_story_frame))
        .route("/api/v1/stories/:id/views", post(record_story_view))
        .route("/api/v1/stories/:id/viewed", get(is_viewed_by))
        .layer(axum::middleware::from_fn(crate::metrics::track_http_metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_and_offsets() {
        let q = PageQuery { page: 0, limit: 500 };
        assert_eq!(q.limit(), PageQuery::MAX_LIMIT as i64);
        assert_eq!(q.offset(), 0);

        let q = PageQuery { page: 3, limit: 20 };
        assert_eq!(q.offset(), 40);
    }
}
