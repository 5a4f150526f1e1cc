use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the buzzer session backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::join_session,
        crate::routes::session::download_submissions,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionCreated,
            crate::dto::session::JoinRequest,
            crate::dto::session::JoinAck,
            crate::dto::session::SessionSummary,
            crate::dto::session::SubmissionView,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session lifecycle and membership"),
        (name = "realtime", description = "WebSocket operations for session participants"),
    )
)]
pub struct ApiDoc;
