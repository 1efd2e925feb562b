use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::sessions::{CreateSessionRequest, SessionResponse, SessionStatusResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::sessions::create_session,
        super::api::sessions::get_session,
        super::api::sessions::start,
        super::api::sessions::stop,
        super::api::sessions::location,
        super::api::sessions::permission_denied,
        super::api::sessions::delete_session,
    ),
    components(
        schemas(
            CreateSessionRequest,
            SessionResponse,
            SessionStatusResponse,
            ErrorResponse,
            crate::route::RouteOption,
            crate::geo::Coordinate,
            crate::tracker::LocationSample,
            crate::tracker::TrackerMode,
            crate::tracker::DisplayState,
            crate::tracker::ProgressSnapshot,
            crate::report::Precedence,
            crate::report::RemoteProgress,
            crate::session::SessionUpdate,
            crate::session::EffectiveProgress,
        )
    ),
    info(
        title = "Nav-O-Mat Navigation API",
        description = "Live progress tracking along a selected route",
        version = "0.1.0"
    ),
    tags(
        (name = "sessions", description = "Navigation sessions")
    )
)]
pub struct ApiDoc;
