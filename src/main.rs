use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    BookingReq, BookingRes, ErrorRes, EventRes, HealthRes, HealthService, ListEventsRes,
    ListUsersRes, SignupReq, SignupRole, UserRes,
};
use cliniq_core::{
    BookingRequest, BookingService, CoreConfig, CoreError, EntityStore, NonEmptyText, RecordId,
    SocialSecNumber, User,
};

/// Application state shared across REST API handlers.
///
/// Holds the entity store and the booking service; both are cheap to clone
/// and safe to share across requests.
#[derive(Clone)]
struct AppState {
    store: Arc<EntityStore>,
    booking: BookingService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        signup,
        list_users,
        create_booking,
        cancel_booking,
        professional_events
    ),
    components(schemas(
        HealthRes,
        SignupReq,
        SignupRole,
        UserRes,
        ListUsersRes,
        BookingReq,
        BookingRes,
        EventRes,
        ListEventsRes,
        ErrorRes
    ))
)]
struct ApiDoc;

type ApiError = (StatusCode, Json<ErrorRes>);

/// Maps a core error to an HTTP status plus the structured `{kind, detail}`
/// payload the web layer renders. Everything except storage faults is a
/// client-correctable 4xx.
fn error_response(err: CoreError) -> ApiError {
    let status = match &err {
        CoreError::InvalidInput(_)
        | CoreError::InvalidInterval
        | CoreError::InvalidValue(_)
        | CoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Overlap { .. }
        | CoreError::DuplicateKey(_)
        | CoreError::DuplicateLink { .. }
        | CoreError::InactiveProfessional(_) => StatusCode::CONFLICT,
        _ => {
            tracing::error!("storage error: {:?}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorRes::from_core(&err)))
}

fn parse_id(input: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(input).map_err(|e| error_response(CoreError::InvalidId(e)))
}

/// Main entry point for the Cliniq application.
///
/// Starts the REST server with Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `CLINIQ_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLINIC_DATA_DIR`: Directory for clinic data storage (default: "/clinic_data")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cliniq_core=info".parse()?)
                .add_directive("cliniq_run=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLINIQ_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("CLINIC_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(cliniq_core::config::DEFAULT_DATA_DIR));

    tracing::info!("++ Starting Cliniq REST on {}", rest_addr);
    tracing::info!("++ Clinic data dir: {}", data_dir.display());

    let cfg = Arc::new(CoreConfig::new(data_dir));
    let store = Arc::new(EntityStore::new(cfg));
    let booking = BookingService::new(store.clone());

    let app = Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users))
        .route("/users", post(signup))
        .route("/bookings", post(create_booking))
        .route("/bookings/:event_id", delete(cancel_booking))
        .route("/professionals/:id/events", get(professional_events))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { store, booking });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = SignupReq,
    responses(
        (status = 200, description = "User created", body = UserRes),
        (status = 400, description = "Invalid input", body = ErrorRes),
        (status = 409, description = "Email or social security number already registered", body = ErrorRes)
    )
)]
/// Creates a user record for any role.
///
/// Professionals sign up with a title, patients with a social security
/// number and an optional professional in charge.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupReq>,
) -> Result<Json<UserRes>, ApiError> {
    let email = NonEmptyText::new(&req.email)
        .map_err(|e| error_response(CoreError::InvalidValue(e)))?;

    let user = match req.role {
        SignupRole::Professional { title } => {
            let title = NonEmptyText::new(&title)
                .map_err(|e| error_response(CoreError::InvalidValue(e)))?;
            User::new_professional(email, req.first_name, req.last_name, req.date_of_birth, title)
        }
        SignupRole::Staff {} => {
            User::new_staff(email, req.first_name, req.last_name, req.date_of_birth)
        }
        SignupRole::Patient {
            social_sec_number,
            prof_in_charge,
        } => {
            let ssn = SocialSecNumber::new(social_sec_number)
                .map_err(|e| error_response(CoreError::InvalidValue(e)))?;
            let prof_in_charge = match prof_in_charge {
                Some(ref id) => Some(parse_id(id)?),
                None => None,
            };
            User::new_patient(
                email,
                req.first_name,
                req.last_name,
                req.date_of_birth,
                ssn,
                prof_in_charge,
            )
        }
    };

    state.store.save_user(&user).map_err(error_response)?;
    Ok(Json(UserRes::from(&user)))
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "List of users", body = ListUsersRes)
    )
)]
/// Lists all registered users.
async fn list_users(State(state): State<AppState>) -> Json<ListUsersRes> {
    let users = state.store.list_users();
    Json(ListUsersRes {
        users: users.iter().map(UserRes::from).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/bookings",
    request_body = BookingReq,
    responses(
        (status = 200, description = "Booking committed", body = BookingRes),
        (status = 400, description = "Invalid interval or input", body = ErrorRes),
        (status = 404, description = "Professional or patient not found", body = ErrorRes),
        (status = 409, description = "Conflict with an existing booking", body = ErrorRes)
    )
)]
/// Proposes a booking for a professional and patient.
///
/// The booking pipeline validates the interval and checks the
/// professional's calendar for overlaps before committing.
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingReq>,
) -> Result<Json<BookingRes>, ApiError> {
    let request = BookingRequest {
        professional_id: parse_id(&req.professional_id)?,
        patient_id: parse_id(&req.patient_id)?,
        name: NonEmptyText::new(&req.name)
            .map_err(|e| error_response(CoreError::InvalidValue(e)))?,
        start_time: req.start_time,
        end_time: req.end_time,
        description: req.description,
    };

    let booked = state.booking.book(request).map_err(error_response)?;
    Ok(Json(BookingRes::from(&booked)))
}

#[utoipa::path(
    delete,
    path = "/bookings/{event_id}",
    params(
        ("event_id" = String, Path, description = "Canonical id of the booked event")
    ),
    responses(
        (status = 200, description = "Booking cancelled"),
        (status = 404, description = "Event not found", body = ErrorRes)
    )
)]
/// Cancels a booking; the calendar link is deleted with the event.
async fn cancel_booking(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let event_id = parse_id(&event_id)?;
    state.booking.cancel(event_id).map_err(error_response)?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/professionals/{id}/events",
    params(
        ("id" = String, Path, description = "Canonical id of the professional")
    ),
    responses(
        (status = 200, description = "Events linked to the professional, ordered by start time", body = ListEventsRes),
        (status = 400, description = "Invalid identifier", body = ErrorRes)
    )
)]
/// Lists the events on one professional's calendar.
async fn professional_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ListEventsRes>, ApiError> {
    let professional_id = parse_id(&id)?;
    let events = state.store.events_for_professional(professional_id);
    Ok(Json(ListEventsRes {
        events: events.iter().map(EventRes::from).collect(),
    }))
}
