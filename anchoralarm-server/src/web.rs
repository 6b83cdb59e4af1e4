use axum::{
    body::Bytes,
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::PoisonError,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_graceful_shutdown::SubsystemHandle;

use anchoralarm_core::{
    AnchorError, AnchorPut, AnchorState, Coordinate, Delta, NotificationState, TrackPoint,
};
use anchoralarm_server::{now_ms, App};

// Plugin endpoints
const DROP_ANCHOR_URI: &str = "/plugins/anchoralarm/dropAnchor";
const RAISE_ANCHOR_URI: &str = "/plugins/anchoralarm/raiseAnchor";
const SET_RADIUS_URI: &str = "/plugins/anchoralarm/setRadius";
const SET_RODE_LENGTH_URI: &str = "/plugins/anchoralarm/setRodeLength";
const SET_ANCHOR_POSITION_URI: &str = "/plugins/anchoralarm/setAnchorPosition";
const SET_MANUAL_ANCHOR_URI: &str = "/plugins/anchoralarm/setManualAnchor";
const STATE_URI: &str = "/plugins/anchoralarm/state";
const TRACK_URI: &str = "/plugins/anchoralarm/track";

// Signal K
const ANCHOR_URI: &str = "/signalk/v1/api/vessels/self/navigation/anchor";
const DELTA_URI: &str = "/signalk/v1/delta";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
}

#[derive(Clone)]
pub struct Web {
    app: App,
}

impl Web {
    pub fn new(app: App) -> Self {
        Web { app }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(DROP_ANCHOR_URI, post(drop_anchor))
            .route(RAISE_ANCHOR_URI, post(raise_anchor))
            .route(SET_RADIUS_URI, post(set_radius))
            .route(SET_RODE_LENGTH_URI, post(set_rode_length))
            .route(SET_ANCHOR_POSITION_URI, post(set_anchor_position))
            .route(SET_MANUAL_ANCHOR_URI, post(set_manual_anchor))
            .route(STATE_URI, get(get_state))
            .route(TRACK_URI, get(get_track))
            .route(ANCHOR_URI, get(get_anchor).put(put_anchor))
            .route(DELTA_URI, post(post_delta))
            .with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let port = self.app.args.port;
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await
                .map_err(WebError::Io)?;

        let app = self.router();
        info!("Starting HTTP web server on port {}", port);

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                debug!("Web server shutting down");
            },
            r = axum::serve(listener, app) => {
                return r.map_err(WebError::Io);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Request and response bodies
// =============================================================================

/// Result of an action, in the shape of a Signal K request response
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ActionResult {
    state: String,
    status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn action_response(result: Result<(), AnchorError>) -> Response {
    match result {
        Ok(()) => Json(ActionResult {
            state: "COMPLETED".to_string(),
            status_code: 200,
            message: Some("ok".to_string()),
        })
        .into_response(),
        Err(e) => {
            let code = e.status_code();
            debug!("Action failed ({}): {}", code, e);
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(ActionResult {
                    state: "FAILED".to_string(),
                    status_code: code,
                    message: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Parse a JSON body; an empty body gives the defaults
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AnchorError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AnchorError::InvalidInput(format!("invalid request body: {}", e)))
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, AnchorError> {
    value.ok_or_else(|| AnchorError::InvalidInput(format!("{} is required", name)))
}

#[derive(Debug, Default, Deserialize)]
struct RadiusRequest {
    radius: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RodeLengthRequest {
    #[serde(alias = "rodeLength")]
    length: Option<f64>,
    depth: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnchorPositionRequest {
    position: Option<Coordinate>,
    depth: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManualAnchorRequest {
    anchor_depth: Option<f64>,
    rode_length: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    #[serde(flatten)]
    anchor: AnchorState,
    watching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    alarm_state: Option<NotificationState>,
    alarm_active: bool,
    position_alarm: bool,
    incomplete_setup_timer: bool,
}

#[derive(Debug, Serialize)]
struct TrackResponse {
    points: Vec<TrackPoint>,
}

// =============================================================================
// Setup actions
// =============================================================================

/// POST /plugins/anchoralarm/dropAnchor - `{radius?}`
#[debug_handler]
async fn drop_anchor(State(state): State<Web>, body: Bytes) -> Response {
    let result = parse_body::<RadiusRequest>(&body).and_then(|req| {
        let now = now_ms();
        state.app.with_engine(|engine, host| engine.drop_anchor(host, now, req.radius))
    });
    action_response(result)
}

/// POST /plugins/anchoralarm/raiseAnchor
#[debug_handler]
async fn raise_anchor(State(state): State<Web>) -> Response {
    let result = state.app.with_engine(|engine, host| engine.raise_anchor(host));
    action_response(result)
}

/// POST /plugins/anchoralarm/setRadius - `{radius?}`, derived when absent
#[debug_handler]
async fn set_radius(State(state): State<Web>, body: Bytes) -> Response {
    let result = parse_body::<RadiusRequest>(&body).and_then(|req| {
        let now = now_ms();
        state.app.with_engine(|engine, host| engine.set_radius(host, now, req.radius))
    });
    action_response(result)
}

/// POST /plugins/anchoralarm/setRodeLength - `{length, depth?}`
#[debug_handler]
async fn set_rode_length(State(state): State<Web>, body: Bytes) -> Response {
    let result = parse_body::<RodeLengthRequest>(&body).and_then(|req| {
        let length = required(req.length, "length")?;
        let now = now_ms();
        state.app.with_engine(|engine, host| {
            engine.set_rode_length(host, now, length, req.depth)
        })
    });
    action_response(result)
}

/// POST /plugins/anchoralarm/setAnchorPosition - `{position, depth?}`
#[debug_handler]
async fn set_anchor_position(State(state): State<Web>, body: Bytes) -> Response {
    let result = parse_body::<AnchorPositionRequest>(&body).and_then(|req| {
        let position = required(req.position, "position")?;
        let now = now_ms();
        state.app.with_engine(|engine, host| {
            engine.set_anchor_position(host, now, position, req.depth)
        })
    });
    action_response(result)
}

/// POST /plugins/anchoralarm/setManualAnchor - `{anchorDepth?, rodeLength}`
#[debug_handler]
async fn set_manual_anchor(State(state): State<Web>, body: Bytes) -> Response {
    let result = parse_body::<ManualAnchorRequest>(&body).and_then(|req| {
        let rode_length = required(req.rode_length, "rodeLength")?;
        let now = now_ms();
        state.app.with_engine(|engine, host| {
            engine.set_manual_anchor(host, now, req.anchor_depth, rode_length)
        })
    });
    action_response(result)
}

/// PUT navigation.anchor - `{"value": null}` raises, `{"value": {position, radius}}` sets
#[debug_handler]
async fn put_anchor(State(state): State<Web>, body: Bytes) -> Response {
    let result = serde_json::from_slice::<Value>(&body)
        .map_err(|e| AnchorError::InvalidInput(format!("invalid request body: {}", e)))
        .and_then(|body| match body.get("value") {
            None => Err(AnchorError::InvalidInput("value is required".to_string())),
            Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value::<AnchorPut>(value.clone())
                .map(Some)
                .map_err(|e| AnchorError::InvalidInput(format!("invalid anchor: {}", e))),
        })
        .and_then(|put| {
            let now = now_ms();
            state.app.with_engine(|engine, host| engine.put_anchor(host, now, put))
        });
    action_response(result)
}

// =============================================================================
// Queries and feed
// =============================================================================

/// GET /plugins/anchoralarm/state
#[debug_handler]
async fn get_state(State(state): State<Web>) -> Response {
    let engine = state
        .app
        .engine
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let session = engine.session();
    Json(StateResponse {
        anchor: engine.state().clone(),
        watching: engine.is_watching(),
        alarm_state: session.last_alarm_state(),
        alarm_active: session.anchor_alarm_active(),
        position_alarm: session.position_alarm_active(),
        incomplete_setup_timer: session.incomplete_setup_timer_active(),
    })
    .into_response()
}

/// GET /plugins/anchoralarm/track
#[debug_handler]
async fn get_track(State(state): State<Web>) -> Response {
    let engine = state
        .app
        .engine
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Json(TrackResponse {
        points: engine.track().to_vec(),
    })
    .into_response()
}

/// GET navigation.anchor - last published values
#[debug_handler]
async fn get_anchor(State(state): State<Web>) -> Response {
    let published = state
        .app
        .published
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    Json(published.anchor_tree()).into_response()
}

/// POST /signalk/v1/delta - sensor feed
#[debug_handler]
async fn post_delta(State(state): State<Web>, body: Bytes) -> Response {
    let delta: Delta = match serde_json::from_slice(&body) {
        Ok(delta) => delta,
        Err(e) => {
            return action_response(Err(AnchorError::InvalidInput(format!(
                "invalid delta: {}",
                e
            ))))
        }
    };

    let used = state
        .app
        .navdata
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .apply(&delta);
    if delta.context.as_deref().map_or(true, |c| c == "vessels.self") {
        state
            .app
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_notifications(&delta);
    }
    debug!("Delta with {} usable values", used);

    action_response(Ok(()))
}
