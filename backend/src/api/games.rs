//! Games API handlers.
//!
//! ```text
//! POST   /games                    create
//! GET    /games?page&pageSize      paginated list with exact total
//! POST   /games/steps              record a turn against a game
//! GET    /games/user/{userId}      games created by a user
//! GET    /games/creator/{creatorId} same filter, legacy prefix
//! GET    /games/{id}               fetch one game
//! PUT    /games/{id}               partial update
//! PUT    /games/{id}/status        set status + updated_at
//! PUT    /games/{id}/finish        mark finished + finished_at
//! GET    /games/{id}/steps         steps recorded for the game
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::patch::{Field, PatchBuilder};
use crate::error::{ApiError, ApiResult};
use crate::storage::StorageClient;
use pagination::{PageEnvelope, PageParams};

pub(crate) fn scope() -> actix_web::Scope {
    web::scope("/games")
        .service(add_step_to_game)
        .service(get_games_by_user)
        .service(get_games_by_creator)
        .service(create_game)
        .service(list_games)
        .service(update_game_status)
        .service(finish_game)
        .service(get_game_steps)
        .service(get_game)
        .service(update_game)
}

#[derive(Debug, Deserialize)]
struct NewGame {
    creator_id: Option<Value>,
    name: Option<Value>,
    description: Option<Value>,
}

#[post("")]
async fn create_game(
    storage: web::Data<StorageClient>,
    body: web::Json<NewGame>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let rows = storage
        .table("games")
        .insert(json!({
            "creator_id": body.creator_id,
            "name": body.name,
            "description": body.description,
        }))
        .await?;
    Ok(HttpResponse::Created().json(rows))
}

#[get("")]
async fn list_games(
    storage: web::Data<StorageClient>,
    query: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let (start, end) = query.window();
    let set = storage
        .table("games")
        .count_exact()
        .window(start, end)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(PageEnvelope::new(set.rows, set.total)))
}

#[get("/{id}")]
async fn get_game(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let Some(row) = storage.table("games").eq("id", &id).select_single().await? else {
        return Err(ApiError::not_found("Game not found"));
    };
    Ok(HttpResponse::Ok().json(row))
}

/// Both lookups filter on `creator_id`; the two prefixes predate each other
/// and deployed clients use both.
#[get("/user/{user_id}")]
async fn get_games_by_user(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    let set = storage
        .table("games")
        .eq("creator_id", &user_id)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[get("/creator/{creator_id}")]
async fn get_games_by_creator(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let creator_id = path.into_inner();
    let set = storage
        .table("games")
        .eq("creator_id", &creator_id)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

/// Update body; each field is tri-state (absent, null, value).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GamePatch {
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    player1_id: Field<String>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    player2_id: Field<String>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    status: Field<String>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    finished_at: Field<String>,
}

#[put("/{id}")]
async fn update_game(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
    body: web::Json<GamePatch>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let patch = build_game_patch(&body);

    let rows = storage.table("games").eq("id", &id).update(patch).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Game not found"));
    }
    Ok(HttpResponse::Ok().json(rows))
}

fn build_game_patch(body: &GamePatch) -> Value {
    PatchBuilder::new()
        .string("player1_id", &body.player1_id)
        .string("player2_id", &body.player2_id)
        .string("status", &body.status)
        .string("finished_at", &body.finished_at)
        .build()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusUpdate {
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    status: Field<Value>,
}

/// Status changes skip the matched-row check: the matched rows (possibly
/// none) are returned as-is. An absent `status` leaves the column alone
/// and only bumps `updated_at`.
#[put("/{id}/status")]
async fn update_game_status(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
    body: web::Json<StatusUpdate>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let rows = storage
        .table("games")
        .eq("id", &id)
        .update(build_status_patch(&body))
        .await?;
    Ok(HttpResponse::Ok().json(rows))
}

fn build_status_patch(body: &StatusUpdate) -> Value {
    PatchBuilder::new()
        .passthrough("status", &body.status)
        .raw("updated_at", Value::String(Utc::now().to_rfc3339()))
        .build()
}

#[put("/{id}/finish")]
async fn finish_game(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let rows = storage
        .table("games")
        .eq("id", &id)
        .update(json!({
            "status": "finished",
            "finished_at": Utc::now().to_rfc3339(),
        }))
        .await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Turn record written through the games surface. Carries the play-time
/// field set (`turn_number`, coordinates, difficulty, result).
#[derive(Debug, Deserialize)]
struct NewGameStep {
    game_id: Option<Value>,
    player_id: Option<Value>,
    turn_number: Option<Value>,
    x_value: Option<Value>,
    y_value: Option<Value>,
    difficulty: Option<Value>,
    result: Option<Value>,
}

#[post("/steps")]
async fn add_step_to_game(
    storage: web::Data<StorageClient>,
    body: web::Json<NewGameStep>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let rows = storage
        .table("steps")
        .insert(json!({
            "game_id": body.game_id,
            "player_id": body.player_id,
            "turn_number": body.turn_number,
            "x_value": body.x_value,
            "y_value": body.y_value,
            "difficulty": body.difficulty,
            "result": body.result,
        }))
        .await?;
    Ok(HttpResponse::Created().json(rows))
}

#[get("/{id}/steps")]
async fn get_game_steps(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let set = storage.table("steps").eq("game_id", &id).select().await?;
    Ok(HttpResponse::Ok().json(set.rows))
}
