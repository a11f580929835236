//! Step API handlers.
//!
//! Steps are individual turns. Records created here carry the
//! preparation-time field set (`step_number`, `function_id`,
//! `user_answer`); records created via `POST /games/steps` carry the
//! play-time set. Both live in the same table, so every column is
//! optional.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::patch::{Field, PatchBuilder};
use crate::error::{ApiError, ApiResult};
use crate::storage::StorageClient;
use pagination::{PageEnvelope, PageParams};

pub(crate) fn scope() -> actix_web::Scope {
    web::scope("/steps")
        .service(get_steps_by_game_turn)
        .service(get_steps_by_game)
        .service(get_steps_by_player)
        .service(get_steps_by_difficulty)
        .service(get_steps_by_function)
        .service(create_step)
        .service(list_steps)
        .service(update_step)
        .service(delete_step)
}

#[derive(Debug, Deserialize)]
struct NewStep {
    game_id: Option<Value>,
    step_number: Option<Value>,
    function_id: Option<Value>,
    user_answer: Option<Value>,
}

#[post("")]
async fn create_step(
    storage: web::Data<StorageClient>,
    body: web::Json<NewStep>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let rows = storage
        .table("steps")
        .insert(json!({
            "game_id": body.game_id,
            "step_number": body.step_number,
            "function_id": body.function_id,
            "user_answer": body.user_answer,
        }))
        .await?;
    Ok(HttpResponse::Created().json(rows))
}

#[get("")]
async fn list_steps(
    storage: web::Data<StorageClient>,
    query: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let (start, end) = query.window();
    let set = storage
        .table("steps")
        .count_exact()
        .window(start, end)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(PageEnvelope::new(set.rows, set.total)))
}

#[get("/game/{game_id}")]
async fn get_steps_by_game(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let game_id = path.into_inner();
    let set = storage
        .table("steps")
        .eq("game_id", &game_id)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[get("/game/{game_id}/turn/{turn_number}")]
async fn get_steps_by_game_turn(
    storage: web::Data<StorageClient>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (game_id, turn_number) = path.into_inner();
    let set = storage
        .table("steps")
        .eq("game_id", &game_id)
        .eq("turn_number", &turn_number)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[get("/player/{player_id}")]
async fn get_steps_by_player(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let player_id = path.into_inner();
    let set = storage
        .table("steps")
        .eq("player_id", &player_id)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[get("/difficulty/{difficulty}")]
async fn get_steps_by_difficulty(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let difficulty = path.into_inner();
    let set = storage
        .table("steps")
        .eq("difficulty", &difficulty)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[get("/function/{function_id}")]
async fn get_steps_by_function(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let function_id = path.into_inner();
    let set = storage
        .table("steps")
        .eq("function_id", &function_id)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StepPatch {
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    turn_number: Field<i64>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    x_value: Field<f64>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    y_value: Field<f64>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    difficulty: Field<i64>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    result: Field<String>,
}

#[put("/{id}")]
async fn update_step(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
    body: web::Json<StepPatch>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let patch = build_step_patch(&body);

    let rows = storage.table("steps").eq("id", &id).update(patch).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Step not found"));
    }
    Ok(HttpResponse::Ok().json(rows))
}

fn build_step_patch(body: &StepPatch) -> Value {
    PatchBuilder::new()
        .integer("turn_number", &body.turn_number)
        .number("x_value", &body.x_value)
        .number("y_value", &body.y_value)
        .integer("difficulty", &body.difficulty)
        .string("result", &body.result)
        .build()
}

#[delete("/{id}")]
async fn delete_step(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    storage.table("steps").eq("id", &id).delete().await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// A difficulty of zero is indistinguishable from "unset" and never
    /// reaches the update payload.
    #[test]
    fn patch_drops_zero_difficulty() {
        let body: StepPatch = serde_json::from_value(json!({
            "difficulty": 0,
            "result": "correct",
        }))
        .expect("patch body");
        assert_eq!(build_step_patch(&body), json!({ "result": "correct" }));
    }

    #[rstest]
    #[case::coordinates(
        json!({ "x_value": 1.5, "y_value": -2.25 }),
        json!({ "x_value": 1.5, "y_value": -2.25 })
    )]
    #[case::zero_coordinates(json!({ "x_value": 0, "y_value": 0 }), json!({}))]
    #[case::turn(json!({ "turn_number": 3 }), json!({ "turn_number": 3 }))]
    fn patch_translates_fields(#[case] body: Value, #[case] expected: Value) {
        let body: StepPatch = serde_json::from_value(body).expect("patch body");
        assert_eq!(build_step_patch(&body), expected);
    }
}
