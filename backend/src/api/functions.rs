//! Mathematical-function API handlers.
//!
//! Functions are expressions with an optional value range (`y_min`,
//! `y_max`) used to pick candidates for a turn.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::patch::{Field, PatchBuilder};
use crate::error::{ApiError, ApiResult};
use crate::storage::StorageClient;
use pagination::{PageEnvelope, PageParams};

pub(crate) fn scope() -> actix_web::Scope {
    web::scope("/functions")
        .service(search_functions)
        .service(get_functions_by_range)
        .service(get_functions_by_user)
        .service(create_function)
        .service(list_functions)
        .service(get_function)
        .service(update_function)
        .service(delete_function)
}

#[derive(Debug, Deserialize)]
struct NewFunction {
    creator_id: Option<Value>,
    expression: Option<Value>,
    y_min: Option<Value>,
    y_max: Option<Value>,
}

#[post("")]
async fn create_function(
    storage: web::Data<StorageClient>,
    body: web::Json<NewFunction>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let rows = storage
        .table("functions")
        .insert(json!({
            "creator_id": body.creator_id,
            "expression": body.expression,
            "y_min": body.y_min,
            "y_max": body.y_max,
        }))
        .await?;
    Ok(HttpResponse::Created().json(rows))
}

#[get("")]
async fn list_functions(
    storage: web::Data<StorageClient>,
    query: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let (start, end) = query.window();
    let set = storage
        .table("functions")
        .count_exact()
        .window(start, end)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(PageEnvelope::new(set.rows, set.total)))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: Option<String>,
}

#[get("/search")]
async fn search_functions(
    storage: web::Data<StorageClient>,
    query: web::Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    let Some(needle) = query.query.as_deref().filter(|q| !q.is_empty()) else {
        return Err(ApiError::invalid_request("Search query is required"));
    };
    let set = storage
        .table("functions")
        .ilike_contains("expression", needle)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    min: Option<String>,
    max: Option<String>,
}

/// Range lookup: functions whose `[y_min, y_max]` interval lies within the
/// requested bounds. Bounds are forwarded verbatim and compared by the
/// backend using column collation.
#[get("/range")]
async fn get_functions_by_range(
    storage: web::Data<StorageClient>,
    query: web::Query<RangeQuery>,
) -> ApiResult<HttpResponse> {
    let (Some(min), Some(max)) = (query.min.as_deref(), query.max.as_deref()) else {
        return Err(ApiError::invalid_request("min and max are required"));
    };
    let set = storage
        .table("functions")
        .gte("y_min", min)
        .lte("y_max", max)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[get("/user/{user_id}")]
async fn get_functions_by_user(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    let set = storage
        .table("functions")
        .eq("creator_id", &user_id)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

#[get("/{id}")]
async fn get_function(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let Some(row) = storage
        .table("functions")
        .eq("id", &id)
        .select_single()
        .await?
    else {
        return Err(ApiError::not_found("Function not found"));
    };
    Ok(HttpResponse::Ok().json(row))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FunctionPatch {
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    expression: Field<String>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    y_min: Field<f64>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    y_max: Field<f64>,
}

#[put("/{id}")]
async fn update_function(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
    body: web::Json<FunctionPatch>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let patch = build_function_patch(&body);

    let rows = storage
        .table("functions")
        .eq("id", &id)
        .update(patch)
        .await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Function not found"));
    }
    Ok(HttpResponse::Ok().json(rows))
}

fn build_function_patch(body: &FunctionPatch) -> Value {
    PatchBuilder::new()
        .string("expression", &body.expression)
        .number("y_min", &body.y_min)
        .number("y_max", &body.y_max)
        .build()
}

#[delete("/{id}")]
async fn delete_function(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    storage.table("functions").eq("id", &id).delete().await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{read_error, test_app};
    use actix_web::{http::StatusCode, test as actix_test};
    use rstest::rstest;

    #[rstest]
    #[case::missing("/functions/search")]
    #[case::empty("/functions/search?query=")]
    #[actix_web::test]
    async fn search_requires_a_query(#[case] uri: &str) {
        let app = actix_test::init_service(test_app()).await;
        let response =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_error(response).await, "Search query is required");
    }

    // A populated `query` parameter must clear validation and reach the
    // storage round trip.
    #[actix_web::test]
    async fn search_accepts_the_query_parameter() {
        let app = actix_test::init_service(test_app()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/functions/search?query=sin")
                .to_request(),
        )
        .await;
        assert_ne!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[case::neither("/functions/range")]
    #[case::only_min("/functions/range?min=0")]
    #[case::only_max("/functions/range?max=10")]
    #[actix_web::test]
    async fn range_requires_both_bounds(#[case] uri: &str) {
        let app = actix_test::init_service(test_app()).await;
        let response =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_error(response).await, "min and max are required");
    }

    #[test]
    fn patch_drops_zero_bounds() {
        let body: FunctionPatch = serde_json::from_value(json!({
            "expression": "x^2",
            "y_min": 0,
            "y_max": 4.5,
        }))
        .expect("patch body");
        assert_eq!(
            build_function_patch(&body),
            json!({ "expression": "x^2", "y_max": 4.5 })
        );
    }
}
