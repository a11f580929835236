//! Support-ticket API handlers.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::patch::{Field, PatchBuilder};
use crate::error::{ApiError, ApiResult};
use crate::storage::StorageClient;

pub(crate) fn scope() -> actix_web::Scope {
    web::scope("/tickets")
        .service(get_tickets_by_user)
        .service(create_ticket)
        .service(get_ticket)
        .service(update_ticket)
        .service(delete_ticket)
}

#[derive(Debug, Deserialize)]
struct NewTicket {
    user_id: Option<Value>,
    subject: Option<Value>,
    message: Option<Value>,
}

#[post("")]
async fn create_ticket(
    storage: web::Data<StorageClient>,
    body: web::Json<NewTicket>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let rows = storage
        .table("tickets")
        .insert(json!({
            "user_id": body.user_id,
            "subject": body.subject,
            "message": body.message,
        }))
        .await?;
    Ok(HttpResponse::Created().json(rows))
}

#[get("/{id}")]
async fn get_ticket(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let Some(row) = storage
        .table("tickets")
        .eq("id", &id)
        .select_single()
        .await?
    else {
        return Err(ApiError::not_found("Ticket not found"));
    };
    Ok(HttpResponse::Ok().json(row))
}

#[get("/user/{user_id}")]
async fn get_tickets_by_user(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    let set = storage
        .table("tickets")
        .eq("user_id", &user_id)
        .select()
        .await?;
    Ok(HttpResponse::Ok().json(set.rows))
}

/// Ticket updates forward every provided field as-is, including empty
/// strings and explicit nulls. Clearing a ticket's priority is a valid
/// operation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TicketPatch {
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    subject: Field<Value>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    message: Field<Value>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    status: Field<Value>,
    #[serde(deserialize_with = "crate::api::patch::deserialize_field")]
    priority: Field<Value>,
}

#[put("/{id}")]
async fn update_ticket(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
    body: web::Json<TicketPatch>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let patch = build_ticket_patch(&body);

    let rows = storage.table("tickets").eq("id", &id).update(patch).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Ticket not found"));
    }
    Ok(HttpResponse::Ok().json(rows))
}

fn build_ticket_patch(body: &TicketPatch) -> Value {
    PatchBuilder::new()
        .passthrough("subject", &body.subject)
        .passthrough("message", &body.message)
        .passthrough("status", &body.status)
        .passthrough("priority", &body.priority)
        .build()
}

#[delete("/{id}")]
async fn delete_ticket(
    storage: web::Data<StorageClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    storage.table("tickets").eq("id", &id).delete().await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_keeps_empty_strings_and_nulls() {
        let body: TicketPatch = serde_json::from_value(json!({
            "subject": "",
            "status": null,
            "priority": "low",
        }))
        .expect("patch body");
        assert_eq!(
            build_ticket_patch(&body),
            json!({ "subject": "", "status": null, "priority": "low" })
        );
    }

    #[test]
    fn patch_skips_absent_fields() {
        let body: TicketPatch =
            serde_json::from_value(json!({ "status": "closed" })).expect("patch body");
        assert_eq!(build_ticket_patch(&body), json!({ "status": "closed" }));
    }
}
