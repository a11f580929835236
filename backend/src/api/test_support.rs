//! Shared fixtures for handler tests.

use actix_web::body::{MessageBody, to_bytes};
use actix_web::dev::ServiceResponse;
use actix_web::{App, web};

use crate::api;
use crate::api::health::HealthState;
use crate::config::StorageConfig;
use crate::storage::StorageClient;

/// Storage client pointing at a closed local port. Handler tests only
/// exercise paths that fail validation before a query is issued, so no
/// request ever leaves the process.
pub(crate) fn test_storage() -> web::Data<StorageClient> {
    let config = StorageConfig {
        url: "http://127.0.0.1:1".parse().expect("storage URL"),
        key: "test-key".into(),
    };
    web::Data::new(StorageClient::new(&config).expect("storage client"))
}

/// Application with every resource scope registered, mirroring production
/// wiring.
pub(crate) fn test_app() -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(test_storage())
        .app_data(web::Data::new(HealthState::new()))
        .configure(api::configure)
}

/// Extract the `error` string from an error response body.
pub(crate) async fn read_error<B>(response: ServiceResponse<B>) -> String
where
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let body = to_bytes(response.into_body()).await.expect("body bytes");
    let value: serde_json::Value = serde_json::from_slice(&body).expect("error JSON");
    value["error"].as_str().expect("error string").to_owned()
}
