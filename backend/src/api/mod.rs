//! REST API modules: one handler module per resource group.

pub mod functions;
pub mod games;
pub mod health;
mod patch;
pub mod steps;
#[cfg(test)]
pub(crate) mod test_support;
pub mod tickets;
pub mod users;

use actix_web::web;

/// Register every resource scope plus the health probes.
///
/// Within each scope, literal segments are registered ahead of `{id}`
/// captures so paths like `/users/search` never match as an identifier.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(users::scope())
        .service(games::scope())
        .service(functions::scope())
        .service(steps::scope())
        .service(tickets::scope())
        .service(health::live)
        .service(health::ready);
}
