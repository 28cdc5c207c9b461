pub mod client_tokens;
pub mod health;
pub mod helpers;
pub mod internal;
pub mod users;

use actix_web::web;

pub use client_tokens::client_token_routes;
pub use health::{AppStartTime, HealthService, health_routes};
pub use internal::internal_routes;
pub use users::user_routes;

use crate::api::constants::DASHBOARD_PATH;
use crate::api::middleware::SessionGuard;
use crate::api::session::redirect;

async fn root() -> actix_web::HttpResponse {
    redirect(DASHBOARD_PATH)
}

/// All portal routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .service(health_routes())
        .service(user_routes())
        .service(
            web::resource(DASHBOARD_PATH)
                .wrap(SessionGuard::user())
                .route(web::get().to(users::dashboard)),
        )
        .service(client_token_routes())
        .service(internal_routes());
}
