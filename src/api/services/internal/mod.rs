//! Pages for internal staff, all behind [`SessionGuard::internal`]

pub mod assignments;
pub mod auth;
pub mod organizations;
pub mod registered_organizations;

use actix_web::web;

use crate::api::constants::INTERNAL_HOME_PATH;
use crate::api::middleware::SessionGuard;
use crate::api::session::redirect;

async fn home() -> actix_web::HttpResponse {
    redirect(INTERNAL_HOME_PATH)
}

pub fn internal_routes() -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<
            actix_web::body::EitherBody<actix_web::body::BoxBody>,
        >,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("/internal")
        .wrap(SessionGuard::internal())
        .route("", web::get().to(home))
        .route("/sign_in", web::get().to(auth::sign_in_page))
        .route("/sign_out", web::post().to(auth::sign_out))
        .route("/auth/{provider}", web::get().to(auth::authorize))
        .route("/auth/{provider}/callback", web::get().to(auth::callback))
        .service(
            web::scope("/organizations")
                .route("", web::get().to(organizations::index))
                .route("", web::post().to(organizations::create))
                .route("/new", web::get().to(organizations::new_organization))
                .route("/{id}", web::get().to(organizations::show))
                .route("/{id}", web::post().to(organizations::update))
                .route("/{id}/edit", web::get().to(organizations::edit))
                .route("/{id}/delete", web::post().to(organizations::delete))
                .route(
                    "/{id}/registered_organizations",
                    web::post().to(registered_organizations::create),
                )
                .route(
                    "/{id}/registered_organizations/new",
                    web::get().to(registered_organizations::new_registration),
                )
                .route(
                    "/{id}/registered_organizations/{env}",
                    web::post().to(registered_organizations::update),
                )
                .route(
                    "/{id}/registered_organizations/{env}/edit",
                    web::get().to(registered_organizations::edit),
                )
                .route(
                    "/{id}/registered_organizations/{env}/delete",
                    web::post().to(registered_organizations::delete),
                )
                .route("/{id}/users", web::post().to(assignments::create))
                .route(
                    "/{id}/users/{user_id}/delete",
                    web::post().to(assignments::delete),
                ),
        )
}
