use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::LOCATION,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::api::constants;
use crate::api::jwt::SessionScope;
use crate::api::session::SessionManager;

/// Signed-in principal, inserted into request extensions by [`SessionGuard`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSubject {
    pub scope: SessionScope,
    pub id: i32,
}

/// Redirects to the matching sign-in page unless a session of `scope` is present
#[derive(Clone)]
pub struct SessionGuard {
    scope: SessionScope,
    sign_in_path: &'static str,
    public_paths: &'static [&'static str],
}

impl SessionGuard {
    pub fn user() -> Self {
        Self {
            scope: SessionScope::User,
            sign_in_path: constants::USER_SIGN_IN_PATH,
            public_paths: &[],
        }
    }

    /// 登录页与 OAuth 回调不需要会话
    pub fn internal() -> Self {
        Self {
            scope: SessionScope::InternalUser,
            sign_in_path: constants::INTERNAL_SIGN_IN_PATH,
            public_paths: &[constants::INTERNAL_SIGN_IN_PATH, "/internal/auth/"],
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardMiddleware {
            service: Rc::new(service),
            guard: self.clone(),
        }))
    }
}

pub struct SessionGuardMiddleware<S> {
    service: Rc<S>,
    guard: SessionGuard,
}

impl<S, B> SessionGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn is_public(req: &ServiceRequest, guard: &SessionGuard) -> bool {
        let path = req.path();
        guard
            .public_paths
            .iter()
            .any(|public| path == *public || (public.ends_with('/') && path.starts_with(public)))
    }

    fn validate_session(req: &ServiceRequest, scope: SessionScope) -> Option<i32> {
        let sessions = req.app_data::<web::Data<Arc<SessionManager>>>()?;
        let cookie = req.cookie(match scope {
            SessionScope::User => constants::USER_SESSION_COOKIE,
            SessionScope::InternalUser => constants::INTERNAL_SESSION_COOKIE,
        });
        sessions.subject(cookie.as_ref().map(|c| c.value()), scope)
    }

    fn redirect_to_sign_in(req: ServiceRequest, location: &str) -> ServiceResponse<EitherBody<B>> {
        req.into_response(
            HttpResponse::SeeOther()
                .insert_header((LOCATION, location.to_string()))
                .finish()
                .map_into_right_body(),
        )
    }
}

impl<S, B> Service<ServiceRequest> for SessionGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let guard = self.guard.clone();

        Box::pin(async move {
            if Self::is_public(&req, &guard) {
                trace!("{} is public - bypassing session check", req.path());
                let response = srv.call(req).await?.map_into_left_body();
                return Ok(response);
            }

            match Self::validate_session(&req, guard.scope) {
                Some(id) => {
                    trace!("{} session {} accepted for {}", guard.scope, id, req.path());
                    req.extensions_mut().insert(SessionSubject {
                        scope: guard.scope,
                        id,
                    });
                    let response = srv.call(req).await?.map_into_left_body();
                    Ok(response)
                }
                None => {
                    debug!(
                        "No {} session for {} - redirecting to {}",
                        guard.scope,
                        req.path(),
                        guard.sign_in_path
                    );
                    Ok(Self::redirect_to_sign_in(req, guard.sign_in_path))
                }
            }
        })
    }
}
