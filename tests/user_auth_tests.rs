//! Organization user sign-up / sign-in tests

#[macro_use]
mod common;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};

use common::{PASSWORD, TestPortal, body_text, json_body, location, response_cookie};
use dpc_portal::api::constants::{FLASH_COOKIE, USER_SESSION_COOKIE};
use dpc_portal::errors::PortalError;
use dpc_portal::services::SignUpParams;

#[actix_web::test]
async fn test_sign_in_page_renders_form() {
    let portal = TestPortal::new().await;
    let app = portal_app!(portal);

    let req = TestRequest::get().uri("/users/sign_in").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("data-test=\"user-sign-in-form\""));
}

#[actix_web::test]
async fn test_sign_up_signs_in_and_redirects() {
    let portal = TestPortal::new().await;
    let app = portal_app!(portal);

    let req = TestRequest::post()
        .uri("/users/sign_up")
        .set_form([
            ("email", "Marlin@Example.com"),
            ("first_name", "Marlin"),
            ("last_name", "Clownfish"),
            ("password", PASSWORD),
            ("password_confirmation", PASSWORD),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");
    let session = response_cookie(&resp, USER_SESSION_COOKIE).expect("session cookie");
    let flash = response_cookie(&resp, FLASH_COOKIE).expect("flash cookie");

    let req = TestRequest::get()
        .uri("/dashboard")
        .cookie(Cookie::new(USER_SESSION_COOKIE, session))
        .cookie(Cookie::new(FLASH_COOKIE, flash))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // 闪现消息读取后即被清除
    assert_eq!(response_cookie(&resp, FLASH_COOKIE).as_deref(), Some(""));
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("marlin@example.com"));
    assert!(body.contains("data-test=\"flash\""));
    assert!(body.contains("You are not assigned to any organization yet."));
}

#[actix_web::test]
async fn test_sign_up_validation_errors() {
    let portal = TestPortal::new().await;
    let app = portal_app!(portal);

    let req = TestRequest::post()
        .uri("/users/sign_up")
        .set_form([
            ("email", "not-an-email"),
            ("first_name", "Marlin"),
            ("last_name", ""),
            ("password", "short"),
            ("password_confirmation", "different"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response_cookie(&resp, USER_SESSION_COOKIE).is_none());

    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Email is invalid"));
    assert!(body.contains("Last name can&#x27;t be blank"));
    assert!(body.contains("Password is too short (minimum is 8 characters)"));
    assert!(body.contains("value=\"Marlin\""));
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let portal = TestPortal::new().await;
    portal.create_user("marlin@example.com").await;

    let err = portal
        .context
        .user_service
        .sign_up(SignUpParams {
            email: " MARLIN@example.com ".to_string(),
            first_name: "Marlin".to_string(),
            last_name: "Clownfish".to_string(),
            password: PASSWORD.to_string(),
            password_confirmation: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, PortalError::Validation(m) if m.contains("Email has already been taken"))
    );
}

#[actix_web::test]
async fn test_sign_in_with_valid_credentials() {
    let portal = TestPortal::new().await;
    portal.create_user("marlin@example.com").await;
    let app = portal_app!(portal);

    let req = TestRequest::post()
        .uri("/users/sign_in")
        .set_form([("email", "marlin@example.com"), ("password", PASSWORD)])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");
    assert!(response_cookie(&resp, USER_SESSION_COOKIE).is_some());
}

#[actix_web::test]
async fn test_sign_in_with_wrong_password() {
    let portal = TestPortal::new().await;
    portal.create_user("marlin@example.com").await;
    let app = portal_app!(portal);

    let req = TestRequest::post()
        .uri("/users/sign_in")
        .set_form([("email", "marlin@example.com"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(response_cookie(&resp, USER_SESSION_COOKIE).is_none());

    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Invalid email or password"));
    assert!(body.contains("value=\"marlin@example.com\""));
}

#[actix_web::test]
async fn test_signed_in_user_skips_sign_in_page() {
    let portal = TestPortal::new().await;
    let user = portal.create_user("marlin@example.com").await;
    let app = portal_app!(portal);

    let req = TestRequest::get()
        .uri("/users/sign_in")
        .cookie(portal.user_cookie(user.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");
}

#[actix_web::test]
async fn test_sign_out_clears_session() {
    let portal = TestPortal::new().await;
    let user = portal.create_user("marlin@example.com").await;
    let app = portal_app!(portal);

    let req = TestRequest::post()
        .uri("/users/sign_out")
        .cookie(portal.user_cookie(user.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/sign_in");
    assert_eq!(
        response_cookie(&resp, USER_SESSION_COOKIE).as_deref(),
        Some("")
    );
}

#[actix_web::test]
async fn test_forged_session_is_ignored() {
    let portal = TestPortal::new().await;
    let app = portal_app!(portal);

    let req = TestRequest::get()
        .uri("/dashboard")
        .cookie(Cookie::new(USER_SESSION_COOKIE, "not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/users/sign_in");
}

#[actix_web::test]
async fn test_health_endpoints() {
    let portal = TestPortal::new().await;
    let app = portal_app!(portal);

    let req = TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(&test::read_body(resp).await);
    assert_eq!(body["status"], "healthy");

    let req = TestRequest::get().uri("/health/live").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
