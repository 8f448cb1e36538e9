// End-to-end tests of the session endpoints wired the way the binary wires them
use actix_web::{http::StatusCode, test, web, App};
use sessionvault::models::SessionStatus;
use sessionvault::session::SessionStore;
use sessionvault::testing::constants::TEST_USER;
use sessionvault::testing::{assert_cookie_cleared, response_token, RequestBuilder, TestFixtures};
use sessionvault::{configure_services, CookieFactory, SessionManager};

#[actix_web::test]
async fn test_exclusive_sign_in_across_clients() {
    let settings = TestFixtures::settings();
    let manager = web::Data::new(SessionManager::from_settings(&settings.session));
    let cookie_name = settings.cookies.name.clone();
    let application = settings.application.clone();
    let app = test::init_service(
        App::new()
            .app_data(manager.clone())
            .app_data(web::Data::new(CookieFactory::new(settings.cookies.clone())))
            .configure(move |cfg| configure_services(cfg, &application)),
    )
    .await;

    // Laptop signs in
    let resp = test::call_service(
        &app,
        RequestBuilder::sign_in(None, TEST_USER, false).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let laptop = response_token(&resp, &cookie_name).unwrap();

    // Phone signs in exclusively and takes over
    let resp = test::call_service(
        &app,
        RequestBuilder::sign_in(None, TEST_USER, true).to_request(),
    )
    .await;
    let phone = response_token(&resp, &cookie_name).unwrap();

    let resp = test::call_service(
        &app,
        RequestBuilder::current_user(Some(&laptop)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        RequestBuilder::session_status(Some(&laptop)).to_request(),
    )
    .await;
    let status: SessionStatus = test::read_body_json(resp).await;
    assert_eq!(status, SessionStatus::anonymous());

    let resp = test::call_service(&app, RequestBuilder::current_user(Some(&phone)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Phone signs out; the laptop's anonymous session remains
    let resp = test::call_service(&app, RequestBuilder::sign_out(Some(&phone)).to_request()).await;
    assert_cookie_cleared(&resp, &cookie_name);
    assert_eq!(manager.store().sessions_for_user(TEST_USER).len(), 0);
    manager.shutdown();
}

#[actix_web::test]
async fn test_malformed_cookie_gets_fresh_session() {
    let settings = TestFixtures::settings();
    let application = settings.application.clone();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(SessionManager::from_settings(&settings.session)))
            .app_data(web::Data::new(CookieFactory::new(settings.cookies.clone())))
            .configure(move |cfg| configure_services(cfg, &application)),
    )
    .await;

    let resp = test::call_service(
        &app,
        RequestBuilder::session_status(Some("not-a-session-id")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = response_token(&resp, &settings.cookies.name).unwrap();
    assert_eq!(token.len(), sessionvault::session::SESSION_ID_LENGTH);
}
