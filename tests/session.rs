mod common;

use common::*;
use mockito::Matcher;
use oneblu::panel::PanelEndpoints;
use oneblu::session::USER_AGENT;
use oneblu::{LoginError, Session, SessionState};
use reqwest::header::{HeaderMap, HeaderValue};

#[test]
fn password_login_succeeds() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let login = password_redirect(&mut server, "/start/").expect(1).create();
    let _start = server
        .mock("GET", "/start/")
        .match_header("user-agent", USER_AGENT)
        .match_header("cookie", Matcher::Regex(format!("PHPSESSID={SESSION_ID}")))
        .with_status(200)
        .with_body(START_PAGE)
        .create();

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert_eq!(session.state(), &SessionState::Authenticated);
    assert!(session.is_valid());
    login.assert();
}

#[test]
fn second_factor_login_succeeds() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let _login = password_redirect(&mut server, "/2fa/").create();
    let _second_factor = page(&mut server, "/2fa/", SECOND_FACTOR_PAGE);
    let check = server
        .mock("POST", "/2fa_check/")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("_csrf_token".into(), "2fa-token".into()),
            Matcher::Regex(r"_auth_code=\d{6}".into()),
        ]))
        .with_status(302)
        .with_header("location", "/start/")
        .expect(1)
        .create();
    let _start = page(&mut server, "/start/", START_PAGE);

    let session = Session::connect(credentials_with_otp(), endpoints(&server)).unwrap();

    assert_eq!(session.state(), &SessionState::Authenticated);
    assert!(session.is_valid());
    check.assert();
}

#[test]
fn second_factor_without_otp_key() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let _login = password_redirect(&mut server, "/2fa/").create();
    let _second_factor = page(&mut server, "/2fa/", SECOND_FACTOR_PAGE);
    let check = server.mock("POST", "/2fa_check/").expect(0).create();
    let _start = redirect(&mut server, "GET", "/start/", "/2fa/");

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert_eq!(
        session.state(),
        &SessionState::Failed(LoginError::OtpRequired)
    );
    assert!(!session.is_valid());
    check.assert();
}

#[test]
fn wrong_credentials_are_reported() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let _login = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(with_alert(LOGIN_PAGE, "Falsche Zugangsdaten"))
        .create();
    let _start = redirect(&mut server, "GET", "/start/", "/");

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert_eq!(
        session.state(),
        &SessionState::Failed(LoginError::WrongCredentials)
    );
    assert!(!session.is_valid());
}

#[test]
fn staying_on_login_page_is_not_authenticated() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let _login = password_redirect(&mut server, "/").create();
    let _start = redirect(&mut server, "GET", "/start/", "/");

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert!(matches!(
        session.state(),
        SessionState::Failed(LoginError::UnknownLoginError(_))
    ));
    assert!(!session.is_valid());
}

#[test]
fn rejected_csrf_token() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let _login = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(with_alert(LOGIN_PAGE, "Ungültiges CSRF-Token."))
        .create();

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert_eq!(
        session.state(),
        &SessionState::Failed(LoginError::InvalidCsrfToken)
    );
}

#[test]
fn rejected_one_time_password() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let _login = password_redirect(&mut server, "/2fa/").create();
    let _second_factor = page(
        &mut server,
        "/2fa/",
        &with_alert(SECOND_FACTOR_PAGE, "Der Code ist ungültig."),
    );
    let _check = redirect(&mut server, "POST", "/2fa_check/", "/2fa/");

    let session = Session::connect(credentials_with_otp(), endpoints(&server)).unwrap();

    assert_eq!(session.state(), &SessionState::Failed(LoginError::InvalidOtp));
}

#[test]
fn missing_csrf_token() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, "<html><body>Wartungsarbeiten</body></html>");
    let login = server.mock("POST", "/").expect(0).create();

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert_eq!(
        session.state(),
        &SessionState::Failed(LoginError::CsrfTokenMissing(format!("{}/", server.url())))
    );
    login.assert();
}

#[test]
fn missing_session_cookie() {
    let mut server = mockito::Server::new();
    let _root = page(&mut server, "/", LOGIN_PAGE);
    let login = server.mock("POST", "/").expect(0).create();

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert_eq!(
        session.state(),
        &SessionState::Failed(LoginError::SessionCookieMissing("PHPSESSID".to_string()))
    );
    login.assert();
}

#[test]
fn panel_unavailable() {
    let mut server = mockito::Server::new();
    let _root = server.mock("GET", "/").with_status(503).create();

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert!(matches!(
        session.state(),
        SessionState::Failed(LoginError::HttpStatus { status: 503, .. })
    ));
    assert!(!session.is_valid());
}

#[test]
fn renew_keeps_valid_session() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let login = password_redirect(&mut server, "/start/").expect(1).create();
    let _start = page(&mut server, "/start/", START_PAGE);

    let mut session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert!(!session.renew_if_needed());
    assert_eq!(session.state(), &SessionState::Authenticated);
    login.assert();
}

#[test]
fn renew_logs_in_again_when_invalid() {
    let mut server = mockito::Server::new();
    let _root = root(&mut server, LOGIN_PAGE);
    let login = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(with_alert(LOGIN_PAGE, "Falsche Zugangsdaten"))
        .expect(2)
        .create();
    let _start = redirect(&mut server, "GET", "/start/", "/");

    let mut session = Session::connect(credentials(), endpoints(&server)).unwrap();

    assert!(session.renew_if_needed());
    assert_eq!(
        session.state(),
        &SessionState::Failed(LoginError::WrongCredentials)
    );
    login.assert();
}

#[test]
fn expired_session_is_renewed() {
    let mut server = mockito::Server::new();
    let first_root = root(&mut server, LOGIN_PAGE);
    let login = password_redirect(&mut server, "/start/").expect(2).create();
    let start = page(&mut server, "/start/", START_PAGE);

    let mut session = Session::connect(credentials(), endpoints(&server)).unwrap();
    assert_eq!(session.state(), &SessionState::Authenticated);

    // 服务端会话过期，起始页被重定向回登录页
    start.remove();
    let expired = redirect(&mut server, "GET", "/start/", "/");
    assert!(!session.is_valid());

    // 重新登录后拿到新的会话 id，旧的会话 id 仍然无效
    expired.remove();
    first_root.remove();
    let _root = root_at(&mut server, "/", LOGIN_PAGE, "renewed");
    let _expired = server
        .mock("GET", "/start/")
        .match_header("cookie", Matcher::Regex(format!("PHPSESSID={SESSION_ID}")))
        .with_status(302)
        .with_header("location", "/")
        .create();
    let _start = server
        .mock("GET", "/start/")
        .match_header("cookie", Matcher::Regex("PHPSESSID=renewed".to_string()))
        .with_status(200)
        .with_body(START_PAGE)
        .create();

    assert!(session.renew_if_needed());
    assert_eq!(session.state(), &SessionState::Authenticated);
    assert!(session.is_valid());
    login.assert();
}

#[test]
fn login_under_base_path() {
    let mut server = mockito::Server::new();
    let _root = root_at(&mut server, "/panel/", LOGIN_PAGE, SESSION_ID);
    let login = password_redirect_at(&mut server, "/panel/", "/panel/start/")
        .expect(1)
        .create();
    let _start = page(&mut server, "/panel/start/", START_PAGE);

    let endpoints = PanelEndpoints::new(format!("{}/panel", server.url()));
    let session = Session::connect(credentials(), endpoints).unwrap();

    assert_eq!(session.state(), &SessionState::Authenticated);
    assert!(session.is_valid());
    login.assert();
}

#[test]
fn get_passes_headers_through() {
    let mut server = mockito::Server::new();
    let _panel = logged_in_panel(&mut server);
    let resource = server
        .mock("GET", "/ajax/records/")
        .match_header("x-requested-with", "XMLHttpRequest")
        .match_header("cookie", Matcher::Regex(format!("PHPSESSID={SESSION_ID}")))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create();

    let session = Session::connect(credentials(), endpoints(&server)).unwrap();
    let mut headers = HeaderMap::new();
    headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
    let page = session
        .get(&session.endpoints().url("/ajax/records/"), headers, String::new())
        .unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(page.body, "[]");
    resource.assert();
}
