//! 模拟 1blu 面板的测试夹具
#![allow(dead_code)]

use mockito::{Matcher, Mock, ServerGuard};
use oneblu::Credentials;
use oneblu::panel::PanelEndpoints;

pub const USERNAME: &str = "kunde@example.de";
pub const PASSWORD: &str = "p@ss&word=1";
pub const OTP_KEY: &str = "JBSWY3DPEHPK3PXP";
pub const SESSION_ID: &str = "abc123";
pub const CONTRACT: &str = "123456";
pub const DOMAIN_NUMBER: &str = "789";

pub const LOGIN_PAGE: &str = r#"<html><head><title>Login</title></head><body>
<form method="post" action="/">
  <input type="text" name="_username">
  <input type="password" name="_password">
  <input type="hidden" name="_csrf_token" value="login-token">
</form></body></html>"#;

pub const SECOND_FACTOR_PAGE: &str = r#"<html><head><title>2FA</title></head><body>
<form method="post" action="/2fa_check/">
  <input type="text" name="_auth_code">
  <input type="hidden" name="_csrf_token" value="2fa-token">
</form></body></html>"#;

pub const START_PAGE: &str = "<html><head><title>Start</title></head><body>Willkommen</body></html>";

pub fn alert(text: &str) -> String {
    format!(r#"<div class="alert alert-danger" role="alert">{text}</div>"#)
}

/// 在页面 body 中插入一个 alert-danger 块
pub fn with_alert(page: &str, text: &str) -> String {
    page.replace("<body>", &format!("<body>{}", alert(text)))
}

pub fn dns_page(records_json: &str) -> String {
    format!(
        r#"<html><body><div id="grid"></div><script>
var grid = new Grid({{"dataSource":{{"data":{records_json}}},"pageSize":50}});
</script></body></html>"#
    )
}

pub fn dns_path() -> String {
    format!("/{CONTRACT}/domain/{DOMAIN_NUMBER}/dns/")
}

pub fn set_dns_path() -> String {
    format!("{}setdnsrecords/", dns_path())
}

pub fn endpoints(server: &ServerGuard) -> PanelEndpoints {
    PanelEndpoints::new(server.url())
}

pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD, "").unwrap()
}

pub fn credentials_with_otp() -> Credentials {
    Credentials::new(USERNAME, PASSWORD, OTP_KEY).unwrap()
}

/// 面板首页：下发会话 cookie，同时也是登录页
pub fn root(server: &mut ServerGuard, body: &str) -> Mock {
    root_at(server, "/", body, SESSION_ID)
}

/// 在 `path` 上下发指定的会话 id
pub fn root_at(server: &mut ServerGuard, path: &str, body: &str, session_id: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html; charset=UTF-8")
        .with_header("set-cookie", &format!("PHPSESSID={session_id}; path=/; HttpOnly"))
        .with_body(body)
        .create()
}

/// 提交用户名和密码，重定向到 `location`；返回的 mock 还需要 `create()`
pub fn password_redirect(server: &mut ServerGuard, location: &str) -> Mock {
    password_redirect_at(server, "/", location)
}

pub fn password_redirect_at(server: &mut ServerGuard, path: &str, location: &str) -> Mock {
    server
        .mock("POST", path)
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("_username".into(), USERNAME.into()),
            Matcher::UrlEncoded("_password".into(), PASSWORD.into()),
            Matcher::UrlEncoded("_csrf_token".into(), "login-token".into()),
        ]))
        .with_status(302)
        .with_header("location", location)
}

pub fn page(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html; charset=UTF-8")
        .with_body(body)
        .create()
}

pub fn redirect(server: &mut ServerGuard, method: &str, path: &str, location: &str) -> Mock {
    server
        .mock(method, path)
        .with_status(302)
        .with_header("location", location)
        .create()
}

/// 只需要密码就能登录的面板
pub fn logged_in_panel(server: &mut ServerGuard) -> Vec<Mock> {
    vec![
        root(server, LOGIN_PAGE),
        password_redirect(server, "/start/").create(),
        page(server, "/start/", START_PAGE),
    ]
}
