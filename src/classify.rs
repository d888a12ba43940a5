use crate::error::LoginError;
use crate::panel::{PanelEndpoints, PanelPage, same_path};

// alert-danger 块中可以识别的错误信息（小写比较）
const CSRF_MARKERS: &[&str] = &["csrf"];
const CREDENTIAL_MARKERS: &[&str] = &[
    "falsche zugangsdaten",
    "ungültige zugangsdaten",
    "invalid credentials",
    "bad credentials",
];
const OTP_MARKERS: &[&str] = &[
    "code",
    "zwei-faktor",
    "two-factor",
    "2fa",
];

/// 页面属于面板的哪个部分
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Surface {
    Login,
    SecondFactor,
    Start,
    Other,
}

/// 刚刚提交的是哪一步登录表单
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginStep {
    Password,
    SecondFactor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    NeedsSecondFactor,
    Failure(LoginError),
}

/// 根据面板返回的页面判断登录结果
///
/// 面板没有结构化的返回值，只能看最终落在哪个页面上。
/// 具体怎么识别页面（地址或标题）由实现决定。
pub trait LoginClassifier: Send + Sync {
    fn surface(&self, page: &PanelPage) -> Surface;

    fn is_start_page(&self, page: &PanelPage) -> bool {
        page.is_ok() && self.surface(page) == Surface::Start
    }

    fn classify(&self, step: LoginStep, page: &PanelPage) -> LoginOutcome {
        if !page.is_ok() {
            return LoginOutcome::Failure(LoginError::HttpStatus {
                method: "POST",
                url: page.url.to_string(),
                status: page.status,
            });
        }
        match (self.surface(page), step) {
            (Surface::Start, _) => LoginOutcome::Success,
            (Surface::SecondFactor, LoginStep::Password) => LoginOutcome::NeedsSecondFactor,
            (Surface::SecondFactor, LoginStep::SecondFactor) | (Surface::Login, _) => {
                LoginOutcome::Failure(rejection(step, page))
            }
            (Surface::Other, _) => LoginOutcome::Failure(LoginError::UnknownLoginError(format!(
                "unexpected landing page '{}'",
                page.url
            ))),
        }
    }
}

/// 面板把我们送回了登录页或二次验证页，根据错误提示判断原因
pub fn rejection(step: LoginStep, page: &PanelPage) -> LoginError {
    let alerts = page.alerts();
    for alert in &alerts {
        let text = alert.to_lowercase();
        if contains_any(&text, CSRF_MARKERS) {
            return LoginError::InvalidCsrfToken;
        }
        if contains_any(&text, CREDENTIAL_MARKERS) {
            return LoginError::WrongCredentials;
        }
        if step == LoginStep::SecondFactor && contains_any(&text, OTP_MARKERS) {
            return LoginError::InvalidOtp;
        }
    }
    if alerts.is_empty() {
        LoginError::UnknownLoginError(format!("returned to '{}' without a message", page.url))
    } else {
        LoginError::UnknownLoginError(alerts.join(" | "))
    }
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

// ========== 按地址识别 ==========

/// 按重定向之后的地址识别页面，比较的是包含根地址前缀的完整路径
pub struct UrlClassifier {
    login_path: String,
    second_factor_path: String,
    start_path: String,
}

impl UrlClassifier {
    pub fn new(endpoints: &PanelEndpoints) -> Self {
        UrlClassifier {
            login_path: endpoints.full_path(&endpoints.login_path),
            second_factor_path: endpoints.full_path(&endpoints.second_factor_path),
            start_path: endpoints.full_path(&endpoints.start_path),
        }
    }
}

impl LoginClassifier for UrlClassifier {
    fn surface(&self, page: &PanelPage) -> Surface {
        let path = page.path();
        if same_path(path, &self.start_path) {
            Surface::Start
        } else if same_path(path, &self.second_factor_path) {
            Surface::SecondFactor
        } else if same_path(path, &self.login_path) {
            Surface::Login
        } else {
            Surface::Other
        }
    }
}

// ========== 按标题识别 ==========

/// 按页面 `<title>` 识别页面，适用于面板不做重定向、直接返回页面的情况
pub struct TitleClassifier {
    login_title: String,
    second_factor_title: String,
    start_title: String,
}

impl TitleClassifier {
    pub fn new(
        login_title: impl Into<String>,
        second_factor_title: impl Into<String>,
        start_title: impl Into<String>,
    ) -> Self {
        TitleClassifier {
            login_title: login_title.into(),
            second_factor_title: second_factor_title.into(),
            start_title: start_title.into(),
        }
    }
}

impl LoginClassifier for TitleClassifier {
    fn surface(&self, page: &PanelPage) -> Surface {
        match page.title() {
            Some(title) if title == self.start_title => Surface::Start,
            Some(title) if title == self.second_factor_title => Surface::SecondFactor,
            Some(title) if title == self.login_title => Surface::Login,
            _ => Surface::Other,
        }
    }
}
