use log::{debug, error, info, warn};
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderMap;
use std::fmt;
use std::sync::Arc;

use crate::classify::{LoginClassifier, LoginOutcome, LoginStep, UrlClassifier};
use crate::error::{LoginError, Result};
use crate::otp::OtpGenerator;
use crate::panel::{PanelEndpoints, PanelPage, SESSION_COOKIE};

/// 每个请求都带上的 User-Agent
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:98.0) Gecko/20100101 Firefox/98.0";

// ========== 登录信息 ==========

#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    otp: Option<OtpGenerator>,
}

impl Credentials {
    /// 空的 `otp_key` 表示没有开启二次验证
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        otp_key: &str,
    ) -> Result<Self> {
        let otp = if otp_key.trim().is_empty() {
            None
        } else {
            Some(OtpGenerator::from_base32(otp_key)?)
        };
        Ok(Credentials {
            username: username.into(),
            password: password.into(),
            otp,
        })
    }

    pub fn has_second_factor(&self) -> bool {
        self.otp.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("otp", &self.otp.is_some())
            .finish()
    }
}

// ========== 会话状态 ==========

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Fresh,
    AwaitingPassword,
    AwaitingSecondFactor,
    Authenticated,
    /// 服务端会话已失效，只能通过 `is_valid` 发现
    Expired,
    Failed(LoginError),
}

/// 登录到 1blu 面板的 HTTP 会话
///
/// cookie 和 csrf-token 都只属于这个会话；不做内部加锁，不能跨线程并发使用。
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    endpoints: PanelEndpoints,
    credentials: Credentials,
    classifier: Box<dyn LoginClassifier>,
    state: SessionState,
}

impl Session {
    /// 创建会话并登录，按地址判断登录结果
    ///
    /// 登录失败不会返回错误，只会记录日志并留在 `Failed` 状态，通过 `is_valid` 观察。
    /// 只有 HTTP 客户端本身无法创建时才返回错误。
    pub fn connect(credentials: Credentials, endpoints: PanelEndpoints) -> Result<Self> {
        let classifier = Box::new(UrlClassifier::new(&endpoints));
        Self::with_classifier(credentials, endpoints, classifier)
    }

    pub fn with_classifier(
        credentials: Credentials,
        endpoints: PanelEndpoints,
        classifier: Box<dyn LoginClassifier>,
    ) -> Result<Self> {
        let (client, jar) = build_client()?;
        let mut session = Session {
            client,
            jar,
            endpoints,
            credentials,
            classifier,
            state: SessionState::Fresh,
        };
        session.establish();
        Ok(session)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn endpoints(&self) -> &PanelEndpoints {
        &self.endpoints
    }

    /// 实时检查：请求起始页，看是否仍然停留在起始页
    pub fn is_valid(&self) -> bool {
        let url = self.endpoints.start_url();
        match self.get(&url, HeaderMap::new(), String::new()) {
            Ok(page) => {
                let valid = self.classifier.is_start_page(&page);
                debug!("session check: '{url}' resolved to '{}' -> {valid}", page.url);
                valid
            }
            Err(e) => {
                warn!("session check failed: {e}");
                false
            }
        }
    }

    /// 会话失效时重新登录，返回是否进行了重新登录
    pub fn renew_if_needed(&mut self) -> bool {
        if self.is_valid() {
            return false;
        }
        info!("Session expired. Creating new one...");
        if self.state == SessionState::Authenticated {
            self.state = SessionState::Expired;
        }
        self.renew();
        true
    }

    /// 丢弃现有的 cookie 重新登录
    pub fn renew(&mut self) {
        match build_client() {
            Ok((client, jar)) => {
                self.client = client;
                self.jar = jar;
            }
            Err(e) => {
                error!("could not build http client: {e}");
                self.state = SessionState::Failed(LoginError::from(e));
                return;
            }
        }
        self.state = SessionState::Fresh;
        self.establish();
    }

    /// 空的 `body` 不会附加到请求上
    pub fn get(&self, url: &str, headers: HeaderMap, body: String) -> Result<PanelPage> {
        let mut request = self.client.get(url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }
        let response = request.send()?;
        Ok(PanelPage::read(response)?)
    }

    pub fn post(&self, url: &str, headers: HeaderMap, body: String) -> Result<PanelPage> {
        let response = self.client.post(url).headers(headers).body(body).send()?;
        Ok(PanelPage::read(response)?)
    }

    // ========== 登录流程 ==========

    fn establish(&mut self) {
        match self.log_in() {
            Ok(()) => {
                info!("logged in as '{}'", self.credentials.username);
                self.state = SessionState::Authenticated;
            }
            Err(e) => {
                error!("log-in failed: {e}");
                self.state = SessionState::Failed(e);
            }
        }
    }

    fn log_in(&mut self) -> std::result::Result<(), LoginError> {
        self.create()?;

        info!("logging in...");
        debug!("2fa configured: {}", self.credentials.has_second_factor());
        self.state = SessionState::AwaitingPassword;
        let login_url = self.endpoints.login_url();
        let csrf_token = self.csrf_token(&login_url)?;
        let page = self.submit(
            &login_url,
            &[
                ("_username", self.credentials.username.as_str()),
                ("_password", self.credentials.password.as_str()),
                ("_csrf_token", csrf_token.as_str()),
            ],
        )?;

        match self.classifier.classify(LoginStep::Password, &page) {
            LoginOutcome::Success => info!("log-in complete."),
            LoginOutcome::NeedsSecondFactor => {
                info!("log-in complete, doing 2fa...");
                self.state = SessionState::AwaitingSecondFactor;
                self.second_factor()?;
                info!("2fa complete.");
            }
            LoginOutcome::Failure(e) => return Err(e),
        }

        self.verify()
    }

    /// 打开面板首页，拿到会话 cookie
    fn create(&self) -> std::result::Result<(), LoginError> {
        let url = self.endpoints.url("/");
        let page = self.fetch(&url)?;
        let session_id = self
            .session_id(&page.url)
            .ok_or_else(|| LoginError::SessionCookieMissing(SESSION_COOKIE.to_string()))?;
        info!("created new session");
        debug!("session id: '{session_id}'");
        Ok(())
    }

    fn second_factor(&self) -> std::result::Result<(), LoginError> {
        let otp = self.credentials.otp.as_ref().ok_or(LoginError::OtpRequired)?;
        let url = self.endpoints.second_factor_url();
        let csrf_token = self.csrf_token(&url)?;
        let auth_code = otp
            .now()
            .map_err(|e| LoginError::UnknownLoginError(e.to_string()))?;
        let page = self.submit(
            &self.endpoints.second_factor_check_url(),
            &[
                ("_auth_code", auth_code.as_str()),
                ("_csrf_token", csrf_token.as_str()),
            ],
        )?;

        match self.classifier.classify(LoginStep::SecondFactor, &page) {
            LoginOutcome::Success => Ok(()),
            LoginOutcome::NeedsSecondFactor => Err(LoginError::InvalidOtp),
            LoginOutcome::Failure(e) => Err(e),
        }
    }

    /// 不管走了哪条路径，最后都要确认起始页可以访问
    fn verify(&self) -> std::result::Result<(), LoginError> {
        let url = self.endpoints.start_url();
        let page = self.fetch(&url)?;
        if self.classifier.is_start_page(&page) {
            Ok(())
        } else {
            debug!("verification: '{url}' resolved to '{}'", page.url);
            Err(LoginError::VerificationFailed(url))
        }
    }

    fn fetch(&self, url: &str) -> std::result::Result<PanelPage, LoginError> {
        let response = self.client.get(url).send()?;
        let page = PanelPage::read(response)?;
        if !page.is_ok() {
            return Err(LoginError::HttpStatus {
                method: "GET",
                url: url.to_string(),
                status: page.status,
            });
        }
        Ok(page)
    }

    fn submit(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> std::result::Result<PanelPage, LoginError> {
        let response = self.client.post(url).form(form).send()?;
        Ok(PanelPage::read(response)?)
    }

    /// 每次提交之前都重新获取 csrf-token
    fn csrf_token(&self, url: &str) -> std::result::Result<String, LoginError> {
        let page = self.fetch(url)?;
        let token = page
            .csrf_token()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| LoginError::CsrfTokenMissing(url.to_string()))?;
        debug!("found csrf-token for '{url}': '{token}'");
        Ok(token.to_string())
    }

    fn session_id(&self, url: &reqwest::Url) -> Option<String> {
        let cookies = self.jar.cookies(url)?;
        let cookies = cookies.to_str().ok()?;
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.to_string())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.endpoints.base_url)
            .field("credentials", &self.credentials)
            .field("state", &self.state)
            .finish()
    }
}

fn build_client() -> std::result::Result<(Client, Arc<Jar>), reqwest::Error> {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .cookie_provider(jar.clone())
        .build()?;
    Ok((client, jar))
}
