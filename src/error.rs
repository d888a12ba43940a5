//! 错误类型定义

use thiserror::Error;

/// 统一的 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

/// 登录失败的原因
///
/// 会被保存在 [`crate::session::SessionState::Failed`] 中，所以需要 Clone 和比较
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// 连接层面的错误（DNS、TLS、连接被拒绝等）
    #[error("transport error: {0}")]
    Transport(String),

    /// 面板返回了非 200 状态码
    #[error("[{method}] '{url}' responded with status-code {status}")]
    HttpStatus {
        method: &'static str,
        url: String,
        status: u16,
    },

    /// 面板首页没有下发会话 cookie
    #[error("no '{0}' cookie was issued by the panel")]
    SessionCookieMissing(String),

    #[error("could not find csrf-token for '{0}'")]
    CsrfTokenMissing(String),

    #[error("the panel rejected the csrf-token")]
    InvalidCsrfToken,

    #[error("wrong username or password")]
    WrongCredentials,

    /// 面板要求二次验证，但没有配置 OTP 密钥
    #[error("the panel requires a one-time password but no OTP key is configured")]
    OtpRequired,

    #[error("the panel rejected the one-time password")]
    InvalidOtp,

    /// 失败页面中没有可识别的错误信息
    #[error("unknown login error: {0}")]
    UnknownLoginError(String),

    /// 登录流程结束，但仍然无法访问起始页
    #[error("login finished but '{0}' is not reachable")]
    VerificationFailed(String),
}

impl From<reqwest::Error> for LoginError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// 核心错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP 客户端错误
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("'{url}' responded with status-code {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("login failed: {0}")]
    Login(#[from] LoginError),

    /// DNS 页面中找不到内嵌的记录列表
    #[error("could not find dns records")]
    RecordsNotFound,

    /// 找到了记录列表，但格式不合法
    #[error("malformed dns records: {0}")]
    MalformedRecords(String),

    /// 在成功获取记录之前调用了 `push_records`
    #[error("no dns records loaded")]
    NoRecordsLoaded,

    #[error("invalid OTP key: {0}")]
    InvalidOtpSeed(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// 公网 IP 或已发布记录查询失败
    #[error("lookup failed: {0}")]
    Lookup(String),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecords(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }
}
