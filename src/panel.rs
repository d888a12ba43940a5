use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

/// 1blu 控制面板地址
pub const DEFAULT_PANEL_URL: &str = "https://ksb.1blu.de";

/// 面板的会话 cookie
pub const SESSION_COOKIE: &str = "PHPSESSID";

static CSRF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input[^>]*?name="_csrf_token"[^>]*?value="(.*?)"[^>]*?>"#)
        .expect("valid csrf pattern")
});

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title pattern")
});

static ALERT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*\balert-danger\b[^"]*"[^>]*>(.*?)</div>"#)
        .expect("valid alert pattern")
});

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

// ========== 面板地址 ==========

/// 面板各页面的地址
#[derive(Clone, Debug)]
pub struct PanelEndpoints {
    /// 不带结尾斜杠的根地址
    pub base_url: String,
    pub login_path: String,
    pub second_factor_path: String,
    pub second_factor_check_path: String,
    /// 登录后的起始页，同时用于判断会话是否有效
    pub start_path: String,
}

impl PanelEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        PanelEndpoints {
            base_url: base_url.trim_end_matches('/').to_string(),
            login_path: "/".to_string(),
            second_factor_path: "/2fa/".to_string(),
            second_factor_check_path: "/2fa_check/".to_string(),
            start_path: "/start/".to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 页面在服务器上的完整路径，包含根地址自带的路径前缀
    pub fn full_path(&self, path: &str) -> String {
        match Url::parse(&self.url(path)) {
            Ok(url) => url.path().to_string(),
            Err(_) => path.to_string(),
        }
    }

    pub fn login_url(&self) -> String {
        self.url(&self.login_path)
    }

    pub fn second_factor_url(&self) -> String {
        self.url(&self.second_factor_path)
    }

    pub fn second_factor_check_url(&self) -> String {
        self.url(&self.second_factor_check_path)
    }

    pub fn start_url(&self) -> String {
        self.url(&self.start_path)
    }

    /// 某个合同下某个域名的 DNS 管理页面
    pub fn dns_url(&self, contract: &str, domain_number: &str) -> String {
        format!("{}/{contract}/domain/{domain_number}/dns/", self.base_url)
    }

    /// 提交 DNS 记录的地址
    pub fn set_dns_url(&self, contract: &str, domain_number: &str) -> String {
        format!("{}setdnsrecords/", self.dns_url(contract, domain_number))
    }
}

impl Default for PanelEndpoints {
    fn default() -> Self {
        PanelEndpoints::new(DEFAULT_PANEL_URL)
    }
}

// ========== 面板页面 ==========

/// 跟随重定向之后得到的页面
#[derive(Clone, Debug)]
pub struct PanelPage {
    pub status: u16,
    /// 重定向之后的最终地址
    pub url: Url,
    pub body: String,
}

impl PanelPage {
    pub fn read(response: reqwest::blocking::Response) -> Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let url = response.url().clone();
        let body = response.text()?;
        Ok(PanelPage { status, url, body })
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// 最终地址的路径部分
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        CSRF_PATTERN
            .captures(&self.body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub fn title(&self) -> Option<String> {
        TITLE_PATTERN
            .captures(&self.body)
            .and_then(|caps| caps.get(1))
            .map(|m| collapse_whitespace(m.as_str()))
    }

    /// 页面中所有 alert-danger 块的文本
    pub fn alerts(&self) -> Vec<String> {
        ALERT_PATTERN
            .captures_iter(&self.body)
            .filter_map(|caps| caps.get(1))
            .map(|m| collapse_whitespace(&TAG_PATTERN.replace_all(m.as_str(), " ")))
            .filter(|text| !text.is_empty())
            .collect()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 路径比较时忽略结尾的斜杠
pub fn same_path(a: &str, b: &str) -> bool {
    let a = a.trim_end_matches('/');
    let b = b.trim_end_matches('/');
    a == b
}
