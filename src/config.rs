use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::otp::OtpGenerator;
use crate::panel::DEFAULT_PANEL_URL;

// ========== 记录类型 ==========

/// 支持更新的记录类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    pub fn is_ipv6(&self) -> bool {
        *self == RecordType::Aaaa
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            _ => Err(Error::config(format!(
                "RRTYPE must be either 'A' or 'AAAA', got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ========== 原始配置 ==========

/// 命令行参数、环境变量和 TOML 文件共用的原始配置，所有字段都是可选的
#[derive(Parser, Deserialize, Debug, Default, Clone)]
#[command(version, about = "Dynamic DNS updater for the 1blu control panel")]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// TOML 配置文件，命令行和环境变量中的值优先
    #[arg(short, long, env = "ONEBLU_CONFIG")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// base32 编码的 OTP 密钥，留空表示没有开启二次验证
    #[arg(long, env = "OTP_KEY", hide_env_values = true)]
    pub otp_key: Option<String>,

    #[arg(long, env = "CONTRACT")]
    pub contract: Option<String>,

    #[arg(long, env = "DOMAIN_NUMBER")]
    pub domain_number: Option<String>,

    /// 用于查询当前已发布地址的完整域名
    #[arg(long, env = "DOMAIN")]
    pub domain: Option<String>,

    /// 要更新的子域名，留空表示根域名
    #[arg(long, env = "SUBDOMAIN")]
    pub subdomain: Option<String>,

    /// A 或 AAAA
    #[arg(long, env = "RRTYPE")]
    pub rrtype: Option<String>,

    /// 检查间隔（分钟）
    #[arg(long, env = "INTERVAL")]
    pub interval: Option<u64>,

    #[arg(long, env = "PANEL_URL")]
    pub panel_url: Option<String>,

    /// 查询公网 IP 的地址，默认使用 v4.ident.me / v6.ident.me
    #[arg(long, env = "IP_LOOKUP_URL")]
    pub ip_lookup_url: Option<String>,
}

impl RawConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read '{}': {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("cannot parse '{}': {e}", path.display())))
    }

    /// 用 `self` 中已设置的值覆盖 `file` 中的值
    pub fn merge(self, file: RawConfig) -> RawConfig {
        RawConfig {
            config: self.config,
            username: self.username.or(file.username),
            password: self.password.or(file.password),
            otp_key: self.otp_key.or(file.otp_key),
            contract: self.contract.or(file.contract),
            domain_number: self.domain_number.or(file.domain_number),
            domain: self.domain.or(file.domain),
            subdomain: self.subdomain.or(file.subdomain),
            rrtype: self.rrtype.or(file.rrtype),
            interval: self.interval.or(file.interval),
            panel_url: self.panel_url.or(file.panel_url),
            ip_lookup_url: self.ip_lookup_url.or(file.ip_lookup_url),
        }
    }
}

// ========== 校验后的配置 ==========

/// 进程启动时加载一次，之后只读
#[derive(Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub otp_key: String,
    pub contract: String,
    pub domain_number: String,
    pub domain: String,
    pub subdomain: String,
    pub rrtype: RecordType,
    pub interval_minutes: u64,
    pub panel_url: String,
    pub ip_lookup_url: Option<String>,
}

impl Config {
    /// 从命令行、环境变量和可选的配置文件加载
    pub fn load() -> Result<Self> {
        let cli = RawConfig::parse();
        let raw = match cli.config.clone() {
            Some(path) => cli.merge(RawConfig::from_file(&path)?),
            None => cli,
        };
        Config::try_from(raw)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(60 * self.interval_minutes)
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = Error;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let rrtype: RecordType = raw.rrtype.as_deref().unwrap_or("A").parse()?;

        let interval_minutes = match raw.interval {
            Some(0) => return Err(Error::config("INTERVAL must be a positive number")),
            Some(minutes) => minutes,
            None => return Err(Error::config("Please define INTERVAL.")),
        };

        let otp_key = raw.otp_key.unwrap_or_default();
        if !otp_key.trim().is_empty() {
            OtpGenerator::from_base32(&otp_key)?;
        }

        Ok(Config {
            username: required(raw.username, "USERNAME")?,
            password: required(raw.password, "PASSWORD")?,
            otp_key,
            contract: required(raw.contract, "CONTRACT")?,
            domain_number: required(raw.domain_number, "DOMAIN_NUMBER")?,
            domain: required(raw.domain, "DOMAIN")?,
            subdomain: raw.subdomain.unwrap_or_default(),
            rrtype,
            interval_minutes,
            panel_url: raw
                .panel_url
                .unwrap_or_else(|| DEFAULT_PANEL_URL.to_string()),
            ip_lookup_url: raw.ip_lookup_url.filter(|url| !url.is_empty()),
        })
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::config(format!("Please define {key}."))),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"***")
            .field("otp_key", &(!self.otp_key.is_empty()))
            .field("contract", &self.contract)
            .field("domain_number", &self.domain_number)
            .field("domain", &self.domain)
            .field("subdomain", &self.subdomain)
            .field("rrtype", &self.rrtype)
            .field("interval_minutes", &self.interval_minutes)
            .field("panel_url", &self.panel_url)
            .field("ip_lookup_url", &self.ip_lookup_url)
            .finish()
    }
}
