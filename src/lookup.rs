use hickory_resolver::TokioResolver;
use log::debug;
use reqwest::blocking::Client;
use std::net::IpAddr;
use tokio::runtime::Runtime;

use crate::AddressLookup;
use crate::config::{Config, RecordType};
use crate::error::{Error, Result};

const IDENT_ME_V4: &str = "https://v4.ident.me";
const IDENT_ME_V6: &str = "https://v6.ident.me";

// ========== 公网 IP ==========

/// 通过 HTTP 服务查询本机的公网 IP，返回纯文本的地址
pub struct PublicIp {
    client: Client,
    url: String,
    rrtype: RecordType,
}

impl PublicIp {
    pub fn new(rrtype: RecordType, url: Option<String>) -> Result<Self> {
        let default_url = if rrtype.is_ipv6() {
            IDENT_ME_V6
        } else {
            IDENT_ME_V4
        };
        let url = url.unwrap_or_else(|| default_url.to_string());
        Ok(PublicIp {
            client: Client::builder().build()?,
            url,
            rrtype,
        })
    }

    pub fn current(&self) -> Result<IpAddr> {
        let response = self.client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(Error::lookup(format!(
                "'{}' responded with status-code {}",
                self.url,
                response.status()
            )));
        }
        let text = response.text()?;
        let ip = parse_address(text.trim(), self.rrtype)?;
        debug!("My ip address is: '{ip}'");
        Ok(ip)
    }
}

/// 解析地址并检查地址族是否和记录类型一致
pub fn parse_address(text: &str, rrtype: RecordType) -> Result<IpAddr> {
    let ip: IpAddr = text
        .parse()
        .map_err(|e| Error::lookup(format!("'{text}' is not an ip address: {e}")))?;
    if ip.is_ipv6() != rrtype.is_ipv6() {
        return Err(Error::lookup(format!("'{ip}' does not fit record type {rrtype}")));
    }
    Ok(ip)
}

// ========== 已发布的记录 ==========

/// 用系统 DNS 配置查询域名当前解析到的地址
pub struct PublishedRecord {
    runtime: Runtime,
    resolver: TokioResolver,
    domain: String,
    rrtype: RecordType,
}

impl PublishedRecord {
    pub fn new(domain: impl Into<String>, rrtype: RecordType) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::lookup(format!("failed to start resolver runtime: {e}")))?;
        let resolver = {
            let _guard = runtime.enter();
            TokioResolver::builder_tokio()
                .map_err(|e| Error::lookup(format!("failed to create resolver: {e}")))?
                .build()
        };
        Ok(PublishedRecord {
            runtime,
            resolver,
            domain: domain.into(),
            rrtype,
        })
    }

    pub fn current(&self) -> Result<IpAddr> {
        let name = self.domain.as_str();
        let ip = self.runtime.block_on(async {
            match self.rrtype {
                RecordType::A => self
                    .resolver
                    .ipv4_lookup(name)
                    .await
                    .map(|lookup| lookup.iter().next().map(|a| IpAddr::V4(a.0))),
                RecordType::Aaaa => self
                    .resolver
                    .ipv6_lookup(name)
                    .await
                    .map(|lookup| lookup.iter().next().map(|aaaa| IpAddr::V6(aaaa.0))),
            }
        });
        let ip = ip
            .map_err(|e| Error::lookup(format!("resolving '{name}' failed: {e}")))?
            .ok_or_else(|| Error::lookup(format!("'{name}' has no {} record", self.rrtype)))?;
        debug!("Remote ip address is: '{ip}'");
        Ok(ip)
    }
}

// ========== 组合 ==========

/// 实际运行时使用的查询：HTTP 查询公网 IP，DNS 查询已发布的地址
pub struct SystemLookup {
    public_ip: PublicIp,
    published: PublishedRecord,
}

impl SystemLookup {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(SystemLookup {
            public_ip: PublicIp::new(config.rrtype, config.ip_lookup_url.clone())?,
            published: PublishedRecord::new(&config.domain, config.rrtype)?,
        })
    }
}

impl AddressLookup for SystemLookup {
    fn public_ip(&self) -> Result<IpAddr> {
        self.public_ip.current()
    }

    fn published_ip(&self) -> Result<IpAddr> {
        self.published.current()
    }
}
