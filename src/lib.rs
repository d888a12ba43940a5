use log::info;
use std::net::IpAddr;

// 子模块声明
pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod lookup;
pub mod otp;
pub mod panel;
pub mod records;
pub mod session;

// 重新导出常用类型
pub use api::DnsClient;
pub use config::{Config, RecordType};
pub use error::{Error, LoginError, Result};
pub use records::DnsRecord;
pub use session::{Credentials, Session, SessionState};

/// 查询本机公网 IP 和域名当前已发布的地址
pub trait AddressLookup {
    fn public_ip(&self) -> Result<IpAddr>;
    fn published_ip(&self) -> Result<IpAddr>;
}

/// 一次检查：地址不一致时登录面板并更新记录，返回是否进行了更新
pub fn check_for_updates(
    lookup: &impl AddressLookup,
    client: &mut DnsClient,
    subdomain: &str,
    rrtype: RecordType,
) -> Result<bool> {
    info!("Checking for changes...");
    let my_ip = lookup.public_ip()?;
    let remote_ip = lookup.published_ip()?;
    if my_ip == remote_ip {
        info!("DNS records still up to date. No update needed.");
        return Ok(false);
    }

    info!("DNS records are not up to date. Updating from '{remote_ip}' to '{my_ip}'.");
    client.renew_session_if_needed();
    client.update_address(subdomain, rrtype.as_str(), &my_ip.to_string())?;
    info!("Updating successful.");
    Ok(true)
}
