use log::{debug, error, info};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::panel::PanelEndpoints;
use crate::records::{self, DnsRecord};
use crate::session::{Credentials, Session};

// ========== 1blu DNS 客户端 ==========

/// 通过 1blu 面板内部接口修改某个域名的 DNS 记录
///
/// 记录不能单条修改，只能整体获取、修改、再整体提交回去。
pub struct DnsClient {
    session: Session,
    dns_url: String,
    set_dns_url: String,
    records: Option<Vec<DnsRecord>>,
}

impl DnsClient {
    pub fn new(session: Session, contract: &str, domain_number: &str) -> Self {
        let dns_url = session.endpoints().dns_url(contract, domain_number);
        let set_dns_url = session.endpoints().set_dns_url(contract, domain_number);
        DnsClient {
            session,
            dns_url,
            set_dns_url,
            records: None,
        }
    }

    /// 按配置登录面板并创建客户端
    pub fn connect(config: &Config) -> Result<Self> {
        let credentials = Credentials::new(&config.username, &config.password, &config.otp_key)?;
        let session = Session::connect(credentials, PanelEndpoints::new(&config.panel_url))?;
        Ok(Self::new(session, &config.contract, &config.domain_number))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 最近一次获取（并可能已修改）的记录
    pub fn records(&self) -> Option<&[DnsRecord]> {
        self.records.as_deref()
    }

    pub fn renew_session_if_needed(&mut self) {
        self.session.renew_if_needed();
    }

    /// 获取当前的 DNS 记录，记录以 JSON 形式内嵌在 HTML 页面中
    ///
    /// 失败时保留之前的记录不变。
    pub fn fetch_records(&mut self) -> Result<()> {
        debug!("Fetching records...");
        let page = self.session.get(&self.dns_url, HeaderMap::new(), String::new())?;
        if !page.is_ok() {
            return Err(Error::HttpStatus {
                url: self.dns_url.clone(),
                status: page.status,
            });
        }

        let json = records::extract(&page.body).ok_or(Error::RecordsNotFound)?;
        let fetched = records::decode(json)?;
        debug!("Fetched records: json: '{json}' -> parsed: {fetched:?}");
        self.records = Some(fetched);
        Ok(())
    }

    /// 以面板的表单格式提交全部记录
    ///
    /// 只检查状态码，面板返回的内容没有做校验。
    pub fn push_records(&self) -> Result<()> {
        debug!("Pushing records...");
        let records = self.records.as_deref().ok_or(Error::NoRecordsLoaded)?;
        let content = records::encode(records);

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content.len()));

        let page = self.session.post(&self.set_dns_url, headers, content.clone())?;
        if !page.is_ok() {
            return Err(Error::HttpStatus {
                url: self.set_dns_url.clone(),
                status: page.status,
            });
        }
        debug!("Pushed records: url-encoded: '{content}'");
        Ok(())
    }

    /// 获取记录、修改主机名和类型都匹配的记录、再提交回去，返回修改的条数
    ///
    /// 没有匹配的记录不算错误，仍然会提交。提交失败时返回错误，内存中的修改不回滚。
    pub fn update_address(
        &mut self,
        subdomain: &str,
        record_type: &str,
        new_target: &str,
    ) -> Result<usize> {
        if let Err(e) = self.fetch_records() {
            error!("Updating address failed: Fetching records failed: {e}");
            return Err(e);
        }

        let hostname = records::normalize_hostname(subdomain);
        debug!("Updating record: '{hostname}' [{record_type}] to new address: '{new_target}'.");
        let records = self.records.as_mut().ok_or(Error::NoRecordsLoaded)?;
        let updated = records::apply_update(records, hostname, record_type, new_target);
        info!("{updated} records updated.");

        if let Err(e) = self.push_records() {
            error!("Updating address failed: Pushing records failed: {e}");
            return Err(e);
        }
        Ok(updated)
    }
}
