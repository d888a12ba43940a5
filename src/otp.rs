use std::fmt;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{Error, Result};

const DIGITS: usize = 6;
const STEP_SECS: u64 = 30;

/// 基于时间的一次性密码（RFC 6238，SHA-1，6 位，30 秒）
#[derive(Clone)]
pub struct OtpGenerator {
    totp: TOTP,
}

impl OtpGenerator {
    /// 从 base32 编码的密钥创建，忽略大小写、空格和填充
    pub fn from_base32(seed: &str) -> Result<Self> {
        let normalized: String = seed
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if normalized.is_empty() {
            return Err(Error::InvalidOtpSeed("empty key".to_string()));
        }
        let secret = Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|e| Error::InvalidOtpSeed(format!("{e:?}")))?;
        // 面板生成的密钥常常短于 128 bit，所以不做长度检查
        let totp = TOTP::new_unchecked(Algorithm::SHA1, DIGITS, 1, STEP_SECS, secret);
        Ok(OtpGenerator { totp })
    }

    /// 指定 unix 时间的验证码
    pub fn at(&self, unix_secs: u64) -> String {
        self.totp.generate(unix_secs)
    }

    pub fn now(&self) -> Result<String> {
        self.totp
            .generate_current()
            .map_err(|e| Error::InvalidOtpSeed(format!("system clock before unix epoch: {e}")))
    }
}

impl fmt::Debug for OtpGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpGenerator { .. }")
    }
}
