//! 使用 Cookie 获取当前登录用户。

use serde::Deserialize;
use serde_json::Value;

use super::transport::{Agent, HttpTransport, TransportError};

const CURRENT_USER_API: &str = "https://www.ximalaya.com/revision/main/getCurrentUser";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub ret: i64,
    pub msg: String,
    pub data: Option<Value>,
}

impl UserInfo {
    pub fn is_logged_in(&self) -> bool {
        self.ret == 200 || (self.ret == 0 && self.data.is_some())
    }

    pub fn nickname(&self) -> Option<&str> {
        self.data.as_ref()?.get("nickname")?.as_str()
    }
}

pub fn fetch_user_info(
    transport: &dyn HttpTransport,
    cookie: &str,
) -> Result<UserInfo, TransportError> {
    transport
        .get(CURRENT_USER_API, Agent::Mobile, Some(cookie))?
        .json()
}
