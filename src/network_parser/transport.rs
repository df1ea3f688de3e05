//! 共享 HTTP 客户端。
//!
//! 所有组件都通过 `&dyn HttpTransport` 使用同一个客户端实例（keep-alive 连接池），
//! 测试中替换为脚本化的假实现。

use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, COOKIE, HeaderMap, HeaderValue, USER_AGENT,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::base_system::context::Config;

/// 请求使用的 UA。服务端会按 UA 区分响应，两者不可混用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    /// 浏览器 UA：抓取专辑页、下载音频。
    Desktop,
    /// 客户端 UA：JSON 接口。
    Mobile,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("invalid header value for {name}")]
    Header { name: &'static str },
    #[error("read response body failed: {0}")]
    Body(#[from] io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// 已拿到响应头的响应；body 仍未读取，drop 即释放连接。
pub struct HttpResponse {
    status: u16,
    content_length: Option<u64>,
    body: Box<dyn Read + Send>,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    pub fn new(status: u16, content_length: Option<u64>, body: Box<dyn Read + Send>) -> Self {
        Self {
            status,
            content_length,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn body_mut(&mut self) -> &mut (dyn Read + Send) {
        self.body.as_mut()
    }

    pub fn text(mut self) -> Result<String, TransportError> {
        let mut buf = String::new();
        self.body.read_to_string(&mut buf)?;
        Ok(buf)
    }

    pub fn bytes(mut self) -> Result<Vec<u8>, TransportError> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn json<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        let bytes = self.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub trait HttpTransport {
    /// 发起 GET，拿到响应头即返回。`cookie` 为原样透传的登录凭证。
    fn get(
        &self,
        url: &str,
        agent: Agent,
        cookie: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Option<Duration>,
    pub desktop_user_agent: String,
    pub mobile_user_agent: String,
}

impl From<&Config> for TransportConfig {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.request_timeout(),
            desktop_user_agent: config.desktop_user_agent.clone(),
            mobile_user_agent: config.mobile_user_agent.clone(),
        }
    }
}

pub struct ReqwestTransport {
    client: Client,
    desktop_ua: HeaderValue,
    mobile_ua: HeaderValue,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        // 未启用 gzip 解码，要求服务端返回原始字节。
        default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        default_headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9"));

        let mut builder = Client::builder().default_headers(default_headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let desktop_ua = HeaderValue::from_str(&config.desktop_user_agent)
            .map_err(|_| TransportError::Header { name: "desktop_user_agent" })?;
        let mobile_ua = HeaderValue::from_str(&config.mobile_user_agent)
            .map_err(|_| TransportError::Header { name: "mobile_user_agent" })?;

        Ok(Self {
            client,
            desktop_ua,
            mobile_ua,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        agent: Agent,
        cookie: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let ua = match agent {
            Agent::Desktop => self.desktop_ua.clone(),
            Agent::Mobile => self.mobile_ua.clone(),
        };
        let mut request = self.client.get(url).header(USER_AGENT, ua);
        if let Some(cookie) = cookie {
            let value =
                HeaderValue::from_str(cookie).map_err(|_| TransportError::Header { name: "cookie" })?;
            request = request.header(COOKIE, value);
        }

        debug!("GET {} ({:?})", url, agent);
        let resp = request.send().map_err(|e| TransportError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = resp.status().as_u16();
        let content_length = resp.content_length();
        Ok(HttpResponse::new(status, content_length, Box::new(resp)))
    }
}
