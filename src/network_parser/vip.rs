//! VIP 音频鉴权：调用支付接口，解密出带签名的下载地址。

use serde::Deserialize;
use tracing::{debug, info};

use super::cipher::PlaybackCipher;
use super::transport::{Agent, HttpTransport};
use crate::download::error::DlError;
use crate::download::models::AudioItem;

const PAY_API: &str = "https://mpay.ximalaya.com/mobile/track/pay";

/// 支付接口返回，只在拼接下载地址时使用一次。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VipEntitlement {
    pub ret: i64,
    pub msg: String,
    pub seed: i64,
    pub file_id: String,
    pub ep: String,
    pub buy_key: String,
    pub domain: String,
    pub api_version: String,
    pub duration: i64,
    pub title: String,
}

pub fn pay_url(track_id: u64, ts: i64) -> String {
    format!("{PAY_API}/{track_id}/{ts}?device=pc&isBackend=true&_={ts}")
}

pub struct VipResolver<'a> {
    transport: &'a dyn HttpTransport,
    cipher: &'a dyn PlaybackCipher,
    token: &'a str,
}

impl<'a> VipResolver<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        cipher: &'a dyn PlaybackCipher,
        token: &'a str,
    ) -> Self {
        Self {
            transport,
            cipher,
            token,
        }
    }

    pub fn resolve(&self, track_id: u64) -> Result<AudioItem, DlError> {
        self.resolve_at(track_id, time::OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn resolve_at(&self, track_id: u64, ts: i64) -> Result<AudioItem, DlError> {
        let denied = |message: String| DlError::EntitlementDenied { track_id, message };

        let url = pay_url(track_id, ts);
        debug!("获取 VIP 音频信息: {}", url);
        let resp = self
            .transport
            .get(&url, Agent::Mobile, Some(self.token))
            .map_err(|e| denied(e.to_string()))?;
        if !resp.is_ok() {
            return Err(denied(format!("status {}", resp.status())));
        }
        let entitlement: VipEntitlement = resp.json().map_err(|e| denied(e.to_string()))?;
        if entitlement.ret != 0 {
            return Err(denied(entitlement.msg));
        }

        let url = build_playable_url(self.cipher, &entitlement)
            .map_err(|source| DlError::EntitlementDecode { track_id, source })?;
        info!("已获取 VIP 音频地址: {}", entitlement.title);
        Ok(AudioItem {
            track_id,
            url,
            title: entitlement.title,
        })
    }
}

pub fn build_playable_url(
    cipher: &dyn PlaybackCipher,
    ent: &VipEntitlement,
) -> Result<String, super::cipher::CipherError> {
    let file_name = cipher.decrypt_file_name(ent.seed, &ent.file_id)?;
    let params = cipher.decrypt_params(&ent.ep)?;
    Ok(format!(
        "{}/download/{}{}?sign={}&buy_key={}&token={}&timestamp={}&duration={}",
        ent.domain,
        ent.api_version,
        file_name,
        params.sign,
        ent.buy_key,
        params.token,
        params.timestamp,
        ent.duration
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network_parser::cipher::{CipherError, UrlParams};
    use crate::network_parser::transport::fake::{FakeTransport, Reply};

    struct StubCipher;

    impl PlaybackCipher for StubCipher {
        fn decrypt_file_name(&self, seed: i64, file_id: &str) -> Result<String, CipherError> {
            Ok(format!("/{seed}/{file_id}.m4a"))
        }

        fn decrypt_params(&self, ep: &str) -> Result<UrlParams, CipherError> {
            if ep == "broken" {
                return Err(CipherError::ParamFields(1));
            }
            Ok(UrlParams {
                sign: "s1gn".to_string(),
                buy_key: "ignored".to_string(),
                token: "77".to_string(),
                timestamp: "1600000000".to_string(),
            })
        }
    }

    fn envelope(ret: i64, ep: &str) -> String {
        format!(
            r#"{{"ret":{ret},"msg":"未购买","seed":12,"fileId":"abc","ep":"{ep}","buyKey":"bk","domain":"https://vod.xmcdn.com","apiVersion":"1.0.0","duration":321,"title":"VIP 第1集"}}"#
        )
    }

    #[test]
    fn builds_signed_url() {
        let t = FakeTransport::new().on("/track/pay/42/", Reply::ok(envelope(0, "x")));
        let item = VipResolver::new(&t, &StubCipher, "1&_token=abc")
            .resolve_at(42, 1700000000)
            .unwrap();

        assert_eq!(item.track_id, 42);
        assert_eq!(item.title, "VIP 第1集");
        assert_eq!(
            item.url,
            "https://vod.xmcdn.com/download/1.0.0/12/abc.m4a?sign=s1gn&buy_key=bk&token=77&timestamp=1600000000&duration=321"
        );

        let req = &t.requests()[0];
        assert_eq!(
            req.url,
            "https://mpay.ximalaya.com/mobile/track/pay/42/1700000000?device=pc&isBackend=true&_=1700000000"
        );
        assert_eq!(req.cookie.as_deref(), Some("1&_token=abc"));
        assert_eq!(req.agent, Agent::Mobile);
    }

    #[test]
    fn non_zero_ret_is_denied_with_message() {
        let t = FakeTransport::new().on("/track/pay/", Reply::ok(envelope(927, "x")));
        let err = VipResolver::new(&t, &StubCipher, "c")
            .resolve_at(42, 1)
            .unwrap_err();
        match err {
            DlError::EntitlementDenied { track_id, message } => {
                assert_eq!(track_id, 42);
                assert_eq!(message, "未购买");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cipher_failure_is_decode_error() {
        let t = FakeTransport::new().on("/track/pay/", Reply::ok(envelope(0, "broken")));
        let err = VipResolver::new(&t, &StubCipher, "c")
            .resolve_at(42, 1)
            .unwrap_err();
        assert!(matches!(err, DlError::EntitlementDecode { track_id: 42, .. }));
    }
}
