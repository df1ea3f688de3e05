//! VIP 下载地址的两个私有变换。
//!
//! 算法由平台决定，随时可能更换，因此以 [`PlaybackCipher`] 策略对象注入，
//! [`XimalayaCipher`] 是当前网页端使用的实现。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

pub const DEFAULT_PARAMS_KEY: &str = "xkt3a41psizxrh9l";

// 注意：平台字母表中 "wyxz" 的顺序就是如此。
const FILE_NAME_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwyxzABCDEFGHIJKLMNOPQRSTUVWYXZ/\\:._-1234567890";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("file id segment '{0}' is not a valid index")]
    BadFileIdSegment(String),
    #[error("encrypted params are not valid base64: {0}")]
    Base64(String),
    #[error("decrypted params have {0} field(s), expected 4")]
    ParamFields(usize),
    #[error("cipher key is empty")]
    EmptyKey,
}

/// `ep` 解密后的下载参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParams {
    pub sign: String,
    pub buy_key: String,
    pub token: String,
    pub timestamp: String,
}

pub trait PlaybackCipher {
    /// `(seed, fileId)` → 下载路径片段。
    fn decrypt_file_name(&self, seed: i64, file_id: &str) -> Result<String, CipherError>;
    /// `ep` → `(sign, key, token, timestamp)`。
    fn decrypt_params(&self, ep: &str) -> Result<UrlParams, CipherError>;
}

#[derive(Debug, Clone)]
pub struct XimalayaCipher {
    params_key: String,
}

impl Default for XimalayaCipher {
    fn default() -> Self {
        Self::new(DEFAULT_PARAMS_KEY)
    }
}

impl XimalayaCipher {
    pub fn new(params_key: impl Into<String>) -> Self {
        Self {
            params_key: params_key.into(),
        }
    }
}

impl PlaybackCipher for XimalayaCipher {
    fn decrypt_file_name(&self, seed: i64, file_id: &str) -> Result<String, CipherError> {
        let table = shuffled_alphabet(seed);
        let mut segments: Vec<&str> = file_id.split('*').collect();
        // 末尾分隔符之后的内容不参与解码。
        segments.pop();

        let mut out = String::with_capacity(segments.len());
        for seg in segments.into_iter().filter(|s| !s.is_empty()) {
            let ch = seg
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| table.get(idx).copied())
                .ok_or_else(|| CipherError::BadFileIdSegment(seg.to_string()))?;
            out.push(ch);
        }
        Ok(out)
    }

    fn decrypt_params(&self, ep: &str) -> Result<UrlParams, CipherError> {
        if self.params_key.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        let data = STANDARD
            .decode(ep.trim())
            .map_err(|e| CipherError::Base64(e.to_string()))?;
        let plain = rc4(self.params_key.as_bytes(), &data);
        let text = String::from_utf8_lossy(&plain);

        let fields: Vec<&str> = text.split('-').collect();
        let [sign, buy_key, token, timestamp] = fields.as_slice() else {
            return Err(CipherError::ParamFields(fields.len()));
        };
        Ok(UrlParams {
            sign: sign.to_string(),
            buy_key: buy_key.to_string(),
            token: token.to_string(),
            timestamp: timestamp.to_string(),
        })
    }
}

/// 以 LCG `seed = (211 * seed + 30031) % 65536` 驱动的字母表洗牌，每次取出的字符从池中移除。
fn shuffled_alphabet(seed: i64) -> Vec<char> {
    let mut pool: Vec<char> = FILE_NAME_ALPHABET.chars().collect();
    let mut state = seed.rem_euclid(65536) as u64;
    let mut out = Vec::with_capacity(pool.len());
    while !pool.is_empty() {
        state = (211 * state + 30031) % 65536;
        let idx = ((state as f64 / 65536.0) * pool.len() as f64) as usize;
        out.push(pool.remove(idx.min(pool.len() - 1)));
    }
    out
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|b| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            b ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc4_matches_reference_vector() {
        let out = rc4(b"Key", b"Plaintext");
        assert_eq!(
            out,
            [0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]
        );
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut table = shuffled_alphabet(4431);
        assert_eq!(table.len(), FILE_NAME_ALPHABET.chars().count());
        table.sort_unstable();
        let mut expected: Vec<char> = FILE_NAME_ALPHABET.chars().collect();
        expected.sort_unstable();
        assert_eq!(table, expected);
        assert_ne!(shuffled_alphabet(1), shuffled_alphabet(2));
    }

    #[test]
    fn file_name_follows_seeded_table() {
        let seed = 7562;
        let table = shuffled_alphabet(seed);
        let path = "/group1/M00/aa.m4a";
        let file_id: String = path
            .chars()
            .map(|c| format!("{}*", table.iter().position(|t| *t == c).unwrap()))
            .collect();

        let cipher = XimalayaCipher::default();
        assert_eq!(cipher.decrypt_file_name(seed, &file_id).unwrap(), path);
    }

    #[test]
    fn bad_file_id_segment() {
        let cipher = XimalayaCipher::default();
        assert_eq!(
            cipher.decrypt_file_name(1, "3*x*"),
            Err(CipherError::BadFileIdSegment("x".to_string()))
        );
        assert_eq!(
            cipher.decrypt_file_name(1, "999*"),
            Err(CipherError::BadFileIdSegment("999".to_string()))
        );
    }

    #[test]
    fn params_split_into_four_fields() {
        let cipher = XimalayaCipher::new("k3y");
        let ep = STANDARD.encode(rc4(b"k3y", b"5f2c-b7e1-1042-1600000000"));

        let params = cipher.decrypt_params(&ep).unwrap();
        assert_eq!(
            params,
            UrlParams {
                sign: "5f2c".to_string(),
                buy_key: "b7e1".to_string(),
                token: "1042".to_string(),
                timestamp: "1600000000".to_string(),
            }
        );
    }

    #[test]
    fn params_with_wrong_shape() {
        let cipher = XimalayaCipher::new("k3y");
        let ep = STANDARD.encode(rc4(b"k3y", b"only-two"));
        assert_eq!(cipher.decrypt_params(&ep), Err(CipherError::ParamFields(2)));
        assert!(matches!(
            cipher.decrypt_params("%%%"),
            Err(CipherError::Base64(_))
        ));
    }
}
