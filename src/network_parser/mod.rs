//! 平台接口：专辑页、音频列表、VIP 鉴权、用户信息，以及共享的 HTTP 客户端。

pub mod album_page;
pub mod cipher;
pub mod track_list;
pub mod transport;
pub mod user_info;
pub mod vip;
