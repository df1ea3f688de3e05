//! 喜马拉雅 FM 专辑 / 音频下载器。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置 / 日志 / 链接解析等基础设施
//! - `network_parser`：共享 HTTP 客户端与平台接口（专辑页、音频列表、VIP 鉴权、用户信息）
//! - `download`：带重试的下载执行器与专辑下载流程编排

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{info, warn};

mod base_system;
mod download;
mod network_parser;

use base_system::config::{load_from_cwd_or_default, load_or_create};
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::album_detail::AlbumDetail;
use download::executor::{DownloadExecutor, RetryOptions};
use network_parser::cipher::XimalayaCipher;
use network_parser::transport::{ReqwestTransport, TransportConfig};
use network_parser::user_info::fetch_user_info;
use network_parser::vip::VipResolver;

const EXAMPLES: &str = "\
Examples:
  download album: ximalaya-dl https://www.ximalaya.com/xiangsheng/39725061
  download audio: ximalaya-dl https://www.ximalaya.com/xiangsheng/39725061/322739646";

#[derive(Debug, Parser)]
#[command(name = "ximalaya-dl", version)]
#[command(about = "Ximalaya FM downloader", after_help = EXAMPLES)]
struct Cli {
    /// 专辑或音频链接
    url: String,

    /// 只显示专辑信息，不下载
    #[arg(short, long, default_value_t = false)]
    display: bool,

    /// 保存目录（默认 ./downloads）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 批量下载的起始位置（从 1 开始）
    #[arg(long)]
    start: Option<usize>,

    /// 登录 Cookie，下载 VIP 音频时需要（也可设置环境变量 XIMALAYA_COOKIE）
    #[arg(long)]
    cookie: Option<String>,

    /// 配置文件路径（不存在时自动生成）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log = match init_logging(cli.debug) {
        Ok(log) => Some(log),
        Err(err) => {
            eprintln!("{err:#}");
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config.as_deref() {
        Some(path) => load_or_create::<Config>(path),
        None => load_from_cwd_or_default::<Config>(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;

    if let Some(cookie) = cli
        .cookie
        .or_else(|| std::env::var("XIMALAYA_COOKIE").ok())
    {
        config.cookie = cookie;
    }

    let output = cli.output.unwrap_or_else(|| config.default_save_dir());
    let mut album = AlbumDetail::new(&cli.url, output)?;
    if let Some(start) = cli.start {
        album.set_start(start);
    }

    let transport = ReqwestTransport::new(&TransportConfig::from(&config))
        .context("build http client failed")?;

    if let Some(token) = config.access_token() {
        match fetch_user_info(&transport, token) {
            Ok(user) if user.is_logged_in() => {
                info!("当前用户: {}", user.nickname().unwrap_or("(unknown)"));
            }
            Ok(user) => warn!("Cookie 未登录或已失效: {}", user.msg),
            Err(err) => warn!("获取用户信息失败: {err}"),
        }
    }

    album.fetch(&transport).context("Get album info failed")?;

    if album.audio_list().is_empty() {
        warn!("专辑中没有获取到任何音频");
    }

    if cli.display {
        album.display()?;
        return Ok(());
    }

    let executor = DownloadExecutor::new(&transport, RetryOptions::from(&config))
        .with_progress(config.show_progress);
    let cipher = XimalayaCipher::new(config.vip_cipher_key.clone());
    let vip = config
        .access_token()
        .map(|token| VipResolver::new(&transport, &cipher, token));

    let report = album.download(&executor, vip.as_ref())?;
    let title = album.metadata().map(|m| m.title.as_str()).unwrap_or_default();
    info!(
        "《{}》已保存到 {}（{} 个文件）",
        title,
        album.output().display(),
        report.files.len()
    );
    Ok(())
}

fn init_logging(debug: bool) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: false,
    };
    LogSystem::init(opts).map_err(|e| anyhow!(e))
}
