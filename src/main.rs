use anyhow::Result;
use std::path::Path;

use listing_report::utils::logging;
use listing_report::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置：有配置文件时读取文件，否则只用环境变量
    let config_path = std::env::var("LISTING_REPORT_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        Config::load(Path::new(&config_path))?
    } else {
        Config::from_env()
    };

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
