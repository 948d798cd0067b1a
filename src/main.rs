use anyhow::Result;
use question_sheet::{logger, utils, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(config.verbose_logging);
    utils::log_startup(&config);

    // 运行交互会话
    App::new(config).run().await?;

    Ok(())
}
