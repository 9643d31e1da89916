use anyhow::Result;
use tracing::warn;
use video_analyzer_client::utils::logging;
use video_analyzer_client::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化应用
    let app = App::initialize(config).await?;

    // Ctrl-C 只停止轮询，服务端任务继续运行
    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，停止轮询...");
            cancel.cancel();
        }
    });

    app.run().await
}
