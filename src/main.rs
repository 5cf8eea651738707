use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use book_quiz_submit::utils::logging;
use book_quiz_submit::{App, Config, RunMode};

#[derive(Parser, Debug)]
#[command(name = "book_quiz_submit", version, about = "批量整理并提交书本测验")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 处理多书文档（默认）
    Batch {
        /// 多书文档路径
        #[arg(long)]
        input: Option<String>,
        /// 每批同时处理的书本数量
        #[arg(long)]
        window_size: Option<usize>,
        /// 批次之间的等待时间（毫秒）
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// 处理书本目录，每个 .txt 文件一本书
    Single {
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// 只检查文档里的书名能否查到书本 ID
    Lookup {
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// 检查凭据和输入文件
    Check,
}

impl Command {
    /// 命令行参数覆盖环境变量配置
    fn apply(self, config: &mut Config) -> RunMode {
        match self {
            Command::Batch {
                input,
                window_size,
                delay_ms,
            } => {
                if let Some(input) = input {
                    config.input_file = input;
                }
                if let Some(size) = window_size {
                    config.window_size = size.max(1);
                }
                if let Some(ms) = delay_ms {
                    config.inter_batch_delay = Duration::from_millis(ms);
                }
                RunMode::Batch
            }
            Command::Single { folder, delay_ms } => {
                if let Some(folder) = folder {
                    config.book_folder = folder;
                }
                if let Some(ms) = delay_ms {
                    config.single_item_delay = Duration::from_millis(ms);
                }
                RunMode::Single
            }
            Command::Lookup { input, delay_ms } => {
                if let Some(input) = input {
                    config.input_file = input;
                }
                if let Some(ms) = delay_ms {
                    config.lookup_delay = Duration::from_millis(ms);
                }
                RunMode::Lookup
            }
            Command::Check => RunMode::Check,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env()?;
    let command = cli.command.unwrap_or(Command::Batch {
        input: None,
        window_size: None,
        delay_ms: None,
    });
    let mode = command.apply(&mut config);

    // 初始化并运行应用
    let app = App::initialize(config, mode)?;
    if let Some(report) = app.run(mode).await? {
        info!(
            "🏁 完成: {}/{} 成功",
            report.summary.successful(),
            report.summary.total()
        );
    }

    Ok(())
}
