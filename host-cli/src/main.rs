//! # Scene Player
//!
//! 无头场景播放器：读取工程文件，从起始场景播放到结束，并输出对话记录。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p host-cli -- project.json
//! cargo run -p host-cli -- project.json --scene chapter2 --log-level debug
//! cargo run -p host-cli -- project.json --save-slot 1
//! cargo run -p host-cli -- project.json --load-slot 1 --realtime
//! cargo run -p host-cli -- project.json --list-saves
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use host_cli::{AppConfig, ConfigOverrides, HeadlessDriver, LoggingSoundPlayer, SaveManager};
use scene_runtime::{GameSession, Project};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "scene-player")]
#[command(about = "无头场景播放器 - 播放工程并输出对话记录")]
#[command(version)]
struct Cli {
    /// 工程文件路径（覆盖配置文件）
    project: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 起始场景 id
    #[arg(short, long)]
    scene: Option<String>,

    /// 存档目录
    #[arg(long)]
    saves_dir: Option<PathBuf>,

    /// 按真实时间等待计时器
    #[arg(long)]
    realtime: bool,

    /// 最多处理的调度步数
    #[arg(long)]
    max_steps: Option<usize>,

    /// 日志级别（trace/debug/info/warn/error）
    #[arg(long)]
    log_level: Option<String>,

    /// 运行结束后保存到此槽位
    #[arg(long)]
    save_slot: Option<u32>,

    /// 从此槽位读档后继续运行
    #[arg(long)]
    load_slot: Option<u32>,

    /// 列出存档后退出
    #[arg(long)]
    list_saves: bool,
}

fn main() {
    let cli = Cli::parse();

    // 读取配置时日志级别还未确定，先用默认订阅者输出配置相关日志
    let bootstrap = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let mut config = tracing::subscriber::with_default(bootstrap, || AppConfig::load(&cli.config));
    config.apply(ConfigOverrides {
        project_path: cli.project.clone(),
        saves_dir: cli.saves_dir.clone(),
        start_scene: cli.scene.clone(),
        log_level: cli.log_level.clone(),
        realtime: cli.realtime,
        max_steps: cli.max_steps,
    });
    init_tracing(&config.log_level);

    if let Err(e) = run(&cli, &config) {
        error!(error = %e, "运行失败");
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let level = level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let saves = SaveManager::new(&config.saves_dir);

    if cli.list_saves {
        for (slot, _) in saves.list_saves() {
            if let Some(info) = saves.get_save_info(slot) {
                println!("{:03}  {}  {}", info.slot, info.display_time, info.scene_name);
            }
        }
        return Ok(());
    }

    config.validate().context("配置无效")?;

    let json = fs::read_to_string(&config.project_path)
        .with_context(|| format!("无法读取工程文件 {}", config.project_path.display()))?;
    let project = Project::from_json(&json).context("工程文件无效")?;
    info!(project = %project.name, scenes = project.scenes.len(), "工程加载完成");

    let start_scene = match &config.start_scene {
        Some(id) => id.clone(),
        None => match project.start_scene() {
            Some(scene) => scene.id.clone(),
            None => bail!("工程中没有任何场景"),
        },
    };

    let session = GameSession::new(project, config.player.clone())
        .with_sound_player(Box::new(LoggingSoundPlayer));
    let mut driver = HeadlessDriver::new(session, config);

    match cli.load_slot {
        Some(slot) => driver
            .load_from_slot(&saves, slot)
            .with_context(|| format!("无法读取存档槽位 {}", slot))?,
        None => driver
            .session_mut()
            .start(&start_scene)
            .with_context(|| format!("无法开始场景 {}", start_scene))?,
    }

    let summary = driver.run()?;
    for line in &summary.transcript {
        println!("{}", line);
    }
    println!(
        "-- {} ({} 步, {} ms)",
        if summary.finished { "播放结束" } else { "已停止" },
        summary.steps,
        summary.virtual_ms
    );

    if let Some(slot) = cli.save_slot {
        driver
            .save_to_slot(&saves, slot)
            .with_context(|| format!("无法保存到槽位 {}", slot))?;
    }
    Ok(())
}
