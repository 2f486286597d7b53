use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::process::ExitCode;
use tracing::{debug, warn};

use winpick::config::Config;
use winpick::model::{DisplayInfo, SpaceInfo, WindowEntity};
use winpick::WindowSwitcher;

#[derive(Parser, Debug)]
#[command(name = "winpick")]
#[command(about = "Переключатель недавних окон поверх запросов к оконному менеджеру")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "winpick.toml")]
    config: String,

    /// Режим сухого запуска (готовые снимки вместо оконного менеджера)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Вывод в JSON вместо строк через табуляцию
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Окна по запросу: сфокусированное первым, затем недавние
    Recent {
        /// Строка поиска, можно с префиксом `#<дисплей>`
        #[arg(default_value = "")]
        query: String,
    },
    /// Все окна как есть
    Windows,
    /// Рабочие столы
    Spaces,
    /// Дисплеи
    Displays,
    /// Отметить окно как активированное из переключателя
    Activate { id: u64 },
    /// Добавить событие фокуса в журнал (для хука оконного менеджера)
    RecordFocus { id: u64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("winpick: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(&args.config)?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;
    debug!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - оконный менеджер не опрашивается");
    }

    let switcher = WindowSwitcher::from_config(&config, args.dry_run);

    match args.command {
        Command::Recent { query } => {
            let windows = switcher
                .recent(&query)
                .await
                .with_context(|| format!("Поиск '{}' не удался", query))?;
            print_windows(&windows, args.json)?;
        }
        Command::Windows => {
            let windows = switcher.windows().await?;
            print_windows(&windows, args.json)?;
        }
        Command::Spaces => {
            let spaces = switcher.spaces().await?;
            print_spaces(&spaces, args.json)?;
        }
        Command::Displays => {
            let displays = switcher.displays().await?;
            print_displays(&displays, args.json)?;
        }
        Command::Activate { id } => {
            let stamped = switcher
                .record_activation(id)
                .await
                .with_context(|| format!("Не удалось отметить окно {}", id))?;
            if args.json {
                print_json(&serde_json::json!({ "id": id, "used_at_ms": stamped }))?;
            } else {
                println!("{}\t{}", id, stamped);
            }
        }
        Command::RecordFocus { id } => {
            let entry = switcher
                .record_focus(id)
                .await
                .context("Не удалось записать событие фокуса")?;
            if args.json {
                print_json(&serde_json::json!({
                    "id": entry.entity_id,
                    "focused_at_secs": entry.timestamp_secs,
                }))?;
            } else {
                print!("{}", entry.to_line());
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_windows(windows: &[WindowEntity], json: bool) -> Result<()> {
    if json {
        return print_json(windows);
    }

    for w in windows {
        let display = w.display_index.map(|d| d.to_string()).unwrap_or_default();
        let focus = if w.focused { "*" } else { "" };
        println!("{}\t{}\t{}\t{}\t{}{}", w.id, display, w.owner, w.title, w.space_index, focus);
    }
    Ok(())
}

fn print_spaces(spaces: &[SpaceInfo], json: bool) -> Result<()> {
    if json {
        return print_json(spaces);
    }

    for s in spaces {
        let windows: Vec<String> = s.windows.iter().map(u64::to_string).collect();
        let focus = if s.has_focus { "*" } else { "" };
        println!("{}{}\t{}\t{}\t{}", s.index, focus, s.display, s.label, windows.join(","));
    }
    Ok(())
}

fn print_displays(displays: &[DisplayInfo], json: bool) -> Result<()> {
    if json {
        return print_json(displays);
    }

    for d in displays {
        let spaces: Vec<String> = d.spaces.iter().map(u32::to_string).collect();
        let focus = if d.has_focus { "*" } else { "" };
        println!("{}{}\t{}\t{}", d.index, focus, d.id, spaces.join(","));
    }
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    // stdout занят результатом, логи только в stderr
    match format {
        "pretty" => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
