use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use scenario_core::templates;
use scenario_core::{
    classify, resolve_keyframe, AlarmConfig, FlaggedResult, ReferenceRange, ResultKind, Scenario,
};
use scenario_session::{spawn, AlarmEvent, AlarmSession, MonitorView, SessionConfig, SessionState};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "scenario-cli",
    about = "Co giãn, tra cứu và phát kịch bản mô phỏng lâm sàng."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Liệt kê template dựng sẵn.
    Templates,
    /// In kịch bản đã co giãn dưới dạng JSON.
    Scale {
        #[command(flatten)]
        source: ScenarioSource,
    },
    /// In snapshot đang hiệu lực tại một thời điểm.
    Resolve {
        #[command(flatten)]
        source: ScenarioSource,
        /// Thời gian đã trôi qua (giây).
        #[arg(long)]
        at: f64,
    },
    /// Xếp loại một giá trị theo khoảng tham chiếu.
    Classify {
        #[arg(long, allow_hyphen_values = true)]
        value: f64,
        #[arg(long)]
        low: Option<f64>,
        #[arg(long)]
        high: Option<f64>,
        #[arg(long)]
        critical_low: Option<f64>,
        #[arg(long)]
        critical_high: Option<f64>,
    },
    /// Gắn cờ kết quả xét nghiệm theo bảng tham chiếu mặc định.
    Lab {
        #[arg(long)]
        analyte: String,
        #[arg(long, allow_hyphen_values = true)]
        value: f64,
        #[arg(long)]
        unit: Option<String>,
        /// Kết quả chẩn đoán hình ảnh thay vì xét nghiệm.
        #[arg(long)]
        radiology: bool,
    },
    /// Phát kịch bản và in các thay đổi báo động.
    Play {
        #[command(flatten)]
        source: ScenarioSource,
        /// File JSON cấu hình báo động của ca bệnh.
        #[arg(long)]
        alarms: Option<PathBuf>,
        /// File JSON cấu hình phiên (tick_interval_ms, event_buffer).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Chạy theo thời gian thực thay vì tua nhanh.
        #[arg(long)]
        realtime: bool,
        /// Bước tua nhanh (giây).
        #[arg(long, default_value_t = 1.0)]
        step: f64,
        /// In sự kiện dạng JSON, mỗi dòng một sự kiện.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ScenarioSource {
    /// Đường dẫn tới file JSON kịch bản.
    #[arg(long, conflicts_with = "template")]
    scenario: Option<PathBuf>,
    /// Mã template dựng sẵn.
    #[arg(long)]
    template: Option<String>,
    /// Thời lượng phiên (giây); bỏ trống để giữ thời lượng gốc.
    #[arg(long)]
    duration: Option<f64>,
}

impl ScenarioSource {
    fn load(&self) -> anyhow::Result<Scenario> {
        let scenario = match (&self.scenario, &self.template) {
            (Some(path), _) => read_json::<Scenario>(path)?,
            (None, Some(id)) => templates::find(id)?.scenario,
            (None, None) => bail!("Cần --scenario hoặc --template"),
        };

        match self.duration {
            Some(target) => Ok(scenario.scaled_to(target)?),
            None => Ok(scenario),
        }
    }
}

#[derive(Deserialize)]
struct SessionConfigOverride {
    #[serde(default)]
    tick_interval_ms: Option<u64>,
    #[serde(default)]
    event_buffer: Option<usize>,
}

impl From<SessionConfigOverride> for SessionConfig {
    fn from(cfg: SessionConfigOverride) -> Self {
        let mut base = SessionConfig::default();
        if let Some(interval) = cfg.tick_interval_ms {
            base.tick_interval_ms = interval;
        }
        if let Some(buffer) = cfg.event_buffer {
            base.event_buffer = buffer;
        }
        base
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Templates => {
            for template in templates::builtin() {
                println!(
                    "{:<14} {:>6.0}s  {} keyframe  {}",
                    template.id,
                    template.scenario.total_duration_seconds,
                    template.scenario.timeline.len(),
                    template.title
                );
            }
        }
        Command::Scale { source } => {
            let scenario = source.load()?;
            println!("{}", serde_json::to_string_pretty(&scenario)?);
        }
        Command::Resolve { source, at } => {
            let scenario = source.load()?;
            let active = resolve_keyframe(&scenario.timeline, at);
            println!("Keyframe #{}: {}", active.index, active.keyframe.label);
            println!("{}", serde_json::to_string_pretty(&active.keyframe.snapshot)?);
        }
        Command::Classify {
            value,
            low,
            high,
            critical_low,
            critical_high,
        } => {
            let range = ReferenceRange {
                low,
                high,
                critical_low,
                critical_high,
            }
            .validated()?;
            println!("{}", classify(value, &range));
        }
        Command::Lab {
            analyte,
            value,
            unit,
            radiology,
        } => {
            let kind = if radiology {
                ResultKind::Radiology
            } else {
                ResultKind::Lab
            };
            let result =
                FlaggedResult::fulfill_with_default_range(analyte, kind, value, unit, Utc::now());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Play {
            source,
            alarms,
            config,
            realtime,
            step,
            json,
        } => {
            let scenario = source.load()?;
            let alarms = match alarms {
                Some(path) => read_json::<AlarmConfig>(&path)?,
                None => AlarmConfig::default(),
            };
            alarms
                .validate()
                .context("Cấu hình báo động không hợp lệ")?;

            if realtime {
                let config = match config {
                    Some(path) => SessionConfig::from(read_json::<SessionConfigOverride>(&path)?),
                    None => SessionConfig::default(),
                };
                play_realtime(scenario, alarms, &config, json).await?;
            } else {
                play_simulated(scenario, alarms, step, json)?;
            }
        }
    }

    Ok(())
}

fn play_simulated(
    scenario: Scenario,
    alarms: AlarmConfig,
    step: f64,
    json: bool,
) -> anyhow::Result<()> {
    if !(step.is_finite() && step > 0.0) {
        bail!("--step phải lớn hơn 0, nhận {step}");
    }

    let started = Utc::now();
    let mut session = AlarmSession::new(scenario, alarms, started)?;
    if session.state() == SessionState::Idle {
        session.start(started)?;
    }

    let mut tick = 0_u64;
    loop {
        let offset_ms = (tick as f64 * step * 1000.0).round() as i64;
        let outcome = session.tick(started + chrono::Duration::milliseconds(offset_ms));
        for event in &outcome.events {
            print_event(event, json)?;
        }
        if outcome.completed {
            break;
        }
        tick += 1;
    }

    session.end(Utc::now());
    print_summary(&session.view());
    Ok(())
}

async fn play_realtime(
    scenario: Scenario,
    alarms: AlarmConfig,
    config: &SessionConfig,
    json: bool,
) -> anyhow::Result<()> {
    let session = AlarmSession::new(scenario, alarms, Utc::now())?;
    let needs_start = session.state() == SessionState::Idle;
    let (handle, mut events) = spawn(session, config);
    if needs_start {
        handle.start().await?;
    }

    let mut view = handle.watch_view();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl+C received, ending session");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event, json)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event subscriber lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = view.changed() => {
                if changed.is_err() || view.borrow().completed {
                    break;
                }
            }
        }
    }

    let final_view = handle.shutdown().await?;
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event, json)?,
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "event subscriber lagged"),
            Err(_) => break,
        }
    }
    print_summary(&final_view);
    Ok(())
}

fn print_event(event: &AlarmEvent, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!(
            "[{:>7.1}s] {:<6} {:>7.1}  {} (trước: {})",
            event.elapsed_seconds, event.parameter, event.value, event.flag, event.previous
        );
    }
    Ok(())
}

fn print_summary(view: &MonitorView) {
    println!(
        "State: {}\nElapsed: {:.1}s ({:.0}%)\nKeyframe: {}",
        view.state,
        view.elapsed_seconds,
        view.progress * 100.0,
        view.keyframe_label.as_deref().unwrap_or("-")
    );
    for monitored in &view.flags {
        println!("  {:<6} {:>7.1}  {}", monitored.parameter, monitored.value, monitored.flag);
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("JSON không hợp lệ trong {:?}", path))
}
