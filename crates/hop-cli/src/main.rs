use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use hop_link::udp::UdpTransport;
use hop_link::{LinkConfig, Transport};
use hop_nav::doctor::{check_geometry, check_mission, validate_waypoints, WaypointRules};
use hop_nav::{
    CommandShaper, GeometryConfig, MissionConfig, MissionController, MissionQueue, MissionState, PixelGeometry,
};
use hop_proto::telemetry::CycleOutcome;
use hop_proto::{Direction, Position};
use hop_vision::feed::{run_feed, FixSource};
use hop_vision::video::{sink_from_config, VideoConfig};
use hop_vision::{position_cell, VisionConfig};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "hop", version, about = "NAVhop - vision-guided waypoint flights for small quadcopters")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fly missions as they are armed (config waypoints, then one route per stdin line).
    Run,
    /// Sanity-check the config.
    Doctor,
    /// Send one raw SDK command and print the reply.
    Send {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Show what the shaper would transmit for a raw correction.
    Shape { direction: String, magnitude: u32 },
}

#[derive(Debug, Default, serde::Deserialize)]
struct Config {
    #[serde(default)]
    link: LinkConfig,
    #[serde(default)]
    video: VideoConfig,
    #[serde(default)]
    vision: VisionConfig,
    #[serde(default)]
    mission: MissionConfig,
    #[serde(default)]
    geometry: GeometryConfig,
    #[serde(default)]
    waypoints: WaypointRules,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Run => run(&cfg).await?,
        Command::Doctor => doctor(&cfg)?,
        Command::Send { words } => send(&cfg, &words.join(" ")).await?,
        Command::Shape { direction, magnitude } => shape(&cfg, &direction, magnitude)?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    check_mission(&cfg.mission)?;
    check_geometry(&cfg.geometry)?;

    let initial = cfg.mission.initial_waypoints();
    if !initial.is_empty() {
        validate_waypoints(&cfg.waypoints, &initial).context("mission.waypoints")?;
    }

    cfg.link
        .drone_addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("link.drone_addr {:?}", cfg.link.drone_addr))?;
    match cfg.vision.source.as_str() {
        "udp" => {}
        "file" => anyhow::ensure!(cfg.vision.replay_file.is_some(), "vision.replay_file missing"),
        other => anyhow::bail!("unknown vision.source: {}", other),
    }
    if cfg.link.response_timeout_ms.is_none() {
        warn!("doctor: link.response_timeout_ms unset; a silent drone stalls the mission");
    }
    if cfg.mission.fix_timeout_ms.is_none() {
        warn!("doctor: mission.fix_timeout_ms unset; missing vision stalls the mission in the air");
    }

    info!("doctor: OK");
    Ok(())
}

fn shape(cfg: &Config, direction: &str, magnitude: u32) -> Result<()> {
    let dir: Direction = direction.parse()?;
    match CommandShaper::new(cfg.mission.shaping).shape(dir, magnitude) {
        Some(cmd) => println!("{}", cmd),
        None => println!("skip"),
    }
    Ok(())
}

async fn send(cfg: &Config, text: &str) -> Result<()> {
    let mut link = UdpTransport::new(cfg.link.clone());
    link.connect().await.context("link connect")?;
    link.send_command("command").await.context("enter sdk mode")?;
    let reply = link.send_command(text).await.with_context(|| format!("send {:?}", text))?;
    println!("{}", reply);
    let st = link.status();
    info!("send: {} commands, reply age {:?}", st.commands_sent, st.reply_age());
    link.close().await?;
    Ok(())
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    let queue = MissionQueue::new();
    let initial = cfg.mission.initial_waypoints();
    if !initial.is_empty() {
        validate_waypoints(&cfg.waypoints, &initial).context("mission.waypoints")?;
        queue.arm(initial);
    }

    // Vision: fixes land in a single-slot cell, the controller only sees the latest.
    let (fix_tx, fix_rx) = position_cell();
    let src = FixSource::from_config(&cfg.vision).await?;
    let feed = tokio::spawn(async move {
        if let Err(e) = run_feed(src, fix_tx).await {
            warn!("vision feed stopped: {:#}", e);
        }
    });

    let routes = tokio::spawn(read_routes(queue.clone(), cfg.waypoints));

    let (report_tx, report_rx) = mpsc::channel::<CycleOutcome>(8);
    let reporter = tokio::spawn(write_reports(report_rx, cfg.mission.report_path.clone()));

    let mut mc = MissionController::new(
        UdpTransport::new(cfg.link.clone()),
        fix_rx,
        queue,
        sink_from_config(&cfg.video),
        PixelGeometry::new(cfg.geometry),
        &cfg.mission,
    );

    let interrupted = tokio::select! {
        _ = mc.run(Some(report_tx)) => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    let state = mc.state();
    // releases the command socket before any emergency link binds it
    drop(mc);

    feed.abort();
    routes.abort();
    if let Err(e) = reporter.await {
        warn!("report writer failed: {}", e);
    }

    if interrupted {
        warn!("run: interrupted in state {:?}", state);
        if state != MissionState::AwaitingMission {
            emergency_land(&cfg.link).await?;
        }
    }
    Ok(())
}

// Short-lived link just for the land command.
async fn emergency_land(link_cfg: &LinkConfig) -> Result<()> {
    let mut link = UdpTransport::new(LinkConfig {
        response_timeout_ms: Some(link_cfg.response_timeout_ms.unwrap_or(3_000)),
        ..link_cfg.clone()
    });
    link.connect().await.context("emergency link")?;
    if let Err(e) = link.send_command("command").await {
        warn!("run: emergency sdk mode entry failed: {}", e);
    }
    let reply = link.send_command("land").await.context("emergency land")?;
    warn!("run: emergency land -> {}", reply);
    link.close().await?;
    Ok(())
}

/// One mission per line: `x,y x,y ...`.
fn parse_route(line: &str) -> Result<Vec<Position>> {
    line.split_whitespace()
        .map(|pt| {
            let (x, y) = pt.split_once(',').with_context(|| format!("bad waypoint {:?}", pt))?;
            let x: f64 = x.parse().with_context(|| format!("bad x in {:?}", pt))?;
            let y: f64 = y.parse().with_context(|| format!("bad y in {:?}", pt))?;
            Ok(Position::new(x, y))
        })
        .collect()
}

async fn read_routes(queue: MissionQueue, rules: WaypointRules) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let route = match parse_route(line) {
            Ok(r) => r,
            Err(e) => {
                warn!("route rejected: {:#}", e);
                continue;
            }
        };
        if let Err(e) = validate_waypoints(&rules, &route) {
            warn!("route rejected: {}", e);
            continue;
        }
        if !queue.arm(route) {
            warn!("route ignored: a mission is already armed");
        }
    }
    Ok(())
}

async fn write_reports(mut rx: mpsc::Receiver<CycleOutcome>, path: Option<String>) {
    while let Some(outcome) = rx.recv().await {
        match &outcome {
            CycleOutcome::Completed(r) => info!(
                "report: {}/{} reached, last={:?}, battery={:?}, final={:?}",
                r.reached_count(),
                r.waypoints.len(),
                r.last_attempted,
                r.battery.as_ref().and_then(|b| b.remaining),
                r.final_position
            ),
            CycleOutcome::Aborted { reason, .. } => warn!("report: cycle aborted: {}", reason),
        }
        if let Some(p) = &path {
            if let Err(e) = append_report(p, &outcome).await {
                warn!("report: write {} failed: {:#}", p, e);
            }
        }
    }
}

async fn append_report(path: &str, outcome: &CycleOutcome) -> Result<()> {
    let mut line = serde_json::to_string(outcome)?;
    line.push('\n');
    let mut f = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("open {}", path))?;
    f.write_all(line.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_lines() {
        let r = parse_route("300,300  300,450 600.5,460").unwrap();
        assert_eq!(r, vec![Position::new(300.0, 300.0), Position::new(300.0, 450.0), Position::new(600.5, 460.0)]);
        assert!(parse_route("300;300").is_err());
        assert!(parse_route("300,abc").is_err());
    }

    #[test]
    fn non_finite_routes_are_never_armed() {
        let rules = WaypointRules::default();
        let route = parse_route("nan,500 inf,300").unwrap();
        assert!(validate_waypoints(&rules, &route).is_err());

        let cfg: Config = toml::from_str(
            r#"
            [mission]
            waypoints = [[nan, 500], [800, 500]]
            "#,
        )
        .unwrap();
        assert!(doctor(&cfg).is_err());
    }

    #[test]
    fn config_sections_default() {
        let cfg: Config = toml::from_str(
            r#"
            [link]
            response_timeout_ms = 7000

            [mission]
            max_retries = 4
            waypoints = [[300, 300], [300, 450]]

            [mission.tolerance]
            x = 100
            "#,
        )
        .unwrap();
        assert_eq!(cfg.link.drone_addr, "192.168.10.1:8889");
        assert_eq!(cfg.link.response_timeout_ms, Some(7000));
        assert_eq!(cfg.mission.max_retries, 4);
        assert_eq!(cfg.mission.delay_ms, 100);
        assert_eq!(cfg.mission.tolerance.x, 100.0);
        assert_eq!(cfg.mission.tolerance.y, 72.0);
        assert_eq!(cfg.mission.shaping.min_value, 20);
        assert_eq!(cfg.mission.initial_waypoints().len(), 2);
        assert_eq!(cfg.vision.source, "udp");
        assert!(cfg.video.enable);
        doctor(&cfg).unwrap();
    }

    #[test]
    fn empty_config_is_valid() {
        let cfg: Config = toml::from_str("").unwrap();
        doctor(&cfg).unwrap();
    }
}
