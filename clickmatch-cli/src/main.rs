use clap::Parser;
use clickmatch::{discover_region, Config, ControlLoop, ControlState, StatusSnapshot};
use serde::Deserialize;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

mod desktop;
#[cfg(feature = "hotkeys")]
mod hotkeys;

use desktop::{EnigoClicker, XcapCapture, XcapRegions};

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Watches a screen region and clicks known buttons",
    after_help = "Commands on stdin: p = pause/resume, s = status, q = quit. \
                  Built with the `hotkeys` feature, F8 pauses/resumes and F9 stops."
)]
struct Cli {
    /// Path to the JSON configuration file; defaults apply when it is missing.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigJson {
    templates_dir: PathBuf,
    match_threshold: f32,
    downscale: f32,
    reload_interval_s: f64,
    scan_interval_s: f64,
    click_cooldown_s: f64,
    worker_count: Option<usize>,
    region_title_hint: String,
    max_log_lines: usize,
}

impl Default for ConfigJson {
    fn default() -> Self {
        let cfg = Config::default();
        Self {
            templates_dir: cfg.templates_dir,
            match_threshold: cfg.match_threshold,
            downscale: cfg.downscale,
            reload_interval_s: cfg.reload_interval.as_secs_f64(),
            scan_interval_s: cfg.scan_interval.as_secs_f64(),
            click_cooldown_s: cfg.click_cooldown.as_secs_f64(),
            worker_count: None,
            region_title_hint: cfg.region_title_hint,
            max_log_lines: cfg.max_log_lines,
        }
    }
}

impl ConfigJson {
    fn into_config(self) -> Result<Config, Box<dyn std::error::Error>> {
        let defaults = Config::default();
        Ok(Config {
            templates_dir: self.templates_dir,
            match_threshold: self.match_threshold,
            downscale: self.downscale,
            reload_interval: seconds("reload_interval_s", self.reload_interval_s)?,
            scan_interval: seconds("scan_interval_s", self.scan_interval_s)?,
            click_cooldown: seconds("click_cooldown_s", self.click_cooldown_s)?,
            worker_count: self.worker_count.unwrap_or(defaults.worker_count),
            region_title_hint: self.region_title_hint,
            max_log_lines: self.max_log_lines,
        })
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f64(value).map_err(|err| format!("{field}: {err}").into())
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let json = if path.exists() {
        let text = fs::read_to_string(path)?;
        serde_json::from_str::<ConfigJson>(&text)?
    } else {
        tracing::info!(path = %path.display(), "config file missing, using defaults");
        ConfigJson::default()
    };
    let config = json.into_config()?;
    config.validate()?;
    Ok(config)
}

fn render_status(snapshot: &StatusSnapshot) -> String {
    let mut out = format!(
        "state: {:?}\ntemplates ({}): {}\nloop: {:.1} ms ({:.1} Hz), {} iterations, {} clicks\n",
        snapshot.state,
        snapshot.templates.len(),
        snapshot.templates.join(", "),
        snapshot.metrics.loop_time.as_secs_f64() * 1000.0,
        snapshot.metrics.rate_hz,
        snapshot.metrics.iterations,
        snapshot.metrics.clicks,
    );
    if let Some(action) = &snapshot.last_action {
        out.push_str(&format!("last action: {action}\n"));
    }
    if let Some(error) = &snapshot.last_error {
        out.push_str(&format!("last error: {error}\n"));
    }
    for entry in &snapshot.log {
        let secs = entry
            .at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        out.push_str(&format!("[{secs}] {:>5} {}\n", entry.severity, entry.message));
    }
    out
}

/// Reads single-letter commands from stdin until quit or EOF.
fn spawn_command_reader(state: Arc<ControlState>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("clickmatch-commands".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match line.trim() {
                    "p" | "pause" => {
                        let paused = state.request_pause_toggle();
                        println!("{}", if paused { "paused" } else { "resumed" });
                    }
                    "s" | "status" => print!("{}", render_status(&state.snapshot())),
                    "q" | "quit" => {
                        state.request_stop();
                        break;
                    }
                    "" => {}
                    other => println!("unknown command {other:?} (p, s, q)"),
                }
            }
        })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("clickmatch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    let region = discover_region(&XcapRegions, &config.region_title_hint)?;
    let state = Arc::new(ControlState::new(config.max_log_lines));

    let mut control = ControlLoop::new(
        config,
        region,
        XcapCapture::default(),
        EnigoClicker::new()?,
        Arc::clone(&state),
    )?;
    // Detached: both may stay blocked on input after the loop stops.
    spawn_command_reader(Arc::clone(&state))?;
    #[cfg(feature = "hotkeys")]
    {
        hotkeys::spawn_listener(Arc::clone(&state))?;
        println!("hotkeys: F8 = pause/resume, F9 = stop");
    }

    println!(
        "watching {}x{} at ({}, {}); commands: p = pause/resume, s = status, q = quit",
        region.width, region.height, region.left, region.top
    );
    let result = control.run();
    print!("{}", render_status(&state.snapshot()));
    result?;
    Ok(())
}
