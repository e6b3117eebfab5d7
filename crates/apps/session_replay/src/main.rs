mod replay;
mod script;

use std::env;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use foundation::{LatLng, Zoom};
use layers::TileSource;
use session::MapConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::replay::ReplayOptions;
use crate::script::Script;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a map session script against a headless surface")]
struct Args {
    /// Script file (JSON)
    script: PathBuf,

    /// Override `center_once` on every enable_location step
    #[arg(long)]
    center_once: Option<bool>,

    /// Initial center: lat,lng
    #[arg(long)]
    center: Option<String>,

    #[arg(long)]
    zoom: Option<u8>,

    /// Tile URL template with {z}, {x}, {y} placeholders
    #[arg(long)]
    tile_url: Option<String>,

    /// Pump events after every position step instead of waiting for `pump`
    #[arg(long)]
    auto_pump: bool,

    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let raw = fs::read_to_string(&args.script)
        .map_err(|e| format!("reading {}: {e}", args.script.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .map_err(|e| format!("parsing {}: {e}", args.script.display()))?;

    let config = resolve_config(script.config.clone(), &args)
        .validated()
        .map_err(|e| e.to_string())?;
    info!(
        script = %args.script.display(),
        steps = script.steps.len(),
        center = %config.center,
        zoom = config.zoom.level(),
        "replaying"
    );

    let options = ReplayOptions {
        auto_pump: args.auto_pump,
        center_once: args.center_once,
    };
    let summary = replay::run(&script, config, &options).map_err(|e| e.to_string())?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{out}");
    Ok(())
}

/// Script config, then environment, then flags.
fn resolve_config(mut config: MapConfig, args: &Args) -> MapConfig {
    config.center = LatLng::new(
        env_var_f64("MAP_CENTER_LAT", config.center.lat),
        env_var_f64("MAP_CENTER_LNG", config.center.lng),
    );
    config.zoom = Zoom(env_var_u8("MAP_ZOOM", config.zoom.level()));
    if let Ok(url) = env::var("MAP_TILE_URL") {
        config.tile_source = TileSource::new(url);
    }

    if let Some(center) = args.center.as_deref().and_then(parse_lat_lng) {
        config.center = center;
    }
    if let Some(zoom) = args.zoom {
        config.zoom = Zoom(zoom);
    }
    if let Some(url) = &args.tile_url {
        config.tile_source = TileSource::new(url.clone());
    }
    config
}

fn parse_lat_lng(s: &str) -> Option<LatLng> {
    let (lat, lng) = s.split_once(',')?;
    Some(LatLng::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?))
}

fn env_var_u8(key: &str, default: u8) -> u8 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
