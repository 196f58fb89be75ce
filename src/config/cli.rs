use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stick-mouse")]
#[command(about = "Use a gamepad's right analog stick as a mouse")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Gamepad evdev node (e.g. /dev/input/event5)
    #[arg(long, env = "STICK_MOUSE_DEVICE")]
    pub device: Option<PathBuf>,

    /// Cursor updates per second
    #[arg(long)]
    pub update_rate_hz: Option<u32>,

    /// Stick deadzone, as a fraction of full deflection
    #[arg(long)]
    pub deadzone: Option<f32>,

    /// Exponent of the stick velocity curve
    #[arg(long)]
    pub power: Option<f32>,

    /// Cursor speed coefficient (pixels per tick at full deflection)
    #[arg(long)]
    pub speed: Option<f32>,

    /// Seconds of stick inactivity before triggers stop acting as clicks
    #[arg(long)]
    pub fade_secs: Option<u64>,

    /// Raw value of ABS_RX/ABS_RY at full left/up
    #[arg(long, allow_hyphen_values = true)]
    pub axis_min: Option<i32>,

    /// Raw value of ABS_RX/ABS_RY at full right/down
    #[arg(long)]
    pub axis_max: Option<i32>,

    /// Path to config file
    #[arg(long, env = "STICK_MOUSE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print raw input events from the gamepad for debugging
    Dump,
}
