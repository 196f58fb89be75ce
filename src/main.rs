use std::thread;
use std::time::Duration;

use clap::Parser;

use stick_mouse::bridge;
use stick_mouse::config::{Cli, Command, Config};
use stick_mouse::cursor::StickMouse;
use stick_mouse::dump;
use stick_mouse::hook::InputHook;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Command::Dump)) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
        let config = Config::load(&cli);
        return dump::run_dump(&config.device);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load(&cli);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    log::info!(
        "stick-mouse starting (device={}, rate={}Hz, deadzone={}, power={}, speed={}, fade={}s)",
        config.device.display(),
        config.cursor.update_rate_hz,
        config.cursor.deadzone,
        config.cursor.power,
        config.cursor.speed,
        config.cursor.fade.as_secs()
    );

    let hook = InputHook::new(StickMouse::new(config.cursor));
    hook.register_devices();
    if !hook.mouse().is_registered() {
        return Err("could not create the virtual mouse (is /dev/uinput writable?)".into());
    }

    loop {
        log::info!("[bridge] starting…");
        if let Err(e) = bridge::run(&config, &hook) {
            log::error!("[bridge] {}", e);
        }
        log::warn!("[bridge] disconnected, reconnecting in 2s…");
        thread::sleep(RECONNECT_DELAY);
    }
}
