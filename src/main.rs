use eduplan::ipc;
use std::io::{self, BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "EDUPLAN_LOG";

fn init_logging() {
    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) {
    let text = match serde_json::to_string(value) {
        Ok(t) => t,
        Err(e) => {
            error!("response serialization failed: {e}");
            r#"{"ok":false,"error":{"code":"internal","message":"response serialization failed"}}"#
                .to_string()
        }
    };
    let _ = writeln!(stdout, "{}", text);
    let _ = stdout.flush();
}

fn main() {
    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "eduplan sidecar started");

    let mut state = ipc::AppState::default();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!("stdin read failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                write_line(&mut stdout, &ipc::bad_json(e.to_string()));
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        write_line(&mut stdout, &resp);
    }
    info!("stdin closed, exiting");
}
