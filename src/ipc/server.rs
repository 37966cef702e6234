use anyhow::{Result, anyhow};
use log::{error, info, warn};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::PathBuf,
    sync::mpsc::{self, Sender},
    thread,
    time::Duration,
};

use super::dispatch::ControlRequest;
use super::pipeline::{Pipeline, PipelineMsg, spawn_reader};
use super::runtime::socket_path;
use crate::config::DaemonConfigState;
use crate::input::Clock;
use crate::trigger::SourceSelection;

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
pub struct RunOptions {
    pub profile: Option<String>,
    pub source: Option<SourceSelection>,
    /// JSON-lines file to replay instead of stdin.
    pub input: Option<PathBuf>,
}

pub fn run_daemon(opts: RunOptions) -> Result<()> {
    let cfg = match &opts.profile {
        Some(name) => DaemonConfigState::load_named(name)?,
        None => DaemonConfigState::load_or_install_default()?,
    };
    info!("daemon: active profile '{}'", cfg.active_name);

    // config errors surface before anything is bound
    let mut pipeline = Pipeline::new(cfg, opts.source, io::stdout())?;

    let sock = socket_path()?;
    if sock.exists() {
        let _ = fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    info!("daemon: listening on {}", sock.display());
    pipeline.socket = Some(sock.clone());

    let (tx, rx) = mpsc::channel::<PipelineMsg>();

    let control_tx = tx.clone();
    thread::spawn(move || accept_loop(listener, control_tx));

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signal_tx = tx.clone();
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("daemon: caught signal {sig}");
            let _ = signal_tx.send(PipelineMsg::Shutdown);
        }
    });

    match &opts.input {
        Some(path) => {
            let file =
                File::open(path).map_err(|e| anyhow!("cannot open {}: {e}", path.display()))?;
            info!("daemon: replaying {}", path.display());
            spawn_reader(BufReader::new(file), Clock::new(), tx);
        }
        None => {
            spawn_reader(BufReader::new(io::stdin()), Clock::new(), tx);
        }
    }

    let result = pipeline.run(rx);
    if let Err(e) = &result {
        error!("daemon: {e}");
    }
    let _ = fs::remove_file(&sock);
    result
}

fn accept_loop(listener: UnixListener, tx: Sender<PipelineMsg>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let tx = tx.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, &tx) {
                        error!("ipc client error: {e}");
                    }
                });
            }
            Err(e) => warn!("ipc accept failed: {e}"),
        }
    }
}

fn handle_client(mut stream: UnixStream, tx: &Sender<PipelineMsg>) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }

    let resp = match serde_json::from_str::<ControlRequest>(&line) {
        Ok(req) => {
            let (reply_tx, reply_rx) = mpsc::channel();
            tx.send(PipelineMsg::Control(req, reply_tx))
                .map_err(|_| anyhow!("pipeline is gone"))?;
            reply_rx
                .recv_timeout(REPLY_TIMEOUT)
                .map_err(|_| anyhow!("pipeline did not answer"))?
        }
        Err(e) => serde_json::json!({"ok": false, "error": format!("bad request: {e}")}),
    };

    writeln!(stream, "{resp}")?;
    Ok(())
}
