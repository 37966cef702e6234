use anyhow::{Result, anyhow};
use log::{info, warn};
use notify::RecommendedWatcher;
use serde::Serialize;
use std::{
    io::{BufRead, Write},
    path::PathBuf,
    sync::mpsc::{Receiver, RecvTimeoutError, Sender},
    thread,
    time::Instant,
};

use super::dispatch::ControlRequest;
use crate::config::DaemonConfigState;
use crate::filter::GazeFilter;
use crate::gestures::{self, FileGestures, GestureProvider};
use crate::input::{self, Clock};
use crate::sample::{Point, TriggerSignal};
use crate::trigger::{InputEvent, RunState, SourceKind, SourceSelection, TriggerSource};

pub enum PipelineMsg {
    Input(InputEvent),
    EndOfInput,
    Control(ControlRequest, Sender<serde_json::Value>),
    Shutdown,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Output<'a> {
    Cursor(Point),
    Signal(&'a TriggerSignal),
}

/// Reads JSON-lines input on its own thread and forwards parsed events.
pub fn spawn_reader<R>(reader: R, clock: Clock, tx: Sender<PipelineMsg>) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("input read failed: {e}");
                    break;
                }
            };
            match input::parse_line(&line, &clock) {
                Ok(Some(ev)) => {
                    if tx.send(PipelineMsg::Input(ev)).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{e}"),
            }
        }
        let _ = tx.send(PipelineMsg::EndOfInput);
    })
}

/// The running source plus everything built from the active profile.
pub struct Pipeline<W: Write> {
    pub(super) cfg: DaemonConfigState,
    pub(super) source_override: Option<SourceSelection>,
    pub(super) source: TriggerSource,
    pub(super) filter: Option<GazeFilter>,
    pub(super) socket: Option<PathBuf>,
    _watcher: Option<RecommendedWatcher>,
    out: W,
    pub(super) signals_written: u64,
}

/// Builds the source a profile selects, with a watcher on the gestures
/// file when the gesture source is chosen and watching is enabled.
fn build_source(
    cfg: &DaemonConfigState,
    selection: SourceSelection,
) -> Result<(TriggerSource, Option<RecommendedWatcher>)> {
    let provider: Option<Box<dyn GestureProvider>> = match selection {
        SourceSelection::Gestures => Some(Box::new(FileGestures::new(cfg.gestures_path()))),
        _ => None,
    };
    let source = TriggerSource::from_profile(&cfg.profile, selection, provider)?;

    let mut watcher = None;
    if let SourceKind::Gestures(engine) = source.kind() {
        if cfg.profile.gestures.watch {
            match gestures::watch_file(&cfg.gestures_path(), engine.updated_flag()) {
                Ok(w) => watcher = Some(w),
                Err(e) => warn!("cannot watch gestures file: {e}"),
            }
        }
    }
    Ok((source, watcher))
}

fn build_filter(cfg: &DaemonConfigState) -> Option<GazeFilter> {
    let s = &cfg.profile.smoothing;
    s.enabled.then(|| GazeFilter::from_settings(s))
}

impl<W: Write> Pipeline<W> {
    pub fn new(
        cfg: DaemonConfigState,
        source_override: Option<SourceSelection>,
        out: W,
    ) -> Result<Self> {
        let selection = source_override.unwrap_or(cfg.profile.trigger.source);
        let (mut source, watcher) = build_source(&cfg, selection)?;
        source.start();
        info!("profile '{}' using {} source", cfg.active_name, selection);
        Ok(Self {
            filter: build_filter(&cfg),
            cfg,
            source_override,
            source,
            socket: None,
            _watcher: watcher,
            out,
            signals_written: 0,
        })
    }

    /// Replaces the source with one built from the current profile. The
    /// new source starts in the state the old one was in.
    pub(super) fn rebuild(&mut self) -> Result<()> {
        let selection = self
            .source_override
            .unwrap_or(self.cfg.profile.trigger.source);
        let (mut source, watcher) = build_source(&self.cfg, selection)?;

        let previous = self.source.state();
        self.source.stop();
        source.start();
        if previous == RunState::Paused {
            source.pause();
        }
        self.source = source;
        self._watcher = watcher;
        self.filter = build_filter(&self.cfg);
        info!(
            "profile '{}' using {} source",
            self.cfg.active_name, selection
        );
        Ok(())
    }

    fn write(&mut self, output: &Output<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, output)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn emit(&mut self, signals: &[TriggerSignal]) -> Result<()> {
        for s in signals {
            self.write(&Output::Signal(s))?;
            self.signals_written += 1;
        }
        if !signals.is_empty() {
            self.out.flush()?;
        }
        Ok(())
    }

    fn on_input(&mut self, event: &InputEvent) -> Result<()> {
        if let (InputEvent::Sample(sample), Some(filter)) = (event, self.filter.as_mut()) {
            if self.source.state() == RunState::Running {
                let cursor = filter.apply(sample);
                self.write(&Output::Cursor(cursor))?;
            }
        }
        let signals = self
            .source
            .handle(event)
            .map_err(|e| anyhow!("{} source terminated: {e}", self.source.selection()))?;
        self.emit(&signals)
    }

    fn next_message(&mut self, rx: &Receiver<PipelineMsg>) -> Result<Option<PipelineMsg>> {
        loop {
            let Some(deadline) = self.source.next_deadline() else {
                return Ok(rx.recv().ok());
            };
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(msg) => return Ok(Some(msg)),
                Err(RecvTimeoutError::Timeout) => {
                    let signals = self.source.tick(Instant::now());
                    self.emit(&signals)?;
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }

    /// Drives the source until input ends, shutdown is requested, or the
    /// source fails.
    pub fn run(&mut self, rx: Receiver<PipelineMsg>) -> Result<()> {
        let result = self.drive(&rx);
        self.source.stop();
        self.out.flush()?;
        result
    }

    fn drive(&mut self, rx: &Receiver<PipelineMsg>) -> Result<()> {
        while let Some(msg) = self.next_message(rx)? {
            match msg {
                PipelineMsg::Input(event) => self.on_input(&event)?,
                PipelineMsg::EndOfInput => {
                    info!("input ended after {} signal(s)", self.signals_written);
                    break;
                }
                PipelineMsg::Control(req, reply) => {
                    let shutdown = req == ControlRequest::Shutdown;
                    let resp = self.dispatch(req);
                    let _ = reply.send(resp);
                    if shutdown {
                        break;
                    }
                }
                PipelineMsg::Shutdown => {
                    info!("shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, sync::mpsc, time::Duration};

    fn config(dir: &std::path::Path, profile: &str) -> DaemonConfigState {
        let profiles = dir.join("profiles");
        fs::create_dir_all(&profiles).unwrap();
        fs::write(profiles.join("test.toml"), profile).unwrap();
        DaemonConfigState::load_from(dir.to_path_buf(), Some("test")).unwrap()
    }

    const KEYS: &str = r#"
        [meta]
        [trigger]
        source = "key_fixation"
        [key_fixation]
        lock_on_ms = 100
        complete_ms = 200
    "#;

    fn lines(buf: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(buf)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn feed(tx: &Sender<PipelineMsg>, clock: &Clock, text: &str) {
        for line in text.lines() {
            if let Some(ev) = input::parse_line(line, clock).unwrap() {
                tx.send(PipelineMsg::Input(ev)).unwrap();
            }
        }
    }

    #[test]
    fn replays_a_dwell_into_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        {
            let mut p = Pipeline::new(config(dir.path(), KEYS), None, &mut out).unwrap();
            let (tx, rx) = mpsc::channel();
            let clock = Clock::new();
            let mut text = String::new();
            for t in (0..=300).step_by(50) {
                text.push_str(&format!(
                    "{{\"sample\":{{\"x\":5,\"y\":5,\"target\":\"A\",\"t_ms\":{t}}}}}\n"
                ));
            }
            feed(&tx, &clock, &text);
            tx.send(PipelineMsg::EndOfInput).unwrap();
            p.run(rx).unwrap();
        }
        let out = lines(&out);
        let last = &out[out.len() - 1]["signal"];
        assert_eq!(last["progress"], 0.0);
        let done = &out[out.len() - 2]["signal"];
        assert_eq!(done["edge"], 1);
        assert_eq!(done["context"]["target"], "A");
    }

    #[test]
    fn control_requests_are_answered_in_band() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Pipeline::new(config(dir.path(), KEYS), None, Vec::new()).unwrap();
        let (tx, rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        tx.send(PipelineMsg::Control(ControlRequest::Pause, reply_tx.clone()))
            .unwrap();
        tx.send(PipelineMsg::Control(ControlRequest::Status, reply_tx.clone()))
            .unwrap();
        tx.send(PipelineMsg::Control(ControlRequest::Shutdown, reply_tx))
            .unwrap();
        p.run(rx).unwrap();

        assert_eq!(reply_rx.recv().unwrap()["ok"], true);
        let status = reply_rx.recv().unwrap();
        assert_eq!(status["data"]["state"], "paused");
        assert_eq!(status["data"]["source"], "key_fixation");
        assert_eq!(reply_rx.recv().unwrap()["ok"], true);
        assert_eq!(p.source.state(), RunState::Stopped);
    }

    #[test]
    fn source_failure_ends_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Pipeline::new(config(dir.path(), KEYS), None, Vec::new()).unwrap();
        let (tx, rx) = mpsc::channel();
        let clock = Clock::new();
        feed(
            &tx,
            &clock,
            "{\"sample\":{\"x\":1,\"y\":1,\"t_ms\":500}}\n{\"sample\":{\"x\":1,\"y\":1,\"t_ms\":100}}",
        );
        let err = p.run(rx).unwrap_err();
        assert!(err.to_string().contains("terminated"));
    }

    #[test]
    fn idle_ticks_fire_expiry_resets() {
        let dir = tempfile::tempdir().unwrap();
        let profile = format!("{KEYS}incomplete_ttl_ms = 30\n");
        let mut out = Vec::new();
        {
            let mut p = Pipeline::new(config(dir.path(), &profile), None, &mut out).unwrap();
            let (tx, rx) = mpsc::channel();
            let clock = Clock::starting_at(Instant::now());
            // fixation from 100, interrupted at 150
            feed(
                &tx,
                &clock,
                r#"{"sample":{"x":1,"y":1,"target":"A","t_ms":0}}
                {"sample":{"x":1,"y":1,"target":"A","t_ms":100}}
                {"sample":{"x":1,"y":1,"target":"A","t_ms":120}}
                {"sample":{"x":1,"y":1,"t_ms":150}}"#,
            );
            let ender = thread::spawn(move || {
                thread::sleep(Duration::from_millis(400));
                let _ = tx.send(PipelineMsg::EndOfInput);
            });
            p.run(rx).unwrap();
            ender.join().unwrap();
        }
        let out = lines(&out);
        assert_eq!(out.last().unwrap()["signal"]["progress"], 0.0);
    }

    #[test]
    fn smoothing_writes_cursor_lines() {
        let dir = tempfile::tempdir().unwrap();
        let profile = format!("{KEYS}[smoothing]\nenabled = true\n");
        let mut out = Vec::new();
        {
            let mut p = Pipeline::new(config(dir.path(), &profile), None, &mut out).unwrap();
            let (tx, rx) = mpsc::channel();
            feed(
                &tx,
                &Clock::new(),
                r#"{"sample":{"x":10,"y":20,"t_ms":0}}"#,
            );
            tx.send(PipelineMsg::EndOfInput).unwrap();
            p.run(rx).unwrap();
        }
        let out = lines(&out);
        assert_eq!(out[0]["cursor"]["x"], 10.0);
        assert_eq!(out[0]["cursor"]["y"], 20.0);
    }
}
