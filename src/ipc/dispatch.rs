use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::Write;

use super::pipeline::Pipeline;
use crate::trigger::SourceKind;

/// One request on the control socket, e.g. `{"op":"use","profile":"mouse"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    Status,
    Pause,
    Resume,
    Reload,
    Use { profile: String },
    List,
    Shutdown,
}

fn ok(data: Value) -> Value {
    json!({"ok": true, "data": data})
}

fn failed(e: impl std::fmt::Display) -> Value {
    json!({"ok": false, "error": e.to_string()})
}

impl<W: Write> Pipeline<W> {
    pub(super) fn dispatch(&mut self, req: ControlRequest) -> Value {
        match req {
            ControlRequest::Status => ok(self.status()),
            ControlRequest::Pause => {
                self.source.pause();
                ok(json!({"state": self.source.state().as_str()}))
            }
            ControlRequest::Resume => {
                self.source.resume();
                // the cursor was not followed while paused
                if let Some(filter) = self.filter.as_mut() {
                    filter.reset();
                }
                ok(json!({"state": self.source.state().as_str()}))
            }
            ControlRequest::Reload => {
                let previous = self.cfg.clone();
                match self.cfg.reload().and_then(|_| self.rebuild()) {
                    Ok(()) => ok(json!({"active_profile": self.cfg.active_name})),
                    Err(e) => {
                        warn!("reload failed, keeping '{}': {e}", previous.active_name);
                        self.cfg = previous;
                        failed(e)
                    }
                }
            }
            ControlRequest::Use { profile } => match self.switch(&profile) {
                Ok(()) => ok(json!({"active_profile": self.cfg.active_name})),
                Err(e) => {
                    warn!("cannot switch to '{profile}': {e}");
                    failed(e)
                }
            },
            ControlRequest::List => ok(json!({
                "profiles": self.cfg.list_profiles(),
                "active": self.cfg.active_name,
            })),
            ControlRequest::Shutdown => {
                info!("shutdown requested over the control socket");
                ok(json!("shutting down"))
            }
        }
    }

    /// Activates `profile`. If its source cannot be built the previous
    /// profile stays active, on disk too.
    fn switch(&mut self, profile: &str) -> Result<()> {
        let previous = self.cfg.active_name.clone();
        self.cfg.set_active(profile)?;
        if let Err(e) = self.rebuild() {
            self.cfg.set_active(&previous)?;
            return Err(e);
        }
        Ok(())
    }

    fn status(&self) -> Value {
        let gestures = match self.source.kind() {
            SourceKind::Gestures(engine) => Some(engine.gestures().len()),
            _ => None,
        };
        json!({
            "state": self.source.state().as_str(),
            "source": self.source.selection().as_str(),
            "active_profile": self.cfg.active_name,
            "profile_name": self.cfg.profile.meta.name,
            "smoothing": self.filter.is_some(),
            "gestures": gestures,
            "signals": self.signals_written,
            "socket": self.socket,
        })
    }
}
