use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, path::PathBuf};

use crate::config::DaemonConfigState;
use crate::gestures::{FileGestures, GestureProvider};
use crate::ipc::{self, ControlRequest, RunOptions};
use crate::trigger::{SourceKind, SourceSelection, TriggerSource};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("run") => {
            let opts = RunOptions {
                profile: pargs.opt_value_from_str("--profile")?,
                source: source_arg(&mut pargs)?,
                input: pargs.opt_value_from_str::<_, PathBuf>("--input")?,
            };
            ipc::run_daemon(opts)
        }

        Some("check") => {
            let profile: Option<String> = pargs.opt_value_from_str("--profile")?;
            let source = source_arg(&mut pargs)?;
            check(profile.as_deref(), source)
        }

        Some("stop") => request(&ControlRequest::Shutdown),
        Some("status") => request(&ControlRequest::Status),
        Some("pause") => request(&ControlRequest::Pause),
        Some("resume") => request(&ControlRequest::Resume),
        Some("reload") => request(&ControlRequest::Reload),
        Some("list") => request(&ControlRequest::List),

        Some("use") => {
            let profile: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: dwellctl use <profile_name>"))?;
            request(&ControlRequest::Use { profile })
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn source_arg(pargs: &mut Arguments) -> Result<Option<SourceSelection>> {
    let raw: Option<String> = pargs.opt_value_from_str("--source")?;
    Ok(raw.map(|s| s.parse::<SourceSelection>()).transpose()?)
}

fn request(req: &ControlRequest) -> Result<()> {
    let r = ipc::client_request(req)?;
    print_response(&r);
    Ok(())
}

/// Loads a profile and builds its source without starting anything.
fn check(profile: Option<&str>, source: Option<SourceSelection>) -> Result<()> {
    let cfg = match profile {
        Some(name) => DaemonConfigState::load_named(name)?,
        None => DaemonConfigState::load_or_install_default()?,
    };
    let selection = source.unwrap_or(cfg.profile.trigger.source);
    let provider: Option<Box<dyn GestureProvider>> = match selection {
        SourceSelection::Gestures => Some(Box::new(FileGestures::new(cfg.gestures_path()))),
        _ => None,
    };
    let src = TriggerSource::from_profile(&cfg.profile, selection, provider)?;

    println!("profile '{}': ok ({} source)", cfg.active_name, selection);
    if let SourceKind::Gestures(engine) = src.kind() {
        let gestures = engine.gestures();
        if gestures.is_empty() {
            return Err(anyhow!(
                "no gestures loaded from {}",
                cfg.gestures_path().display()
            ));
        }
        for g in gestures {
            let state = if g.enabled { "" } else { " (disabled)" };
            println!("  gesture '{}': {} step(s){state}", g.name, g.steps.len());
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"dwellctl: dwell and gaze trigger daemon

USAGE:
  dwellctl help [command]                 Show general or command-specific help
  dwellctl run [--profile N] [--source S] [--input FILE]
                                          Run the trigger pipeline in the foreground
  dwellctl check [--profile N] [--source S]
                                          Validate a profile and its gesture file
  dwellctl stop                           Stop the running pipeline
  dwellctl status                         Show pipeline state
  dwellctl pause                          Withhold trigger signals
  dwellctl resume                         Emit trigger signals again
  dwellctl reload                         Reload active profile
  dwellctl use <name>                     Switch active profile
  dwellctl list                           List profiles

SOURCES:
  key_fixation, point_fixation, gestures, keyboard, mouse, gamepad

TIPS:
  - Input is JSON lines on stdin: {{"sample":{{"x":..,"y":..,"target":"A"}}}}
  - Profiles: ~/.config/dwellctl/profiles
  - Active profile pointer: ~/.config/dwellctl/active
  - RUST_LOG=debug shows fixation transitions on stderr
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "run" => println!(
            "usage: dwellctl run [--profile N] [--source S] [--input FILE]\nReads samples and edges as JSON lines (stdin unless --input) and writes trigger signals to stdout."
        ),
        "check" => println!(
            "usage: dwellctl check [--profile N] [--source S]\nLoads the profile, builds its trigger source and lists loaded gestures."
        ),
        "stop" => println!("usage: dwellctl stop\nStops the running pipeline."),
        "status" => println!(
            "usage: dwellctl status\nShows run state, source, active profile, signal count, socket."
        ),
        "pause" => println!(
            "usage: dwellctl pause\nKeeps tracking input but withholds signals until resume."
        ),
        "resume" => println!("usage: dwellctl resume\nEmits signals again after pause."),
        "reload" => println!(
            "usage: dwellctl reload\nReloads the current profile; keeps last good on error."
        ),
        "use" => {
            println!("usage: dwellctl use <name>\nSwitches active profile to <name> and reloads.")
        }
        "list" => println!("usage: dwellctl list\nLists available profiles and the active one."),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
