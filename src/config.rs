use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::sample::TargetId;
use crate::trigger::SourceSelection;
use crate::trigger::digital::MouseButton;

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSettings {
    pub source: SourceSelection,
    #[serde(default = "default_screen_width")]
    pub screen_width: f64,
    #[serde(default = "default_screen_height")]
    pub screen_height: f64,
}

fn default_screen_width() -> f64 {
    1920.0
}

fn default_screen_height() -> f64 {
    1080.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyFixationSettings {
    pub lock_on_ms: u64,
    pub complete_ms: u64,
    pub incomplete_ttl_ms: u64,
    pub resume_requires_lock_on: bool,
    /// Per-target completion times used when no override applies.
    pub complete_times: HashMap<TargetId, u64>,
    pub overrides: Vec<OverrideSettings>,
    pub disabled: Vec<TargetId>,
}

impl Default for KeyFixationSettings {
    fn default() -> Self {
        Self {
            lock_on_ms: 250,
            complete_ms: 1000,
            incomplete_ttl_ms: 3000,
            resume_requires_lock_on: true,
            complete_times: HashMap::new(),
            overrides: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideSettings {
    pub target: TargetId,
    pub lock_on_ms: Option<u64>,
    #[serde(default)]
    pub completion_ms: Vec<u64>,
    pub lock_down_ms: Option<u64>,
    pub lock_down_attempt_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PointFixationSettings {
    pub lock_on_ms: u64,
    pub lock_on_radius: f64,
    pub fixation_radius: f64,
    pub complete_ms: u64,
}

impl Default for PointFixationSettings {
    fn default() -> Self {
        Self {
            lock_on_ms: 250,
            lock_on_radius: 20.0,
            fixation_radius: 40.0,
            complete_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Relative paths resolve against the config directory.
    pub file: PathBuf,
    pub watch: bool,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from("gestures.toml"),
            watch: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigitalSettings {
    pub keyboard_key: Option<String>,
    pub mouse_button: Option<MouseButton>,
    pub gamepad_button: Option<String>,
    pub gamepad_repeat: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    pub enabled: bool,
    pub damping: f64,
    pub fixation_radius: f64,
    pub lock_radius: f64,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            damping: 0.5,
            fixation_radius: 40.0,
            lock_radius: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    pub trigger: TriggerSettings,
    #[serde(default)]
    pub key_fixation: KeyFixationSettings,
    #[serde(default)]
    pub point_fixation: PointFixationSettings,
    #[serde(default)]
    pub gestures: GestureSettings,
    #[serde(default)]
    pub digital: DigitalSettings,
    #[serde(default)]
    pub smoothing: SmoothingSettings,
}

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[derive(Debug, Clone)]
pub struct DaemonConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("dwellctl"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

fn default_gestures_text() -> &'static str {
    include_str!("../profiles/gestures.toml")
}

impl DaemonConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir()?;
        Self::load_from(cfgdir, None)
    }

    /// Loads `name` instead of the profile the active pointer names.
    pub fn load_named(name: &str) -> Result<Self> {
        let cfgdir = config_dir()?;
        Self::load_from(cfgdir, Some(name))
    }

    pub fn load_from(cfgdir: PathBuf, name: Option<&str>) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }
        let gestures_path = cfgdir.join("gestures.toml");
        if !gestures_path.exists() {
            fs::write(&gestures_path, default_gestures_text())?;
            info!("installed default gestures at {}", gestures_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = match name {
            Some(n) => n.to_string(),
            None => fs::read_to_string(&active_ptr)?.trim().to_string(),
        };
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn gestures_path(&self) -> PathBuf {
        let file = &self.profile.gestures.file;
        if file.is_absolute() {
            file.clone()
        } else {
            self.config_dir.join(file)
        }
    }
}

fn load_profile(profiles_dir: &Path, name: &str) -> Result<Profile> {
    let path = profiles_dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    parse_profile(&txt).map_err(|e| anyhow!("failed to load {}: {e}", path.display()))
}

pub fn parse_profile(txt: &str) -> Result<Profile> {
    let profile: Profile = toml::from_str(txt)?;
    validate_profile(&profile)?;
    Ok(profile)
}

fn validate_profile(p: &Profile) -> Result<()> {
    if p.trigger.screen_width <= 0.0 || p.trigger.screen_height <= 0.0 {
        return Err(anyhow!("trigger.screen_width/height must be positive"));
    }

    let k = &p.key_fixation;
    if k.lock_on_ms == 0 || k.complete_ms == 0 || k.incomplete_ttl_ms == 0 {
        return Err(anyhow!("key_fixation durations must be positive"));
    }
    if let Some((t, _)) = k.complete_times.iter().find(|(_, v)| **v == 0) {
        return Err(anyhow!("key_fixation.complete_times.{t} must be positive"));
    }
    for o in &k.overrides {
        if o.completion_ms.contains(&0) || o.lock_on_ms == Some(0) || o.lock_down_ms == Some(0) {
            return Err(anyhow!("override for '{}' has a zero duration", o.target));
        }
        // lock-down only counts repeats, and only completion sequences repeat
        if o.lock_down_ms.is_some() && o.completion_ms.is_empty() {
            return Err(anyhow!(
                "override for '{}' sets lock_down_ms without completion_ms",
                o.target
            ));
        }
    }

    let pf = &p.point_fixation;
    if pf.lock_on_ms == 0 || pf.complete_ms == 0 {
        return Err(anyhow!("point_fixation durations must be positive"));
    }
    if pf.lock_on_radius <= 0.0 || pf.fixation_radius < pf.lock_on_radius {
        return Err(anyhow!(
            "point_fixation radii must satisfy 0 < lock_on_radius <= fixation_radius"
        ));
    }

    let s = &p.smoothing;
    if !(0.0..=1.0).contains(&s.damping) {
        return Err(anyhow!("smoothing.damping must be in [0,1]"));
    }
    if s.lock_radius < 0.0 || s.fixation_radius < s.lock_radius {
        return Err(anyhow!(
            "smoothing radii must satisfy 0 <= lock_radius <= fixation_radius"
        ));
    }
    Ok(())
}
