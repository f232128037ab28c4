// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal host-application lifecycle: `init`/`progress`/`fini`, plus the
//! handful of CLI flags a frame-stepping host needs (spec §7). Scheduling
//! and threading the actual systems across a frame is an external
//! collaborator's job; this module only owns the world's lifecycle and the
//! frame clock.

use crate::error::{EcsError, Result};
use crate::world::World;

/// Parsed command-line configuration for a running application.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Worker thread count hint for the external scheduler. `None` means
    /// "let the scheduler decide".
    pub threads: Option<usize>,
    /// Target frames per second; `progress` computes a sleep-free delta
    /// when `None`.
    pub target_fps: Option<f32>,
    /// Whether the admin/diagnostics surface should be enabled.
    pub admin: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threads: None,
            target_fps: None,
            admin: false,
        }
    }
}

impl AppConfig {
    /// Parse `--threads N`, `--fps N`, `--admin` out of an argv-shaped
    /// slice (no program-name element, unlike `std::env::args`).
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut config = Self::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--threads" => {
                    let value = args.get(i + 1).ok_or_else(|| {
                        EcsError::ParseError("--threads requires a value".into())
                    })?;
                    config.threads = Some(value.parse().map_err(|_| {
                        EcsError::ParseError(format!("--threads: not a number: `{value}`"))
                    })?);
                    i += 2;
                }
                "--fps" => {
                    let value = args.get(i + 1).ok_or_else(|| {
                        EcsError::ParseError("--fps requires a value".into())
                    })?;
                    config.target_fps = Some(value.parse().map_err(|_| {
                        EcsError::ParseError(format!("--fps: not a number: `{value}`"))
                    })?);
                    i += 2;
                }
                "--admin" => {
                    config.admin = true;
                    i += 1;
                }
                other => {
                    return Err(EcsError::ParseError(format!("unrecognized flag `{other}`")));
                }
            }
        }
        Ok(config)
    }
}

/// Running application: a world plus the config it was started with and
/// the frame count accumulated by `progress`.
pub struct App {
    pub world: World,
    pub config: AppConfig,
    frame_count: u64,
}

impl App {
    /// Build a world and parse `args` into its config (spec §7 `init`).
    pub fn init(args: &[String]) -> Result<Self> {
        let config = AppConfig::parse(args)?;
        Ok(Self {
            world: World::new(),
            config,
            frame_count: 0,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Advance one frame. Returns `false` to request shutdown; this base
    /// implementation never requests it on its own, since picking a quit
    /// condition is the host application's job; it just counts frames and,
    /// when `target_fps` is set, sleeps off the remainder of the frame
    /// budget not already spent on `delta`.
    pub fn progress(&mut self, delta: f32) -> bool {
        self.frame_count += 1;
        if let Some(fps) = self.config.target_fps {
            if fps > 0.0 {
                let budget = 1.0 / fps;
                let remaining = budget - delta;
                if remaining > 0.0 {
                    std::thread::sleep(std::time::Duration::from_secs_f32(remaining));
                }
            }
        }
        true
    }

    /// Tear down the application. Nothing to flush beyond dropping the
    /// world today, but kept as an explicit call so a host never needs to
    /// guess whether shutdown order matters (spec §7 `fini`).
    pub fn fini(self) -> World {
        self.world
    }
}
