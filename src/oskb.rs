//! External OS on-screen keyboard (distinct from the in-process widget)
//!
//! Show/hide are configured subprocess command lines; on Windows the
//! defaults drive `osk.exe`. Platforms without a configured command are
//! no-ops.

use std::process::{Command as Process, Stdio};

use crate::config::OskbConfig;

pub struct SystemKeyboard {
    show: Option<Vec<String>>,
    hide: Option<Vec<String>>,
    visible: bool,
}

impl SystemKeyboard {
    pub fn from_config(cfg: &OskbConfig) -> Self {
        Self {
            show: cfg.show.clone(),
            hide: cfg.hide.clone(),
            visible: false,
        }
    }

    /// Show the OS keyboard. Any stale instance is closed first. Returns
    /// whether a launch was attempted.
    pub fn launch(&mut self) -> bool {
        let Some(show) = self.show.clone() else {
            return false;
        };
        if self.hide.is_some() {
            self.run_blocking_hide();
        }
        if spawn_detached(&show) {
            self.visible = true;
            true
        } else {
            false
        }
    }

    pub fn close(&mut self) -> bool {
        self.visible = false;
        self.run_blocking_hide()
    }

    pub fn toggle(&mut self) -> bool {
        if self.visible {
            self.close();
            false
        } else {
            self.launch()
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn configured(&self) -> bool {
        self.show.is_some() || self.hide.is_some()
    }

    fn run_blocking_hide(&self) -> bool {
        let Some(hide) = &self.hide else {
            return false;
        };
        let Some((program, rest)) = hide.split_first() else {
            return false;
        };
        Process::new(program)
            .args(rest)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

fn spawn_detached(command: &[String]) -> bool {
    let Some((program, rest)) = command.split_first() else {
        return false;
    };
    Process::new(program)
        .args(rest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .is_ok()
}
