use std::fmt;
use std::process::Command;

use crate::error::SwitchError;

/// Compute device the inference models are bound to. Read by the extractor
/// only at (re)initialization, never mid-inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelection {
    Cpu,
    Accelerator(u32),
}

impl fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelection::Cpu => write!(f, "CPU"),
            DeviceSelection::Accelerator(i) => write!(f, "GPU:{}", i),
        }
    }
}

/// Map a position in the device list (CPU first, then accelerators) to a
/// selection.
pub fn device_for_index(index: usize) -> DeviceSelection {
    if index == 0 {
        DeviceSelection::Cpu
    } else {
        DeviceSelection::Accelerator((index - 1) as u32)
    }
}

/// Anything whose model state can be rebuilt against a new device. A failed
/// rebind must leave the previous models intact and usable.
pub trait Rebind {
    fn rebind(&mut self, device: DeviceSelection) -> Result<(), SwitchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Idle(DeviceSelection),
    Switching,
}

/// Device hot-swap state machine. At most one reconfiguration is in flight;
/// a failed switch rolls back to the last-known-good device.
pub struct BackendSelector {
    state: BackendState,
}

impl BackendSelector {
    pub fn new(initial: DeviceSelection) -> Self {
        Self {
            state: BackendState::Idle(initial),
        }
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    pub fn current(&self) -> Option<DeviceSelection> {
        match self.state {
            BackendState::Idle(d) => Some(d),
            BackendState::Switching => None,
        }
    }

    /// Rebuild `target`'s models on `new`. The caller must have paused the
    /// tick loop: no frames may be pulled while this runs. Requesting the
    /// active device is a no-op.
    pub fn switch(
        &mut self,
        target: &mut impl Rebind,
        new: DeviceSelection,
    ) -> Result<(), SwitchError> {
        let previous = match self.state {
            BackendState::Idle(d) if d == new => {
                log::debug!("device {} already active, nothing to do", new);
                return Ok(());
            }
            BackendState::Idle(d) => d,
            BackendState::Switching => return Err(SwitchError::AlreadySwitching),
        };

        self.state = BackendState::Switching;
        match target.rebind(new) {
            Ok(()) => {
                self.state = BackendState::Idle(new);
                log::info!("switched inference device {} -> {}", previous, new);
                Ok(())
            }
            Err(e) => {
                self.state = BackendState::Idle(previous);
                log::error!("device switch to {} failed, staying on {}: {}", new, previous, e);
                Err(e)
            }
        }
    }
}

/// Device identifiers for the UI/CLI: "CPU" first, then GPU names reported by
/// nvidia-smi. A missing or failing nvidia-smi degrades to CPU-only.
pub fn enumerate_devices() -> Vec<String> {
    let mut devices = vec!["CPU".to_string()];

    match Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output()
    {
        Ok(out) if out.status.success() => {
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                let name = line.trim();
                if !name.is_empty() {
                    devices.push(name.to_string());
                }
            }
        }
        Ok(out) => {
            log::warn!(
                "nvidia-smi failed, CPU only: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Err(_) => {
            log::info!("nvidia-smi not found, CPU only");
        }
    }

    devices
}
