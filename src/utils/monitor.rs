use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub since_start: Duration,
    pub since_last: Duration,
}

struct MonitorState {
    system: System,
    last_checkpoint: Instant,
    peak_memory_mb: u64,
    phases: Vec<PhaseStats>,
}

/// Records CPU and memory of the current process at named phases of a fetch:
/// `resolve` (options and paths), `download` (raw file present) and `process`
/// (processed or recipe data loaded). A disabled monitor records nothing.
pub struct ResourceMonitor {
    state: Option<Mutex<MonitorState>>,
    pid: Option<Pid>,
    start: Instant,
}

impl ResourceMonitor {
    pub fn new(enabled: bool) -> Self {
        let start = Instant::now();
        let pid = sysinfo::get_current_pid().ok();
        if !enabled || pid.is_none() {
            if enabled {
                tracing::warn!("Resource monitoring unavailable: cannot resolve current PID");
            }
            return Self {
                state: None,
                pid: None,
                start,
            };
        }

        let mut system = System::new();
        system.refresh_memory();

        Self {
            state: Some(Mutex::new(MonitorState {
                system,
                last_checkpoint: start,
                peak_memory_mb: 0,
                phases: Vec::new(),
            })),
            pid,
            start,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    /// 記錄一個階段的資源使用
    pub fn checkpoint(&self, phase: &str) -> Option<PhaseStats> {
        let pid = self.pid?;
        let mut state = self.state.as_ref()?.lock().ok()?;

        state.system.refresh_memory();
        state.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        let (cpu_usage, memory_mb) = {
            let process = state.system.process(pid)?;
            (process.cpu_usage(), process.memory() / 1024 / 1024)
        };

        let now = Instant::now();
        let stats = PhaseStats {
            phase: phase.to_string(),
            cpu_usage,
            memory_mb,
            since_start: now.duration_since(self.start),
            since_last: now.duration_since(state.last_checkpoint),
        };
        state.last_checkpoint = now;
        state.peak_memory_mb = state.peak_memory_mb.max(memory_mb);
        state.phases.push(stats.clone());

        tracing::info!(
            "📊 {} - CPU: {:.1}%, Memory: {}MB, Phase time: {:?}",
            phase,
            stats.cpu_usage,
            stats.memory_mb,
            stats.since_last
        );
        Some(stats)
    }

    pub fn peak_memory_mb(&self) -> Option<u64> {
        let state = self.state.as_ref()?.lock().ok()?;
        Some(state.peak_memory_mb)
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        self.state
            .as_ref()
            .and_then(|s| s.lock().ok().map(|s| s.phases.clone()))
            .unwrap_or_default()
    }

    pub fn log_summary(&self) {
        if let Some(peak) = self.peak_memory_mb() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB, Phases: {}",
                self.start.elapsed(),
                peak,
                self.phases().len()
            );
        }
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
