use indicatif::{ProgressBar, ProgressStyle};
use lcmc::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    phase: Arc<Mutex<PhaseStatus>>,
}

/// Running counters of the phase currently shown.
#[derive(Debug, Default, Clone)]
struct PhaseStatus {
    name: String,
    temperature: f64,
    sweeps: usize,
    energy: Option<f64>,
}

impl PhaseStatus {
    fn message(&self) -> String {
        let energy = self
            .energy
            .map(|e| format!("{e:.4e}"))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} T={} sweeps={} E={}",
            self.name, self.temperature, self.sweeps, energy
        )
    }
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::bar_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            phase: Arc::new(Mutex::new(PhaseStatus::default())),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();
        let phase_clone = self.phase.clone();

        Box::new(move |progress: Progress| {
            let (Ok(mut pb_guard), Ok(mut phase)) = (pb_clone.lock(), phase_clone.lock()) else {
                warn!("Progress state mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name, temperatures } => {
                    *phase = PhaseStatus {
                        name,
                        ..PhaseStatus::default()
                    };
                    pb_guard.reset();
                    pb_guard.set_length(temperatures as u64);
                    pb_guard.set_position(0);
                    pb_guard.set_style(Self::bar_style());
                    pb_guard.set_message(phase.message());
                }
                Progress::TemperatureStart { temperature } => {
                    phase.temperature = temperature;
                    pb_guard.inc(1);
                    pb_guard.set_message(phase.message());
                }
                Progress::SweepFinish { .. } => {
                    phase.sweeps += 1;
                    pb_guard.set_message(phase.message());
                }
                Progress::StateAdopted { energy } => {
                    phase.energy = Some(energy);
                    pb_guard.set_message(phase.message());
                }
                Progress::PhaseFinish => {
                    let length = pb_guard.length().unwrap_or(0);
                    pb_guard.set_position(length);
                    pb_guard.finish_with_message(format!("✓ {} done", phase.name));
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<48} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})")
            .expect("Failed to create bar style template")
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
