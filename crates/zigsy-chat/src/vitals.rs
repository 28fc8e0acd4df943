//! System vitals for the "status" directive.

use sysinfo::System;

use crate::error::ChatError;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub cpu_percent: f32,
    pub ram_used_mb: u64,
    pub ram_total_mb: u64,
    pub ram_free_mb: u64,
}

impl Vitals {
    pub fn report(&self) -> String {
        format!(
            "── SYSTEM VITALS ──────────────────\n\
             CPU:      {:.1}% used\n\
             RAM:      {} MB used / {} MB total ({} MB free)\n\
             ───────────────────────────────────",
            self.cpu_percent, self.ram_used_mb, self.ram_total_mb, self.ram_free_mb
        )
    }
}

/// Source of [`Vitals`]. Sampling may block for a moment, so callers run it
/// on a blocking thread.
pub trait VitalsProbe: Send + Sync {
    fn sample(&self) -> Result<Vitals, ChatError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoVitals;

impl VitalsProbe for SysinfoVitals {
    fn sample(&self) -> Result<Vitals, ChatError> {
        let mut sys = System::new();

        // CPU usage is a delta between two refreshes.
        sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        vitals_from(
            sys.global_cpu_usage(),
            sys.total_memory(),
            sys.used_memory(),
            sys.available_memory(),
        )
    }
}

/// Build [`Vitals`] from raw byte counts. A zero total means the platform
/// gave no memory figures.
fn vitals_from(cpu_percent: f32, total: u64, used: u64, available: u64) -> Result<Vitals, ChatError> {
    if total == 0 {
        return Err(ChatError::VitalsUnavailable(
            "memory information missing".to_string(),
        ));
    }

    Ok(Vitals {
        cpu_percent,
        ram_used_mb: used / MB,
        ram_total_mb: total / MB,
        ram_free_mb: available / MB,
    })
}
