use std::time::Instant;

/// Outcome of feeding one CPU-time reading to a [`CpuSampler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CpuReading {
    /// First reading; stored as the baseline, nothing to compare against yet.
    Baseline,
    /// Percent of one CPU used since the previous reading.
    Percent(f64),
}

/// Per-handle CPU percent state.
///
/// Moves from `Unbaselined` to `Baselined` on the first successful reading
/// and never goes back. A new handle starts over at `Unbaselined`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CpuSampler {
    #[default]
    Unbaselined,
    Baselined {
        /// Total CPU seconds at the previous reading
        cpu_seconds: f64,
        at: Instant,
    },
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_baselined(&self) -> bool {
        matches!(self, CpuSampler::Baselined { .. })
    }

    /// Records `cpu_seconds` taken at `now` and compares it with the previous
    /// reading. The result is bounded to `[0, 100 * cpu_count]`.
    pub fn sample(&mut self, cpu_seconds: f64, now: Instant, cpu_count: usize) -> CpuReading {
        let previous = std::mem::replace(self, CpuSampler::Baselined { cpu_seconds, at: now });

        match previous {
            CpuSampler::Unbaselined => CpuReading::Baseline,
            CpuSampler::Baselined { cpu_seconds: last, at } => {
                let wall = now.saturating_duration_since(at).as_secs_f64();
                if wall <= 0.0 {
                    return CpuReading::Percent(0.0);
                }

                let used = (cpu_seconds - last).max(0.0);
                let ceiling = 100.0 * cpu_count.max(1) as f64;
                CpuReading::Percent((used / wall * 100.0).min(ceiling))
            }
        }
    }
}
