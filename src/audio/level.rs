// Input level meter for recording feedback
//
// Frames are reduced to RMS, converted to dB, mapped onto a 0..1 range and
// smoothed with a fast attack / slow release so the indicator reacts quickly
// to speech and decays gently in pauses.

const MIN_DB: f32 = -70.0;
const MAX_DB: f32 = -10.0;
const ATTACK: f32 = 0.25;
const RELEASE: f32 = 0.05;
const MIN_RMS: f32 = 1e-8;

pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        .map(|&s| {
            let v = s as f32 / 32768.0;
            v * v
        })
        .sum();
    (sum / samples.len() as f32).sqrt()
}

pub fn rms_to_db(rms: f32) -> f32 {
    20.0 * rms.max(MIN_RMS).log10()
}

pub fn db_to_norm(db: f32) -> f32 {
    if db <= MIN_DB {
        return 0.0;
    }
    if db >= MAX_DB {
        return 1.0;
    }
    (db - MIN_DB) / (MAX_DB - MIN_DB)
}

/// Smoothed, normalized input level
#[derive(Debug, Default, Clone)]
pub struct LevelMeter {
    level: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame and return the smoothed level in 0..=1
    pub fn update(&mut self, samples: &[i16]) -> f32 {
        let norm = db_to_norm(rms_to_db(rms(samples)));
        let alpha = if norm > self.level { ATTACK } else { RELEASE };
        self.level = alpha * norm + (1.0 - alpha) * self.level;
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}
