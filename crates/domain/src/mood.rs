//! Mood-driven interval jitter
//!
//! A cosmetic layer that makes posting times look less mechanical: the wait
//! chosen by the interval policy is scaled by the time of day (circadian
//! energy), a drifting emotional state, and gaussian noise. The posting cycle
//! never lets this shorten a backoff.

use std::f64::consts::PI;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::model::{Platform, PlatformResult};
use crate::ports::{Clock, IntervalJitter};

/// Standard deviation of the multiplicative noise
const NOISE_STDDEV: f64 = 0.15;
/// Chance per cycle that the emotion drifts on its own
const DRIFT_CHANCE: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Curious,
    Content,
    Excited,
    Tired,
    Frustrated,
    Proud,
    Anxious,
    Peaceful,
    Playful,
    Reflective,
}

impl Emotion {
    /// Scale applied to the interval; below 1.0 posts sooner
    pub fn interval_modifier(self) -> f64 {
        match self {
            Emotion::Excited => 0.7,
            Emotion::Tired => 1.5,
            Emotion::Curious => 0.8,
            Emotion::Content => 1.0,
            Emotion::Frustrated => 0.9,
            Emotion::Peaceful => 1.2,
            Emotion::Playful => 0.75,
            Emotion::Reflective => 1.3,
            Emotion::Anxious => 0.85,
            Emotion::Proud => 0.95,
        }
    }

    /// Emotions this one can drift into
    pub fn neighbours(self) -> [Emotion; 3] {
        use Emotion::*;
        match self {
            Curious => [Excited, Content, Playful],
            Content => [Peaceful, Curious, Reflective],
            Excited => [Curious, Tired, Proud],
            Tired => [Reflective, Peaceful, Frustrated],
            Frustrated => [Curious, Tired, Anxious],
            Proud => [Content, Curious, Excited],
            Anxious => [Curious, Tired, Reflective],
            Peaceful => [Content, Reflective, Curious],
            Playful => [Curious, Excited, Content],
            Reflective => [Peaceful, Content, Curious],
        }
    }
}

/// Part of the day, keyed by local hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircadianPhase {
    Dawn,
    Morning,
    Noon,
    Afternoon,
    Dusk,
    Evening,
    Night,
}

impl CircadianPhase {
    pub fn at_hour(hour: u8) -> Self {
        match hour {
            5..=8 => CircadianPhase::Dawn,
            9..=11 => CircadianPhase::Morning,
            12..=13 => CircadianPhase::Noon,
            14..=16 => CircadianPhase::Afternoon,
            17..=19 => CircadianPhase::Dusk,
            20..=22 => CircadianPhase::Evening,
            _ => CircadianPhase::Night,
        }
    }

    /// Energy in (0, 1]; low energy stretches the interval
    pub fn energy(self) -> f64 {
        match self {
            CircadianPhase::Dawn => 0.7,
            CircadianPhase::Morning => 1.0,
            CircadianPhase::Noon => 0.85,
            CircadianPhase::Afternoon => 0.75,
            CircadianPhase::Dusk => 0.6,
            CircadianPhase::Evening => 0.4,
            CircadianPhase::Night => 0.2,
        }
    }
}

/// Snapshot fed into [`vary_interval`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodState {
    pub emotion: Emotion,
    pub phase: CircadianPhase,
}

/// `base * emotion modifier / energy * noise`, saturating at `Duration::MAX`
pub fn vary_interval(base: Duration, mood: MoodState, noise: f64) -> Duration {
    let factor = mood.emotion.interval_modifier() / mood.phase.energy() * noise;
    Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Stateful jitter with a clock-driven circadian phase and a drifting emotion
pub struct Soul {
    clock: Arc<dyn Clock>,
    utc_offset: UtcOffset,
    state: Mutex<SoulState>,
}

struct SoulState {
    emotion: Emotion,
    rng: StdRng,
}

impl Soul {
    /// `seed` makes drift and noise reproducible
    pub fn new(clock: Arc<dyn Clock>, utc_offset: UtcOffset, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            clock,
            utc_offset,
            state: Mutex::new(SoulState {
                emotion: Emotion::Curious,
                rng,
            }),
        }
    }

    pub fn phase(&self) -> CircadianPhase {
        let hour = self.clock.now().to_offset(self.utc_offset).hour();
        CircadianPhase::at_hour(hour)
    }

    pub fn mood(&self) -> MoodState {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        MoodState {
            emotion: state.emotion,
            phase: self.phase(),
        }
    }
}

impl IntervalJitter for Soul {
    fn vary(&self, interval: Duration, results: &[(Platform, PlatformResult)]) -> Duration {
        let phase = self.phase();
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());

        if !results.is_empty() {
            state.emotion = if results.iter().any(|(_, r)| r.is_success()) {
                Emotion::Proud
            } else {
                Emotion::Frustrated
            };
        }

        if state.rng.gen_bool(DRIFT_CHANCE) {
            let options = state.emotion.neighbours();
            state.emotion = options[state.rng.gen_range(0..options.len())];
        }

        let noise = gaussian_noise(&mut state.rng);
        let mood = MoodState {
            emotion: state.emotion,
            phase,
        };
        let varied = vary_interval(interval, mood, noise);

        tracing::debug!(
            emotion = ?mood.emotion,
            phase = ?mood.phase,
            noise,
            varied_secs = varied.as_secs(),
            "Mood applied to interval"
        );

        varied
    }
}

/// Normal(1.0, NOISE_STDDEV) via Box-Muller, clamped to [0.5, 1.5]
fn gaussian_noise(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    (1.0 + NOISE_STDDEV * z).clamp(0.5, 1.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use time::macros::datetime;

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(CircadianPhase::at_hour(4), CircadianPhase::Night);
        assert_eq!(CircadianPhase::at_hour(5), CircadianPhase::Dawn);
        assert_eq!(CircadianPhase::at_hour(9), CircadianPhase::Morning);
        assert_eq!(CircadianPhase::at_hour(13), CircadianPhase::Noon);
        assert_eq!(CircadianPhase::at_hour(14), CircadianPhase::Afternoon);
        assert_eq!(CircadianPhase::at_hour(19), CircadianPhase::Dusk);
        assert_eq!(CircadianPhase::at_hour(22), CircadianPhase::Evening);
        assert_eq!(CircadianPhase::at_hour(23), CircadianPhase::Night);
    }

    #[test]
    fn test_vary_interval_formula() {
        let mood = MoodState {
            emotion: Emotion::Content,
            phase: CircadianPhase::Morning,
        };
        assert_eq!(
            vary_interval(Duration::from_secs(100), mood, 1.0),
            Duration::from_secs(100)
        );

        let tired_night = MoodState {
            emotion: Emotion::Tired,
            phase: CircadianPhase::Night,
        };
        // 1.5 / 0.2 = 7.5
        assert_eq!(
            vary_interval(Duration::from_secs(100), tired_night, 1.0).as_secs(),
            750
        );
    }

    #[test]
    fn test_vary_interval_saturates_on_overflow() {
        let mood = MoodState {
            emotion: Emotion::Tired,
            phase: CircadianPhase::Night,
        };
        let huge = Duration::from_secs(u64::MAX / 4);
        assert_eq!(vary_interval(huge, mood, 1.5), Duration::MAX);
    }

    #[test]
    fn test_soul_uses_offset_for_phase() {
        let clock = Arc::new(FixedClock(datetime!(2026-03-01 08:30 UTC)));
        let soul = Soul::new(clock, UtcOffset::from_hms(2, 0, 0).unwrap(), Some(7));
        assert_eq!(soul.phase(), CircadianPhase::Morning);
    }

    #[test]
    fn test_soul_reacts_to_outcomes() {
        let clock = Arc::new(FixedClock(datetime!(2026-03-01 10:00 UTC)));
        let soul = Soul::new(clock, UtcOffset::UTC, Some(1));

        soul.vary(
            Duration::from_secs(60),
            &[(Platform::Twitter, PlatformResult::failed("boom"))],
        );
        let after_failure = soul.mood().emotion;
        assert!(
            after_failure == Emotion::Frustrated
                || Emotion::Frustrated.neighbours().contains(&after_failure)
        );

        soul.vary(
            Duration::from_secs(60),
            &[(Platform::Twitter, PlatformResult::success("1"))],
        );
        let after_success = soul.mood().emotion;
        assert!(
            after_success == Emotion::Proud
                || Emotion::Proud.neighbours().contains(&after_success)
        );
    }

    #[test]
    fn test_seeded_soul_is_reproducible() {
        let run = || {
            let clock = Arc::new(FixedClock(datetime!(2026-03-01 15:00 UTC)));
            let soul = Soul::new(clock, UtcOffset::UTC, Some(42));
            (0..5)
                .map(|_| soul.vary(Duration::from_secs(3600), &[]))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_noise_is_clamped() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            let noise = gaussian_noise(&mut rng);
            assert!((0.5..=1.5).contains(&noise));
        }
    }
}
