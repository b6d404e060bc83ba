use crate::metrics::round_to;
use crate::models::{KpiRecord, Trend};
use chrono::{DateTime, Utc};
use rand::Rng;

const SEED_START_RATIO: f64 = 0.8;

/// Draws a multiplicative step in `[-variation / 2, variation / 2)`.
pub fn draw_step<R: Rng + ?Sized>(rng: &mut R, variation: f64) -> f64 {
    (rng.random::<f64>() - 0.5) * variation
}

pub fn perturb<R: Rng + ?Sized>(rng: &mut R, value: f64, variation: f64) -> f64 {
    round_to(value * (1.0 + draw_step(rng, variation)), 2)
}

pub fn push_bounded(history: &mut Vec<f64>, value: f64, cap: usize) {
    history.push(value);
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

/// Moves a KPI to `next`, keeping `previous_value`, `trend` and the history
/// window consistent with each other.
pub fn apply_reading(kpi: &mut KpiRecord, next: f64, cap: usize, now: DateTime<Utc>) {
    kpi.previous_value = kpi.value;
    kpi.value = next;
    kpi.trend = Trend::between(kpi.previous_value, next);
    push_bounded(&mut kpi.history, next, cap);
    kpi.last_updated = now;
}

pub fn advance_all<R: Rng + ?Sized>(kpis: &mut [KpiRecord], rng: &mut R, variation: f64, cap: usize) {
    let now = Utc::now();
    for kpi in kpis.iter_mut() {
        let next = perturb(rng, kpi.value, variation);
        apply_reading(kpi, next, cap, now);
    }
}

/// Random walk that ends in the neighbourhood of `value`, used to give a new
/// KPI a non-trivial trend line.
pub fn synthesize_history<R: Rng + ?Sized>(rng: &mut R, value: f64, length: usize, variation: f64) -> Vec<f64> {
    let mut current = value * SEED_START_RATIO;
    let mut points = Vec::with_capacity(length);
    for _ in 0..length {
        current *= 1.0 + draw_step(rng, variation);
        points.push(round_to(current, 2));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::{advance_all, apply_reading, perturb, push_bounded, synthesize_history};
    use crate::models::{KpiRecord, Trend};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(value: f64, history: Vec<f64>) -> KpiRecord {
        KpiRecord {
            id: "1".to_string(),
            name: "Revenue".to_string(),
            category: "Financial".to_string(),
            unit: "$".to_string(),
            value,
            previous_value: value,
            trend: Trend::Stable,
            target: None,
            history,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn perturbation_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let next = perturb(&mut rng, 1_000.0, 0.05);
            assert!((975.0..=1_025.0).contains(&next), "{next}");
        }
    }

    #[test]
    fn zero_value_stays_zero_and_stable() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut kpis = vec![record(0.0, vec![0.0])];
        advance_all(&mut kpis, &mut rng, 0.1, 30);
        assert_eq!(kpis[0].value, 0.0);
        assert_eq!(kpis[0].trend, Trend::Stable);
    }

    #[test]
    fn history_never_exceeds_cap() {
        let mut history = (0..30).map(f64::from).collect::<Vec<_>>();
        push_bounded(&mut history, 99.0, 30);
        assert_eq!(history.len(), 30);
        assert_eq!(history[0], 1.0);
        assert_eq!(history[29], 99.0);

        let mut short = vec![1.0];
        push_bounded(&mut short, 2.0, 30);
        assert_eq!(short, vec![1.0, 2.0]);
    }

    #[test]
    fn apply_reading_sets_trend_from_sign() {
        let mut kpi = record(10.0, vec![10.0]);
        apply_reading(&mut kpi, 12.0, 30, Utc::now());
        assert_eq!((kpi.previous_value, kpi.value, kpi.trend), (10.0, 12.0, Trend::Up));
        apply_reading(&mut kpi, 11.0, 30, Utc::now());
        assert_eq!(kpi.trend, Trend::Down);
        apply_reading(&mut kpi, 11.0, 30, Utc::now());
        assert_eq!(kpi.trend, Trend::Stable);
        assert_eq!(kpi.history, vec![10.0, 12.0, 11.0, 11.0]);
    }

    #[test]
    fn repeated_ticks_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut kpis = vec![record(125_000.0, vec![125_000.0; 30]), record(3.2, vec![3.2; 5])];
        for _ in 0..100 {
            let before = kpis.iter().map(|kpi| kpi.value).collect::<Vec<_>>();
            advance_all(&mut kpis, &mut rng, 0.05, 30);
            for (kpi, old) in kpis.iter().zip(before) {
                assert!(kpi.history.len() <= 30);
                assert_eq!(kpi.previous_value, old);
                assert_eq!(kpi.trend, Trend::between(old, kpi.value));
                assert_eq!(kpi.history.last().copied(), Some(kpi.value));
            }
        }
    }

    #[test]
    fn synthesized_history_walks_from_eighty_percent() {
        let mut rng = StdRng::seed_from_u64(9);
        let history = synthesize_history(&mut rng, 200.0, 30, 0.2);
        assert_eq!(history.len(), 30);
        assert!((144.0..=176.0).contains(&history[0]), "{}", history[0]);
        for pair in history.windows(2) {
            let ratio = pair[1] / pair[0];
            assert!((0.89..=1.11).contains(&ratio), "{ratio}");
        }
    }

    #[test]
    fn negative_readings_are_not_clamped() {
        let mut kpi = record(5.0, vec![5.0]);
        apply_reading(&mut kpi, -3.5, 30, Utc::now());
        assert_eq!(kpi.value, -3.5);
        assert_eq!(kpi.previous_value, 5.0);
        assert_eq!(kpi.trend, Trend::Down);
        assert_eq!(kpi.history.last().copied(), Some(-3.5));

        let mut rng = StdRng::seed_from_u64(12);
        let mut kpis = vec![kpi];
        advance_all(&mut kpis, &mut rng, 0.05, 30);
        assert!(kpis[0].value < 0.0);
    }
}
