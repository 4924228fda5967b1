// Post-processing of raw similarity scores
//
// A filter sees every defined score together with the pair it belongs to and
// returns the value to record, or `None` to drop the pair from the output.
// The recorded value is usually the score itself (`V = f64`) but may be any
// annotation built from the score and the pair.

/// Transforms, rounds, annotates or drops a raw score.
pub trait ScoreFilter<I, V = f64>: Send + Sync {
    fn apply(&self, score: f64, source: &I, target: &I) -> Option<V>;
}

impl<I, V, F> ScoreFilter<I, V> for F
where
    F: Fn(f64, &I, &I) -> Option<V> + Send + Sync,
{
    fn apply(&self, score: f64, source: &I, target: &I) -> Option<V> {
        self(score, source, target)
    }
}

/// Records every score unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl<I> ScoreFilter<I> for Identity {
    fn apply(&self, score: f64, _source: &I, _target: &I) -> Option<f64> {
        Some(score)
    }
}

/// Round to a fixed number of decimal places (`Round(3)`: 2/3 becomes 0.667).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round(pub u32);

impl Round {
    pub fn round(&self, score: f64) -> f64 {
        let scale = 10f64.powi(self.0 as i32);
        (score * scale).round() / scale
    }
}

impl<I> ScoreFilter<I> for Round {
    fn apply(&self, score: f64, _source: &I, _target: &I) -> Option<f64> {
        Some(self.round(score))
    }
}

/// Keep only scores strictly above the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinScore(pub f64);

impl<I> ScoreFilter<I> for MinScore {
    fn apply(&self, score: f64, _source: &I, _target: &I) -> Option<f64> {
        (score > self.0).then_some(score)
    }
}

/// Run score filters in order; the first `None` drops the pair.
pub struct Chain<I> {
    filters: Vec<Box<dyn ScoreFilter<I>>>,
}

impl<I> Chain<I> {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    pub fn then(mut self, filter: impl ScoreFilter<I> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl<I> Default for Chain<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> ScoreFilter<I> for Chain<I> {
    fn apply(&self, score: f64, source: &I, target: &I) -> Option<f64> {
        self.filters
            .iter()
            .try_fold(score, |value, filter| filter.apply(value, source, target))
    }
}
