use crate::reading::Reading;

/// Append-only buffer of every reading received since the last reset.
///
/// The four sequences are kept private so they can only grow together through
/// [`SampleStore::push`] and shrink together through [`SampleStore::reset`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleStore {
    index: Vec<usize>,
    temperature: Vec<f64>,
    conductance: Vec<f64>,
    heart_rate: Vec<f64>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one reading. The index of a sample is its 1-based position since the
    /// last reset.
    pub fn push(&mut self, reading: Reading) {
        self.index.push(self.index.len() + 1);
        self.temperature.push(reading.temperature);
        self.conductance.push(reading.conductance);
        self.heart_rate.push(reading.heart_rate);
    }

    pub fn reset(&mut self) {
        self.index.clear();
        self.temperature.clear();
        self.conductance.clear();
        self.heart_rate.clear();
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Most recent reading, if any.
    pub fn latest(&self) -> Option<Reading> {
        let last = self.len().checked_sub(1)?;
        Some(Reading::new(
            self.temperature[last],
            self.conductance[last],
            self.heart_rate[last],
        ))
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    pub fn conductance(&self) -> &[f64] {
        &self.conductance
    }

    pub fn heart_rate(&self) -> &[f64] {
        &self.heart_rate
    }

    #[cfg(test)]
    fn lengths(&self) -> [usize; 4] {
        [
            self.index.len(),
            self.temperature.len(),
            self.conductance.len(),
            self.heart_rate.len(),
        ]
    }
}
