use rand::Rng;
use std::fmt;

use crate::error::TbResult;
use crate::model::{self, Phase, SinCos, Validity, VALIDITY_LEN};

/// Origin of the sin/cos values carried by an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trig {
    /// Derived from the item's phase by the reference table.
    Predicted(SinCos),
    /// Written back from what the DUT returned.
    Observed(SinCos),
}

impl Trig {
    pub fn value(&self) -> SinCos {
        match *self {
            Trig::Predicted(v) | Trig::Observed(v) => v,
        }
    }
}

/// Whether `validity` takes part in item comparison. The strobe only describes when the phase was
/// driven, so a captured item may legitimately carry a different vector than the driven one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompareValidity {
    #[default]
    Include,
    Ignore,
}

#[derive(Clone, Debug)]
pub struct StimulusItem {
    name: String,
    phase: Phase,
    validity: Validity,
    trig: Trig,
}

impl StimulusItem {
    pub fn new(name: &str, phase: Phase, validity: Validity) -> Self {
        Self {
            name: name.to_string(),
            phase,
            validity,
            trig: predicted(phase),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Reassigning the phase drops any observed values.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.trig = predicted(phase);
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn set_validity(&mut self, validity: Validity) -> TbResult<()> {
        validity.check()?;
        self.validity = validity;
        Ok(())
    }

    pub fn sin(&self) -> i16 {
        self.trig.value().sin
    }

    pub fn cos(&self) -> i16 {
        self.trig.value().cos
    }

    pub fn trig(&self) -> Trig {
        self.trig
    }

    /// Turns the item into a result-carrying transaction.
    pub fn set_observed(&mut self, result: SinCos) {
        self.trig = Trig::Observed(result);
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self.trig, Trig::Observed(_))
    }

    pub fn randomize_phase(&mut self, rng: &mut impl Rng) {
        self.set_phase(Phase::random(rng));
    }

    pub fn randomize_validity(&mut self, rng: &mut impl Rng) {
        self.validity = Validity::random(rng, VALIDITY_LEN);
    }

    pub fn randomize(&mut self, rng: &mut impl Rng) {
        self.randomize_phase(rng);
        self.randomize_validity(rng);
    }

    pub fn matches(&self, other: &Self, validity: CompareValidity) -> bool {
        self.phase == other.phase
            && (validity == CompareValidity::Ignore || self.validity == other.validity)
            && self.trig.value() == other.trig.value()
    }
}

fn predicted(phase: Phase) -> Trig {
    Trig::Predicted(SinCos::new(model::sin_value(phase), model::cos_value(phase)))
}

impl PartialEq for StimulusItem {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other, CompareValidity::Include)
    }
}

impl fmt::Display for StimulusItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : phase: {}, phase_v: {}, sin: {}, cos: {}",
            self.name,
            self.phase,
            self.validity,
            self.sin(),
            self.cos()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn item(phase: u32, pos: usize) -> StimulusItem {
        StimulusItem::new("tr", Phase::new(phase).unwrap(), Validity::at(5, pos).unwrap())
    }

    #[test]
    fn values_follow_phase() {
        let mut it = item(0, 0);
        assert_eq!((it.sin(), it.cos()), (0, 32767));
        it.set_phase(Phase::new(1024).unwrap());
        assert_eq!((it.sin(), it.cos()), (32767, 0));
        assert!(!it.is_overridden());
    }

    #[test]
    fn observed_values_replace_prediction_until_phase_changes() {
        let mut it = item(5, 1);
        it.set_observed(SinCos::new(1, 2));
        assert!(it.is_overridden());
        assert_eq!((it.sin(), it.cos()), (1, 2));
        it.set_phase(Phase::new(5).unwrap());
        assert!(matches!(it.trig(), Trig::Predicted(_)));
        assert_eq!(it, item(5, 1));
    }

    #[test]
    fn equality_policy_for_validity() {
        let a = item(100, 0);
        let b = item(100, 3);
        assert_ne!(a, b);
        assert!(a.matches(&b, CompareValidity::Ignore));
        let mut c = item(100, 0);
        c.set_observed(SinCos::new(0, 0));
        assert!(!a.matches(&c, CompareValidity::Ignore));
    }

    #[test]
    fn randomize_keeps_item_consistent() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut it = item(0, 0);
        it.randomize(&mut rng);
        assert!(it.validity().check().is_ok());
        assert_eq!(it.sin(), model::direct_sin(it.phase()));
        assert!(it.set_validity(Validity::OneHot(vec![1, 1])).is_err());
    }
}
