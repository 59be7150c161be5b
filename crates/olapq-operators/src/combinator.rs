//! Slice-wise combination of several underlying measures.
//!
//! Every underlying is evaluated at the parent's own filter and group-by, so
//! columns align slice by slice. A slice present in no underlying is absent
//! from the output; a combination that yields null is not written either.

use std::collections::BTreeSet;

use olapq_core::measure::{Combination, Combinator, Measure};
use olapq_core::step::Step;
use olapq_core::types::{MeasureValue, Scalar, Slice, SliceColumn};

use crate::aggregate::{add_scalars, mul_scalars, sub_scalars, to_f64};
use crate::traits::{OpError, Transformator};

pub struct CombinatorOp {
    def: Combinator,
}

impl CombinatorOp {
    pub fn new(def: Combinator) -> Self {
        Self { def }
    }

    fn combine(&self, values: &[Scalar]) -> Result<Scalar, OpError> {
        let non_null = || values.iter().filter(|v| !v.is_null());
        let out = match self.def.combination {
            Combination::Sum => fold(non_null(), add_scalars)?,
            Combination::Product => fold(non_null(), mul_scalars)?,
            Combination::Max => non_null()
                .max_by(|a, b| a.total_cmp(b))
                .cloned()
                .unwrap_or(Scalar::Null),
            Combination::Min => non_null()
                .min_by(|a, b| a.total_cmp(b))
                .cloned()
                .unwrap_or(Scalar::Null),
            Combination::Coalesce => non_null().next().cloned().unwrap_or(Scalar::Null),
            Combination::Difference => match values.split_first() {
                Some((first, _)) if first.is_null() => Scalar::Null,
                Some((first, rest)) => {
                    let mut acc = first.clone();
                    for v in rest.iter().filter(|v| !v.is_null()) {
                        acc = sub_scalars(&acc, v)?;
                    }
                    acc
                }
                None => Scalar::Null,
            },
            Combination::Ratio => match values {
                [num, den] if !num.is_null() && !den.is_null() => {
                    let den = to_f64(den)?;
                    if den == 0.0 {
                        Scalar::Null
                    } else {
                        Scalar::F64(to_f64(num)? / den)
                    }
                }
                _ => Scalar::Null,
            },
        };
        Ok(out)
    }
}

fn fold<'a>(
    mut values: impl Iterator<Item = &'a Scalar>,
    op: fn(&Scalar, &Scalar) -> Result<Scalar, OpError>,
) -> Result<Scalar, OpError> {
    let Some(first) = values.next() else {
        return Ok(Scalar::Null);
    };
    let mut acc = first.clone();
    for v in values {
        acc = op(&acc, v)?;
    }
    Ok(acc)
}

impl Transformator for CombinatorOp {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn underlying_steps(&self, step: &Step) -> Result<Vec<Step>, OpError> {
        if self.def.underlyings.is_empty() {
            return Err(OpError::Definition {
                measure: self.def.name.clone(),
                reason: "a combinator needs at least one underlying".into(),
            });
        }
        if self.def.combination == Combination::Ratio && self.def.underlyings.len() != 2 {
            return Err(OpError::Definition {
                measure: self.def.name.clone(),
                reason: format!(
                    "ratio takes exactly 2 underlyings, got {}",
                    self.def.underlyings.len()
                ),
            });
        }
        Ok(self
            .def
            .underlyings
            .iter()
            .map(|name| step.with_measure(Measure::reference(name.clone())))
            .collect())
    }

    fn produce_column(
        &self,
        _step: &Step,
        underlyings: &[&SliceColumn],
    ) -> Result<SliceColumn, OpError> {
        let slices: BTreeSet<&Slice> = underlyings.iter().flat_map(|c| c.slices()).collect();

        let mut out = SliceColumn::new();
        for slice in slices {
            let mut values = Vec::with_capacity(underlyings.len());
            let mut failure = None;
            for column in underlyings {
                match column.get(slice) {
                    Some(MeasureValue::Error { error }) => failure = Some(error.clone()),
                    Some(v) => values.push(v.to_scalar()),
                    None => values.push(Scalar::Null),
                }
            }
            // An underlying that failed as data poisons the slice.
            if let Some(error) = failure {
                out.insert(slice.clone(), MeasureValue::Error { error });
                continue;
            }
            let combined = self.combine(&values).map_err(|e| {
                OpError::Exec(format!("combining '{}' at {}: {}", self.def.name, slice, e))
            })?;
            if !combined.is_null() {
                out.insert(slice.clone(), MeasureValue::Scalar(combined));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olapq_core::filter::Filter;
    use olapq_core::step::GroupBy;
    use olapq_core::types::Coordinate;

    fn op(combination: Combination, n: usize) -> CombinatorOp {
        let names: Vec<String> = (0..n).map(|i| format!("u{i}")).collect();
        match Measure::combinator("c", names, combination) {
            Measure::Combinator(def) => CombinatorOp::new(def),
            _ => unreachable!(),
        }
    }

    fn col(pairs: &[(&str, Scalar)]) -> SliceColumn {
        pairs
            .iter()
            .map(|(k, v)| {
                (
                    Slice::from_pairs([("g", Coordinate::from(*k))]),
                    MeasureValue::Scalar(v.clone()),
                )
            })
            .collect()
    }

    fn step() -> Step {
        Step::new(Measure::reference("c"), Filter::MatchAll, GroupBy::of(["g"]))
    }

    #[test]
    fn declares_references_in_order_with_duplicates() {
        let def = match Measure::combinator("c", ["a", "a", "b"], Combination::Sum) {
            Measure::Combinator(def) => def,
            _ => unreachable!(),
        };
        let steps = CombinatorOp::new(def).underlying_steps(&step()).unwrap();
        let names: Vec<&str> = steps.iter().map(|s| s.measure_name()).collect();
        assert_eq!(names, ["a", "a", "b"]);
        assert!(steps.iter().all(|s| s.group_by == GroupBy::of(["g"])));
    }

    #[test]
    fn max_over_union_of_slices() {
        let a = col(&[("x", Scalar::I64(10)), ("y", Scalar::I64(1))]);
        let b = col(&[("x", Scalar::I64(7)), ("z", Scalar::I64(3))]);
        let out = op(Combination::Max, 2)
            .produce_column(&step(), &[&a, &b])
            .unwrap();
        assert_eq!(out.len(), 3);
        let x = Slice::from_pairs([("g", Coordinate::from("x"))]);
        assert_eq!(out.get(&x), Some(&MeasureValue::Scalar(Scalar::I64(10))));
    }

    #[test]
    fn ratio_skips_zero_denominators() {
        let num = col(&[("x", Scalar::I64(1)), ("y", Scalar::I64(1))]);
        let den = col(&[("x", Scalar::I64(4)), ("y", Scalar::I64(0))]);
        let out = op(Combination::Ratio, 2)
            .produce_column(&step(), &[&num, &den])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(op(Combination::Ratio, 3).underlying_steps(&step()).is_err());
    }

    #[test]
    fn difference_and_strings() {
        let a = col(&[("x", Scalar::I64(10))]);
        let b = col(&[("x", Scalar::I64(4))]);
        let out = op(Combination::Difference, 2)
            .produce_column(&step(), &[&a, &b])
            .unwrap();
        let x = Slice::from_pairs([("g", Coordinate::from("x"))]);
        assert_eq!(out.get(&x), Some(&MeasureValue::Scalar(Scalar::I64(6))));

        let s = col(&[("x", Scalar::Str("oops".into()))]);
        assert!(op(Combination::Sum, 2).produce_column(&step(), &[&a, &s]).is_err());
    }
}
