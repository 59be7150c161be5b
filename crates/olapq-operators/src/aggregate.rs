//! Aggregation kernels and scalar arithmetic.
//!
//! Integers stay integers until they overflow or meet a float; then the
//! result widens to `F64`. Nulls are ignored by every kernel.

use olapq_core::measure::Aggregation;
use olapq_core::types::{Carrier, MeasureValue, Scalar};

use crate::traits::OpError;

/// Running state of one leaf aggregation for one slice.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Count(u64),
    Sum(Option<Scalar>),
    Min(Option<Scalar>),
    Max(Option<Scalar>),
    Avg { sum: f64, count: u64 },
}

impl Accumulator {
    pub fn new(aggregation: Aggregation) -> Self {
        match aggregation {
            Aggregation::Count => Accumulator::Count(0),
            Aggregation::Sum => Accumulator::Sum(None),
            Aggregation::Min => Accumulator::Min(None),
            Aggregation::Max => Accumulator::Max(None),
            Aggregation::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
        }
    }

    pub fn add(&mut self, value: &Scalar) -> Result<(), OpError> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Sum(acc) => {
                *acc = Some(match acc.take() {
                    None => numeric(value)?,
                    Some(prev) => add_scalars(&prev, value)?,
                });
            }
            Accumulator::Min(acc) => {
                if acc.as_ref().map_or(true, |cur| value.total_cmp(cur).is_lt()) {
                    *acc = Some(value.clone());
                }
            }
            Accumulator::Max(acc) => {
                if acc.as_ref().map_or(true, |cur| value.total_cmp(cur).is_gt()) {
                    *acc = Some(value.clone());
                }
            }
            Accumulator::Avg { sum, count } => {
                *sum += to_f64(value)?;
                *count += 1;
            }
        }
        Ok(())
    }

    /// Final value; `None` when nothing was aggregated (sparse output).
    pub fn finish(self) -> Option<MeasureValue> {
        match self {
            Accumulator::Count(n) => Some(MeasureValue::Scalar(Scalar::I64(n as i64))),
            Accumulator::Sum(v) | Accumulator::Min(v) | Accumulator::Max(v) => {
                v.map(MeasureValue::Scalar)
            }
            Accumulator::Avg { count: 0, .. } => None,
            Accumulator::Avg { sum, count } => {
                Some(MeasureValue::Carrier(Carrier::Avg { sum, count }))
            }
        }
    }
}

fn numeric(v: &Scalar) -> Result<Scalar, OpError> {
    match v {
        Scalar::I64(_) | Scalar::F64(_) => Ok(v.clone()),
        other => Err(OpError::Exec(format!("expected a number, got '{other}'"))),
    }
}

pub fn to_f64(v: &Scalar) -> Result<f64, OpError> {
    v.as_f64()
        .ok_or_else(|| OpError::Exec(format!("expected a number, got '{v}'")))
}

pub fn add_scalars(a: &Scalar, b: &Scalar) -> Result<Scalar, OpError> {
    match (a, b) {
        (Scalar::I64(x), Scalar::I64(y)) => Ok(x
            .checked_add(*y)
            .map(Scalar::I64)
            .unwrap_or(Scalar::F64(*x as f64 + *y as f64))),
        _ => Ok(Scalar::F64(to_f64(a)? + to_f64(b)?)),
    }
}

pub fn sub_scalars(a: &Scalar, b: &Scalar) -> Result<Scalar, OpError> {
    match (a, b) {
        (Scalar::I64(x), Scalar::I64(y)) => Ok(x
            .checked_sub(*y)
            .map(Scalar::I64)
            .unwrap_or(Scalar::F64(*x as f64 - *y as f64))),
        _ => Ok(Scalar::F64(to_f64(a)? - to_f64(b)?)),
    }
}

pub fn mul_scalars(a: &Scalar, b: &Scalar) -> Result<Scalar, OpError> {
    match (a, b) {
        (Scalar::I64(x), Scalar::I64(y)) => Ok(x
            .checked_mul(*y)
            .map(Scalar::I64)
            .unwrap_or(Scalar::F64(*x as f64 * *y as f64))),
        _ => Ok(Scalar::F64(to_f64(a)? * to_f64(b)?)),
    }
}
