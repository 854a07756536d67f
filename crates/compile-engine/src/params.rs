//! Parameter and expression evaluation with unit discipline.
//!
//! Expressions are typed `{length, angle, count}`. Lengths canonicalize to
//! millimeters, angles to radians. A unitless literal is a count until
//! context promotes it; promotion to length interprets the value in the
//! document's unit system, promotion to angle takes it as radians.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use trueform_types::{BinOp, Expr, Overrides, ParamDef, ParamType, UnitSystem};

use crate::error::CompileError;

/// A parameter reduced to a canonical scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedParam {
    pub value: f64,
    #[serde(rename = "type")]
    pub ty: ParamType,
}

/// Evaluated parameters keyed by id.
pub type ParamTable = BTreeMap<String, EvaluatedParam>;

/// A typed scalar mid-evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scalar {
    pub value: f64,
    pub kind: ParamType,
}

/// Evaluates a part's parameter table and any expression against it.
#[derive(Debug)]
pub(crate) struct Evaluator<'a> {
    defs: BTreeMap<&'a str, &'a ParamDef>,
    overrides: &'a Overrides,
    units: UnitSystem,
    evaluated: ParamTable,
    visiting: BTreeSet<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        params: &'a [ParamDef],
        overrides: &'a Overrides,
        units: UnitSystem,
    ) -> Result<Self, CompileError> {
        let mut defs: BTreeMap<&str, &ParamDef> = BTreeMap::new();
        for def in params {
            if defs.insert(def.id.as_str(), def).is_some() {
                return Err(CompileError::ParamDuplicate {
                    id: def.id.clone(),
                });
            }
        }
        for id in overrides.keys() {
            if !defs.contains_key(id.as_str()) {
                return Err(CompileError::ParamOverrideMissing { id: id.clone() });
            }
        }
        Ok(Self {
            defs,
            overrides,
            units,
            evaluated: ParamTable::new(),
            visiting: BTreeSet::new(),
        })
    }

    /// Force every declared parameter, in declaration order.
    pub fn evaluate_all(&mut self, params: &[ParamDef]) -> Result<(), CompileError> {
        for def in params {
            self.param(&def.id)?;
        }
        Ok(())
    }

    pub fn into_table(self) -> ParamTable {
        self.evaluated
    }

    fn param(&mut self, id: &str) -> Result<Scalar, CompileError> {
        if let Some(p) = self.evaluated.get(id) {
            return Ok(Scalar {
                value: p.value,
                kind: p.ty,
            });
        }
        if self.visiting.contains(id) {
            return Err(CompileError::ParamCycle { id: id.to_string() });
        }
        let def = *self
            .defs
            .get(id)
            .ok_or_else(|| CompileError::ParamMissing { id: id.to_string() })?;

        self.visiting.insert(id.to_string());
        let expr = self
            .overrides
            .get(id)
            .map(|o| o.as_expr())
            .unwrap_or_else(|| def.value.clone());
        let raw = self.eval(&expr)?;
        let coerced = self.coerce(raw, def.ty, id)?;
        self.visiting.remove(id);

        self.evaluated.insert(
            id.to_string(),
            EvaluatedParam {
                value: coerced.value,
                ty: coerced.kind,
            },
        );
        Ok(coerced)
    }

    /// Evaluate an arbitrary expression against the parameter context.
    pub fn eval(&mut self, expr: &Expr) -> Result<Scalar, CompileError> {
        match expr {
            Expr::Literal { value, unit } => Ok(match unit {
                Some(u) if u.is_length() => Scalar {
                    value: value * u.canonical_factor(),
                    kind: ParamType::Length,
                },
                Some(u) => Scalar {
                    value: value * u.canonical_factor(),
                    kind: ParamType::Angle,
                },
                None => Scalar {
                    value: *value,
                    kind: ParamType::Count,
                },
            }),
            Expr::Param { id } => self.param(id),
            Expr::Neg { value } => {
                let s = self.eval(value)?;
                Ok(Scalar {
                    value: -s.value,
                    kind: s.kind,
                })
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.binary(*op, l, r)
            }
        }
    }

    /// Coerce a scalar to the expected type. A count promotes to either
    /// dimensioned type; dimensioned scalars never cross over.
    pub fn coerce(
        &self,
        s: Scalar,
        expected: ParamType,
        context: &str,
    ) -> Result<Scalar, CompileError> {
        if s.kind == expected {
            return Ok(s);
        }
        if s.kind == ParamType::Count {
            return Ok(Scalar {
                value: self.promote(s.value, expected),
                kind: expected,
            });
        }
        Err(CompileError::ParamTypeMismatch {
            id: context.to_string(),
            message: format!("expected {:?}, found {:?}", expected, s.kind),
        })
    }

    /// Promote a bare count into a dimensioned type.
    fn promote(&self, value: f64, to: ParamType) -> f64 {
        match to {
            ParamType::Length => value * self.units.length_unit().canonical_factor(),
            ParamType::Angle | ParamType::Count => value,
        }
    }

    fn binary(&self, op: BinOp, l: Scalar, r: Scalar) -> Result<Scalar, CompileError> {
        use ParamType::{Angle, Count, Length};
        match op {
            BinOp::Add | BinOp::Sub => {
                let (lv, rv, kind) = match (l.kind, r.kind) {
                    (a, b) if a == b => (l.value, r.value, a),
                    (Count, other) => (self.promote(l.value, other), r.value, other),
                    (other, Count) => (l.value, self.promote(r.value, other), other),
                    (Length, Angle) | (Angle, Length) => {
                        return Err(CompileError::ParamUnitMismatch {
                            message: "cannot add or subtract length and angle".to_string(),
                        });
                    }
                    _ => unreachable!("all kind pairs covered"),
                };
                let value = if op == BinOp::Add { lv + rv } else { lv - rv };
                Ok(Scalar { value, kind })
            }
            BinOp::Mul => match (l.kind, r.kind) {
                (Count, other) => Ok(Scalar {
                    value: l.value * r.value,
                    kind: other,
                }),
                (other, Count) => Ok(Scalar {
                    value: l.value * r.value,
                    kind: other,
                }),
                _ => Err(CompileError::ParamUnitMismatch {
                    message: "multiplication requires at least one count operand".to_string(),
                }),
            },
            BinOp::Div => {
                if r.kind != Count {
                    return Err(CompileError::ParamUnitMismatch {
                        message: "divisor must be a count".to_string(),
                    });
                }
                if r.value == 0.0 {
                    return Err(CompileError::ParamDivZero);
                }
                Ok(Scalar {
                    value: l.value / r.value,
                    kind: l.kind,
                })
            }
        }
    }
}
