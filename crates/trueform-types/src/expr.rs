use serde::{Deserialize, Serialize};

/// Unit attached to a literal. Lengths and angles carry explicit units;
/// a literal without a unit is a bare count until context promotes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "mm")]
    Mm,
    #[serde(rename = "cm")]
    Cm,
    #[serde(rename = "m")]
    M,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "rad")]
    Rad,
    #[serde(rename = "deg")]
    Deg,
}

impl Unit {
    /// Conversion factor into canonical units (millimeters / radians).
    pub fn canonical_factor(self) -> f64 {
        match self {
            Unit::Mm => 1.0,
            Unit::Cm => 10.0,
            Unit::M => 1000.0,
            Unit::In => 25.4,
            Unit::Rad => 1.0,
            Unit::Deg => std::f64::consts::PI / 180.0,
        }
    }

    pub fn is_length(self) -> bool {
        matches!(self, Unit::Mm | Unit::Cm | Unit::M | Unit::In)
    }

    pub fn is_angle(self) -> bool {
        matches!(self, Unit::Rad | Unit::Deg)
    }
}

/// The document's declared length-unit system. Unitless literals promoted
/// to length are interpreted in this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    #[serde(rename = "mm")]
    Mm,
    #[serde(rename = "cm")]
    Cm,
    #[serde(rename = "m")]
    M,
    #[serde(rename = "in")]
    In,
}

impl UnitSystem {
    pub fn length_unit(self) -> Unit {
        match self {
            UnitSystem::Mm => Unit::Mm,
            UnitSystem::Cm => Unit::Cm,
            UnitSystem::M => Unit::M,
            UnitSystem::In => Unit::In,
        }
    }
}

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

/// A symbolic scalar expression. Parameters reference each other by id and
/// must form a DAG; evaluation happens once per build during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expr {
    Literal {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<Unit>,
    },
    Param {
        id: String,
    },
    Neg {
        value: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// A unitless literal.
    pub fn lit(value: f64) -> Self {
        Expr::Literal { value, unit: None }
    }

    /// A literal with an explicit unit.
    pub fn lit_unit(value: f64, unit: Unit) -> Self {
        Expr::Literal {
            value,
            unit: Some(unit),
        }
    }

    /// True when the expression is already a unitless literal (the shape
    /// normalization inlines every expression into).
    pub fn is_inlined(&self) -> bool {
        matches!(self, Expr::Literal { unit: None, .. })
    }
}

/// The declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamType {
    Length,
    Angle,
    Count,
}

/// A named parameter declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub id: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub value: Expr,
}

/// An override supplied at build time. A bare number is a unitless literal;
/// an expression is evaluated in the part's parameter context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamOverride {
    Number(f64),
    Expr(Expr),
}

impl ParamOverride {
    pub fn as_expr(&self) -> Expr {
        match self {
            ParamOverride::Number(v) => Expr::lit(*v),
            ParamOverride::Expr(e) => e.clone(),
        }
    }
}
