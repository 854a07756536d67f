use serde::{Deserialize, Serialize};

/// Axis-aligned direction token. The only axis tokens the IR accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxisDir {
    #[serde(rename = "+X")]
    PosX,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "+Y")]
    PosY,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "+Z")]
    PosZ,
    #[serde(rename = "-Z")]
    NegZ,
}

impl AxisDir {
    pub fn token(self) -> &'static str {
        match self {
            AxisDir::PosX => "+X",
            AxisDir::NegX => "-X",
            AxisDir::PosY => "+Y",
            AxisDir::NegY => "-Y",
            AxisDir::PosZ => "+Z",
            AxisDir::NegZ => "-Z",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "+X" => Some(AxisDir::PosX),
            "-X" => Some(AxisDir::NegX),
            "+Y" => Some(AxisDir::PosY),
            "-Y" => Some(AxisDir::NegY),
            "+Z" => Some(AxisDir::PosZ),
            "-Z" => Some(AxisDir::NegZ),
            _ => None,
        }
    }

    pub fn vector(self) -> [f64; 3] {
        match self {
            AxisDir::PosX => [1.0, 0.0, 0.0],
            AxisDir::NegX => [-1.0, 0.0, 0.0],
            AxisDir::PosY => [0.0, 1.0, 0.0],
            AxisDir::NegY => [0.0, -1.0, 0.0],
            AxisDir::PosZ => [0.0, 0.0, 1.0],
            AxisDir::NegZ => [0.0, 0.0, -1.0],
        }
    }
}

/// Filter predicate applied to candidate selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    /// Candidate must carry `planar: true` metadata.
    Planar,
    /// Candidate's `normal` metadata must equal the axis token.
    Normal { axis: AxisDir },
    /// Candidate's `createdBy` metadata must equal the feature id.
    CreatedBy { feature: String },
    /// Candidate's `role` metadata must equal the role string.
    Role { role: String },
}

impl Predicate {
    /// Sort key used by selector canonicalization. Predicates are a
    /// conjunction, so reordering them never changes which candidates pass.
    pub fn canonical_key(&self) -> (u8, String) {
        match self {
            Predicate::Planar => (0, String::new()),
            Predicate::Normal { axis } => (1, axis.token().to_string()),
            Predicate::CreatedBy { feature } => (2, feature.clone()),
            Predicate::Role { role } => (3, role.clone()),
        }
    }
}

/// Ranking rule applied after predicate filtering. Rules apply in author
/// order; each narrows the candidate set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RankRule {
    MaxArea,
    MaxZ,
    MinZ,
    ClosestTo { selector: Box<Selector> },
}

/// A declarative query over kernel-produced topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selector {
    Face {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        predicates: Vec<Predicate>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        rank: Vec<RankRule>,
    },
    Edge {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        predicates: Vec<Predicate>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        rank: Vec<RankRule>,
    },
    Solid {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        predicates: Vec<Predicate>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        rank: Vec<RankRule>,
    },
    /// A named output key (`body:main`) or, pre-canonicalization, a
    /// comma-separated selection-id list (`edge:7, edge:9`).
    Named { name: String },
    /// Canonical list form of a selection-id list.
    Ids { ids: Vec<String> },
}

/// Reserved named-output prefixes. A `named` selector whose name starts with
/// one of these must match a declared feature output.
pub const OUTPUT_PREFIXES: [&str; 4] = ["body:", "surface:", "profile:", "datum:"];

/// Kinds a selection-id token may carry.
const SELECTION_ID_KINDS: [&str; 4] = ["face", "edge", "solid", "surface"];

/// True when `token` is a syntactically valid selection id (`edge:7`).
pub fn is_selection_id(token: &str) -> bool {
    match token.split_once(':') {
        Some((kind, rest)) => {
            SELECTION_ID_KINDS.contains(&kind)
                && !rest.is_empty()
                && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        None => false,
    }
}

/// Split a comma-separated selection-id list. Returns None unless every
/// token is a valid selection id.
pub fn parse_selection_id_list(name: &str) -> Option<Vec<String>> {
    let tokens: Vec<String> = name
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() || !tokens.iter().all(|t| is_selection_id(t)) {
        return None;
    }
    Some(tokens)
}

/// True when `name` claims to be a declared feature output rather than a
/// raw selection-id list.
pub fn is_output_name(name: &str) -> bool {
    OUTPUT_PREFIXES.iter().any(|p| name.starts_with(p)) && parse_selection_id_list(name).is_none()
}

impl Selector {
    pub fn predicates(&self) -> &[Predicate] {
        match self {
            Selector::Face { predicates, .. }
            | Selector::Edge { predicates, .. }
            | Selector::Solid { predicates, .. } => predicates,
            Selector::Named { .. } | Selector::Ids { .. } => &[],
        }
    }

    pub fn rank(&self) -> &[RankRule] {
        match self {
            Selector::Face { rank, .. }
            | Selector::Edge { rank, .. }
            | Selector::Solid { rank, .. } => rank,
            Selector::Named { .. } | Selector::Ids { .. } => &[],
        }
    }

    /// True for the predicate-based forms that need an anchor.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Selector::Face { .. } | Selector::Edge { .. } | Selector::Solid { .. }
        )
    }

    /// True when this selector or a nested `closestTo` selector carries a
    /// `createdBy` predicate (which anchors it to a feature).
    pub fn has_created_by(&self) -> bool {
        let direct = self
            .predicates()
            .iter()
            .any(|p| matches!(p, Predicate::CreatedBy { .. }));
        let nested = self.rank().iter().any(|r| match r {
            RankRule::ClosestTo { selector } => selector.has_created_by(),
            _ => false,
        });
        direct || nested
    }

    /// Every feature id referenced by `createdBy` predicates, including
    /// those inside nested `closestTo` selectors.
    pub fn created_by_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for p in self.predicates() {
            if let Predicate::CreatedBy { feature } = p {
                out.push(feature.as_str());
            }
        }
        for r in self.rank() {
            if let RankRule::ClosestTo { selector } = r {
                out.extend(selector.created_by_refs());
            }
        }
        out
    }

    /// Every named-output name referenced by this selector, including
    /// nested `closestTo` selectors.
    pub fn named_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Selector::Named { name } => out.push(name.as_str()),
            Selector::Face { rank, .. }
            | Selector::Edge { rank, .. }
            | Selector::Solid { rank, .. } => {
                for r in rank {
                    if let RankRule::ClosestTo { selector } = r {
                        out.extend(selector.named_refs());
                    }
                }
            }
            Selector::Ids { .. } => {}
        }
        out
    }
}
