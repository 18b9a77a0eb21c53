//! Rule References
//!
//! Typed form of the `pattern:` / `type:` / `subcategory:` / `category:`
//! strings operators use to name an allow or block target.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::types::AgentSignature;

// ============================================================================
// RULE REF
// ============================================================================

/// A four-level rule target, most specific first
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleRef {
    /// Exact signature pattern
    Pattern(String),
    /// category / subcategory / type
    Type {
        category: String,
        subcategory: String,
        agent_type: String,
    },
    /// category / subcategory
    Subcategory {
        category: String,
        subcategory: String,
    },
    /// Whole category
    Category(String),
}

impl RuleRef {
    pub fn pattern_of(agent: &AgentSignature) -> Self {
        RuleRef::Pattern(agent.pattern.clone())
    }

    pub fn type_of(agent: &AgentSignature) -> Self {
        RuleRef::Type {
            category: agent.category.clone(),
            subcategory: agent.subcategory.clone(),
            agent_type: agent.agent_type.clone(),
        }
    }

    pub fn subcategory_of(agent: &AgentSignature) -> Self {
        RuleRef::Subcategory {
            category: agent.category.clone(),
            subcategory: agent.subcategory.clone(),
        }
    }

    pub fn category_of(agent: &AgentSignature) -> Self {
        RuleRef::Category(agent.category.clone())
    }

    /// Ancestors of an agent, most specific first (type, subcategory, category)
    pub fn ancestors_of(agent: &AgentSignature) -> [RuleRef; 3] {
        [
            Self::type_of(agent),
            Self::subcategory_of(agent),
            Self::category_of(agent),
        ]
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RuleRef::Pattern(_) => "pattern",
            RuleRef::Type { .. } => "type",
            RuleRef::Subcategory { .. } => "subcategory",
            RuleRef::Category(_) => "category",
        }
    }

    /// Parse the tagged string form
    pub fn parse(raw: &str) -> Result<Self, RuleParseError> {
        let raw = raw.trim();
        let (kind, rest) = raw
            .split_once(':')
            .ok_or_else(|| RuleParseError::MissingKind(raw.to_string()))?;

        if rest.is_empty() {
            return Err(RuleParseError::EmptyTarget(raw.to_string()));
        }

        match kind {
            // Patterns are regexes and may contain ':' themselves
            "pattern" => Ok(RuleRef::Pattern(rest.to_string())),
            "type" => {
                let parts: Vec<&str> = rest.splitn(3, ':').collect();
                match parts.as_slice() {
                    [category, subcategory, agent_type]
                        if !category.is_empty() && !subcategory.is_empty() && !agent_type.is_empty() =>
                    {
                        Ok(RuleRef::Type {
                            category: category.to_string(),
                            subcategory: subcategory.to_string(),
                            agent_type: agent_type.to_string(),
                        })
                    }
                    _ => Err(RuleParseError::WrongArity {
                        raw: raw.to_string(),
                        expected: 3,
                    }),
                }
            }
            "subcategory" => match rest.split_once(':') {
                Some((category, subcategory)) if !category.is_empty() && !subcategory.is_empty() => {
                    Ok(RuleRef::Subcategory {
                        category: category.to_string(),
                        subcategory: subcategory.to_string(),
                    })
                }
                _ => Err(RuleParseError::WrongArity {
                    raw: raw.to_string(),
                    expected: 2,
                }),
            },
            "category" => Ok(RuleRef::Category(rest.to_string())),
            other => Err(RuleParseError::UnknownKind(other.to_string())),
        }
    }

    /// Parse a list, dropping entries that do not parse
    pub fn parse_all<'a, I>(raw: I) -> Vec<RuleRef>
    where
        I: IntoIterator<Item = &'a str>,
    {
        raw.into_iter()
            .filter_map(|s| match RuleRef::parse(s) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    log::warn!("Ignoring rule reference: {}", e);
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Display for RuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleRef::Pattern(p) => write!(f, "pattern:{}", p),
            RuleRef::Type {
                category,
                subcategory,
                agent_type,
            } => write!(f, "type:{}:{}:{}", category, subcategory, agent_type),
            RuleRef::Subcategory {
                category,
                subcategory,
            } => write!(f, "subcategory:{}:{}", category, subcategory),
            RuleRef::Category(c) => write!(f, "category:{}", c),
        }
    }
}

impl std::str::FromStr for RuleRef {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleRef::parse(s)
    }
}

impl Serialize for RuleRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RuleRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RuleRef::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    MissingKind(String),
    UnknownKind(String),
    EmptyTarget(String),
    WrongArity { raw: String, expected: usize },
}

impl std::fmt::Display for RuleParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKind(raw) => write!(f, "'{}' has no rule kind prefix", raw),
            Self::UnknownKind(kind) => write!(f, "unknown rule kind '{}'", kind),
            Self::EmptyTarget(raw) => write!(f, "'{}' names no target", raw),
            Self::WrongArity { raw, expected } => {
                write!(f, "'{}' needs {} ':'-separated parts", raw, expected)
            }
        }
    }
}

impl std::error::Error for RuleParseError {}

// ============================================================================
// TESTS
// ============================================================================
