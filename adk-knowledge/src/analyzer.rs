//! Query analysis: intent classification, role detection and person-name
//! extraction.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KnowledgeError, Result};

/// Verbs that must precede a role variant for a question to count as a role lookup.
const ROLE_TRIGGERS: &str = "who is|what is|find|get|contact";

/// Words whose presence rules out person-name extraction entirely.
const ROLE_WORDS: [&str; 6] = ["chair", "director", "dean", "head", "advisor", "adviser"];

/// Capitalized words that are never part of a person's name.
const NAME_STOP_WORDS: [&str; 16] = [
    "who",
    "is",
    "the",
    "what",
    "where",
    "tell",
    "me",
    "about",
    "morgan",
    "state",
    "university",
    "computer",
    "science",
    "department",
    "dr",
    "doctor",
];

/// The classified purpose of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryIntent {
    /// "Who is the chair of ...": find the holder of a role.
    RoleQuery,
    /// "Who is Dr. Jane Roe": find a named individual.
    PersonQuery,
    /// Anything else.
    GeneralQuery,
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RoleQuery => "role",
            Self::PersonQuery => "person",
            Self::GeneralQuery => "general",
        };
        f.write_str(name)
    }
}

/// A canonical role with the surface forms that name it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Canonical role name, e.g. `chair`.
    pub name: String,
    /// Surface forms recognised in questions, e.g. `chairperson`.
    pub variants: Vec<String>,
    /// Extra phrases that mark a document line as mentioning this role.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Extra words appended to the question before embedding.
    #[serde(default)]
    pub hints: Vec<String>,
}

impl RoleDefinition {
    /// Create a role with its question variants and no document aliases.
    pub fn new(name: &str, variants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            aliases: Vec::new(),
            hints: Vec::new(),
        }
    }

    /// Add phrases that also mark document lines as role-relevant.
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Add words that widen the embedded query for this role.
    pub fn with_hints(mut self, hints: &[&str]) -> Self {
        self.hints = hints.iter().map(|h| h.to_string()).collect();
        self
    }

    /// Terms that mark text as mentioning this role: the name, then aliases.
    pub fn match_terms(&self) -> Vec<String> {
        std::iter::once(self.name.clone()).chain(self.aliases.iter().cloned()).collect()
    }
}

/// The built-in role table, in tie-break order.
pub fn default_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new("chair", &["chair", "chairperson", "department head"])
            .with_aliases(&["chairperson", "department head"])
            .with_hints(&["head"]),
        RoleDefinition::new("director", &["director", "program director"]),
        RoleDefinition::new("dean", &["dean"]),
        RoleDefinition::new("advisor", &["advisor", "adviser", "advising"]),
    ]
}

/// The result of analysing one question. Consumed by every later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// The classified intent.
    pub intent: QueryIntent,
    /// Canonical role name, for role queries.
    pub role_keyword: Option<String>,
    /// Lowercased person name, for person queries.
    pub person_name: Option<String>,
    /// Role variants, for role queries.
    pub keywords: Vec<String>,
    /// Terms that mark text as mentioning the role, for role queries.
    pub role_terms: Vec<String>,
    /// Intent-specific expansion terms derived from the question wording.
    pub hints: Vec<String>,
}

impl QueryAnalysis {
    /// A general query with no extracted fields.
    pub fn general() -> Self {
        Self {
            intent: QueryIntent::GeneralQuery,
            role_keyword: None,
            person_name: None,
            keywords: Vec::new(),
            role_terms: Vec::new(),
            hints: Vec::new(),
        }
    }

    /// Whether `text` mentions the detected role. Always false for other intents.
    pub fn mentions_role(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.role_terms.iter().any(|term| lower.contains(term.as_str()))
    }

    /// Keywords followed by hints, the words appended to the question before embedding.
    pub fn expansion_terms(&self) -> Vec<&str> {
        self.keywords.iter().chain(&self.hints).map(String::as_str).collect()
    }
}

struct CompiledRole {
    definition: RoleDefinition,
    patterns: Vec<(String, Regex)>,
}

/// Deterministic classifier turning a raw question into a [`QueryAnalysis`].
pub struct QueryAnalyzer {
    roles: Vec<CompiledRole>,
    who_is: Regex,
    doctor: Regex,
}

impl QueryAnalyzer {
    /// Build an analyzer over the given role table.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if a role variant produces an invalid pattern.
    pub fn new(roles: &[RoleDefinition]) -> Result<Self> {
        let roles = roles
            .iter()
            .map(|definition| {
                let patterns = definition
                    .variants
                    .iter()
                    .map(|variant| {
                        let variant = variant.to_lowercase();
                        let pattern = format!(
                            "(?:{ROLE_TRIGGERS}).{{0,20}}(?:the )?{}",
                            regex::escape(&variant)
                        );
                        Ok((variant, compile(&pattern)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledRole { definition: definition.clone(), patterns })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            roles,
            who_is: compile(r"who\s+is\s+(?:dr\.?\s+)?([a-z]+\s+[a-z]+)")?,
            doctor: compile(r"dr\.?\s+([a-z]+\s+[a-z]+)")?,
        })
    }

    /// Classify a question.
    ///
    /// Role detection wins over person detection; the first role in table
    /// order with a matching variant wins over later roles.
    pub fn analyze(&self, question: &str) -> QueryAnalysis {
        let q = question.to_lowercase();

        for role in &self.roles {
            for (variant, pattern) in &role.patterns {
                if q.contains(variant.as_str()) && pattern.is_match(&q) {
                    debug!(role = %role.definition.name, "role query detected");
                    return QueryAnalysis {
                        intent: QueryIntent::RoleQuery,
                        role_keyword: Some(role.definition.name.clone()),
                        person_name: None,
                        keywords: role.definition.variants.clone(),
                        role_terms: role.definition.match_terms(),
                        hints: role.definition.hints.clone(),
                    };
                }
            }
        }

        if let Some(name) = self.extract_person(question) {
            let names_a_role = self
                .roles
                .iter()
                .flat_map(|r| r.definition.variants.iter())
                .any(|variant| name.contains(variant.as_str()));
            if !names_a_role {
                debug!(person = %name, "person query detected");
                return QueryAnalysis {
                    intent: QueryIntent::PersonQuery,
                    person_name: Some(name),
                    hints: person_hints(&q),
                    ..QueryAnalysis::general()
                };
            }
        }

        debug!("general query detected");
        QueryAnalysis { hints: general_hints(&q), ..QueryAnalysis::general() }
    }

    /// Pull a two-word person name out of a question, lowercased.
    ///
    /// Returns `None` when the question mentions a role word, or when no
    /// two-word name can be found.
    pub fn extract_person(&self, question: &str) -> Option<String> {
        let q = question.to_lowercase();
        if ROLE_WORDS.iter().any(|w| q.contains(w)) {
            return None;
        }

        for pattern in [&self.who_is, &self.doctor] {
            if let Some(name) = pattern.captures(&q).and_then(|c| c.get(1)) {
                return Some(name.as_str().trim().to_string());
            }
        }

        let mut tokens = Vec::with_capacity(2);
        for word in question.split_whitespace() {
            let clean: String = word.chars().filter(|c| c.is_ascii_alphabetic()).collect();
            let capitalized = clean.chars().next().is_some_and(|c| c.is_uppercase());
            let lower = clean.to_lowercase();
            if clean.len() > 1 && capitalized && !NAME_STOP_WORDS.contains(&lower.as_str()) {
                tokens.push(lower);
                if tokens.len() == 2 {
                    return Some(tokens.join(" "));
                }
            }
        }
        None
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| KnowledgeError::Config(format!("invalid pattern: {e}")))
}

fn person_hints(q: &str) -> Vec<String> {
    if ["contact", "email", "phone"].iter().any(|w| q.contains(w)) {
        to_strings(&["email", "phone", "office", "contact"])
    } else {
        Vec::new()
    }
}

fn general_hints(q: &str) -> Vec<String> {
    if q.contains("contact") {
        to_strings(&["email", "phone", "contact"])
    } else if q.contains("office") {
        to_strings(&["office", "room", "location"])
    } else if q.contains("hours") {
        to_strings(&["hours"])
    } else {
        Vec::new()
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
