//! System prompt assembly.

use crate::analyzer::{QueryAnalysis, QueryIntent};

const NO_PROFILE: &str = "No academic profile is available for this user yet.";

/// Builds the system instruction handed to the generator.
///
/// Pure templating: no I/O, no state beyond the institution name.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    institution: String,
}

impl PromptAssembler {
    /// Create an assembler that introduces itself as `institution`'s assistant.
    pub fn new(institution: impl Into<String>) -> Self {
        Self { institution: institution.into() }
    }

    /// Assemble the preamble, profile block, intent block and ranked context.
    ///
    /// A missing or blank `profile` renders a fixed placeholder line.
    pub fn build(&self, context: &str, analysis: &QueryAnalysis, profile: Option<&str>) -> String {
        let profile = profile.map(str::trim).filter(|p| !p.is_empty()).unwrap_or(NO_PROFILE);
        let intent = intent_block(analysis);

        format!(
            "You are the AI assistant for {institution}.

STUDENT ACADEMIC PROFILE:
{profile}

OUTPUT FORMAT:
- Write plain, natural sentences only.
- Do not use markdown, asterisks, bold or italic text.
- Limit punctuation to periods, commas, colons and parentheses.

HOW TO ANSWER:
- Use only the knowledge base and the academic profile in this message.
- Knowledge base entries are ordered by relevance; prefer the earlier ones.
- Copy names, emails, phone numbers, dates and links exactly as written.
- Questions about the student's own GPA, courses or credits are answered from the academic profile.
- If the exact answer is missing, give the closest related information instead of refusing.

NEVER:
- Invent facts that are not in the material below.
- Mix up two different people or offices.
- Apologize for limitations.

{intent}

KNOWLEDGE BASE (ordered by relevance):
{context}

Answer the question accurately in plain text.",
            institution = self.institution,
        )
    }
}

fn intent_block(analysis: &QueryAnalysis) -> String {
    match analysis.intent {
        QueryIntent::RoleQuery => format!(
            "ROLE LOOKUP: {}
- Identify the person who currently holds this role.
- Give their name, title and contact details (email, phone, office).",
            analysis.role_keyword.as_deref().unwrap_or("unknown role"),
        ),
        QueryIntent::PersonQuery => format!(
            "PERSON LOOKUP: {}
- Focus on this individual only.
- Give their title, role and contact details.
- If several people have similar names, make clear which one you mean.",
            analysis.person_name.as_deref().unwrap_or("unknown person"),
        ),
        QueryIntent::GeneralQuery => "GENERAL QUESTION
- Answer the question as directly as possible.
- Point to the relevant office or resource when that helps."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{QueryAnalyzer, default_roles};

    fn analyze(question: &str) -> QueryAnalysis {
        QueryAnalyzer::new(&default_roles()).unwrap().analyze(question)
    }

    #[test]
    fn blocks_appear_in_order() {
        let prompt = PromptAssembler::new("Test University").build(
            "=== From cs ===\nChair: Dr. Paul Wang",
            &analyze("who is the chair of cs"),
            Some("You are a Physics major."),
        );

        let preamble = prompt.find("AI assistant for Test University").unwrap();
        let profile = prompt.find("You are a Physics major.").unwrap();
        let intent = prompt.find("ROLE LOOKUP: chair").unwrap();
        let context = prompt.find("Chair: Dr. Paul Wang").unwrap();
        assert!(preamble < profile && profile < intent && intent < context);
        assert!(prompt.contains("Do not use markdown"));
        assert!(prompt.contains("closest related information"));
    }

    #[test]
    fn missing_profile_uses_placeholder() {
        let assembler = PromptAssembler::new("X");
        let analysis = analyze("when is the library open");
        assert!(assembler.build("", &analysis, None).contains(NO_PROFILE));
        assert!(assembler.build("", &analysis, Some("  ")).contains(NO_PROFILE));
        assert!(assembler.build("", &analysis, None).contains("GENERAL QUESTION"));
    }

    #[test]
    fn person_block_names_the_person() {
        let prompt = PromptAssembler::new("X").build("", &analyze("Who is Dr. Paul Wang"), None);
        assert!(prompt.contains("PERSON LOOKUP: paul wang"));
        assert!(prompt.contains("make clear which one you mean"));
    }
}
