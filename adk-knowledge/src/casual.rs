//! Canned replies for small talk, answered without touching retrieval.

/// How a rule matches the normalized message.
enum Match {
    /// The whole message equals one of the phrases.
    Exact(&'static [&'static str]),
    /// The message contains one of the phrases.
    Contains(&'static [&'static str]),
    /// Either of the above.
    Both { exact: &'static [&'static str], contains: &'static [&'static str] },
}

impl Match {
    fn matches(&self, msg: &str) -> bool {
        match self {
            Self::Exact(phrases) => is_one_of(msg, phrases),
            Self::Contains(phrases) => contains_any(msg, phrases),
            Self::Both { exact, contains } => {
                is_one_of(msg, exact) || contains_any(msg, contains)
            }
        }
    }
}

fn is_one_of(msg: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| *p == msg)
}

fn contains_any(msg: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| msg.contains(p))
}

/// Rules are checked in order; `{institution}` in a reply is substituted.
const RULES: &[(Match, &str)] = &[
    (
        Match::Exact(&["hi", "hello", "hey", "greetings", "howdy", "yo"]),
        "Hello! I'm the {institution} assistant. How can I help you?",
    ),
    (
        Match::Both { exact: &["morning", "gm"], contains: &["good morning"] },
        "Good morning! How can I help you with {institution} today?",
    ),
    (
        Match::Both { exact: &["afternoon"], contains: &["good afternoon"] },
        "Good afternoon! How can I help you with {institution} today?",
    ),
    (
        Match::Both { exact: &["evening"], contains: &["good evening"] },
        "Good evening! How can I help you with {institution} today?",
    ),
    (
        Match::Both { exact: &["goodnight", "night"], contains: &["good night"] },
        "Good night! Reach out anytime you need something.",
    ),
    (
        Match::Contains(&["how are you", "how r u", "how are u"]),
        "I'm doing well, thanks for asking! How can I help you with {institution}?",
    ),
    (
        Match::Both { exact: &["sup", "wassup"], contains: &["how's it going", "how is it going"] },
        "All good here! What can I do for you?",
    ),
    (
        Match::Exact(&[
            "bye",
            "goodbye",
            "bye bye",
            "see you",
            "see ya",
            "later",
            "catch you later",
            "take care",
        ]),
        "Goodbye! Come back anytime you need help.",
    ),
    (
        Match::Contains(&["have a good day", "have a great day", "have a nice day"]),
        "Thank you, you too! Come back if you need anything else.",
    ),
    (
        Match::Contains(&["have a good night", "have a great night"]),
        "Thanks, have a great night as well!",
    ),
    (
        Match::Exact(&["thanks", "thank you", "thx", "ty", "tysm", "thank u", "appreciate it"]),
        "You're welcome! I'm here if you need anything else.",
    ),
    (
        Match::Contains(&["thanks a lot", "thank you so much"]),
        "You're very welcome! Happy to help anytime.",
    ),
    (
        Match::Contains(&["nice to meet you", "pleased to meet you"]),
        "Nice to meet you too! Ask me anything about {institution}.",
    ),
    (
        Match::Exact(&["ok", "okay", "alright", "got it", "understood"]),
        "Great! Let me know if you need anything else.",
    ),
    (
        Match::Exact(&["yes", "yeah", "yep", "sure", "yup"]),
        "Wonderful! What would you like to know about {institution}?",
    ),
    (
        Match::Exact(&["no", "nope", "nah", "not really"]),
        "No problem! I'm here if you change your mind.",
    ),
    (
        Match::Both { exact: &["help"], contains: &["i need help", "help me"] },
        "I'm here to help! Ask me about classes, faculty, departments, registration or campus resources.",
    ),
    (
        Match::Contains(&["what can you do", "what do you do"]),
        "I can find information about {institution}: academic programs, faculty contacts, registration dates, campus resources and more.",
    ),
    (
        Match::Both { exact: &["great"], contains: &["good job", "well done", "nice work"] },
        "Thank you for the kind words!",
    ),
    (
        Match::Contains(&["you're helpful", "you are helpful", "very helpful"]),
        "Glad I could help! Ask me anything else about {institution}.",
    ),
    (
        Match::Exact(&["sorry", "my bad", "oops", "apologies"]),
        "No worries at all! How can I help?",
    ),
];

/// Recognizes greetings, thanks and other small talk.
#[derive(Debug, Clone)]
pub struct SmallTalk {
    institution: String,
}

impl SmallTalk {
    /// Create a responder naming `institution` in its replies.
    pub fn new(institution: impl Into<String>) -> Self {
        Self { institution: institution.into() }
    }

    /// The canned reply for `message`, or `None` if it needs a real answer.
    pub fn reply(&self, message: &str) -> Option<String> {
        let msg = message.trim().to_lowercase();
        RULES
            .iter()
            .find(|(rule, _)| rule.matches(&msg))
            .map(|(_, reply)| reply.replace("{institution}", &self.institution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greets_by_institution() {
        let talk = SmallTalk::new("Morgan State University");
        let reply = talk.reply("  Hello ").unwrap();
        assert!(reply.contains("Morgan State University"));
    }

    #[test]
    fn matches_contained_phrases() {
        let talk = SmallTalk::new("X");
        assert!(talk.reply("well, good morning to you").unwrap().starts_with("Good morning"));
        assert!(talk.reply("thank you so much!").is_some());
    }

    #[test]
    fn real_questions_pass_through() {
        let talk = SmallTalk::new("X");
        assert_eq!(talk.reply("Who is the chair of computer science?"), None);
        assert_eq!(talk.reply("hi, when does registration open?"), None);
    }
}
