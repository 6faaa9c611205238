use serde::{Deserialize, Serialize};

use crate::AssistError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Apologetic,
    Persuasive,
    Formal,
    Casual,
}

impl Tone {
    pub fn opening(self) -> &'static str {
        match self {
            Tone::Professional => "I hope this message finds you well.",
            Tone::Friendly => "I hope you're having a great day!",
            Tone::Apologetic => "Please accept my sincere apologies for any inconvenience caused.",
            Tone::Persuasive => "I truly believe this could be a great opportunity for you.",
            Tone::Formal => "I am writing to you regarding the following matter.",
            Tone::Casual => "Just wanted to quickly reach out about this.",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tone::Professional => "Professional",
            Tone::Friendly => "Friendly",
            Tone::Apologetic => "Apologetic",
            Tone::Persuasive => "Persuasive",
            Tone::Formal => "Formal",
            Tone::Casual => "Casual",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailRequest {
    pub subject: String,
    pub recipient: String,
    #[serde(default)]
    pub tone: Tone,
    pub details: String,
}

/// Fill the email template for the requested tone.
pub fn draft_email(req: &EmailRequest) -> Result<String, AssistError> {
    for (name, value) in [
        ("subject", &req.subject),
        ("recipient", &req.recipient),
        ("details", &req.details),
    ] {
        if value.trim().is_empty() {
            return Err(AssistError::MissingField(name));
        }
    }

    Ok(format!(
        "Subject: {subject}\n\nDear {recipient},\n\n{opening}\n\n{details}\n\nBest regards,  \n[Your Name]\n",
        subject = req.subject,
        recipient = req.recipient,
        opening = req.tone.opening(),
        details = req.details,
    ))
}
