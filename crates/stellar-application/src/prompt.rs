//! Generation request construction.

use stellar_core::collaborator::{ChatTurn, GenerationRequest};
use stellar_core::session::Session;

/// System priming that establishes the advisor persona.
pub const PERSONA_INSTRUCTION: &str = "You are a knowledgeable astrologer providing insights.";

/// Advisor text stored and delivered when generation fails.
pub const FALLBACK_TEXT: &str = "Sorry, I couldn't process that.";

/// Builds the request for a reply to `question`.
///
/// `session` is the state loaded before the user's message was appended, so
/// its history is exactly the prior context.
pub fn build_generation_request(session: &Session, question: &str) -> GenerationRequest {
    let params = session.profile_params();
    let snapshot = serde_json::to_string(session.profile_snapshot())
        .unwrap_or_else(|_| session.profile_snapshot().to_string());

    let text = format!(
        "User's birth details:\n- Date: {}\n- Time: {}\n- Place: {}\n\n\
         Astrology Data from RoxyAPI:\n{}\n\n\
         User's Question: {}\n\n\
         Provide a detailed astrology-based response.",
        params.date, params.time, params.place, snapshot, question
    );

    GenerationRequest {
        persona_instruction: PERSONA_INSTRUCTION.to_string(),
        context: session
            .history()
            .iter()
            .map(|message| ChatTurn {
                sender: message.sender,
                text: message.text.clone(),
            })
            .collect(),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stellar_core::auth::Identity;
    use stellar_core::session::{Message, ProfileParams, Sender};

    fn session() -> Session {
        Session::new(
            Identity::new("U1"),
            ProfileParams::new("1990-01-01", "14:30", "Lagos"),
            json!({"sunSign": "Capricorn"}),
        )
    }

    #[test]
    fn test_profile_block() {
        let request = build_generation_request(&session(), "What does today hold for me?");

        assert_eq!(request.persona_instruction, PERSONA_INSTRUCTION);
        assert!(request.context.is_empty());
        assert_eq!(
            request.text,
            "User's birth details:\n- Date: 1990-01-01\n- Time: 14:30\n- Place: Lagos\n\n\
             Astrology Data from RoxyAPI:\n{\"sunSign\":\"Capricorn\"}\n\n\
             User's Question: What does today hold for me?\n\n\
             Provide a detailed astrology-based response."
        );
    }

    #[test]
    fn test_snapshot_is_embedded_verbatim() {
        let raw = r#"{"sunSign":"Capricorn","ascendant":"Leo"}"#;
        let session = Session::new(
            Identity::new("U1"),
            ProfileParams::new("1990-01-01", "14:30", "Lagos"),
            serde_json::from_str(raw).unwrap(),
        );

        let request = build_generation_request(&session, "Who am I?");

        assert!(request.text.contains(&format!("Astrology Data from RoxyAPI:\n{raw}\n")));
    }

    #[test]
    fn test_history_becomes_context() {
        let mut session = session();
        session.append(Message::user("Hi").unwrap());
        session.append(Message::advisor("Hello").unwrap());

        let request = build_generation_request(&session, "And tomorrow?");

        let senders: Vec<Sender> = request.context.iter().map(|t| t.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Advisor]);
        assert_eq!(request.context[1].text, "Hello");
        assert!(request.text.contains("User's Question: And tomorrow?"));
    }
}
