//! Prompt text sent to the interviewer model.
//!
//! Three pieces make up a conversation:
//! * [`system_instruction`]: persona, pacing and focus for the chosen
//!   [`InterviewType`], sent once when the conversation is opened.
//! * [`seed_message`]: the first user turn carrying the resume.
//! * [`FEEDBACK_PROMPT`]: the closing request for an evaluation.

use crate::session::{InterviewDuration, InterviewType};

// ---------------------------------------------------------------------------
// Persona
// ---------------------------------------------------------------------------

/// `{{name}}` and `{{length}}` are substituted by [`system_instruction`].
const PERSONA_TEMPLATE: &str = "\
You are a world-class senior software engineering interviewer at a top tech company (like Google or Amazon). Your name is {{name}}.
Your goal is to conduct a comprehensive, {{length}} technical interview.
You must be professional, encouraging, but also rigorous in your evaluation.
Maintain a conversational and friendly tone. Start with easier questions and gradually increase the difficulty. Provide positive reinforcement like \"Good, that's a great start\" or \"Excellent point.\"
Pace the interview to last about the selected duration. Don't rush, but keep the conversation moving. If the candidate is stuck, provide small hints to guide them.
You are {{name}}. Respond only as {{name}} would. Do not break character. Do not say you are an AI.
Start by introducing yourself. Then, using the provided resume, ask 1-2 specific, insightful questions about a project or experience listed before moving into the main topic.
";

// ---------------------------------------------------------------------------
// Per-type focus
// ---------------------------------------------------------------------------

const FOCUS_STANDARD: &str = "
**Interview Focus: Standard Technical**
After the resume questions, transition into technical questions. Cover a range of topics appropriate for a senior SDE, including:
*   Data Structures & Algorithms (e.g., trees, graphs, dynamic programming). Ask for complexity analysis.
*   System Design (e.g., design a service like Twitter, a URL shortener, etc.). Focus on scalability, availability, and trade-offs.
*   One or two behavioral questions (\"Tell me about a time...\").
";

const FOCUS_BEHAVIORAL: &str = "
**Interview Focus: Behavioral**
After the resume questions, transition into behavioral questions. Dig deep into the candidate's past experiences using the STAR method (Situation, Task, Action, Result). Ask about teamwork, leadership, conflict resolution, and dealing with failure. Example questions:
*   \"Tell me about a time you had a disagreement with a coworker.\"
*   \"Describe a time you took the lead on a challenging project.\"
*   \"Walk me through a complex technical decision you had to make.\"
";

const FOCUS_RESUME: &str = "
**Interview Focus: Resume Deep Dive**
This entire interview is a deep dive into the candidate's resume. Go beyond the surface level. For each major project or role, ask about:
*   The technical architecture and why it was chosen.
*   The biggest challenges and how they were overcome.
*   Their specific contributions and the impact of their work.
*   What they would do differently now.
";

const FOCUS_SYSTEM_DESIGN: &str = "
**Interview Focus: System Design**
After the resume questions, present a large-scale system design problem. For example, \"Design a photo-sharing service like Instagram\" or \"Design a video streaming service like YouTube.\" Evaluate the candidate on:
*   Clarifying requirements and identifying constraints.
*   High-level architecture design.
*   Data modeling and database choice.
*   Identifying bottlenecks, scalability, and availability concerns.
*   Trade-off discussions.
";

fn focus(interview_type: InterviewType) -> &'static str {
    match interview_type {
        InterviewType::Standard => FOCUS_STANDARD,
        InterviewType::Behavioral => FOCUS_BEHAVIORAL,
        InterviewType::Resume => FOCUS_RESUME,
        InterviewType::SystemDesign => FOCUS_SYSTEM_DESIGN,
    }
}

// ---------------------------------------------------------------------------
// Public builders
// ---------------------------------------------------------------------------

/// Build the system instruction for one interview.
///
/// With no `duration` the persona is told to run an hour-long interview.
pub fn system_instruction(
    interview_type: InterviewType,
    duration: Option<InterviewDuration>,
    interviewer_name: &str,
) -> String {
    let length = match duration {
        Some(d) => format!("{}-minute", d.minutes()),
        None => "hour-long".to_string(),
    };
    let name = match interviewer_name.trim() {
        "" => "Alex",
        n => n,
    };

    let mut prompt = PERSONA_TEMPLATE
        .replace("{{name}}", name)
        .replace("{{length}}", &length);
    prompt.push_str(focus(interview_type));
    prompt
}

/// First user turn: asks the interviewer to read the resume and open.
pub fn seed_message(resume_text: &str) -> String {
    format!(
        "Here is the candidate's resume. Please review it and then start the interview by \
         introducing yourself and asking the first question based on the interview type. \
         Resume:\n\n{}",
        resume_text.trim()
    )
}

/// Sent over the same conversation when the candidate ends the interview.
pub const FEEDBACK_PROMPT: &str = "The interview is now over. Please provide a comprehensive \
evaluation of the candidate's performance based on our entire conversation. Structure your \
feedback with sections for **Strengths**, **Areas for Improvement**, and **Overall \
Recommendation**. Be constructive and specific in your feedback. Address the candidate \
directly using \"you\".";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_spelled_in_minutes() {
        let d = InterviewDuration::from_minutes(30).unwrap();
        let p = system_instruction(InterviewType::Standard, Some(d), "Alex");
        assert!(p.contains("comprehensive, 30-minute technical interview"));
        assert!(!p.contains("{{"));
    }

    #[test]
    fn missing_duration_falls_back_to_hour_long() {
        let p = system_instruction(InterviewType::Behavioral, None, "Alex");
        assert!(p.contains("hour-long"));
    }

    #[test]
    fn each_type_appends_its_focus() {
        let cases = [
            (InterviewType::Standard, "Standard Technical"),
            (InterviewType::Behavioral, "STAR method"),
            (InterviewType::Resume, "Resume Deep Dive"),
            (InterviewType::SystemDesign, "large-scale system design"),
        ];
        for (t, needle) in cases {
            let p = system_instruction(t, None, "Alex");
            assert!(p.contains(needle), "{t}: missing {needle:?}");
            assert!(p.starts_with("You are a world-class"));
        }
    }

    #[test]
    fn persona_name_is_substituted() {
        let p = system_instruction(InterviewType::Resume, None, "Sam");
        assert!(p.contains("Your name is Sam."));
        assert!(p.contains("Respond only as Sam would."));
        assert!(!p.contains("Alex"));

        let blank = system_instruction(InterviewType::Resume, None, "  ");
        assert!(blank.contains("Your name is Alex."));
    }

    #[test]
    fn seed_message_embeds_resume() {
        let m = seed_message("  Jane Doe\nRust engineer  ");
        assert!(m.starts_with("Here is the candidate's resume."));
        assert!(m.ends_with("Resume:\n\nJane Doe\nRust engineer"));
    }

    #[test]
    fn feedback_prompt_names_sections() {
        for section in ["**Strengths**", "**Areas for Improvement**", "**Overall Recommendation**"] {
            assert!(FEEDBACK_PROMPT.contains(section));
        }
    }
}
