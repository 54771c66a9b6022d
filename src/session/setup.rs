//! Interview configuration chosen on the setup screen.
//!
//! [`InterviewType`] selects the interviewer's focus, [`InterviewDuration`]
//! the pacing the persona is told to aim for.  Both end up in the system
//! instruction built by [`crate::agent::prompt`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// InterviewType
// ---------------------------------------------------------------------------

/// The four interview styles offered on the setup screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterviewType {
    /// Resume questions, then data structures, algorithms and design.
    Standard,
    /// STAR-method behavioural questions.
    Behavioral,
    /// The whole interview is a resume deep dive.
    Resume,
    /// One large-scale system design problem.
    SystemDesign,
}

impl InterviewType {
    /// Every variant, in the order the setup screen lists them.
    pub const ALL: [InterviewType; 4] = [
        InterviewType::Standard,
        InterviewType::Behavioral,
        InterviewType::Resume,
        InterviewType::SystemDesign,
    ];

    /// Stable identifier used in `settings.toml`.
    pub fn id(&self) -> &'static str {
        match self {
            InterviewType::Standard => "standard",
            InterviewType::Behavioral => "behavioral",
            InterviewType::Resume => "resume",
            InterviewType::SystemDesign => "system-design",
        }
    }

    /// Card title shown on the setup screen.
    pub fn title(&self) -> &'static str {
        match self {
            InterviewType::Standard => "Standard Technical",
            InterviewType::Behavioral => "Behavioral",
            InterviewType::Resume => "Resume Deep Dive",
            InterviewType::SystemDesign => "System Design",
        }
    }

    /// One-line card description shown under the title.
    pub fn description(&self) -> &'static str {
        match self {
            InterviewType::Standard => {
                "A mix of resume questions, data structures, algorithms, and system design concepts."
            }
            InterviewType::Behavioral => {
                "Focuses on past experiences, problem-solving, and handling workplace situations."
            }
            InterviewType::Resume => {
                "An in-depth conversation about specific projects and skills listed on your resume."
            }
            InterviewType::SystemDesign => {
                "A focused session on designing scalable, distributed systems for real-world problems."
            }
        }
    }
}

impl Default for InterviewType {
    fn default() -> Self {
        InterviewType::Standard
    }
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for InterviewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InterviewType::ALL
            .iter()
            .copied()
            .find(|t| t.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown interview type: {s}"))
    }
}

// ---------------------------------------------------------------------------
// InterviewDuration
// ---------------------------------------------------------------------------

/// Target interview length in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterviewDuration(u32);

impl InterviewDuration {
    /// Durations offered by the setup screen.
    pub const PRESETS: [InterviewDuration; 4] = [
        InterviewDuration(15),
        InterviewDuration(30),
        InterviewDuration(45),
        InterviewDuration(60),
    ];

    /// `None` for a zero-minute duration.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes > 0).then_some(Self(minutes))
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InterviewDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}

// ---------------------------------------------------------------------------
// InterviewSetup
// ---------------------------------------------------------------------------

/// Everything `SessionOrchestrator::start` needs to open an interview.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSetup {
    /// Extracted resume text.  Must be non-empty after trimming.
    pub resume_text: String,
    pub interview_type: InterviewType,
    /// `None` leaves pacing open ("hour-long" in the persona prompt).
    pub duration: Option<InterviewDuration>,
}

impl InterviewSetup {
    pub fn new(resume_text: impl Into<String>, interview_type: InterviewType) -> Self {
        Self {
            resume_text: resume_text.into(),
            interview_type,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: InterviewDuration) -> Self {
        self.duration = Some(duration);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
