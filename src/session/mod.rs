//! Interview session: setup types, lifecycle state and the orchestrator.
//!
//! ```text
//! ┌────────────┐  start   ┌──────────────┐   end    ┌────────────┐
//! │   Setup    │ ───────► │  InProgress  │ ───────► │  Finished  │
//! └────────────┘          └──────────────┘          └────────────┘
//!       ▲                   submit ⟲                      │
//!       └──────────────────────── reset ──────────────────┘
//! ```

pub mod error;
pub mod orchestrator;
pub mod setup;
pub mod state;

pub use error::SessionError;
pub use orchestrator::{SessionOrchestrator, APOLOGY_REPLY, FEEDBACK_FALLBACK};
pub use setup::{InterviewDuration, InterviewSetup, InterviewType};
pub use state::{SessionSnapshot, SessionState, Speaker, Turn};
