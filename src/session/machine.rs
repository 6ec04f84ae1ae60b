//! Session state machine
//!
//! Every transition takes the session by value and hands it back together with
//! the side effects the runtime has to perform. Nothing here touches a device,
//! a timer or the network.

use tracing::{debug, info, warn};

use super::state::{
    DeviceStatus, Outcome, Question, Session, SessionState, TimerState, UploadStatus, Validity,
};
use crate::backend::StoredVideo;
use crate::error::SessionError;

/// A discrete event consumed by the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    ValidityResolved(Validity),
    QuestionsLoaded(Vec<Question>),
    QuestionsFailed(String),
    DeviceReady,
    DeviceFailed(String),
    AttachUser(String),
    Start,
    Next,
    Stop,
    RetryDevice,
    Leave,
    TimerTick { question: usize, remaining: u32 },
    TimerExpired { question: usize },
    MediaFinalized,
    CaptureFailed(String),
    UploadDispatched,
    UploadSucceeded(StoredVideo),
    UploadFailed(String),
}

impl Input {
    /// Whether this input comes from the candidate rather than a collaborator
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Input::AttachUser(_)
                | Input::Start
                | Input::Next
                | Input::Stop
                | Input::RetryDevice
                | Input::Leave
        )
    }

    fn command_name(&self) -> &'static str {
        match self {
            Input::AttachUser(_) => "attach a user",
            Input::Start => "start",
            Input::Next => "advance",
            Input::Stop => "stop",
            Input::RetryDevice => "retry the camera",
            Input::Leave => "leave",
            _ => "handle event",
        }
    }
}

/// Work the runtime performs on behalf of the machine, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckValidity,
    LoadQuestions,
    AcquireDevice,
    BeginCapture,
    ArmTimer { question: usize, seconds: u32 },
    CancelTimer,
    FinalizeCapture,
    SubmitMedia,
    ReleaseDevice,
    Navigate(Outcome),
}

/// A session after one input, with the effects that input requires
#[derive(Debug, Clone)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
    /// Set when a command was not allowed; the session is unchanged
    pub rejection: Option<SessionError>,
}

/// Effects to run when a session is created
pub fn enter(session: Session) -> Transition {
    info!("Session for interview {} entered", session.interview_id);

    Transition {
        session,
        effects: vec![
            Effect::CheckValidity,
            Effect::LoadQuestions,
            Effect::AcquireDevice,
        ],
        rejection: None,
    }
}

/// Apply one input
pub fn apply(mut session: Session, input: Input) -> Transition {
    let mut effects = Vec::new();

    if session.closed {
        // A camera that resolves after the candidate left must still be let go
        if input == Input::DeviceReady {
            effects.push(Effect::ReleaseDevice);
        }
        let rejection = input.is_command().then_some(SessionError::SessionClosed);
        return Transition {
            session,
            effects,
            rejection,
        };
    }

    let command = input.command_name();
    let result = match input {
        Input::ValidityResolved(validity) => {
            resolve_validity(&mut session, validity, &mut effects);
            Ok(())
        }
        Input::QuestionsLoaded(questions) => {
            load_questions(&mut session, questions);
            Ok(())
        }
        Input::QuestionsFailed(reason) => {
            warn!("Error fetching questions: {}", reason);
            load_questions(&mut session, Vec::new());
            Ok(())
        }
        Input::DeviceReady => {
            device_ready(&mut session, &mut effects);
            Ok(())
        }
        Input::DeviceFailed(reason) => {
            let error = SessionError::DeviceUnavailable(reason.clone());
            session.push_notice(&error);
            session.device = DeviceStatus::Unavailable { reason };
            Ok(())
        }
        Input::AttachUser(user_id) => attach_user(&mut session, user_id),
        Input::Start => start(&mut session, &mut effects),
        Input::Next => next(&mut session, &mut effects),
        Input::Stop => stop(&mut session, &mut effects),
        Input::RetryDevice => retry_device(&mut session, &mut effects),
        Input::Leave => {
            leave(&mut session, &mut effects);
            Ok(())
        }
        Input::TimerTick { question, remaining } => {
            tick(&mut session, question, remaining);
            Ok(())
        }
        Input::TimerExpired { question } => {
            expire(&mut session, question, &mut effects);
            Ok(())
        }
        Input::MediaFinalized => {
            if session.state == SessionState::Advancing {
                effects.push(Effect::SubmitMedia);
            }
            Ok(())
        }
        Input::CaptureFailed(reason) => {
            capture_failed(&mut session, reason, &mut effects);
            Ok(())
        }
        Input::UploadDispatched => {
            if session.state == SessionState::Advancing {
                session.upload = UploadStatus::Pending;
                set_state(&mut session, SessionState::Completed);
            }
            Ok(())
        }
        Input::UploadSucceeded(video) => {
            if session.upload == UploadStatus::Pending {
                session.upload = UploadStatus::Succeeded { video };
                session.outcome = Some(Outcome::Completed);
                effects.push(Effect::Navigate(Outcome::Completed));
            }
            Ok(())
        }
        Input::UploadFailed(reason) => {
            if session.upload == UploadStatus::Pending {
                let error = SessionError::UploadFailed(reason.clone());
                session.push_notice(&error);
                session.upload = UploadStatus::Failed { reason };
            }
            Ok(())
        }
    };

    let rejection = match result {
        Ok(()) => None,
        Err(error) => {
            debug!("Rejected {}: {}", command, error);
            // Rejections leave no effects behind
            effects.clear();
            Some(error)
        }
    };

    Transition {
        session,
        effects,
        rejection,
    }
}

fn set_state(session: &mut Session, next: SessionState) {
    info!(
        "Interview {}: {} -> {}",
        session.interview_id, session.state, next
    );
    session.state = next;
    session.history.push(next);
}

fn rejected(session: &Session, command: &str, detail: Option<&str>) -> SessionError {
    let state = match detail {
        Some(detail) => format!("{} ({})", session.state, detail),
        None => session.state.to_string(),
    };
    SessionError::CommandRejected {
        command: command.to_string(),
        state,
    }
}

fn resolve_validity(session: &mut Session, validity: Validity, effects: &mut Vec<Effect>) {
    // Checked once per session; later answers are ignored
    if session.validity != Validity::Unknown || session.state != SessionState::Gating {
        debug!("Ignoring repeated validity result for {}", session.interview_id);
        return;
    }

    session.validity = validity;

    match validity {
        Validity::Valid => set_state(session, SessionState::Idle),
        Validity::Invalid | Validity::Unknown => {
            session.validity = Validity::Invalid;
            let error = SessionError::ValidityCheckFailed(format!(
                "interview {} is expired or unavailable",
                session.interview_id
            ));
            session.push_notice(&error);
            session.outcome = Some(Outcome::NotFound);
            set_state(session, SessionState::Invalidated);
            effects.push(Effect::ReleaseDevice);
            effects.push(Effect::Navigate(Outcome::NotFound));
        }
    }
}

fn load_questions(session: &mut Session, questions: Vec<Question>) {
    if session.questions.is_some() {
        debug!("Questions already loaded for {}", session.interview_id);
        return;
    }

    if questions.is_empty() {
        let error = SessionError::NoQuestionsLoaded(format!(
            "interview {} has no questions",
            session.interview_id
        ));
        session.push_notice(&error);
    } else {
        info!(
            "Loaded {} questions for interview {}",
            questions.len(),
            session.interview_id
        );
    }

    session.questions = Some(questions);
}

fn device_ready(session: &mut Session, effects: &mut Vec<Effect>) {
    if session.state == SessionState::Invalidated {
        effects.push(Effect::ReleaseDevice);
        return;
    }
    session.device = DeviceStatus::Ready;
}

fn attach_user(session: &mut Session, user_id: String) -> Result<(), SessionError> {
    if !matches!(session.state, SessionState::Gating | SessionState::Idle) {
        return Err(rejected(session, "attach a user", None));
    }
    info!(
        "Interview {} recording for user {}",
        session.interview_id, user_id
    );
    session.user_id = Some(user_id);
    Ok(())
}

fn start(session: &mut Session, effects: &mut Vec<Effect>) -> Result<(), SessionError> {
    if session.state != SessionState::Idle {
        return Err(rejected(session, "start", None));
    }
    match &session.device {
        DeviceStatus::Ready => {}
        DeviceStatus::Pending => return Err(rejected(session, "start", Some("camera not ready"))),
        DeviceStatus::Unavailable { reason } => {
            return Err(SessionError::DeviceUnavailable(reason.clone()))
        }
    }
    if !session.questions_loaded() {
        return Err(rejected(session, "start", Some("questions loading")));
    }
    if session.user_id.is_none() {
        return Err(rejected(session, "start", Some("no candidate registered")));
    }

    effects.push(Effect::BeginCapture);

    let index = session.current_question_index;
    if index < session.question_count() {
        arm(session, index, effects);
        set_state(session, SessionState::Recording { question: Some(index) });
    } else {
        // No prompts; capture runs until an explicit stop
        set_state(session, SessionState::Recording { question: None });
    }
    Ok(())
}

fn next(session: &mut Session, effects: &mut Vec<Effect>) -> Result<(), SessionError> {
    match session.state {
        SessionState::Recording { question: Some(i) } if i + 1 < session.question_count() => {
            advance(session, i, effects);
            Ok(())
        }
        SessionState::Recording { .. } => {
            debug!("Next on the final question is a no-op");
            Ok(())
        }
        _ => Err(rejected(session, "advance", None)),
    }
}

fn stop(session: &mut Session, effects: &mut Vec<Effect>) -> Result<(), SessionError> {
    if !session.state.is_recording() {
        return Err(rejected(session, "stop", None));
    }
    finish(session, effects);
    Ok(())
}

fn retry_device(session: &mut Session, effects: &mut Vec<Effect>) -> Result<(), SessionError> {
    if !session.controls().retry_device {
        return Err(rejected(session, "retry the camera", None));
    }
    session.device = DeviceStatus::Pending;
    effects.push(Effect::AcquireDevice);
    Ok(())
}

fn leave(session: &mut Session, effects: &mut Vec<Effect>) {
    if session.state.is_recording() {
        warn!(
            "Leaving interview {} while recording; capture is discarded",
            session.interview_id
        );
    }
    if session.timer.take().is_some() {
        effects.push(Effect::CancelTimer);
    }
    effects.push(Effect::ReleaseDevice);
    session.closed = true;
    info!("Session for interview {} closed", session.interview_id);
}

fn tick(session: &mut Session, question: usize, remaining: u32) {
    let current = matches!(session.state, SessionState::Recording { question: Some(q) } if q == question);
    match session.timer.as_mut() {
        Some(timer) if current && timer.running => timer.remaining_seconds = remaining,
        _ => debug!("Ignoring stale tick for question {}", question),
    }
}

fn expire(session: &mut Session, question: usize, effects: &mut Vec<Effect>) {
    let current = matches!(session.state, SessionState::Recording { question: Some(q) } if q == question);
    let running = session.timer.is_some_and(|t| t.running);
    if !current || !running {
        debug!("Ignoring stale expiry for question {}", question);
        return;
    }

    info!(
        "Time is up for question {} of interview {}",
        question + 1,
        session.interview_id
    );
    // The countdown already stopped itself
    session.timer = None;

    if question + 1 < session.question_count() {
        advance(session, question, effects);
    } else {
        finish(session, effects);
    }
}

/// Recording(i) -> Advancing -> Recording(i + 1)
fn advance(session: &mut Session, from: usize, effects: &mut Vec<Effect>) {
    set_state(session, SessionState::Advancing);
    if session.timer.take().is_some() {
        effects.push(Effect::CancelTimer);
    }

    let to = from + 1;
    debug_assert!(to > session.current_question_index);
    session.current_question_index = to;

    arm(session, to, effects);
    set_state(session, SessionState::Recording { question: Some(to) });
}

/// A fresh countdown at the question's full duration
fn arm(session: &mut Session, question: usize, effects: &mut Vec<Effect>) {
    let seconds = session.questions()[question].allotted_seconds;
    session.timer = Some(TimerState {
        remaining_seconds: seconds,
        running: true,
    });
    effects.push(Effect::ArmTimer { question, seconds });
}

/// Recording -> Advancing; `Completed` follows once the upload is dispatched
fn finish(session: &mut Session, effects: &mut Vec<Effect>) {
    if session.timer.take().is_some() {
        effects.push(Effect::CancelTimer);
    }
    set_state(session, SessionState::Advancing);
    effects.push(Effect::FinalizeCapture);
}

fn capture_failed(session: &mut Session, reason: String, effects: &mut Vec<Effect>) {
    let error = SessionError::CaptureFailed(reason.clone());
    session.push_notice(&error);

    if !(session.state.is_recording() || session.state == SessionState::Advancing) {
        return;
    }

    // Recording never resumes; close out with nothing to upload
    if session.timer.take().is_some() {
        effects.push(Effect::CancelTimer);
    }
    effects.push(Effect::ReleaseDevice);
    session.upload = UploadStatus::Failed { reason };
    set_state(session, SessionState::Completed);
}
