use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::gate::ValidityGate;
use super::machine::{self, Effect, Input, Transition};
use super::state::{Question, Session, Validity};
use super::timer::{QuestionTimer, TimerSignal};
use super::upload::UploadHandoff;
use super::view::SessionView;
use crate::backend::{InterviewBackend, StoredVideo};
use crate::capture::{CaptureAdapter, CaptureDevice, FinishedMedia, MediaStream};
use crate::error::{CaptureError, SessionError};

/// Commands waiting for the controller; senders wait when full
const COMMAND_QUEUE: usize = 32;

/// Something the candidate asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Next,
    Stop,
    RetryDevice,
    AttachUser(String),
    Leave,
}

impl From<SessionCommand> for Input {
    fn from(command: SessionCommand) -> Self {
        match command {
            SessionCommand::Start => Input::Start,
            SessionCommand::Next => Input::Next,
            SessionCommand::Stop => Input::Stop,
            SessionCommand::RetryDevice => Input::RetryDevice,
            SessionCommand::AttachUser(user_id) => Input::AttachUser(user_id),
            SessionCommand::Leave => Input::Leave,
        }
    }
}

/// Completions posted back by timers and background requests
#[derive(Debug)]
enum SessionEvent {
    ValidityResolved(Validity),
    QuestionsLoaded(Result<Vec<Question>, String>),
    Timer(TimerSignal),
    UploadResolved(Result<StoredVideo, SessionError>),
}

impl From<TimerSignal> for SessionEvent {
    fn from(signal: TimerSignal) -> Self {
        SessionEvent::Timer(signal)
    }
}

impl SessionEvent {
    fn into_input(self) -> Input {
        match self {
            SessionEvent::ValidityResolved(validity) => Input::ValidityResolved(validity),
            SessionEvent::QuestionsLoaded(Ok(questions)) => Input::QuestionsLoaded(questions),
            SessionEvent::QuestionsLoaded(Err(reason)) => Input::QuestionsFailed(reason),
            SessionEvent::Timer(TimerSignal::Tick { question, remaining }) => {
                Input::TimerTick { question, remaining }
            }
            SessionEvent::Timer(TimerSignal::Expired { question }) => {
                Input::TimerExpired { question }
            }
            SessionEvent::UploadResolved(Ok(video)) => Input::UploadSucceeded(video),
            SessionEvent::UploadResolved(Err(SessionError::UploadFailed(reason))) => {
                Input::UploadFailed(reason)
            }
            SessionEvent::UploadResolved(Err(other)) => Input::UploadFailed(other.to_string()),
        }
    }
}

struct CommandEnvelope {
    command: SessionCommand,
    reply: oneshot::Sender<Result<SessionView, SessionError>>,
}

/// Runs one session: owns the camera, the countdown and the event loop
///
/// Every input, whether a command, a timer signal or a finished request, is
/// applied one at a time on a single task, so no two transitions interleave.
pub struct SessionController {
    id: String,
    capture: CaptureAdapter,
    /// Stream acquired for preview, consumed when recording starts
    stream: Option<MediaStream>,
    /// Finalized recording waiting to be submitted
    media: Option<FinishedMedia>,
    timer: QuestionTimer<SessionEvent>,
    gate: ValidityGate,
    handoff: UploadHandoff,
    backend: Arc<dyn InterviewBackend>,
    config: SessionConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    views: watch::Sender<SessionView>,
}

impl SessionController {
    /// Create a session for `interview_id` and start its event loop
    pub fn spawn(
        interview_id: impl Into<String>,
        user_id: Option<String>,
        backend: Arc<dyn InterviewBackend>,
        device: Box<dyn CaptureDevice>,
        config: SessionConfig,
    ) -> SessionHandle {
        let id = format!("session-{}", Uuid::new_v4());
        let session = Session::new(interview_id, user_id);

        let (views, view_rx) = watch::channel(SessionView::new(&id, &session));
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        info!(
            "Creating session {} for interview {} on {}",
            id,
            session.interview_id(),
            device.name()
        );

        let controller = SessionController {
            id: id.clone(),
            capture: CaptureAdapter::new(device),
            stream: None,
            media: None,
            timer: QuestionTimer::new(events_tx.clone()),
            gate: ValidityGate::new(Arc::clone(&backend)),
            handoff: UploadHandoff::new(Arc::clone(&backend), config.file_name.clone()),
            backend,
            config,
            events: events_tx,
            views,
        };

        tokio::spawn(controller.run(session, commands_rx, events_rx));

        SessionHandle {
            id,
            commands: commands_tx,
            views: view_rx,
        }
    }

    async fn run(
        mut self,
        session: Session,
        mut commands: mpsc::Receiver<CommandEnvelope>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let (mut session, _) = self.settle(machine::enter(session)).await;

        while !session.is_finished() {
            tokio::select! {
                envelope = commands.recv() => match envelope {
                    Some(CommandEnvelope { command, reply }) => {
                        debug!("Session {} received {:?}", self.id, command);
                        let (next, rejection) =
                            self.settle(machine::apply(session, command.into())).await;
                        session = next;

                        let response = match rejection {
                            Some(error) => Err(error),
                            None => Ok(SessionView::new(&self.id, &session)),
                        };
                        // The caller may have stopped waiting
                        let _ = reply.send(response);
                    }
                    None => {
                        info!("All handles to session {} dropped, leaving", self.id);
                        session = self.settle(machine::apply(session, Input::Leave)).await.0;
                    }
                },
                Some(event) = events.recv() => {
                    session = self.settle(machine::apply(session, event.into_input())).await.0;
                }
            }
        }

        info!("Session {} stopped in state {}", self.id, session.state());
    }

    /// Run a transition's effects, then any inputs they produced, until quiet
    async fn settle(&mut self, transition: Transition) -> (Session, Option<SessionError>) {
        let Transition {
            mut session,
            mut effects,
            rejection,
        } = transition;
        let mut pending = VecDeque::new();

        loop {
            for effect in effects {
                if let Some(input) = self.execute(&session, effect).await {
                    pending.push_back(input);
                }
            }

            match pending.pop_front() {
                Some(input) => {
                    let next = machine::apply(session, input);
                    session = next.session;
                    effects = next.effects;
                }
                None => break,
            }
        }

        self.views.send_replace(SessionView::new(&self.id, &session));
        (session, rejection)
    }

    /// Perform one effect; inputs that complete immediately are returned
    async fn execute(&mut self, session: &Session, effect: Effect) -> Option<Input> {
        match effect {
            Effect::CheckValidity => {
                let gate = self.gate.clone();
                let events = self.events.clone();
                let interview_id = session.interview_id().to_string();
                tokio::spawn(async move {
                    let validity = gate.check(&interview_id).await;
                    let _ = events.send(SessionEvent::ValidityResolved(validity));
                });
                None
            }
            Effect::LoadQuestions => {
                let backend = Arc::clone(&self.backend);
                let events = self.events.clone();
                let interview_id = session.interview_id().to_string();
                let default_seconds = self.config.default_question_secs;
                tokio::spawn(async move {
                    let loaded = backend
                        .fetch_questions(&interview_id)
                        .await
                        .map(|records| {
                            records
                                .iter()
                                .map(|record| Question::from_record(record, default_seconds))
                                .collect()
                        })
                        .map_err(|e| e.to_string());
                    let _ = events.send(SessionEvent::QuestionsLoaded(loaded));
                });
                None
            }
            Effect::AcquireDevice => match self.capture.acquire().await {
                Ok(stream) => {
                    self.stream = Some(stream);
                    Some(Input::DeviceReady)
                }
                Err(CaptureError::DeviceUnavailable(reason)) => Some(Input::DeviceFailed(reason)),
                Err(e) => Some(Input::DeviceFailed(e.to_string())),
            },
            Effect::BeginCapture => {
                let Some(stream) = self.stream.take() else {
                    error!("Session {} has no camera stream to record", self.id);
                    return Some(Input::CaptureFailed("camera stream missing".to_string()));
                };
                match self.capture.begin_recording(stream) {
                    Ok(()) => None,
                    Err(e) => Some(Input::CaptureFailed(e.to_string())),
                }
            }
            Effect::ArmTimer { question, seconds } => {
                self.timer.arm(question, seconds);
                None
            }
            Effect::CancelTimer => {
                self.timer.cancel();
                None
            }
            Effect::FinalizeCapture => match self.capture.finalize().await {
                Ok(media) => {
                    self.media = Some(media);
                    Some(Input::MediaFinalized)
                }
                Err(e) => {
                    error!("Failed to finalize recording for {}: {}", self.id, e);
                    Some(Input::CaptureFailed(e.to_string()))
                }
            },
            Effect::SubmitMedia => {
                let Some(media) = self.media.take() else {
                    return Some(Input::CaptureFailed("no finished recording".to_string()));
                };

                let events = self.events.clone();
                let Some(user_id) = session.user_id().map(str::to_string) else {
                    warn!("Session {} has no user to tag the upload with", self.id);
                    let _ = events.send(SessionEvent::UploadResolved(Err(
                        SessionError::UploadFailed("no user id".to_string()),
                    )));
                    return Some(Input::UploadDispatched);
                };

                let handoff = self.handoff.clone();
                let interview_id = session.interview_id().to_string();
                tokio::spawn(async move {
                    let result = handoff.submit(media, &interview_id, &user_id).await;
                    let _ = events.send(SessionEvent::UploadResolved(result));
                });
                Some(Input::UploadDispatched)
            }
            Effect::ReleaseDevice => {
                // Dropping an unused preview stream stops its tracks
                self.stream = None;
                self.media = None;
                self.capture.release();
                None
            }
            Effect::Navigate(outcome) => {
                info!("Session {} navigating to {:?}", self.id, outcome);
                None
            }
        }
    }
}

/// Cloneable handle used to command a session and observe it
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    commands: mpsc::Sender<CommandEnvelope>,
    views: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest published snapshot
    pub fn view(&self) -> SessionView {
        self.views.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.views.clone()
    }

    /// Whether the controller has stopped; commands then fail with `SessionClosed`
    pub fn is_stopped(&self) -> bool {
        self.views.has_changed().is_err()
    }

    /// Resolves once the controller has stopped
    pub async fn stopped(&self) {
        let mut views = self.views.clone();
        while views.changed().await.is_ok() {}
    }

    /// Submit a command and wait until it has been applied
    pub async fn send(&self, command: SessionCommand) -> Result<SessionView, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(CommandEnvelope { command, reply })
            .await
            .map_err(|_| SessionError::SessionClosed)?;

        response.await.map_err(|_| SessionError::SessionClosed)?
    }

    pub async fn start(&self) -> Result<SessionView, SessionError> {
        self.send(SessionCommand::Start).await
    }

    pub async fn next(&self) -> Result<SessionView, SessionError> {
        self.send(SessionCommand::Next).await
    }

    pub async fn stop(&self) -> Result<SessionView, SessionError> {
        self.send(SessionCommand::Stop).await
    }

    pub async fn retry_device(&self) -> Result<SessionView, SessionError> {
        self.send(SessionCommand::RetryDevice).await
    }

    pub async fn attach_user(&self, user_id: impl Into<String>) -> Result<SessionView, SessionError> {
        self.send(SessionCommand::AttachUser(user_id.into())).await
    }

    pub async fn leave(&self) -> Result<SessionView, SessionError> {
        self.send(SessionCommand::Leave).await
    }

    /// Wait for a snapshot matching `predicate`
    ///
    /// Returns the last snapshot if the session stops first.
    pub async fn wait_for(&self, predicate: impl FnMut(&SessionView) -> bool) -> SessionView {
        let mut views = self.views.clone();
        let matched = views.wait_for(predicate).await.map(|view| view.clone());
        matched.unwrap_or_else(|_| views.borrow().clone())
    }
}
