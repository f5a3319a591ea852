//! Generation pipeline and the interactive session around it
//!
//! A [`Generator`] turns one snapshot of the form into a raster, walking
//! `Validating -> Encoding -> (Compositing) -> Ready | Failed`. A [`Session`]
//! owns the form, the displayed result and the request counter, and regenerates
//! once edits have settled for the configured quiet period. Every generation
//! carries a [`RequestId`]; results that are not the latest are dropped.

use crate::compositor::{LogoAsset, LogoOptions, overlay_logo};
use crate::config::QrstudioConfig;
use crate::error::{Error, Result};
use crate::input::{FormInput, InputMode};
use crate::logging;
use crate::metrics;
use crate::output::{self, RenderedGeneration};
use crate::qr::{Payload, QrEncoder, RasterImage};
use crate::template::{self, ColorPair, Template};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;

/// Default quiet period before regenerating
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Step of a single generation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    /// Nothing generated yet
    Idle,
    /// Checking the active input mode
    Validating,
    /// Building the symbol
    Encoding,
    /// Drawing the logo
    Compositing,
    /// Raster available
    Ready,
    /// Cycle ended with an error
    Failed,
}

/// Identifier attached to each generation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues strictly increasing request ids and remembers the latest
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    /// Create a tracker that has issued nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id; it becomes the only current one.
    pub fn next(&mut self) -> RequestId {
        self.latest += 1;
        RequestId(self.latest)
    }

    /// Whether `id` is the most recently issued id
    pub fn is_current(&self, id: RequestId) -> bool {
        self.latest != 0 && id.0 == self.latest
    }

    /// Most recently issued id, if any
    pub fn latest(&self) -> Option<RequestId> {
        (self.latest != 0).then_some(RequestId(self.latest))
    }
}

/// Quiet-period timer: fires once no touch happened for `quiet`
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create an idle debouncer
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Configured quiet period
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Record an edit, pushing the deadline out by the quiet period
    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
    }

    /// Whether an edit is waiting to settle
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Forget a pending edit
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Wait until the pending edit settles. Never resolves when idle.
    pub async fn settled(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

/// One change to the form
#[derive(Debug, Clone)]
pub enum FormEdit {
    /// Switch input mode
    Mode(InputMode),
    /// Replace URL text
    Url(String),
    /// Replace contact name
    Name(String),
    /// Replace contact phone
    Phone(String),
    /// Replace contact email
    Email(String),
    /// Replace contact organization (empty clears it)
    Organization(String),
    /// Select a template by id
    Template(String),
    /// Attach an already loaded logo
    Logo(LogoAsset),
    /// Remove the logo
    ClearLogo,
}

/// Everything the user has entered
#[derive(Debug, Clone)]
pub struct FormState {
    /// Text fields and active mode
    pub input: FormInput,
    /// Selected template id
    pub template_id: String,
    /// Optional logo
    pub logo: Option<LogoAsset>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            input: FormInput::default(),
            template_id: template::DEFAULT_TEMPLATE_ID.to_string(),
            logo: None,
        }
    }
}

impl FormState {
    /// Form with the given input and template
    pub fn new(input: FormInput, template_id: impl Into<String>) -> Self {
        Self {
            input,
            template_id: template_id.into(),
            logo: None,
        }
    }

    /// Selected template, or the default one for an unknown id
    pub fn template(&self) -> &'static Template {
        template::find(&self.template_id).unwrap_or_else(template::default_template)
    }

    /// Apply one edit. Unknown template ids are rejected and leave the form unchanged.
    pub fn apply(&mut self, edit: FormEdit) -> Result<()> {
        match edit {
            FormEdit::Mode(mode) => self.input.mode = mode,
            FormEdit::Url(url) => self.input.url = url,
            FormEdit::Name(name) => self.input.contact.name = name,
            FormEdit::Phone(phone) => self.input.contact.phone = phone,
            FormEdit::Email(email) => self.input.contact.email = email,
            FormEdit::Organization(org) => {
                self.input.contact.organization = (!org.trim().is_empty()).then_some(org);
            }
            FormEdit::Template(id) => {
                let template = template::lookup(&id)?;
                self.template_id = template.id.to_string();
            }
            FormEdit::Logo(logo) => self.logo = Some(logo),
            FormEdit::ClearLogo => self.logo = None,
        }
        Ok(())
    }
}

/// A successfully generated code
#[derive(Debug, Clone)]
pub struct Generated {
    /// Final raster, with logo if one was applied
    pub raster: RasterImage,
    /// Encoded payload
    pub payload: Payload,
    /// Template used
    pub template: &'static Template,
    /// Input mode the payload came from
    pub mode: InputMode,
    /// Colors actually handed to the encoder
    pub colors: ColorPair,
    /// Whether the logo made it onto the raster
    pub logo_applied: bool,
    /// Non-fatal problems (e.g. logo fallback)
    pub warnings: Vec<String>,
}

/// Result of one generation cycle
#[derive(Debug)]
pub struct GenerationOutcome {
    /// Cycle identifier
    pub id: RequestId,
    /// States visited, in order, ending in `Ready` or `Failed`
    pub states: Vec<GenerationState>,
    /// Generated code or the error that stopped the cycle
    pub result: Result<Generated>,
}

impl GenerationOutcome {
    /// Terminal state of the cycle
    pub fn final_state(&self) -> GenerationState {
        if self.result.is_ok() {
            GenerationState::Ready
        } else {
            GenerationState::Failed
        }
    }

    /// Whether the encoder was invoked
    pub fn attempted_encode(&self) -> bool {
        self.states.contains(&GenerationState::Encoding)
    }
}

/// Stateless pipeline from form snapshot to raster
#[derive(Debug, Clone, Default)]
pub struct Generator {
    encoder: QrEncoder,
    logo_options: LogoOptions,
}

impl Generator {
    /// Create a generator from an encoder and logo settings
    pub fn new(encoder: QrEncoder, logo_options: LogoOptions) -> Self {
        Self {
            encoder,
            logo_options,
        }
    }

    /// Build a generator from loaded configuration
    pub fn from_config(config: &QrstudioConfig) -> Self {
        Self::new(QrEncoder::new(config.render), config.logo.clone())
    }

    /// Run one full cycle over `form` inside a span tagged with `id`.
    pub async fn generate(&self, id: RequestId, form: &FormState) -> GenerationOutcome {
        let span = logging::generation_span(id, &form.template_id);
        self.cycle(id, form).instrument(span).await
    }

    async fn cycle(&self, id: RequestId, form: &FormState) -> GenerationOutcome {
        let started = std::time::Instant::now();
        let mut states = vec![GenerationState::Validating];
        let result = self.pipeline(form, &mut states).await;

        match &result {
            Ok(generated) => tracing::info!(
                mode = %generated.mode,
                bytes = generated.payload.len(),
                logo = generated.logo_applied,
                "Generated QR code"
            ),
            Err(err) if err.is_validation() => {
                tracing::debug!("Input incomplete; skipped encoding")
            }
            Err(err) => tracing::error!(error = %err, "QR generation failed"),
        }

        metrics::record(started.elapsed(), result.is_ok(), form.input.mode);

        let mut outcome = GenerationOutcome {
            id,
            states,
            result,
        };
        let terminal = outcome.final_state();
        outcome.states.push(terminal);
        outcome
    }

    async fn pipeline(
        &self,
        form: &FormState,
        states: &mut Vec<GenerationState>,
    ) -> Result<Generated> {
        let payload = form.input.payload()?;
        let template = form.template();
        let colors = template.colors();

        states.push(GenerationState::Encoding);
        let raster = self.encoder.encode(&payload, &colors)?;

        let mut warnings = Vec::new();
        let mut logo_applied = false;
        let raster = match &form.logo {
            Some(logo) => {
                states.push(GenerationState::Compositing);
                match overlay_logo(raster.clone(), logo.clone(), self.logo_options.clone()).await {
                    Ok(with_logo) => {
                        logo_applied = true;
                        with_logo
                    }
                    Err(err) => {
                        tracing::warn!(
                            logo = %logo.name(),
                            error = %err,
                            "Failed to add logo, using QR without logo"
                        );
                        warnings.push(format!(
                            "Failed to add logo, using QR without logo: {}",
                            err.user_message()
                        ));
                        raster
                    }
                }
            }
            None => raster,
        };

        Ok(Generated {
            raster,
            payload,
            template,
            mode: form.input.mode,
            colors,
            logo_applied,
            warnings,
        })
    }
}

/// Input to a running session
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Change the form
    Edit(FormEdit),
    /// Read a logo file and attach it
    SelectLogo(PathBuf),
    /// Write the displayed raster into a directory
    Export(PathBuf),
}

/// Output of a running session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new raster is displayed
    Ready {
        /// Cycle that produced it
        id: RequestId,
        /// Presentation of the result
        report: RenderedGeneration,
    },
    /// The latest cycle failed; the previous raster stays displayed
    Failed {
        /// Failed cycle
        id: RequestId,
        /// Inline user message
        message: String,
    },
    /// A result arrived for a superseded cycle and was dropped
    Discarded {
        /// Stale cycle
        id: RequestId,
    },
    /// An edit or logo selection was refused
    Rejected {
        /// Inline user message
        message: String,
    },
    /// Export finished; `None` when nothing was displayed
    Exported {
        /// Written file
        path: Option<PathBuf>,
    },
}

/// Form plus displayed result, regenerating on settled input
pub struct Session {
    generator: Arc<Generator>,
    form: FormState,
    tracker: RequestTracker,
    current: Option<Generated>,
    last_error: Option<String>,
    generated: u64,
    state: GenerationState,
    quiet: Duration,
}

impl Session {
    /// Create an idle session
    pub fn new(generator: Generator, form: FormState) -> Self {
        Self {
            generator: Arc::new(generator),
            form,
            tracker: RequestTracker::new(),
            current: None,
            last_error: None,
            generated: 0,
            state: GenerationState::Idle,
            quiet: DEFAULT_DEBOUNCE,
        }
    }

    /// Override the quiet period used by [`Session::run`]
    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.quiet = quiet;
        self
    }

    /// Current form
    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Apply an edit without regenerating
    pub fn apply(&mut self, edit: FormEdit) -> Result<()> {
        self.form.apply(edit)
    }

    /// Load and attach a logo. On failure the form and displayed raster are untouched.
    pub async fn select_logo(&mut self, path: &Path) -> Result<()> {
        match LogoAsset::load(path).await {
            Ok(logo) => {
                self.form.logo = Some(logo);
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Displayed result, if any
    pub fn current(&self) -> Option<&Generated> {
        self.current.as_ref()
    }

    /// Message from the latest failure, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of successful generations in this session
    pub fn generated_count(&self) -> u64 {
        self.generated
    }

    /// Terminal state of the latest accepted cycle
    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Issue a new request id, superseding any in-flight cycle
    pub fn begin_request(&mut self) -> RequestId {
        self.state = GenerationState::Validating;
        self.tracker.next()
    }

    /// Generate immediately from the current form
    pub async fn regenerate(&mut self) -> SessionEvent {
        let id = self.begin_request();
        let outcome = self.generator.generate(id, &self.form).await;
        self.accept(outcome)
    }

    /// Fold a finished cycle into the session, dropping stale ones.
    pub fn accept(&mut self, outcome: GenerationOutcome) -> SessionEvent {
        if !self.tracker.is_current(outcome.id) {
            tracing::debug!(
                request = %outcome.id,
                latest = ?self.tracker.latest(),
                "Discarding stale result"
            );
            return SessionEvent::Discarded { id: outcome.id };
        }

        self.state = outcome.final_state();
        match outcome.result {
            Ok(generated) => {
                self.generated += 1;
                self.last_error = None;
                let report = output::render_generation(&generated, self.generated);
                self.current = Some(generated);
                SessionEvent::Ready {
                    id: outcome.id,
                    report,
                }
            }
            Err(err) => {
                let message = err.user_message();
                self.last_error = Some(message.clone());
                SessionEvent::Failed {
                    id: outcome.id,
                    message,
                }
            }
        }
    }

    /// Save the displayed raster into `dir`; no-op without one.
    pub fn export(&self, dir: &Path) -> Result<Option<PathBuf>> {
        match &self.current {
            Some(generated) => output::export(
                Some(&generated.raster),
                dir,
                generated.template,
                generated.mode,
            ),
            None => Ok(None),
        }
    }

    /// Process commands until the channel closes and all work has drained.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let mut debouncer = Debouncer::new(self.quiet);
        let mut tasks: JoinSet<GenerationOutcome> = JoinSet::new();
        let mut commands_open = true;

        loop {
            if !commands_open && !debouncer.is_pending() && tasks.is_empty() {
                break;
            }

            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if let Some(event) = self.handle_command(command, &mut debouncer).await {
                            let _ = events.send(event).await;
                        }
                    }
                    None => commands_open = false,
                },
                _ = debouncer.settled(), if debouncer.is_pending() => {
                    let id = self.begin_request();
                    let generator = Arc::clone(&self.generator);
                    let form = self.form.clone();
                    tasks.spawn(async move { generator.generate(id, &form).await });
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Ok(outcome) => {
                        let event = self.accept(outcome);
                        let _ = events.send(event).await;
                    }
                    Err(err) => tracing::error!(error = %err, "Generation task aborted"),
                },
            }
        }

        self
    }

    async fn handle_command(
        &mut self,
        command: SessionCommand,
        debouncer: &mut Debouncer,
    ) -> Option<SessionEvent> {
        match command {
            SessionCommand::Edit(edit) => match self.form.apply(edit) {
                Ok(()) => {
                    debouncer.touch();
                    None
                }
                Err(err) => Some(err.into()),
            },
            SessionCommand::SelectLogo(path) => match self.select_logo(&path).await {
                Ok(()) => {
                    debouncer.touch();
                    None
                }
                Err(err) => Some(err.into()),
            },
            SessionCommand::Export(dir) => Some(match self.export(&dir) {
                Ok(path) => SessionEvent::Exported { path },
                Err(err) => err.into(),
            }),
        }
    }
}

impl From<Error> for SessionEvent {
    fn from(err: Error) -> Self {
        SessionEvent::Rejected {
            message: err.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ContactRecord;

    #[test]
    fn tracker_only_latest_is_current() {
        let mut tracker = RequestTracker::new();
        assert!(tracker.latest().is_none());
        let first = tracker.next();
        let second = tracker.next();
        assert!(second > first);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn unknown_template_edit_is_refused() {
        let mut form = FormState::default();
        assert!(form.apply(FormEdit::Template("no-such".to_string())).is_err());
        assert_eq!(form.template_id, "purple");
        form.apply(FormEdit::Template("ai-matrix".to_string())).unwrap();
        assert_eq!(form.template().name, "Matrix");
    }

    #[test]
    fn blank_organization_clears_field() {
        let mut form = FormState::default();
        form.apply(FormEdit::Organization("Acme".to_string())).unwrap();
        assert_eq!(form.input.contact.organization.as_deref(), Some("Acme"));
        form.apply(FormEdit::Organization("  ".to_string())).unwrap();
        assert!(form.input.contact.organization.is_none());
    }

    #[tokio::test]
    async fn validation_failure_skips_encoder() {
        let generator = Generator::default();
        let form = FormState::new(
            FormInput::contact(ContactRecord::new("John Doe")),
            "classic",
        );
        let outcome = generator.generate(RequestId(1), &form).await;
        assert_eq!(
            outcome.states,
            [GenerationState::Validating, GenerationState::Failed]
        );
        assert!(!outcome.attempted_encode());
        assert!(outcome.result.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn stale_outcome_is_discarded() {
        let mut session = Session::new(
            Generator::default(),
            FormState::new(FormInput::url("first.example"), "classic"),
        );
        let stale = session.begin_request();
        let outcome = session.generator.generate(stale, &session.form).await;

        let fresh = session.begin_request();
        assert!(matches!(session.accept(outcome), SessionEvent::Discarded { id } if id == stale));
        assert!(session.current().is_none());
        assert_eq!(session.generated_count(), 0);

        let outcome = session.generator.generate(fresh, &session.form).await;
        assert!(matches!(session.accept(outcome), SessionEvent::Ready { .. }));
        assert_eq!(session.generated_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_waits_for_quiet_period() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        assert!(!debouncer.is_pending());

        let start = Instant::now();
        debouncer.touch();
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.touch();
        debouncer.settled().await;

        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert!(!debouncer.is_pending());
    }
}
