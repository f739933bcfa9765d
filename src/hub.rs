//! Synchronization hub: the per-context state machine that keeps every
//! observer of the display converged on one command sequence.
//!
//! Two triggers exist. A **local issue** validates the command, applies it
//! to the context's own surface, and dispatches it on every live link
//! tagged with this context's origin id. An **inbound receipt** first
//! discards echoes of our own dispatches and second copies of an
//! already-applied command; anything else is applied and, if not yet
//! forwarded, re-dispatched once on every link other than the one it
//! arrived on. The forwarded marker bounds fan-out to one hop beyond the
//! origin for any topology.

use std::sync::Arc;

use crate::color::{ConversionEngine, InputMode};
use crate::command::{Command, Envelope};
use crate::error::BeamError;
use crate::session::SessionContext;
use crate::surface::DisplaySurface;
use crate::template::{ResolveOutcome, TemplateResolver};
use crate::transport::Arrival;

// ── Status types ─────────────────────────────────────────────────

/// Outcome of a local issue. `delivered = false` is informational, not an
/// error: no live transport accepted the command, but it was still
/// applied locally where a surface exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStatus {
    pub delivered: bool,
}

/// Counters for one pump pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub received: usize,
    pub applied: usize,
    pub forwarded: usize,
    pub discarded: usize,
}

// ── SyncHub ──────────────────────────────────────────────────────

/// One context's hub, owning its session state and display surface.
///
/// Contexts that never render pass a [`NullSurface`].
///
/// [`NullSurface`]: crate::surface::NullSurface
pub struct SyncHub<S: DisplaySurface> {
    session: SessionContext,
    surface: S,
    resolver: Option<Arc<TemplateResolver>>,
    engine: ConversionEngine,
}

impl<S: DisplaySurface> SyncHub<S> {
    pub fn new(session: SessionContext, surface: S) -> Self {
        Self {
            session,
            surface,
            resolver: None,
            engine: ConversionEngine::new(),
        }
    }

    /// Attach a template resolver. Without one, template commands are
    /// acknowledged but leave the surface untouched.
    pub fn with_resolver(mut self, resolver: Arc<TemplateResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.engine
    }

    /// Tear the context down, closing every transport.
    pub fn close(&mut self) {
        self.session.close();
    }

    // ── Local issue ──────────────────────────────────────────────

    /// Validate and dispatch an operator command.
    ///
    /// Validation failure means nothing is dispatched. Transport
    /// unavailability is not a failure; it comes back as
    /// `delivered = false`.
    pub async fn issue(&mut self, command: Command) -> Result<DispatchStatus, BeamError> {
        command.validate()?;
        if let (Command::Template(id), Some(resolver)) = (&command, &self.resolver) {
            if resolver.get_metadata(id).is_none() {
                return Err(BeamError::UnknownTemplate(id.clone()));
            }
        }

        let envelope = Envelope::local(command, self.session.origin_id().clone());
        self.apply(&envelope).await;

        let delivered = self.session.dispatch(&envelope, None);
        if delivered {
            tracing::debug!(command = %envelope.command, "command dispatched");
        } else {
            tracing::info!(command = %envelope.command, "no live transport link; applied locally only");
        }
        Ok(DispatchStatus { delivered })
    }

    // ── Inbound ──────────────────────────────────────────────────

    /// Drain and process every pending inbound envelope.
    pub async fn pump(&mut self) -> PumpStats {
        let mut stats = PumpStats::default();
        while let Some((envelope, arrival)) = self.session.next_inbound() {
            stats.received += 1;
            self.handle_inbound(envelope, arrival, &mut stats).await;
        }
        stats
    }

    async fn handle_inbound(&mut self, envelope: Envelope, arrival: Arrival, stats: &mut PumpStats) {
        if envelope.origin_id == *self.session.origin_id() {
            tracing::trace!("discarding echo of our own dispatch");
            stats.discarded += 1;
            return;
        }
        if self.session.is_duplicate(&envelope) {
            tracing::trace!(command = %envelope.command, "second copy over another link; discarding");
            stats.discarded += 1;
            return;
        }

        self.apply(&envelope).await;
        stats.applied += 1;

        if !envelope.already_forwarded {
            let relay = envelope.forwarded();
            if self.session.dispatch(&relay, Some(&arrival)) {
                tracing::trace!(command = %relay.command, "forwarded one hop");
                stats.forwarded += 1;
            }
        }
    }

    // ── Apply ────────────────────────────────────────────────────

    async fn apply(&mut self, envelope: &Envelope) {
        match &envelope.command {
            Command::Color(css) => {
                self.surface.apply_color(css);
                // Track the pivot for field re-derivation. Non-hex CSS
                // strings stay applied but are not trackable.
                if let Ok(tuple) = self.engine.parse("srgb", InputMode::Hex, css) {
                    if let Ok(pivot) = self.engine.to_pivot("srgb", tuple) {
                        self.session.remember_pivot(pivot);
                    }
                }
            }
            Command::Image(url) => self.surface.apply_image(url),
            Command::Template(id) => {
                let Some(resolver) = self.resolver.clone() else {
                    tracing::debug!(%id, "no resolver attached; template not applied");
                    self.session.note_applied(envelope);
                    return;
                };
                let request = resolver.request(id);
                match resolver.resolve(&request).await {
                    ResolveOutcome::Resolved(template) => {
                        self.surface.apply_template(Some(&template));
                    }
                    ResolveOutcome::NotFound => {
                        tracing::warn!(%id, "unknown template; display unchanged");
                    }
                    ResolveOutcome::Stale => {
                        // Superseded mid-flight; the newer request owns
                        // the display now.
                    }
                    ResolveOutcome::Failed(error) => {
                        tracing::warn!(%id, %error, "template load failed; display unchanged");
                    }
                }
            }
        }
        self.session.note_applied(envelope);
    }

    // ── Field re-derivation ──────────────────────────────────────

    /// Render the most recently applied color in another space and mode,
    /// or `None` when no trackable color has been applied yet.
    pub fn rederive(&self, space: &str, mode: InputMode) -> Result<Option<String>, BeamError> {
        match self.session.last_pivot() {
            None => Ok(None),
            Some(pivot) => self.engine.rederive(space, mode, pivot).map(Some),
        }
    }
}
