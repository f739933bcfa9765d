//! Display surface contract consumed by the synchronization hub.
//!
//! The real surface lives outside this crate (it owns the actual pixels);
//! [`InMemorySurface`] is the reference implementation used by tests and
//! by contexts that only need to track what the display is showing.

use crate::template::ResolvedTemplate;

// ── Contract ─────────────────────────────────────────────────────

/// What a presentation surface must support.
///
/// Every method must be idempotent under repeated identical calls, and
/// applying any one kind must clear the state left by a previous call of
/// a different kind (switching from template to color removes the
/// template markup, and so on).
pub trait DisplaySurface: Send {
    /// Fill the surface with a CSS color.
    fn apply_color(&mut self, css: &str);

    /// Show an image by URL.
    fn apply_image(&mut self, url: &str);

    /// Show a resolved template, or clear the template area on `None`.
    fn apply_template(&mut self, template: Option<&ResolvedTemplate>);
}

// ── NullSurface ──────────────────────────────────────────────────

/// Surface for contexts that control but never render (secondary control
/// windows). All applies are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl DisplaySurface for NullSurface {
    fn apply_color(&mut self, _css: &str) {}
    fn apply_image(&mut self, _url: &str) {}
    fn apply_template(&mut self, _template: Option<&ResolvedTemplate>) {}
}

// ── InMemorySurface ──────────────────────────────────────────────

/// What the surface is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayState {
    #[default]
    Blank,
    Color(String),
    Image(String),
    /// Template id of the applied layout.
    Template(String),
}

/// Reference surface holding the display state as a value.
///
/// Replacing the whole state on every apply gives the clearing behavior
/// the contract demands for free. The raw call counter exists so tests
/// can assert on delivery counts, not just on the final state.
#[derive(Debug, Default)]
pub struct InMemorySurface {
    state: DisplayState,
    apply_calls: usize,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Total `apply*` calls received, including idempotent repeats.
    pub fn apply_calls(&self) -> usize {
        self.apply_calls
    }
}

impl DisplaySurface for InMemorySurface {
    fn apply_color(&mut self, css: &str) {
        self.apply_calls += 1;
        self.state = DisplayState::Color(css.to_string());
    }

    fn apply_image(&mut self, url: &str) {
        self.apply_calls += 1;
        self.state = DisplayState::Image(url.to_string());
    }

    fn apply_template(&mut self, template: Option<&ResolvedTemplate>) {
        self.apply_calls += 1;
        self.state = match template {
            Some(t) => DisplayState::Template(t.meta.id.clone()),
            None => DisplayState::Blank,
        };
    }
}
