#![forbid(unsafe_code)]

//! Theme selection with persistence and system-preference fallback.
//!
//! [`ThemeManager`] holds a persisted [`ThemePreference`] and resolves it
//! to a concrete [`ResolvedTheme`]. An explicit `Light`/`Dark` preference
//! resolves to itself; `System` follows the platform's dark-scheme media
//! query, live: while the preference is `System`, scheme flips re-resolve
//! the output, and an explicit preference makes those flips inert without
//! unsubscribing.
//!
//! # Invariants
//!
//! - The preference is persisted on every change, keyed by
//!   [`ThemeConfig::storage_key`].
//! - A stored value that does not parse falls back to the configured
//!   default instead of failing construction.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::inputs::{MediaSource, PreferenceStore};
use tether_core::observable::Observable;
use tether_core::observer::ObserverGuard;

/// Media query used to follow the platform scheme under
/// [`ThemePreference::System`].
pub const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";

/// What the user asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ThemePreference {
    Light,
    Dark,
    /// Follow the platform's dark-scheme media query.
    #[default]
    System,
}

impl ThemePreference {
    fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// What actually gets rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolvedTheme {
    Light,
    Dark,
}

/// Construction parameters for [`ThemeManager`].
#[derive(Clone, Debug)]
pub struct ThemeConfig {
    /// Used when the store has no (or an unparseable) entry.
    pub default_preference: ThemePreference,
    /// Store key the preference is persisted under.
    pub storage_key: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            default_preference: ThemePreference::System,
            storage_key: "theme".to_owned(),
        }
    }
}

/// Persisted theme preference resolved against the platform scheme.
pub struct ThemeManager {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    store: Rc<dyn PreferenceStore>,
    storage_key: String,
    preference: Observable<ThemePreference>,
    resolved: Observable<ResolvedTheme>,
    system_dark: bool,
    guard: Option<ObserverGuard>,
}

impl ThemeManager {
    /// Load the stored preference (falling back to the config default) and
    /// subscribe to platform scheme changes.
    #[must_use]
    pub fn new(
        store: Rc<dyn PreferenceStore>,
        media: Rc<dyn MediaSource>,
        config: ThemeConfig,
    ) -> Self {
        let preference = store
            .get(&config.storage_key)
            .and_then(|raw| ThemePreference::parse(&raw))
            .unwrap_or(config.default_preference);
        let system_dark = media.matches(DARK_SCHEME_QUERY);

        let inner = Rc::new(RefCell::new(Inner {
            store,
            storage_key: config.storage_key,
            preference: Observable::new(preference),
            resolved: Observable::new(resolve(preference, system_dark)),
            system_dark,
            guard: None,
        }));

        let weak = Rc::downgrade(&inner);
        let guard = media.subscribe(
            DARK_SCHEME_QUERY,
            Rc::new(move |dark| {
                if let Some(rc) = weak.upgrade() {
                    Inner::on_scheme_change(&rc, dark);
                }
            }),
        );
        inner.borrow_mut().guard = Some(guard);

        Self { inner }
    }

    /// The concrete theme to render.
    #[must_use]
    pub fn resolved(&self) -> Observable<ResolvedTheme> {
        self.inner.borrow().resolved.clone()
    }

    /// The stored preference.
    #[must_use]
    pub fn preference(&self) -> Observable<ThemePreference> {
        self.inner.borrow().preference.clone()
    }

    /// Change and persist the preference, re-resolving the output.
    pub fn set_preference(&self, preference: ThemePreference) {
        let (pref_out, resolved_out, resolved) = {
            let inner = self.inner.borrow();
            inner.store.set(&inner.storage_key, preference.as_str());
            (
                inner.preference.clone(),
                inner.resolved.clone(),
                resolve(preference, inner.system_dark),
            )
        };
        pref_out.set(preference);
        resolved_out.set(resolved);
    }

    /// Flip between explicit `Light` and `Dark`, anchored at the currently
    /// resolved theme when the preference is `System`.
    pub fn toggle(&self) {
        let next = match self.inner.borrow().resolved.get() {
            ResolvedTheme::Light => ThemePreference::Dark,
            ResolvedTheme::Dark => ThemePreference::Light,
        };
        self.set_preference(next);
    }

    /// Stop following platform scheme changes. Idempotent; also runs on
    /// drop.
    pub fn dispose(&self) {
        drop(self.inner.borrow_mut().guard.take());
    }
}

impl std::fmt::Debug for ThemeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ThemeManager")
            .field("preference", &inner.preference.get())
            .field("resolved", &inner.resolved.get())
            .finish()
    }
}

fn resolve(preference: ThemePreference, system_dark: bool) -> ResolvedTheme {
    match preference {
        ThemePreference::Light => ResolvedTheme::Light,
        ThemePreference::Dark => ResolvedTheme::Dark,
        ThemePreference::System => {
            if system_dark {
                ResolvedTheme::Dark
            } else {
                ResolvedTheme::Light
            }
        }
    }
}

impl Inner {
    fn on_scheme_change(rc: &Rc<RefCell<Inner>>, dark: bool) {
        let update = {
            let mut inner = rc.borrow_mut();
            inner.system_dark = dark;
            if inner.preference.get() == ThemePreference::System {
                Some((
                    inner.resolved.clone(),
                    resolve(ThemePreference::System, dark),
                ))
            } else {
                None
            }
        };
        if let Some((output, resolved)) = update {
            output.set(resolved);
        }
    }
}
