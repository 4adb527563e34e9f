//! # Page Wizards
//!
//! A [`Wizard`] walks a user through a multi-page form. Advancing
//! force-validates the page's form node first:
//!
//! - any `error` blocks the step;
//! - `warning`s block only the first attempt to leave a page, so the user
//!   sees them once and may then continue.
//!
//! Either way the page is marked visited. Successful steps push the page
//! onto the history that [`Wizard::previous_page`] pops.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use formtree_core::Severity;

use crate::node::FormNode;

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by wizard navigation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// `previous_page` was called on the first page.
    #[error("no previous page: wizard history is empty")]
    NoHistory,
}

// ─── Outcome ─────────────────────────────────────────────────────────

/// Result of [`Wizard::next_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<P> {
    /// The wizard moved on.
    Advanced {
        /// The page that was left.
        from: P,
        /// The new current page.
        to: P,
    },
    /// Validation stopped the step; the wizard stays on `page`.
    Blocked {
        /// The current page.
        page: P,
        /// Number of `error` messages in the page's form.
        errors: usize,
        /// Number of `warning` messages in the page's form.
        warnings: usize,
    },
}

impl<P> PageOutcome<P> {
    /// True for [`PageOutcome::Advanced`].
    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

// ─── Wizard ──────────────────────────────────────────────────────────

/// Page navigator with history and visited tracking.
#[derive(Debug, Clone)]
pub struct Wizard<P> {
    page: P,
    history: Vec<P>,
    visited: BTreeSet<P>,
}

impl<P> Wizard<P>
where
    P: Clone + Ord + fmt::Debug,
{
    /// Start on `initial`.
    pub fn new(initial: P) -> Self {
        Self {
            page: initial,
            history: Vec::new(),
            visited: BTreeSet::new(),
        }
    }

    /// The page currently shown.
    pub fn current_page(&self) -> &P {
        &self.page
    }

    /// Pages left by successful steps, oldest first.
    pub fn history(&self) -> &[P] {
        &self.history
    }

    /// Pages the user has attempted to leave.
    pub fn visited(&self) -> &BTreeSet<P> {
        &self.visited
    }

    /// Try to move to `next`, validating the current page's form if given.
    pub fn next_page(&mut self, node: Option<&mut FormNode>, next: P) -> PageOutcome<P> {
        let first_visit = !self.visited.contains(&self.page);
        self.visited.insert(self.page.clone());

        if let Some(node) = node {
            node.validate(true);
            let errors = node.errors().count(Severity::Error);
            let warnings = node.errors().count(Severity::Warning);
            if errors > 0 || (warnings > 0 && first_visit) {
                debug!(page = ?self.page, errors, warnings, first_visit, "wizard step blocked");
                return PageOutcome::Blocked {
                    page: self.page.clone(),
                    errors,
                    warnings,
                };
            }
        }

        let from = std::mem::replace(&mut self.page, next);
        self.history.push(from.clone());
        debug!(from = ?from, to = ?self.page, "wizard advanced");
        PageOutcome::Advanced {
            from,
            to: self.page.clone(),
        }
    }

    /// Go back to the most recently left page.
    pub fn previous_page(&mut self) -> Result<&P, WizardError> {
        let page = self.history.pop().ok_or(WizardError::NoHistory)?;
        self.page = page;
        Ok(&self.page)
    }
}
