//! Convergence barrier.
//!
//! Once composed, a form tracks which children have passed validation since
//! their last reset. The child whose pass completes the set triggers the
//! form's own validation, whatever order the children finished in.

use std::sync::Arc;

use futures::future::BoxFuture;

use super::Form;
use crate::composition::CompositionParent;
use crate::error::FormError;

impl Form {
    /// Wire the composition protocol into every child.
    ///
    /// Must be called once, after construction. A second call, or a child
    /// that already belongs to another form, fails.
    pub fn compose(self) -> Result<Self, FormError> {
        let already_composed = self
            .inner
            .state
            .update(|s| std::mem::replace(&mut s.composed, true));
        if already_composed {
            return Err(FormError::already_composed());
        }

        for (index, (key, child)) in self.inner.children.iter().enumerate() {
            child
                .set_composition_parent(self.parent_for(index))
                .map_err(|e| e.within(key))?;
        }

        log::debug!("composed form with {} children", self.len());
        Ok(self)
    }

    pub fn is_composed(&self) -> bool {
        self.inner.state.read(|s| s.composed)
    }

    /// Install the hooks of the form this one is nested in.
    pub fn set_composition_parent(&self, parent: CompositionParent) -> Result<(), FormError> {
        self.inner.state.update(|s| {
            if s.parent.is_some() {
                return Err(FormError::already_composed());
            }
            s.parent = Some(parent);
            Ok(())
        })
    }

    /// Number of children that passed validation since their last reset.
    pub fn validated_children(&self) -> usize {
        self.inner.state.read(|s| s.validated_children.len())
    }

    fn parent_for(&self, index: usize) -> CompositionParent {
        let on_pass = Arc::downgrade(&self.inner);
        let on_init = Arc::downgrade(&self.inner);

        CompositionParent::new(
            move || {
                let inner = on_pass.upgrade()?;
                Form { inner }.child_passed(index)
            },
            move || {
                if let Some(inner) = on_init.upgrade() {
                    Form { inner }.child_reset(index);
                }
            },
        )
    }

    fn child_reset(&self, index: usize) {
        self.inner.state.update(|s| s.validated_children.remove(&index));
    }

    fn child_passed(&self, index: usize) -> Option<BoxFuture<'static, ()>> {
        let has_field_error = self.has_field_error();
        let total = self.len();

        let converged = self.inner.state.update(|s| {
            // A child passing invalidates the last form-level verdict.
            s.form_error = None;
            s.validated_children.insert(index);

            let ready = !has_field_error && s.validating == 0 && s.validated_children.len() == total;
            if ready {
                s.validating += 1;
            }
            ready
        });

        if !converged {
            return None;
        }

        log::debug!("all {} children passed, validating form", total);
        let form = self.clone();
        Some(Box::pin(async move {
            if let Err(err) = form.run_claimed_validation().await {
                log::error!("form validation after convergence failed: {}", err);
            }
        }))
    }

    pub(super) async fn notify_validation_pass(&self) {
        let parent = self.inner.state.read(|s| s.parent.clone());
        if let Some(follow_up) = parent.and_then(|parent| parent.validation_passed()) {
            follow_up.await;
        }
    }

    pub(super) fn notify_init(&self) {
        if let Some(parent) = self.inner.state.read(|s| s.parent.clone()) {
            parent.initialized();
        }
    }
}
