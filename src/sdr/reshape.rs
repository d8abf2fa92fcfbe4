//! Views: nodes that reinterpret another node's active set under new dimensions.
//!
//! A view shares the active set of its parent, which is either a canonical node or another
//! view, and derives its own dense and coordinate encodings under its own dimensions. It
//! keeps only a weak reference to the parent plus a subscription on the parent's notifier:
//!
//! - when the parent changes, the view drops its cached encodings and re-fires
//!   [`SdrEvent::ValueChanged`] to its own subscribers, so the change ripples down the tree;
//! - when the parent is destroyed, the view becomes orphaned: it forgets the parent, drops
//!   its cache and fires [`SdrEvent::Destroyed`] to its own subscribers, which orphans its
//!   own views in turn. An orphaned view stays a valid object but every read fails with
//!   [`crate::Error::UseAfterFree`];
//! - when the view itself is destroyed, it unsubscribes from the parent first, so the parent
//!   never calls into a dead node.
//!
//! Destroying a view never affects its parent or its siblings.

use std::sync::{atomic::Ordering, Arc, Mutex, Weak};

use crate::{utils::checked_size, Error, Result};

use super::{NodeKind, ParentLink, Sdr, SdrEvent, SdrNode};

impl Sdr {
    /// Creates a view of `parent` with new dimensions of the same size.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterFree`] if `parent` is an orphaned view,
    /// [`Error::InvalidValue`] for an empty dimension list and
    /// [`Error::DimensionMismatch`] if the product of `dimensions` differs from the
    /// parent's size. Nothing is registered with the parent on failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sdrscope::{Error, Sdr};
    ///
    /// let parent = Sdr::new(&[11])?;
    /// assert!(matches!(
    ///     Sdr::reshape(&parent, &[11, 0]),
    ///     Err(Error::DimensionMismatch { expected: 11, actual: 0 })
    /// ));
    /// # Ok::<(), sdrscope::Error>(())
    /// ```
    pub fn reshape(parent: &Sdr, dimensions: &[u32]) -> Result<Sdr> {
        if parent.is_orphaned() {
            return Err(Error::UseAfterFree);
        }
        if dimensions.is_empty() {
            return Err(Error::InvalidValue(
                "a view needs at least one dimension".to_string(),
            ));
        }
        let size = checked_size(dimensions).unwrap_or(usize::MAX);
        if size != parent.size() {
            return Err(Error::DimensionMismatch {
                expected: parent.size(),
                actual: size,
            });
        }

        let node = Arc::new(SdrNode::new(
            dimensions.to_vec(),
            size,
            NodeKind::Reshape(Mutex::new(None)),
        ));
        lock!(node.cache).invalidate();

        let child = Arc::downgrade(&node);
        let listener = Arc::new(move |event: SdrEvent| on_parent_event(&child, event));
        let token = parent.node.notifier.subscribe(listener);
        if let NodeKind::Reshape(link) = &node.kind {
            *lock!(link) = Some(ParentLink {
                parent: Arc::downgrade(&parent.node),
                token,
            });
        }

        log::debug!(
            "created view {:?} over {:?}",
            node.dimensions,
            parent.dimensions()
        );
        Ok(Sdr { node })
    }

    /// Creates a view of `parent` with the parent's own dimensions.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterFree`] if `parent` is an orphaned view.
    pub fn view(parent: &Sdr) -> Result<Sdr> {
        Sdr::reshape(parent, parent.dimensions())
    }

    /// Returns `true` for a view, `false` for a canonical node.
    #[must_use]
    pub fn is_view(&self) -> bool {
        matches!(self.node.kind, NodeKind::Reshape(_))
    }

    /// Returns `true` once the parent of this view has been destroyed.
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        self.node.is_orphaned()
    }
}

fn on_parent_event(child: &Weak<SdrNode>, event: SdrEvent) {
    let Some(child) = child.upgrade() else {
        return;
    };

    match event {
        SdrEvent::ValueChanged => {
            lock!(child.cache).invalidate();
            child.notifier.notify(SdrEvent::ValueChanged);
        }
        SdrEvent::Destroyed => orphan(&child),
    }
}

/// Cuts a view loose from a parent that is being destroyed.
fn orphan(node: &SdrNode) {
    if node.orphaned.swap(true, Ordering::AcqRel) {
        return;
    }

    // The parent is dropping its subscriber list itself, so the link is discarded without
    // unsubscribing.
    if let NodeKind::Reshape(link) = &node.kind {
        lock!(link).take();
    }
    lock!(node.cache).invalidate();

    log::debug!("view {:?} orphaned", node.dimensions);
    node.notifier.notify_destroyed();
}

/// Unsubscribes a view that is being destroyed from its parent.
pub(super) fn detach(node: &SdrNode) {
    let NodeKind::Reshape(link) = &node.kind else {
        return;
    };

    let link = lock!(link).take();
    if let Some(ParentLink { parent, token }) = link {
        if let Some(parent) = parent.upgrade() {
            parent.notifier.unsubscribe(token);
        }
    }
}
