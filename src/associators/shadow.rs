//! Junction row shadows and list reconciliation
//!
//! A shadow is a transient, in-memory image of one junction row of an
//! ordered association: either a row that currently exists (loaded with its
//! persisted `previous`/`next` neighbors) or a row the caller wants to
//! exist. [`merge_shadows`] reconciles the two sets against the caller's
//! desired ordering and marks each shadow with the single SQL mutation it
//! needs, so that replacing a list wholesale touches the minimum number of
//! rows. Shadows are built fresh per call and discarded once the SQL has
//! been issued.

use log::warn;
use std::collections::HashSet;

/// Transient image of one junction row during reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntityShadow {
    /// Persisted junction row id, `None` until the row is created
    pub junction_id: Option<i64>,
    /// Right entity id this row links to
    pub entity_id: i64,
    /// Persisted neighbor entity ids
    pub previous: Option<i64>,
    pub next: Option<i64>,
    /// Computed neighbor entity ids under the desired ordering
    pub new_previous: Option<i64>,
    pub new_next: Option<i64>,
    /// Mutation flags: at most one of `create`/`remove` is set;
    /// `update_links` only applies to surviving (`common`) rows
    pub create: bool,
    pub remove: bool,
    pub common: bool,
    pub update_links: bool,
}

impl EntityShadow {
    /// Shadow of a currently-persisted junction row
    pub(crate) fn persisted(
        junction_id: i64,
        entity_id: i64,
        previous: Option<i64>,
        next: Option<i64>,
    ) -> Self {
        Self {
            junction_id: Some(junction_id),
            entity_id,
            previous,
            next,
            new_previous: None,
            new_next: None,
            create: false,
            remove: false,
            common: false,
            update_links: false,
        }
    }

    fn desired(entity_id: i64) -> Self {
        Self {
            junction_id: None,
            entity_id,
            previous: None,
            next: None,
            new_previous: None,
            new_next: None,
            create: false,
            remove: false,
            common: false,
            update_links: false,
        }
    }
}

/// Reconcile the persisted junction rows of one left-id group against the
/// desired entity ordering
///
/// Returns the working shadow list: the desired entries in caller order
/// (each marked `create` or `common`), followed by the shadows marked
/// `remove`, which are carried only so their DELETE is issued. Surviving
/// rows keep their junction id, and `update_links` is set only where the
/// persisted neighbors differ from the computed ones.
pub(crate) fn merge_shadows(
    originals: Vec<EntityShadow>,
    desired_ids: &[i64],
) -> Vec<EntityShadow> {
    let desired_ids = dedup_ids(desired_ids);

    // Empty desired list: everything currently linked is removed.
    if desired_ids.is_empty() {
        return originals
            .into_iter()
            .map(|mut shadow| {
                shadow.remove = true;
                shadow
            })
            .collect();
    }

    let mut merged: Vec<EntityShadow> = desired_ids
        .iter()
        .map(|&entity_id| EntityShadow::desired(entity_id))
        .collect();

    // Carry persisted state into the shadows that survive, so they are
    // updated in place instead of recreated.
    let mut removed: Vec<EntityShadow> = Vec::new();
    for original in originals {
        match merged
            .iter_mut()
            .find(|shadow| shadow.entity_id == original.entity_id)
        {
            Some(shadow) => {
                shadow.common = true;
                shadow.junction_id = original.junction_id;
                shadow.previous = original.previous;
                shadow.next = original.next;
            }
            None => {
                let mut shadow = original;
                shadow.remove = true;
                removed.push(shadow);
            }
        }
    }

    // The desired ordering is the base list: compute each survivor's
    // target neighbors from it, then flag the ones whose persisted
    // pointers actually differ.
    let count = merged.len();
    for index in 0..count {
        let new_previous = if index > 0 {
            Some(desired_ids[index - 1])
        } else {
            None
        };
        let new_next = if index + 1 < count {
            Some(desired_ids[index + 1])
        } else {
            None
        };

        let shadow = &mut merged[index];
        shadow.new_previous = new_previous;
        shadow.new_next = new_next;

        if shadow.common {
            shadow.update_links =
                shadow.previous != shadow.new_previous || shadow.next != shadow.new_next;
        } else {
            shadow.create = true;
        }
    }

    merged.extend(removed);
    merged
}

fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(ids.len());
    for &id in ids {
        if seen.insert(id) {
            out.push(id);
        } else {
            warn!("duplicate entity id {} in desired ordered list, keeping first", id);
        }
    }
    out
}
