//! Diff planner: upstream snapshot + local active set → ordered mutations.
//!
//! Planning is pure. It never touches the store, and the same inputs always
//! yield the same [`Plan`].

use std::collections::BTreeMap;

use crate::regional::{ExternalRegional, RegionalRecord};

// ─── Actions ─────────────────────────────────────────────────────────────────

/// One logical change needed to bring the local table in line with upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  /// The upstream key has no active local row.
  Insert { external_id: i64, name: String },
  /// The active local row's key is gone from upstream.
  Inactivate { local_id: i64, external_id: i64 },
  /// The key exists on both sides but the name changed. Applied as an
  /// inactivation of `local_id` followed by an insert of `new_name`.
  Replace {
    local_id:    i64,
    external_id: i64,
    new_name:    String,
  },
}

impl Action {
  pub fn external_id(&self) -> i64 {
    match self {
      Self::Insert { external_id, .. }
      | Self::Inactivate { external_id, .. }
      | Self::Replace { external_id, .. } => *external_id,
    }
  }
}

/// A primitive store operation, in the order the applier must run it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
  Inactivate {
    local_id:    i64,
    external_id: i64,
    /// `true` when this is the first half of a [`Action::Replace`].
    replaced:    bool,
  },
  Insert {
    external_id: i64,
    name:        &'a str,
    /// `true` when this is the second half of a [`Action::Replace`].
    replacement: bool,
  },
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Ordered set of actions, one per affected `external_id`, sorted by
/// ascending `external_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
  actions: Vec<Action>,
}

impl Plan {
  pub fn actions(&self) -> &[Action] { &self.actions }

  pub fn is_empty(&self) -> bool { self.actions.is_empty() }

  pub fn len(&self) -> usize { self.actions.len() }

  /// Expand the plan into primitive steps.
  ///
  /// Every inactivation (including the first half of each replace) comes
  /// before every insert. Within each phase steps follow ascending
  /// `external_id`.
  pub fn steps(&self) -> Vec<Step<'_>> {
    let inactivations = self.actions.iter().filter_map(|a| match a {
      Action::Inactivate { local_id, external_id } => Some(Step::Inactivate {
        local_id:    *local_id,
        external_id: *external_id,
        replaced:    false,
      }),
      Action::Replace { local_id, external_id, .. } => Some(Step::Inactivate {
        local_id:    *local_id,
        external_id: *external_id,
        replaced:    true,
      }),
      Action::Insert { .. } => None,
    });

    let inserts = self.actions.iter().filter_map(|a| match a {
      Action::Insert { external_id, name } => Some(Step::Insert {
        external_id: *external_id,
        name:        name.as_str(),
        replacement: false,
      }),
      Action::Replace { external_id, new_name, .. } => Some(Step::Insert {
        external_id: *external_id,
        name:        new_name.as_str(),
        replacement: true,
      }),
      Action::Inactivate { .. } => None,
    });

    inactivations.chain(inserts).collect()
  }
}

/// Compute the plan that makes `active` match `snapshot`.
///
/// `snapshot` should already be de-duplicated; if it is not, the first
/// occurrence of an `external_id` wins. `active` must hold only active rows.
/// Name comparison is exact, so case and whitespace count.
pub fn plan(snapshot: &[ExternalRegional], active: &[RegionalRecord]) -> Plan {
  let mut upstream: BTreeMap<i64, &str> = BTreeMap::new();
  for r in snapshot {
    upstream.entry(r.external_id).or_insert(r.name.as_str());
  }

  let mut local: BTreeMap<i64, &RegionalRecord> = BTreeMap::new();
  for r in active {
    local.entry(r.external_id).or_insert(r);
  }

  let mut actions = Vec::new();

  for (&external_id, &name) in &upstream {
    match local.get(&external_id) {
      None => actions.push(Action::Insert {
        external_id,
        name: name.to_owned(),
      }),
      Some(current) if current.name != name => actions.push(Action::Replace {
        local_id: current.id,
        external_id,
        new_name: name.to_owned(),
      }),
      Some(_) => {}
    }
  }

  for (&external_id, current) in &local {
    if !upstream.contains_key(&external_id) {
      actions.push(Action::Inactivate { local_id: current.id, external_id });
    }
  }

  // Keys are unique across actions, so this fully determines the order.
  actions.sort_by_key(Action::external_id);

  Plan { actions }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
