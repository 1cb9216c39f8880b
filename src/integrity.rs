//! # Integrity Verification
//!
//! On-demand verification pass over a reconciled catalog root. Violations
//! are collected and returned, never prevented proactively during the merge;
//! a clean sync should always produce a consistent report.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{CardId, SetCode};
use crate::store::CatalogRoot;

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// An id occurs more than once within one collection view.
    DuplicateCardId { scope: String, id: CardId },
    /// A set's member view disagrees with its declared card count.
    MemberCountMismatch {
        code: SetCode,
        declared: u64,
        actual: usize,
    },
    /// A card names a set code no current set carries.
    UnknownSetCode { id: CardId, code: SetCode },
    /// A card names a current set whose member view does not contain it.
    MissingMembership { id: CardId, code: SetCode },
    /// A member card does not declare the set that holds it.
    ForeignMember { id: CardId, code: SetCode },
    /// Two current sets share a code.
    DuplicateSetCode { code: SetCode },
    /// The global distinct count is not the sum of per-set distinct counts
    /// plus orphans.
    GlobalCountMismatch {
        global: usize,
        per_set: usize,
        orphans: usize,
    },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::DuplicateCardId { scope, id } => {
                write!(f, "duplicate card id {id} in {scope}")
            }
            IntegrityViolation::MemberCountMismatch {
                code,
                declared,
                actual,
            } => write!(
                f,
                "set {code} declares {declared} cards but holds {actual}"
            ),
            IntegrityViolation::UnknownSetCode { id, code } => {
                write!(f, "card {id} references unknown set {code}")
            }
            IntegrityViolation::MissingMembership { id, code } => {
                write!(f, "card {id} is missing from the member view of set {code}")
            }
            IntegrityViolation::ForeignMember { id, code } => {
                write!(f, "set {code} holds card {id} which declares another set")
            }
            IntegrityViolation::DuplicateSetCode { code } => {
                write!(f, "duplicate set code {code}")
            }
            IntegrityViolation::GlobalCountMismatch {
                global,
                per_set,
                orphans,
            } => write!(
                f,
                "global count {global} != per-set sum {per_set} + orphans {orphans}"
            ),
        }
    }
}

/// Everything the verification pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Run the verification pass over one catalog root.
pub fn verify_root(root: &CatalogRoot) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    check_duplicates(&mut report, "the global collection", root.cards.iter());

    let mut seen_codes = FxHashSet::default();
    for set in root.sets.iter() {
        if !seen_codes.insert(set.code.clone()) {
            report
                .violations
                .push(IntegrityViolation::DuplicateSetCode {
                    code: set.code.clone(),
                });
        }

        check_duplicates(
            &mut report,
            &format!("set {}", set.code),
            set.members.iter(),
        );

        if let Some(declared) = set.card_count {
            let actual = set.members.len();
            if declared as usize != actual {
                report
                    .violations
                    .push(IntegrityViolation::MemberCountMismatch {
                        code: set.code.clone(),
                        declared,
                        actual,
                    });
            }
        }

        for id in set.members.iter() {
            let declares = root
                .arena
                .get(id)
                .and_then(|card| card.set_code.as_ref());
            if declares != Some(&set.code) {
                report.violations.push(IntegrityViolation::ForeignMember {
                    id: id.clone(),
                    code: set.code.clone(),
                });
            }
        }
    }

    let mut orphans = 0usize;
    for id in root.cards.unique_by_id().iter() {
        match root.arena.get(id).and_then(|card| card.set_code.clone()) {
            Some(code) => match root.sets.find_by_code(&code) {
                Some(set) => {
                    if !set.members.contains_id(id) {
                        report
                            .violations
                            .push(IntegrityViolation::MissingMembership {
                                id: id.clone(),
                                code,
                            });
                    }
                }
                None => {
                    orphans += 1;
                    report.violations.push(IntegrityViolation::UnknownSetCode {
                        id: id.clone(),
                        code,
                    });
                }
            },
            None => orphans += 1,
        }
    }

    let global = root.cards.unique_by_id().len();
    let per_set: usize = root
        .sets
        .iter()
        .map(|set| set.members.unique_by_id().len())
        .sum();
    if global != per_set + orphans {
        report
            .violations
            .push(IntegrityViolation::GlobalCountMismatch {
                global,
                per_set,
                orphans,
            });
    }

    report
}

fn check_duplicates<'a>(
    report: &mut IntegrityReport,
    scope: &str,
    ids: impl Iterator<Item = &'a CardId>,
) {
    let mut counts: FxHashMap<&CardId, usize> = FxHashMap::default();
    for id in ids {
        *counts.entry(id).or_default() += 1;
    }
    for (id, count) in counts {
        if count > 1 {
            report.violations.push(IntegrityViolation::DuplicateCardId {
                scope: scope.to_string(),
                id: id.clone(),
            });
        }
    }
}
