//! View and content queries.
//!
//! A query collects directive instances (by type) or local references (by
//! name) as they are created. View queries see their own view and every
//! embedded view declared in it; content queries belong to a directive and
//! see the elements declared between its host's start and end.
//!
//! Every match is kept, keyed by where it sits in the view tree. Results are
//! published lazily: collection marks the list dirty, and
//! [`QueryList::refresh`] sorts the matches into DOM order, applies the
//! cardinality, makes the new result visible and reports whether anything
//! changed. Each publication also bumps a reactive counter so
//! signal-based code can observe result changes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use super::instructions::ViewCtx;
use super::view::{Slot, ViewPath};
use crate::definition::{Directive, DirectiveRef, TypeTag};
use crate::error::{RenderError, Result};
use crate::types::Value;

// =============================================================================
// Query Description
// =============================================================================

/// What a query collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPredicate {
    /// Instances of one directive type.
    Type(TypeTag),
    /// Values of the named local references.
    Locals(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cardinality {
    /// Publish only the first match in DOM order.
    First,
    #[default]
    All,
}

/// A query declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub predicate: QueryPredicate,
    pub cardinality: Cardinality,
    /// Content queries only: also match below direct children of the host.
    pub descend: bool,
}

impl QuerySpec {
    pub fn directive<T: Directive>() -> Self {
        Self {
            predicate: QueryPredicate::Type(TypeTag::of::<T>()),
            cardinality: Cardinality::All,
            descend: false,
        }
    }

    pub fn locals(names: &[&str]) -> Self {
        Self {
            predicate: QueryPredicate::Locals(names.iter().map(|n| n.to_string()).collect()),
            cardinality: Cardinality::All,
            descend: false,
        }
    }

    pub fn first(mut self) -> Self {
        self.cardinality = Cardinality::First;
        self
    }

    pub fn descend(mut self, descend: bool) -> Self {
        self.descend = descend;
        self
    }
}

/// Something a query may collect.
pub(crate) enum Candidate<'a> {
    Directive { tag: TypeTag, handle: &'a Value },
    Local { name: &'a str, value: &'a Value },
}

/// A content query handed down to the embedded views of a container.
#[derive(Clone)]
pub(crate) struct InheritedQuery {
    pub(crate) list: QueryList,
    /// The container's nodes are direct children of the query's host.
    pub(crate) direct: bool,
}

// =============================================================================
// Query List
// =============================================================================

/// Where a match was collected.
pub(crate) struct EntryKey {
    pub(crate) path: ViewPath,
    pub(crate) slot: usize,
}

struct Entry {
    view_id: usize,
    key: EntryKey,
    value: Value,
}

struct QueryState {
    /// Every match, tagged with the view that produced it.
    entries: Vec<Entry>,
    /// Last published result.
    published: Vec<Value>,
    dirty: bool,
    /// Nothing has been published yet.
    pristine: bool,
}

struct QueryInner {
    spec: QuerySpec,
    state: RefCell<QueryState>,
    version: Signal<u64>,
}

/// Live result of a query. Clones share the same list.
#[derive(Clone)]
pub struct QueryList {
    inner: Rc<QueryInner>,
}

impl QueryList {
    pub(crate) fn new(spec: QuerySpec) -> Self {
        Self {
            inner: Rc::new(QueryInner {
                spec,
                state: RefCell::new(QueryState {
                    entries: Vec::new(),
                    published: Vec::new(),
                    dirty: true,
                    pristine: true,
                }),
                version: signal(0),
            }),
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.inner.spec
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.state.borrow().published.get(index).cloned()
    }

    pub fn first(&self) -> Option<Value> {
        self.get(0)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.state.borrow().published.clone()
    }

    /// Published entries that are directive handles.
    pub fn directives(&self) -> Vec<DirectiveRef> {
        self.inner
            .state
            .borrow()
            .published
            .iter()
            .filter_map(DirectiveRef::from_value)
            .collect()
    }

    /// Publish pending changes. Returns `true` if the visible result changed,
    /// and always on the first call.
    pub fn refresh(&self) -> bool {
        let mut state = self.inner.state.borrow_mut();
        if !state.dirty {
            return false;
        }
        state.dirty = false;
        state
            .entries
            .sort_by_cached_key(|entry| entry.key.path.order(entry.key.slot));
        let keep = match self.inner.spec.cardinality {
            Cardinality::First => state.entries.len().min(1),
            Cardinality::All => state.entries.len(),
        };
        let next: Vec<Value> = state.entries[..keep]
            .iter()
            .map(|entry| entry.value.clone())
            .collect();
        let changed = std::mem::take(&mut state.pristine)
            || next.len() != state.published.len()
            || next.iter().zip(&state.published).any(|(a, b)| !a.same(b));
        state.published = next;
        drop(state);

        if changed {
            let version = self.inner.version.get();
            self.inner.version.set(version + 1);
        }
        changed
    }

    /// Counter bumped every time [`QueryList::refresh`] publishes a change.
    pub fn changes(&self) -> Signal<u64> {
        self.inner.version.clone()
    }

    pub fn ptr_eq(a: &QueryList, b: &QueryList) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Offer a candidate collected in view `view_id`.
    pub(crate) fn offer(&self, view_id: usize, key: EntryKey, candidate: &Candidate<'_>) {
        let value = match (&self.inner.spec.predicate, candidate) {
            (QueryPredicate::Type(wanted), Candidate::Directive { tag, handle }) if wanted == tag => {
                (*handle).clone()
            }
            (QueryPredicate::Locals(names), Candidate::Local { name, value })
                if names.iter().any(|n| n == name) =>
            {
                (*value).clone()
            }
            _ => return,
        };

        let mut state = self.inner.state.borrow_mut();
        state.entries.push(Entry { view_id, key, value });
        state.dirty = true;
    }

    /// Drop everything collected in a destroyed view.
    pub(crate) fn remove_view(&self, view_id: usize) {
        let mut state = self.inner.state.borrow_mut();
        let before = state.entries.len();
        state.entries.retain(|entry| entry.view_id != view_id);
        if state.entries.len() != before {
            state.dirty = true;
        }
    }
}

impl fmt::Debug for QueryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryList")
            .field("spec", &self.inner.spec)
            .field("len", &self.len())
            .finish()
    }
}

// =============================================================================
// Instructions
// =============================================================================

impl ViewCtx<'_> {
    /// Declare a view query at `index`.
    pub fn query(&mut self, index: usize, spec: QuerySpec) -> Result<QueryList> {
        self.expect_next(index, "query")?;
        let list = QueryList::new(spec);
        self.view.slots.push(Slot::Query(list.clone()));
        self.view.queries.push(list.clone());
        Ok(list)
    }

    /// The query declared at `index`.
    pub fn load_query(&self, index: usize) -> Result<QueryList> {
        match self.view.slot(index)? {
            Slot::Query(list) => Ok(list.clone()),
            _ => Err(RenderError::SlotType {
                index,
                expected: "a query",
            }),
        }
    }

    /// Content query `n` of the directive at `directive`, in declaration order.
    pub fn content_query(&self, directive: usize, n: usize) -> Result<QueryList> {
        self.view
            .directive(directive)?
            .content_queries
            .get(n)
            .cloned()
            .ok_or(RenderError::SlotType {
                index: directive,
                expected: "a directive with that many content queries",
            })
    }

    /// Hand a new directive or local on element `host` to every interested
    /// query: the view queries visible here, then the content queries of
    /// enclosing hosts, including hosts outside this embedded view.
    pub(crate) fn offer_to_queries(&self, host: usize, candidate: Candidate<'_>) {
        let view_id = self.view.id;
        let slot = self.view.slots.len().saturating_sub(1);
        let key = || EntryKey {
            path: self.view.path.clone(),
            slot,
        };
        for list in &self.view.queries {
            list.offer(view_id, key(), &candidate);
        }

        // `open` includes `host` itself when the element is still open.
        let ancestors: Vec<usize> = self
            .open
            .iter()
            .copied()
            .filter(|&slot| slot != host)
            .collect();
        for inherited in self.content_queries_within(&ancestors) {
            inherited.list.offer(view_id, key(), &candidate);
        }
    }

    /// Content queries that see a node whose enclosing open elements in this
    /// view are `ancestors` (outermost first).
    pub(crate) fn content_queries_within(&self, ancestors: &[usize]) -> Vec<InheritedQuery> {
        let top_level = ancestors.is_empty();
        let mut out: Vec<InheritedQuery> = self
            .view
            .content_queries
            .iter()
            .filter(|q| q.list.spec().descend || (q.direct && top_level))
            .map(|q| InheritedQuery {
                list: q.list.clone(),
                direct: q.direct && top_level,
            })
            .collect();

        let parent = ancestors.last().copied();
        for &element in ancestors {
            let Ok(el) = self.view.element(element) else {
                continue;
            };
            let direct = Some(element) == parent;
            for &dir in &el.directives {
                let Ok(slot) = self.view.directive(dir) else {
                    continue;
                };
                for list in &slot.content_queries {
                    if list.spec().descend || direct {
                        out.push(InheritedQuery {
                            list: list.clone(),
                            direct,
                        });
                    }
                }
            }
        }
        out
    }
}
