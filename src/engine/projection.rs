//! Content projection.
//!
//! Nodes declared between a component host's start and end are not attached
//! to the host. They become the component view's projectable content, which
//! `projection_def` partitions into buckets once, at creation:
//!
//! - bucket 0 takes every node no selector claims
//! - bucket `i` (from 1) takes nodes matching `selectors[i - 1]`
//! - the first matching selector wins; a `None` selector matches anything
//!
//! `projection` then splices one bucket where it is declared. Text nodes and
//! containers only match `None` selectors.

use super::instructions::ViewCtx;
use super::view::{Placed, Slot};
use crate::error::{RenderError, Result};
use crate::selector::CssSelector;

impl ViewCtx<'_> {
    /// Partition this view's projectable content into buckets.
    pub fn projection_def(
        &mut self,
        index: usize,
        selectors: Option<&[Option<CssSelector>]>,
    ) -> Result<()> {
        self.expect_next(index, "projection_def")?;

        let mut content = Vec::new();
        for placed in self.view.content.borrow().iter() {
            expand(placed, &mut content);
        }

        let selectors = selectors.unwrap_or(&[]);
        let mut buckets = vec![Vec::new(); selectors.len() + 1];
        for placed in content {
            let bucket = bucket_for(&placed, selectors);
            buckets[bucket].push(placed);
        }
        log::trace!(
            "{}: projection buckets {:?}",
            self.view.name,
            buckets.iter().map(Vec::len).collect::<Vec<_>>()
        );

        self.view.slots.push(Slot::ProjectionDef(buckets));
        Ok(())
    }

    /// Insert bucket `bucket` of the definition at `def_index` here.
    pub fn projection(&mut self, index: usize, def_index: usize, bucket: usize) -> Result<()> {
        self.expect_next(index, "projection")?;
        let nodes = match self.view.slot(def_index)? {
            Slot::ProjectionDef(buckets) => buckets
                .get(bucket)
                .cloned()
                .ok_or(RenderError::BucketOutOfRange {
                    bucket,
                    len: buckets.len(),
                })?,
            _ => {
                return Err(RenderError::SlotType {
                    index: def_index,
                    expected: "a projection definition",
                });
            }
        };
        self.view.slots.push(Slot::Projection);
        self.place(Placed::Projection(nodes))
    }
}

/// Re-projected content is classified item by item.
fn expand(placed: &Placed, out: &mut Vec<Placed>) {
    match placed {
        Placed::Projection(items) => {
            for item in items {
                expand(item, out);
            }
        }
        other => out.push(other.clone()),
    }
}

fn bucket_for(placed: &Placed, selectors: &[Option<CssSelector>]) -> usize {
    let element = match placed {
        Placed::Node(node) => {
            let node = node.borrow();
            node.tag()
                .map(|tag| (tag.to_string(), node.attributes().to_vec()))
        }
        _ => None,
    };
    for (i, selector) in selectors.iter().enumerate() {
        let matched = match (selector, &element) {
            (None, _) => true,
            (Some(selector), Some((tag, attrs))) => selector.matches(tag, attrs),
            (Some(_), None) => false,
        };
        if matched {
            return i + 1;
        }
    }
    0
}
