//! Renderer - DOM-like node tree and HTML serialization.
//!
//! - `dom`: `Document` owns node creation and every mutation, counting them
//!   in `DomStats` so tests can observe that an unchanged pass writes nothing
//! - `html`: serialization of a subtree (comments omitted)

pub mod dom;
pub mod html;

pub use dom::{Document, DomStats, ElementData, Listener, Node, NodeKind, NodeRef};
pub use html::{inner_html, to_html};
