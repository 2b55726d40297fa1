//! Coordinating unit and process wiring of the damast pipeline

pub mod collab;
pub mod coordinator;
pub mod links;
pub mod pipeline;
pub mod scopes;

pub use collab::{FilterDescriber, HtmlFilterDescriber, RegexNameSearch};
pub use coordinator::{Coordinator, FilterDescription, FilterUpdate, LoadRequest};
pub use links::{brush_links, PortLink};
pub use pipeline::Pipeline;
