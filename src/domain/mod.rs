//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod diff;
pub mod entities;
pub mod error;
pub mod layout;
pub mod normalize;
pub mod validator;
pub mod visibility;

pub use arena::{ChangeAnnotation, HierarchyNode, HierarchyTree};
pub use builder::{build_hierarchy, HierarchyBuilder};
pub use diff::{
    analyze_changes, annotate_tree, CascadeEffect, ChangeAnalysis, ChangeClassification,
    ChangeSummary, ChangeType, DiffEngine, MovedEmployee,
};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use layout::{calculate_layout, subtree_width, LayoutConfig, LayoutEngine};
pub use normalize::{normalize_id, normalize_opt};
pub use validator::{validate, validate_records, validate_with};
pub use visibility::{positioned_nodes, visible_links, visible_nodes, PositionedNode, VisibleLink};
