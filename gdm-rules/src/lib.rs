//! Rule engine for shop product presentation.
//!
//! Rules are typed records that select products through a scope, compose
//! text for description slots from templates, variants and nested
//! `[rule-<id>]` fragments, and run typed actions on the price, title,
//! gallery and featured slots. The crate also carries the custom order
//! fields and the admin-action HTTP API used to manage both.

mod action;
mod applier;
mod cache;
mod composer;
mod condition;
mod engine;
mod error;
mod fields;
mod loader;
mod outcome;
mod registry;
mod rule;
mod selector;
mod service;
mod store;
mod variant;

pub use action::{
    merge_gallery, AdjustmentDirection, AdjustmentKind, GalleryMode, PriceAdjustment, PriceTarget,
    Rounding, RuleAction,
};
pub use applier::{apply_action, splice};
pub use cache::RequestCache;
pub use composer::{expand_placeholders, Composer, RuleSource, MAX_DEPTH, VARIANT_TOKEN};
pub use condition::{
    matches, PriceComparison, PriceCondition, Scope, TitleComparison, TitleCondition,
    PRICE_EPSILON,
};
pub use engine::RuleEngine;
pub use error::RuleError;
pub use fields::{
    CustomField, FieldCondition, FieldError, FieldOption, FieldStore, FieldType, VisibilityMode,
};
pub use loader::{load_rules, parse_rules};
pub use outcome::RenderOutcome;
pub use registry::{ModuleDescriptor, ModuleRegistry};
pub use rule::{Placement, Rule, RuleId, RuleStatus, Schedule, Slot};
pub use selector::{select, until_final};
pub use service::{
    action_table, ActionError, ActionHandler, AdminState, RuleApiBuilder, RuleServiceConfig,
    NONCE_HEADER,
};
pub use store::{BulkStatusReport, RuleHistoryEntry, RuleStore, ScheduleTransition};
pub use variant::{select_variant, Variant, VariantAction, VariantKind, VariantMode};
