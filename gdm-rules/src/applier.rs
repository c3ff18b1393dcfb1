use gdm_protocol::catalog::Product;

use crate::action::{merge_gallery, RuleAction};
use crate::rule::Placement;

/// Splices composed text into the current content.
///
/// `IfEmpty` behaves as `Replace` when the current content is blank and
/// keeps the content untouched otherwise.
pub fn splice(current: &str, composed: &str, placement: Placement) -> String {
    match placement {
        Placement::Replace => composed.to_string(),
        Placement::Prepend => format!("{}{}", composed, current),
        Placement::Append => format!("{}{}", current, composed),
        Placement::IfEmpty if current.trim().is_empty() => composed.to_string(),
        Placement::IfEmpty => current.to_string(),
    }
}

/// Writes a non-text action onto the product.
///
/// `original` is the product before any rule ran: price, title and gallery
/// are computed from it so the last applied rule wins instead of compounding.
/// `composed_title` carries the expanded template of a `SetTitle` action.
pub fn apply_action(action: &RuleAction, product: &mut Product, original: &Product, composed_title: Option<&str>) {
    match action {
        RuleAction::AdjustPrice(adjustment) => adjustment.apply(product, original.regular_price),
        RuleAction::SetTitle { placement, .. } => {
            if let Some(title) = composed_title {
                product.name = splice(&original.name, title, *placement);
            }
        }
        RuleAction::SetFeatured { featured } => product.featured = *featured,
        RuleAction::SetGallery { image_ids, mode } => {
            product.gallery_image_ids = merge_gallery(&original.gallery_image_ids, image_ids, *mode);
        }
    }
}
