//! Public types for the Huginn API.

mod label;
mod record;

pub use label::{ImageReference, Label, LabelMap};
pub use record::{Attribute, AttributeValue, IMAGE_TYPE, Record, TEXT_TYPE};
