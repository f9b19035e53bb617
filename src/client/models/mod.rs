//! Kit API data models
//!
//! Models are organized by resource type for easy discovery.

mod custom_field;
mod form;
mod post;
mod product;
mod sequence;
mod subscriber;
mod tag;

pub use custom_field::CustomField;
pub use form::{Form, LandingPage};
pub use post::Post;
pub use product::Product;
pub use sequence::Sequence;
pub use subscriber::{Purchase, PurchasedProduct, Subscriber};
pub use tag::Tag;
