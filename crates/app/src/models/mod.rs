//! Domain models for the app.

pub mod carousel;
pub mod session;

pub use carousel::{CarouselData, Slide};
pub use session::ShopSession;
