/// Image handling module
///
/// Loading, dimension probing, data-URL conversion and client-side resizing.

pub mod data_url;
pub mod loader;
pub mod resize;

pub use loader::ImageSource;
