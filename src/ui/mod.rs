/// View modules
///
/// Pure view code: each submodule builds one section of the interface from
/// the application state. All side effects stay in the update loop.

pub mod history;
pub mod input;
pub mod result;

use iced::Color;

pub(crate) fn success_color() -> Color {
    Color::from_rgb(0.35, 0.78, 0.45)
}

pub(crate) fn accent_color() -> Color {
    Color::from_rgb(0.36, 0.58, 0.95)
}

pub(crate) fn dim_color() -> Color {
    Color::from_rgb(0.55, 0.55, 0.58)
}

pub(crate) fn danger_color() -> Color {
    Color::from_rgb(0.90, 0.35, 0.35)
}
