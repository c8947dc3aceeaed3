pub mod layout;
pub mod overview;
pub mod scene;
pub mod search;
pub mod style;
