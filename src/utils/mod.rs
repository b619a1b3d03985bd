pub mod averages;
pub mod host;
pub mod locale;
pub mod mykoob;
pub mod popup;
