pub mod date_label;
pub mod date_range;
pub mod element;
pub mod interval;
pub mod record;
