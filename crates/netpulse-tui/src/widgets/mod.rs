pub mod charts;
pub mod format;
pub mod selection;
pub mod text_input;
