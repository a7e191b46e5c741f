pub mod progress_bar;
pub mod reading_area;
pub mod training_sidebar;
pub mod translation_dialog;
pub mod word_detail;
