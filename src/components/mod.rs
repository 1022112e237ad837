pub mod dialogs;
pub mod palette_panel;
pub mod tools;
