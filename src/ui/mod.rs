/// UI module exports
pub mod components;
pub mod side_panel;
