pub mod control_form;
pub mod controls_table;
pub mod selector;
